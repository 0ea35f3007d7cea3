//! Declarative wave plans: spawn rules, count formulas, boss waves, pacing and
//! clear conditions.

use crate::catalog::CatalogError;
use serde::{Deserialize, Serialize};

/// One additive term of a count formula.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCountTerm", into = "RawCountTerm")]
pub enum CountTerm {
    /// `factor × wave`
    Scaled { factor: f64 },
    /// `floor(wave / divisor)`
    Stepped { divisor: f64 },
    /// `floor(max(0, wave − offset) / divisor)`
    SteppedAfter { offset: f64, divisor: f64 },
}

impl CountTerm {
    pub fn evaluate(&self, wave: u32) -> f64 {
        let w = f64::from(wave);
        match *self {
            CountTerm::Scaled { factor } => factor * w,
            CountTerm::Stepped { divisor } => (w / nonzero(divisor)).floor(),
            CountTerm::SteppedAfter { offset, divisor } => {
                ((w - offset).max(0.0) / nonzero(divisor)).floor()
            }
        }
    }
}

fn nonzero(divisor: f64) -> f64 {
    if divisor == 0.0 || !divisor.is_finite() {
        1.0
    } else {
        divisor
    }
}

/// Wire shape: `{type: "mul"|"floorDiv", value: "wave"|"waveMinus", factor?, divisor?, minus?}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct RawCountTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    divisor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    minus: Option<f64>,
}

impl TryFrom<RawCountTerm> for CountTerm {
    type Error = CatalogError;

    fn try_from(raw: RawCountTerm) -> Result<Self, Self::Error> {
        match (raw.kind.as_str(), raw.value.as_str()) {
            ("mul", "wave") => Ok(CountTerm::Scaled {
                factor: raw.factor.unwrap_or(1.0),
            }),
            ("floorDiv", "wave") => Ok(CountTerm::Stepped {
                divisor: raw.divisor.unwrap_or(1.0),
            }),
            ("floorDiv", "waveMinus") => Ok(CountTerm::SteppedAfter {
                offset: raw.minus.unwrap_or(0.0),
                divisor: raw.divisor.unwrap_or(1.0),
            }),
            _ => Err(CatalogError::UnknownCountTerm {
                kind: raw.kind,
                value: raw.value,
            }),
        }
    }
}

impl From<CountTerm> for RawCountTerm {
    fn from(term: CountTerm) -> Self {
        let (kind, value, factor, divisor, minus) = match term {
            CountTerm::Scaled { factor } => ("mul", "wave", Some(factor), None, None),
            CountTerm::Stepped { divisor } => ("floorDiv", "wave", None, Some(divisor), None),
            CountTerm::SteppedAfter { offset, divisor } => {
                ("floorDiv", "waveMinus", None, Some(divisor), Some(offset))
            }
        };
        Self {
            kind: kind.to_string(),
            value: value.to_string(),
            factor,
            divisor,
            minus,
        }
    }
}

/// `count = max(0, floor(base + Σ terms))`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountExpr {
    pub base: f64,
    pub terms: Vec<CountTerm>,
}

impl CountExpr {
    pub fn constant(base: f64) -> Self {
        Self {
            base,
            terms: Vec::new(),
        }
    }

    pub fn with(mut self, term: CountTerm) -> Self {
        self.terms.push(term);
        self
    }

    pub fn evaluate(&self, wave: u32) -> u32 {
        let total = self.terms.iter().fold(self.base, |acc, t| acc + t.evaluate(wave));
        if total.is_finite() && total > 0.0 {
            total.floor().min(f64::from(u32::MAX)) as u32
        } else {
            0
        }
    }
}

fn first_wave() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnRule {
    pub kind: String,
    #[serde(default = "first_wave")]
    pub unlock_wave: u32,
    pub count: CountExpr,
}

impl SpawnRule {
    pub fn new(kind: &str, unlock_wave: u32, count: CountExpr) -> Self {
        Self {
            kind: kind.to_string(),
            unlock_wave,
            count,
        }
    }

    /// Units this rule contributes to `wave`; zero before it unlocks.
    pub fn count_for(&self, wave: u32) -> u32 {
        if wave < self.unlock_wave {
            0
        } else {
            self.count.evaluate(wave)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BossWave {
    pub interval: u32,
    pub boss_kind: String,
    pub extra_rules: Vec<SpawnRule>,
    /// Boss goes to the back of the queue; otherwise the front.
    pub spawn_last: bool,
}

impl Default for BossWave {
    fn default() -> Self {
        Self {
            interval: 5,
            boss_kind: "bossWhaleKing".to_string(),
            extra_rules: Vec::new(),
            spawn_last: true,
        }
    }
}

impl BossWave {
    pub fn is_boss_wave(&self, wave: u32) -> bool {
        self.interval > 0 && wave > 0 && wave % self.interval == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpawnTiming {
    pub normal_base: f32,
    pub normal_jitter: f32,
    pub boss_fixed: f32,
}

impl Default for SpawnTiming {
    fn default() -> Self {
        Self {
            normal_base: 0.45,
            normal_jitter: 0.25,
            boss_fixed: 1.2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClearCondition {
    MinLives { value: i32 },
    MinKills { value: u32 },
    MaxLeaks { value: i32 },
    MaxTowersPlaced { value: u32 },
}

impl ClearCondition {
    /// Early-start bonus contribution of this condition type, in percent.
    pub fn bonus_percent(&self) -> u32 {
        match self {
            ClearCondition::MaxTowersPlaced { .. } => 12,
            ClearCondition::MaxLeaks { .. } => 8,
            ClearCondition::MinLives { .. } => 5,
            ClearCondition::MinKills { .. } => 4,
        }
    }

    pub fn type_key(&self) -> &'static str {
        match self {
            ClearCondition::MinLives { .. } => "minLives",
            ClearCondition::MinKills { .. } => "minKills",
            ClearCondition::MaxLeaks { .. } => "maxLeaks",
            ClearCondition::MaxTowersPlaced { .. } => "maxTowersPlaced",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WavePlan {
    pub label: String,
    /// `None` runs forever.
    pub max_waves: Option<u32>,
    pub rules: Vec<SpawnRule>,
    pub boss_wave: BossWave,
    pub clear_conditions: Vec<ClearCondition>,
    pub spawn_timing: SpawnTiming,
    pub auto_wave_delay_seconds: f32,
}

impl Default for WavePlan {
    fn default() -> Self {
        Self {
            label: String::new(),
            max_waves: None,
            rules: Vec::new(),
            boss_wave: BossWave::default(),
            clear_conditions: Vec::new(),
            spawn_timing: SpawnTiming::default(),
            auto_wave_delay_seconds: 1.4,
        }
    }
}
