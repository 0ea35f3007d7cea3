//! Persisted player progress: stars, unlocks, endless records, codex.
//!
//! The backing store is external and untrusted. Loading never fails: every
//! field is coerced into its valid domain and anything unusable is dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

pub const PROGRESS_KEY: &str = "reef.progress.v1";
pub const DEFAULT_UNLOCKED: [&str; 2] = ["endless_default", "stage_shallow_intro"];
pub const ENDLESS_BEST_WAVE: &str = "endlessWave";
pub const ENDLESS_BEST_KILLS: &str = "endlessKills";
const MAX_STARS: u8 = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub stars: BTreeMap<String, u8>,
    pub unlocked_stages: Vec<String>,
    pub best_scores: BTreeMap<String, u32>,
    pub seen_units: Vec<String>,
    pub seen_towers: Vec<String>,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            stars: BTreeMap::new(),
            unlocked_stages: DEFAULT_UNLOCKED.iter().map(|s| s.to_string()).collect(),
            best_scores: BTreeMap::new(),
            seen_units: Vec::new(),
            seen_towers: Vec::new(),
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn unique_strings(value: Option<&Value>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in value.and_then(Value::as_array).into_iter().flatten() {
        if let Some(s) = item.as_str() {
            if !out.iter().any(|seen| seen == s) {
                out.push(s.to_string());
            }
        }
    }
    out
}

fn migrate_unit_id(id: String) -> String {
    match id.as_str() {
        "tunaMedium" => "oarfish".to_string(),
        _ => id,
    }
}

impl Progress {
    /// Coerces arbitrary JSON into valid progress for a catalog whose stage
    /// ids are `known_stages`.
    pub fn sanitize(raw: &Value, known_stages: &[&str]) -> Self {
        let known = |id: &str| known_stages.contains(&id);
        let obj = raw.as_object();
        let field = |name: &str| obj.and_then(|o| o.get(name));

        let mut stars = BTreeMap::new();
        for (stage, value) in field("stars").and_then(Value::as_object).into_iter().flatten() {
            if !known(stage) {
                continue;
            }
            if let Some(n) = as_number(value) {
                stars.insert(stage.clone(), n.floor().clamp(0.0, f64::from(MAX_STARS)) as u8);
            }
        }

        let mut unlocked_stages: Vec<String> = unique_strings(field("unlockedStages"))
            .into_iter()
            .filter(|id| known(id))
            .collect();
        let [endless, intro] = DEFAULT_UNLOCKED;
        if !unlocked_stages.iter().any(|s| s == endless) {
            unlocked_stages.insert(0, endless.to_string());
        }
        if !unlocked_stages.iter().any(|s| s == intro) {
            unlocked_stages.push(intro.to_string());
        }

        let mut best_scores = BTreeMap::new();
        for (key, value) in field("bestScores").and_then(Value::as_object).into_iter().flatten() {
            if let Some(n) = as_number(value) {
                best_scores.insert(key.clone(), n.floor().clamp(0.0, f64::from(u32::MAX)) as u32);
            }
        }

        let mut seen_units: Vec<String> = Vec::new();
        for id in unique_strings(field("seenUnits").or_else(|| field("seenFish"))) {
            let id = migrate_unit_id(id);
            if !seen_units.contains(&id) {
                seen_units.push(id);
            }
        }

        Self {
            stars,
            unlocked_stages,
            best_scores,
            seen_units,
            seen_towers: unique_strings(field("seenTowers")),
        }
    }

    pub fn from_json(text: &str, known_stages: &[&str]) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(raw) => Self::sanitize(&raw, known_stages),
            Err(err) => {
                warn!(%err, "progress data is not valid JSON, starting fresh");
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn stars_for(&self, stage: &str) -> u8 {
        self.stars.get(stage).copied().unwrap_or(0)
    }

    /// Keeps the best rating. Returns true when it improved.
    pub fn record_stars(&mut self, stage: &str, stars: u8) -> bool {
        let stars = stars.min(MAX_STARS);
        if stars <= self.stars_for(stage) {
            return false;
        }
        self.stars.insert(stage.to_string(), stars);
        true
    }

    pub fn is_unlocked(&self, stage: &str) -> bool {
        stage.starts_with("endless") || self.unlocked_stages.iter().any(|s| s == stage)
    }

    pub fn unlock(&mut self, stage: &str) -> bool {
        if self.unlocked_stages.iter().any(|s| s == stage) {
            return false;
        }
        self.unlocked_stages.push(stage.to_string());
        true
    }

    /// Raises the endless records. Returns true when either improved.
    pub fn record_endless(&mut self, wave: u32, kills: u32) -> bool {
        let mut improved = false;
        for (key, value) in [(ENDLESS_BEST_WAVE, wave), (ENDLESS_BEST_KILLS, kills)] {
            let best = self.best_scores.entry(key.to_string()).or_insert(0);
            if value > *best {
                *best = value;
                improved = true;
            }
        }
        improved
    }

    pub fn mark_unit_seen(&mut self, kind: &str) -> bool {
        mark(&mut self.seen_units, kind)
    }

    pub fn mark_tower_seen(&mut self, kind: &str) -> bool {
        mark(&mut self.seen_towers, kind)
    }
}

fn mark(list: &mut Vec<String>, id: &str) -> bool {
    if id.is_empty() || list.iter().any(|s| s == id) {
        return false;
    }
    list.push(id.to_string());
    true
}

/// Opaque key-value persistence owned by the host application.
pub trait ProgressStore {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&mut self, key: &str, value: &str);
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}

pub fn load_progress(store: &dyn ProgressStore, known_stages: &[&str]) -> Progress {
    store
        .load(PROGRESS_KEY)
        .map(|text| Progress::from_json(&text, known_stages))
        .unwrap_or_default()
}

pub fn save_progress(store: &mut dyn ProgressStore, progress: &Progress) {
    match progress.to_json() {
        Ok(text) => store.save(PROGRESS_KEY, &text),
        Err(err) => warn!(%err, "could not serialize progress"),
    }
}
