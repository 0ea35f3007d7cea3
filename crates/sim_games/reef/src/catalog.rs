//! Read-only catalogs the engine consumes: unit species, tower specs, stages.
//!
//! Catalog content is data. Lookups never fail at runtime: unknown unit
//! species resolve to the catalog's fallback species and unknown tower kinds
//! resolve to the basic tower.

use crate::plan::WavePlan;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("tower catalog has no `basic` entry")]
    MissingBasicTower,
    #[error("unit catalog fallback `{0}` is not a known species")]
    MissingFallbackUnit(String),
    #[error("unknown count term `{kind}` over `{value}`")]
    UnknownCountTerm { kind: String, value: String },
    #[error("stage `{0}` has a route shorter than two cells")]
    ShortRoute(String),
    #[error("catalog declares no stages")]
    NoStages,
}

// ---------------------------------------------------------------------------
// Towers
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TowerKind {
    Basic,
    Slow,
    Splash,
    Sniper,
    Support,
}

impl TowerKind {
    pub const ALL: [TowerKind; 5] = [
        TowerKind::Basic,
        TowerKind::Slow,
        TowerKind::Splash,
        TowerKind::Sniper,
        TowerKind::Support,
    ];

    pub fn key(self) -> &'static str {
        match self {
            TowerKind::Basic => "basic",
            TowerKind::Slow => "slow",
            TowerKind::Splash => "splash",
            TowerKind::Sniper => "sniper",
            TowerKind::Support => "support",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlowSpec {
    /// Movement multiplier while active; lower is stronger.
    pub multiplier: f32,
    pub duration: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BurnSpec {
    pub dps: f32,
    pub duration: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArmorBreakSpec {
    /// Added to the target's armor ratio while active.
    pub amount: f32,
    pub duration: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SupportAura {
    pub radius: f32,
    pub damage_mult: f32,
    #[serde(alias = "fireRateMult")]
    pub fire_interval_mult: f32,
    pub range_bonus: f32,
    pub crit_bonus: f32,
    #[serde(alias = "armorBreakBonus")]
    pub armor_pierce_bonus: f32,
}

impl Default for SupportAura {
    fn default() -> Self {
        Self {
            radius: 0.0,
            damage_mult: 1.0,
            fire_interval_mult: 1.0,
            range_bonus: 0.0,
            crit_bonus: 0.0,
            armor_pierce_bonus: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TowerSpec {
    pub label: String,
    pub cost: u32,
    pub damage: f32,
    pub range: f32,
    #[serde(alias = "fireRate")]
    pub fire_interval: f32,
    pub projectile_speed: f32,
    pub upgrade_cost: u32,
    #[serde(default)]
    pub slow: Option<SlowSpec>,
    #[serde(default)]
    pub splash_radius: f32,
    #[serde(default)]
    pub splash_ratio: f32,
    #[serde(default)]
    pub crit_chance: f32,
    #[serde(default)]
    pub crit_multiplier: Option<f32>,
    #[serde(default)]
    pub support_aura: Option<SupportAura>,
}

/// Tower specs keyed by kind. Always contains a basic tower.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<TowerKind, TowerSpec>",
    into = "BTreeMap<TowerKind, TowerSpec>"
)]
pub struct TowerCatalog {
    basic: TowerSpec,
    others: BTreeMap<TowerKind, TowerSpec>,
}

impl TowerCatalog {
    pub fn new(mut specs: BTreeMap<TowerKind, TowerSpec>) -> Result<Self, CatalogError> {
        let basic = specs
            .remove(&TowerKind::Basic)
            .ok_or(CatalogError::MissingBasicTower)?;
        Ok(Self {
            basic,
            others: specs,
        })
    }

    pub(crate) fn with_basic(basic: TowerSpec, others: BTreeMap<TowerKind, TowerSpec>) -> Self {
        let mut others = others;
        others.remove(&TowerKind::Basic);
        Self { basic, others }
    }

    pub fn get(&self, kind: TowerKind) -> Option<&TowerSpec> {
        match kind {
            TowerKind::Basic => Some(&self.basic),
            other => self.others.get(&other),
        }
    }

    /// Spec for `kind`, or the basic tower when the catalog lacks it.
    pub fn spec(&self, kind: TowerKind) -> (TowerKind, &TowerSpec) {
        match self.get(kind) {
            Some(spec) => (kind, spec),
            None => {
                warn!(kind = kind.key(), "tower kind missing from catalog, using basic");
                (TowerKind::Basic, &self.basic)
            }
        }
    }

    pub fn kinds(&self) -> impl Iterator<Item = TowerKind> + '_ {
        std::iter::once(TowerKind::Basic).chain(self.others.keys().copied())
    }
}

impl TryFrom<BTreeMap<TowerKind, TowerSpec>> for TowerCatalog {
    type Error = CatalogError;

    fn try_from(specs: BTreeMap<TowerKind, TowerSpec>) -> Result<Self, Self::Error> {
        Self::new(specs)
    }
}

impl From<TowerCatalog> for BTreeMap<TowerKind, TowerSpec> {
    fn from(catalog: TowerCatalog) -> Self {
        let mut specs = catalog.others;
        specs.insert(TowerKind::Basic, catalog.basic);
        specs
    }
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummonPack {
    pub kind: String,
    pub count: u32,
}

fn unit_scale() -> f32 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SkillDescriptor {
    AccelerateOnHp {
        trigger_hp_ratio: f32,
        multiplier: f32,
    },
    ArmorStatic {
        armor_ratio: f32,
    },
    SplitOnDeath {
        count: u32,
        into: String,
        #[serde(default = "unit_scale")]
        hp_scale: f32,
    },
    BossSummonThreshold {
        #[serde(default)]
        thresholds: Option<Vec<f32>>,
        #[serde(default)]
        packs: Option<Vec<SummonPack>>,
        #[serde(default)]
        speed_multiplier: Option<f32>,
    },
    BossShieldThreshold {
        #[serde(default)]
        thresholds: Option<Vec<f32>>,
        #[serde(default)]
        shield_ratio: Option<f32>,
    },
}

fn full_armor_ratio() -> f32 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitTemplate {
    #[serde(default)]
    pub id: String,
    pub label: String,
    pub hp: f32,
    pub speed: f32,
    /// Lives removed when this unit leaks.
    pub damage: i32,
    pub reward: u32,
    pub radius: f32,
    #[serde(default = "full_armor_ratio")]
    pub armor_ratio: f32,
    #[serde(default)]
    pub skills: Vec<SkillDescriptor>,
    #[serde(default)]
    pub is_boss: bool,
}

#[derive(Deserialize)]
struct RawUnitCatalog {
    fallback: String,
    units: BTreeMap<String, UnitTemplate>,
}

#[derive(Serialize)]
struct UnitCatalogRepr {
    fallback: String,
    units: BTreeMap<String, UnitTemplate>,
}

/// Unit species keyed by id, with a designated fallback species.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "RawUnitCatalog", into = "UnitCatalogRepr")]
pub struct UnitCatalog {
    fallback: UnitTemplate,
    templates: BTreeMap<String, UnitTemplate>,
}

impl UnitCatalog {
    pub fn new(
        templates: BTreeMap<String, UnitTemplate>,
        fallback: &str,
    ) -> Result<Self, CatalogError> {
        let templates = stamp_ids(templates);
        let fallback = templates
            .get(fallback)
            .cloned()
            .ok_or_else(|| CatalogError::MissingFallbackUnit(fallback.to_string()))?;
        Ok(Self {
            fallback,
            templates,
        })
    }

    /// Builds from a fallback template that is not required to be in `templates`.
    pub(crate) fn with_fallback(
        fallback_id: &str,
        fallback: UnitTemplate,
        templates: BTreeMap<String, UnitTemplate>,
    ) -> Self {
        let mut templates = stamp_ids(templates);
        let mut fallback = fallback;
        fallback.id = fallback_id.to_string();
        templates.insert(fallback.id.clone(), fallback.clone());
        Self {
            fallback,
            templates,
        }
    }

    pub fn get(&self, kind: &str) -> Option<&UnitTemplate> {
        self.templates.get(kind)
    }

    /// Template for `kind`, or the fallback species when unknown.
    pub fn resolve(&self, kind: &str) -> &UnitTemplate {
        match self.templates.get(kind) {
            Some(template) => template,
            None => {
                warn!(kind, fallback = %self.fallback.id, "unknown unit species, using fallback");
                &self.fallback
            }
        }
    }

    pub fn fallback_id(&self) -> &str {
        &self.fallback.id
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}

fn stamp_ids(templates: BTreeMap<String, UnitTemplate>) -> BTreeMap<String, UnitTemplate> {
    templates
        .into_iter()
        .map(|(id, mut template)| {
            template.id.clone_from(&id);
            (id, template)
        })
        .collect()
}

impl TryFrom<RawUnitCatalog> for UnitCatalog {
    type Error = CatalogError;

    fn try_from(raw: RawUnitCatalog) -> Result<Self, Self::Error> {
        Self::new(raw.units, &raw.fallback)
    }
}

impl From<UnitCatalog> for UnitCatalogRepr {
    fn from(catalog: UnitCatalog) -> Self {
        Self {
            fallback: catalog.fallback.id,
            units: catalog.templates,
        }
    }
}

// ---------------------------------------------------------------------------
// Maps and stages
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSpec {
    pub cols: u32,
    pub rows: u32,
    pub cell_size: f32,
    #[serde(default)]
    pub offset_x: f32,
    #[serde(default)]
    pub offset_y: f32,
    /// Route cells in travel order.
    pub path_cells: Vec<[u32; 2]>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: String,
    pub label: String,
    pub map: MapSpec,
    pub wave_plan: WavePlan,
}

impl Stage {
    pub fn is_endless(&self) -> bool {
        self.wave_plan.max_waves.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub units: UnitCatalog,
    pub towers: TowerCatalog,
    /// Stages in unlock order.
    pub stages: Vec<Stage>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.stages.is_empty() {
            return Err(CatalogError::NoStages);
        }
        if let Some(stage) = self.stages.iter().find(|s| s.map.path_cells.len() < 2) {
            return Err(CatalogError::ShortRoute(stage.id.clone()));
        }
        Ok(())
    }

    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.id == id)
    }

    /// Stage `id`, or the first stage when unknown.
    pub fn stage_or_first(&self, id: &str) -> Option<&Stage> {
        self.stage(id).or_else(|| {
            warn!(stage = id, "unknown stage, using the first catalog stage");
            self.stages.first()
        })
    }

    /// Stage unlocked by clearing `id`.
    pub fn next_stage_id(&self, id: &str) -> Option<&str> {
        let index = self.stages.iter().position(|stage| stage.id == id)?;
        self.stages.get(index + 1).map(|stage| stage.id.as_str())
    }

    pub fn stage_ids(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|stage| stage.id.as_str())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        crate::defaults::catalog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tower_catalog_requires_basic() {
        let mut specs = BTreeMap::new();
        let slow = crate::defaults::catalog()
            .towers
            .get(TowerKind::Slow)
            .cloned()
            .unwrap();
        specs.insert(TowerKind::Slow, slow);
        assert!(matches!(
            TowerCatalog::new(specs),
            Err(CatalogError::MissingBasicTower)
        ));
    }

    #[test]
    fn missing_tower_kind_falls_back_to_basic() {
        let mut specs = BTreeMap::new();
        let basic = crate::defaults::catalog()
            .towers
            .get(TowerKind::Basic)
            .cloned()
            .unwrap();
        specs.insert(TowerKind::Basic, basic);
        let catalog = TowerCatalog::new(specs).unwrap();
        let (kind, spec) = catalog.spec(TowerKind::Sniper);
        assert_eq!(kind, TowerKind::Basic);
        assert_eq!(spec.cost, 50);
    }

    #[test]
    fn unknown_unit_resolves_to_fallback() {
        let catalog = crate::defaults::catalog();
        let template = catalog.units.resolve("kraken");
        assert_eq!(template.id, catalog.units.fallback_id());
    }

    #[test]
    fn skills_parse_from_tagged_json() {
        let json = r#"{
            "label": "Puffer",
            "hp": 90, "speed": 55, "damage": 1, "reward": 10, "radius": 11,
            "skills": [
                {"type": "split_on_death", "count": 3, "into": "minnow", "hpScale": 0.5},
                {"type": "accelerate_on_hp", "triggerHpRatio": 0.5, "multiplier": 1.3}
            ]
        }"#;
        let template: UnitTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(template.armor_ratio, 1.0);
        assert_eq!(
            template.skills[0],
            SkillDescriptor::SplitOnDeath {
                count: 3,
                into: "minnow".to_string(),
                hp_scale: 0.5
            }
        );
    }

    #[test]
    fn default_catalog_survives_json_round_trip() {
        let catalog = Catalog::default();
        let json = serde_json::to_string(&catalog).unwrap();
        let parsed = Catalog::from_json(&json).unwrap();
        assert_eq!(parsed, catalog);
    }

    #[test]
    fn next_stage_follows_catalog_order() {
        let catalog = Catalog::default();
        let ids: Vec<&str> = catalog.stage_ids().collect();
        assert_eq!(catalog.next_stage_id(ids[0]), Some(ids[1]));
        assert_eq!(catalog.next_stage_id(ids[ids.len() - 1]), None);
    }
}
