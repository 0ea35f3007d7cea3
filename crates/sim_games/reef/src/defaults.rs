//! Built-in content so the engine runs without external catalog files.
//! Values are tuning, not contract.

use crate::catalog::{
    Catalog, MapSpec, SkillDescriptor, SlowSpec, Stage, SupportAura, TowerCatalog, TowerKind,
    TowerSpec, UnitCatalog, UnitTemplate,
};
use crate::plan::{
    BossWave, ClearCondition, CountExpr, CountTerm, SpawnRule, SpawnTiming, WavePlan,
};
use std::collections::BTreeMap;

pub const ENDLESS_STAGE: &str = "endless_default";
pub const INTRO_STAGE: &str = "stage_shallow_intro";
pub const KELP_STAGE: &str = "stage_kelp_maze";
pub const FALLBACK_UNIT: &str = "minnow";
pub const BOSS_UNIT: &str = "bossWhaleKing";

pub fn catalog() -> Catalog {
    Catalog {
        units: units(),
        towers: towers(),
        stages: vec![endless_stage(), intro_stage(), kelp_stage()],
    }
}

fn unit(label: &str, hp: f32, speed: f32, damage: i32, reward: u32, radius: f32) -> UnitTemplate {
    UnitTemplate {
        id: String::new(),
        label: label.to_string(),
        hp,
        speed,
        damage,
        reward,
        radius,
        armor_ratio: 1.0,
        skills: Vec::new(),
        is_boss: false,
    }
}

pub fn units() -> UnitCatalog {
    let mut templates = BTreeMap::new();
    let minnow = unit("Minnow", 40.0, 62.0, 1, 6, 9.0);

    let mut swordfish = unit("Swordfish", 55.0, 80.0, 1, 8, 10.0);
    swordfish.skills.push(SkillDescriptor::AccelerateOnHp {
        trigger_hp_ratio: 0.5,
        multiplier: 1.35,
    });
    templates.insert("swordfish".to_string(), swordfish);

    templates.insert("oarfish".to_string(), unit("Oarfish", 120.0, 48.0, 2, 12, 13.0));

    let mut puffer = unit("Puffer", 90.0, 52.0, 1, 10, 12.0);
    puffer.skills.push(SkillDescriptor::SplitOnDeath {
        count: 3,
        into: "minnow".to_string(),
        hp_scale: 0.5,
    });
    templates.insert("puffer".to_string(), puffer);

    let mut crab = unit("Armored Crab", 95.0, 42.0, 2, 11, 12.0);
    crab.skills.push(SkillDescriptor::ArmorStatic { armor_ratio: 0.6 });
    templates.insert("crab".to_string(), crab);

    let mut whale = unit("Whale King", 2600.0, 30.0, 10, 180, 26.0);
    whale.is_boss = true;
    whale.skills.push(SkillDescriptor::BossSummonThreshold {
        thresholds: Some(vec![0.85, 0.6, 0.35]),
        packs: None,
        speed_multiplier: None,
    });
    whale.skills.push(SkillDescriptor::BossShieldThreshold {
        thresholds: Some(vec![0.72, 0.42]),
        shield_ratio: Some(0.16),
    });
    templates.insert(BOSS_UNIT.to_string(), whale);

    UnitCatalog::with_fallback(FALLBACK_UNIT, minnow, templates)
}

fn tower(label: &str, cost: u32, damage: f32, range: f32, fire_interval: f32, speed: f32, upgrade: u32) -> TowerSpec {
    TowerSpec {
        label: label.to_string(),
        cost,
        damage,
        range,
        fire_interval,
        projectile_speed: speed,
        upgrade_cost: upgrade,
        slow: None,
        splash_radius: 0.0,
        splash_ratio: 0.0,
        crit_chance: 0.0,
        crit_multiplier: None,
        support_aura: None,
    }
}

pub fn towers() -> TowerCatalog {
    let mut specs = BTreeMap::new();
    let basic = tower("Harpoon Turret", 50, 10.0, 120.0, 0.6, 320.0, 40);

    let mut slow = tower("Frost Coral", 70, 4.0, 110.0, 0.8, 260.0, 55);
    slow.slow = Some(SlowSpec {
        multiplier: 0.6,
        duration: 1.4,
    });
    specs.insert(TowerKind::Slow, slow);

    let mut splash = tower("Depth Charge", 90, 14.0, 115.0, 1.2, 220.0, 65);
    splash.splash_radius = 48.0;
    splash.splash_ratio = 0.6;
    specs.insert(TowerKind::Splash, splash);

    let mut sniper = tower("Longshot", 120, 38.0, 210.0, 1.6, 520.0, 85);
    sniper.crit_chance = 0.15;
    sniper.crit_multiplier = Some(2.0);
    specs.insert(TowerKind::Sniper, sniper);

    let mut support = tower("Tide Beacon", 100, 0.0, 90.0, 1.0, 0.0, 70);
    support.support_aura = Some(SupportAura {
        radius: 95.0,
        damage_mult: 1.12,
        fire_interval_mult: 0.9,
        range_bonus: 10.0,
        crit_bonus: 0.04,
        armor_pierce_bonus: 0.0,
    });
    specs.insert(TowerKind::Support, support);

    TowerCatalog::with_basic(basic, specs)
}

/// Expands corner waypoints into the full list of route cells.
fn trace(corners: &[(u32, u32)]) -> Vec<[u32; 2]> {
    let mut cells = Vec::new();
    for pair in corners.windows(2) {
        let (mut x, mut y) = pair[0];
        let (tx, ty) = pair[1];
        if cells.is_empty() {
            cells.push([x, y]);
        }
        while (x, y) != (tx, ty) {
            if x != tx {
                x = if tx > x { x + 1 } else { x - 1 };
            } else {
                y = if ty > y { y + 1 } else { y - 1 };
            }
            cells.push([x, y]);
        }
    }
    cells
}

fn map(corners: &[(u32, u32)]) -> MapSpec {
    MapSpec {
        cols: 16,
        rows: 10,
        cell_size: 40.0,
        offset_x: 0.0,
        offset_y: 0.0,
        path_cells: trace(corners),
    }
}

fn linear(base: f64, factor: f64) -> CountExpr {
    CountExpr::constant(base).with(CountTerm::Scaled { factor })
}

fn every(base: f64, divisor: f64) -> CountExpr {
    CountExpr::constant(base).with(CountTerm::Stepped { divisor })
}

fn after(base: f64, offset: f64, divisor: f64) -> CountExpr {
    CountExpr::constant(base).with(CountTerm::SteppedAfter { offset, divisor })
}

pub fn endless_stage() -> Stage {
    Stage {
        id: ENDLESS_STAGE.to_string(),
        label: "Endless Reef".to_string(),
        map: map(&[(0, 2), (5, 2), (5, 6), (10, 6), (10, 3), (15, 3)]),
        wave_plan: WavePlan {
            label: "Endless Reef".to_string(),
            max_waves: None,
            rules: vec![
                SpawnRule::new("minnow", 1, linear(4.0, 1.0)),
                SpawnRule::new("swordfish", 2, every(0.0, 2.0)),
                SpawnRule::new("oarfish", 3, after(1.0, 2.0, 2.0)),
                SpawnRule::new("puffer", 4, every(0.0, 3.0)),
                SpawnRule::new("crab", 6, after(1.0, 5.0, 2.0)),
            ],
            boss_wave: BossWave {
                extra_rules: vec![SpawnRule::new("minnow", 1, linear(3.0, 0.5))],
                ..BossWave::default()
            },
            ..WavePlan::default()
        },
    }
}

fn intro_stage() -> Stage {
    Stage {
        id: INTRO_STAGE.to_string(),
        label: "Shallow Intro".to_string(),
        map: map(&[(0, 4), (7, 4), (7, 1), (12, 1), (12, 7), (15, 7)]),
        wave_plan: WavePlan {
            label: "Shallow Intro".to_string(),
            max_waves: Some(10),
            rules: vec![
                SpawnRule::new("minnow", 1, linear(3.0, 1.0)),
                SpawnRule::new("swordfish", 3, after(1.0, 2.0, 2.0)),
                SpawnRule::new("oarfish", 5, every(0.0, 3.0)),
            ],
            clear_conditions: vec![
                ClearCondition::MinLives { value: 10 },
                ClearCondition::MaxTowersPlaced { value: 8 },
            ],
            auto_wave_delay_seconds: 2.0,
            ..WavePlan::default()
        },
    }
}

fn kelp_stage() -> Stage {
    Stage {
        id: KELP_STAGE.to_string(),
        label: "Kelp Maze".to_string(),
        map: map(&[
            (0, 1),
            (3, 1),
            (3, 8),
            (7, 8),
            (7, 2),
            (11, 2),
            (11, 8),
            (15, 8),
        ]),
        wave_plan: WavePlan {
            label: "Kelp Maze".to_string(),
            max_waves: Some(12),
            rules: vec![
                SpawnRule::new("minnow", 1, linear(5.0, 1.0)),
                SpawnRule::new("puffer", 2, every(1.0, 2.0)),
                SpawnRule::new("crab", 4, after(1.0, 3.0, 2.0)),
                SpawnRule::new("swordfish", 5, linear(0.0, 0.5)),
            ],
            boss_wave: BossWave {
                interval: 6,
                spawn_last: false,
                extra_rules: vec![SpawnRule::new("oarfish", 1, every(1.0, 3.0))],
                ..BossWave::default()
            },
            clear_conditions: vec![
                ClearCondition::MinKills { value: 120 },
                ClearCondition::MaxLeaks { value: 8 },
            ],
            spawn_timing: SpawnTiming {
                normal_base: 0.38,
                ..SpawnTiming::default()
            },
            ..WavePlan::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traced_route_is_contiguous() {
        let cells = trace(&[(0, 2), (3, 2), (3, 0)]);
        assert_eq!(
            cells,
            vec![[0, 2], [1, 2], [2, 2], [3, 2], [3, 1], [3, 0]]
        );
    }

    #[test]
    fn built_in_catalog_validates() {
        let catalog = catalog();
        assert!(catalog.validate().is_ok());
        assert!(catalog.stage(ENDLESS_STAGE).unwrap().is_endless());
        assert!(!catalog.stage(INTRO_STAGE).unwrap().is_endless());
        for stage in &catalog.stages {
            assert!(catalog.units.get(&stage.wave_plan.boss_wave.boss_kind).is_some());
            for rule in &stage.wave_plan.rules {
                assert!(catalog.units.get(&rule.kind).is_some(), "{}", rule.kind);
            }
        }
    }
}
