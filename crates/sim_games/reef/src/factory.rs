//! Unit construction from catalog templates.
//!
//! Skill descriptors are interpreted once here; the rest of the engine only
//! sees the typed optional skills on [`Unit`].

use crate::catalog::{SkillDescriptor, SummonPack, UnitTemplate};
use crate::config::SimConfig;
use crate::events::ReefEvent;
use crate::status::StatusEffects;
use crate::world::{AccelerationSkill, BossState, Point, ReefState, Route, SplitSkill, Unit, UnitId};
use rand::Rng;
use std::collections::VecDeque;
use tracing::trace;

pub const DEFAULT_SUMMON_THRESHOLDS: [f32; 3] = [0.85, 0.6, 0.35];
pub const DEFAULT_SHIELD_THRESHOLDS: [f32; 2] = [0.72, 0.42];

pub fn default_summon_packs() -> Vec<SummonPack> {
    [("swordfish", 2), ("oarfish", 2), ("puffer", 1)]
        .into_iter()
        .map(|(kind, count)| SummonPack {
            kind: kind.to_string(),
            count,
        })
        .collect()
}

/// Per-spawn adjustments on top of the template.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpawnOverrides {
    pub pos: Option<Point>,
    pub path_index: Option<usize>,
    pub hp: Option<f32>,
    pub max_hp: Option<f32>,
    pub speed: Option<f32>,
    pub base_speed: Option<f32>,
    pub from_split: bool,
}

fn descending(thresholds: &[f32]) -> VecDeque<f32> {
    let mut sorted: Vec<f32> = thresholds.iter().copied().filter(|t| t.is_finite()).collect();
    sorted.sort_by(|a, b| b.total_cmp(a));
    sorted.into()
}

fn boss_state(template: &UnitTemplate, config: &SimConfig) -> BossState {
    let mut state = BossState {
        summon_thresholds: descending(&DEFAULT_SUMMON_THRESHOLDS),
        shield_thresholds: descending(&DEFAULT_SHIELD_THRESHOLDS),
        shield: 0.0,
        shield_ratio: config.default_shield_ratio,
        summon_packs: default_summon_packs(),
        summon_speed_multiplier: config.summon_speed_multiplier,
    };
    for skill in &template.skills {
        match skill {
            SkillDescriptor::BossSummonThreshold {
                thresholds,
                packs,
                speed_multiplier,
            } => {
                if let Some(thresholds) = thresholds {
                    state.summon_thresholds = descending(thresholds);
                }
                if let Some(packs) = packs {
                    state.summon_packs.clone_from(packs);
                }
                if let Some(mult) = speed_multiplier {
                    state.summon_speed_multiplier = *mult;
                }
            }
            SkillDescriptor::BossShieldThreshold {
                thresholds,
                shield_ratio,
            } => {
                if let Some(thresholds) = thresholds {
                    state.shield_thresholds = descending(thresholds);
                }
                if let Some(ratio) = shield_ratio {
                    state.shield_ratio = *ratio;
                }
            }
            _ => {}
        }
    }
    state
}

/// Builds a unit without inserting it anywhere.
pub fn build_unit(
    template: &UnitTemplate,
    route: &Route,
    config: &SimConfig,
    overrides: &SpawnOverrides,
) -> Unit {
    let acceleration = template.skills.iter().find_map(|s| match s {
        SkillDescriptor::AccelerateOnHp {
            trigger_hp_ratio,
            multiplier,
        } => Some(AccelerationSkill {
            trigger_hp_ratio: *trigger_hp_ratio,
            multiplier: *multiplier,
        }),
        _ => None,
    });
    let split = template.skills.iter().find_map(|s| match s {
        SkillDescriptor::SplitOnDeath {
            count,
            into,
            hp_scale,
        } => Some(SplitSkill {
            count: *count,
            into: into.clone(),
            hp_scale: *hp_scale,
        }),
        _ => None,
    });
    let armor_ratio = template
        .skills
        .iter()
        .find_map(|s| match s {
            SkillDescriptor::ArmorStatic { armor_ratio } => Some(*armor_ratio),
            _ => None,
        })
        .unwrap_or(template.armor_ratio)
        .clamp(0.0, 1.0);

    let path_index = overrides.path_index.unwrap_or(0).min(route.last_index());
    let pos = overrides
        .pos
        .or_else(|| route.point(path_index))
        .unwrap_or_else(|| route.start());
    let max_hp = overrides.max_hp.unwrap_or(template.hp);
    let hp = overrides.hp.unwrap_or(max_hp);

    Unit {
        kind: template.id.clone(),
        label: template.label.clone(),
        hp,
        max_hp,
        pos,
        path_index,
        base_speed: overrides.base_speed.unwrap_or(template.speed),
        speed: overrides.speed.unwrap_or(template.speed),
        accelerated: false,
        acceleration,
        split,
        split_spawned: false,
        spawned_from_split: overrides.from_split,
        armor_ratio,
        damage: template.damage,
        reward: template.reward,
        radius: template.radius,
        status: StatusEffects::default(),
        boss: template.is_boss.then(|| boss_state(template, config)),
    }
}

/// Instantiates `kind` (or the fallback species) and inserts it into the world.
pub fn spawn_unit(
    state: &mut ReefState,
    kind: &str,
    overrides: SpawnOverrides,
    events: &mut Vec<ReefEvent>,
) -> UnitId {
    let template = state.catalog.units.resolve(kind);
    let unit = build_unit(template, &state.route, &state.config, &overrides);
    let kind = unit.kind.clone();
    let boss = unit.is_boss();
    let id = state.world.units.insert(unit);
    trace!(?id, kind = %kind, boss, "unit spawned");
    if state.progress.mark_unit_seen(&kind) {
        events.push(ReefEvent::ProgressChanged);
    }
    events.push(ReefEvent::UnitSpawned { id, kind, boss });
    id
}

/// Spawns split-on-death children of a unit that just died. Fires at most
/// once per parent.
pub fn spawn_split_children(
    state: &mut ReefState,
    parent_id: UnitId,
    parent: &mut Unit,
    events: &mut Vec<ReefEvent>,
) {
    if parent.split_spawned {
        return;
    }
    let Some(split) = parent.split.clone() else {
        return;
    };
    parent.split_spawned = true;

    let child = state.catalog.units.resolve(&split.into).clone();
    let hp = child.hp * split.hp_scale;
    let speed = child.speed * state.config.split_speed_multiplier;
    for i in 0..split.count {
        let jitter = (i as f32 - (split.count as f32 - 1.0) / 2.0) * 10.0;
        let dy = state.rng.gen_range(-5.0..=5.0);
        let overrides = SpawnOverrides {
            pos: Some(Point::new(parent.pos.x + jitter, parent.pos.y + dy)),
            path_index: Some(parent.path_index),
            hp: Some(hp),
            max_hp: Some(hp),
            speed: Some(speed),
            base_speed: Some(child.speed),
            from_split: true,
        };
        spawn_unit(state, &child.id, overrides, events);
    }
    events.push(ReefEvent::UnitSplit {
        parent: parent_id,
        into: child.id.clone(),
        count: split.count,
    });
    events.push(ReefEvent::Message(format!("{} split apart!", parent.label)));
}
