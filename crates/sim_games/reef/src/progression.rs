//! Tower placement, leveling and exclusive two-tier branches.

use crate::actions::BranchSlot;
use crate::catalog::{ArmorBreakSpec, BurnSpec, TowerKind, TowerSpec};
use crate::config::SimConfig;
use crate::error::ActionError;
use crate::events::{colors, spend_gold, ReefEvent, SfxCue};
use crate::world::{BranchKey, BranchState, Point, ReefState, SupportBuff, Tower, TowerId, TowerStats};
use reef_types::Cell;
use tracing::debug;

pub const MAX_LEVEL: u8 = 4;
pub const BRANCH_TIER1_LEVEL: u8 = 2;
pub const BRANCH_TIER2_LEVEL: u8 = 4;
const UPGRADE_COST_GROWTH: f32 = 1.6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchOption {
    pub key: BranchKey,
    pub label: &'static str,
    pub tier1_cost: u32,
    pub tier2_cost: u32,
}

const fn option(key: BranchKey, label: &'static str, tier1_cost: u32, tier2_cost: u32) -> BranchOption {
    BranchOption {
        key,
        label,
        tier1_cost,
        tier2_cost,
    }
}

impl BranchOption {
    pub fn cost(&self, tier: u8) -> u32 {
        if tier <= 1 {
            self.tier1_cost
        } else {
            self.tier2_cost
        }
    }
}

impl BranchKey {
    /// Stable snake_case key, matching the serialized form.
    pub fn key(self) -> &'static str {
        match self {
            BranchKey::Sniper => "sniper",
            BranchKey::Rapid => "rapid",
            BranchKey::Glacier => "glacier",
            BranchKey::Breaker => "breaker",
            BranchKey::Megablast => "megablast",
            BranchKey::Ember => "ember",
            BranchKey::Execution => "execution",
            BranchKey::Pierce => "pierce",
            BranchKey::Overclock => "overclock",
            BranchKey::Fortify => "fortify",
        }
    }

    pub fn label(self) -> &'static str {
        TowerKind::ALL
            .iter()
            .flat_map(|kind| kind.branch_options())
            .find(|o| o.key == self)
            .map_or("", |o| o.label)
    }
}

impl TowerKind {
    /// The two mutually exclusive branches, slot A then slot B.
    pub fn branch_options(self) -> [BranchOption; 2] {
        match self {
            TowerKind::Basic => [
                option(BranchKey::Sniper, "Sniper Path", 90, 145),
                option(BranchKey::Rapid, "Rapid Path", 90, 145),
            ],
            TowerKind::Slow => [
                option(BranchKey::Glacier, "Glacier Path", 95, 150),
                option(BranchKey::Breaker, "Breaker Path", 95, 150),
            ],
            TowerKind::Sniper => [
                option(BranchKey::Execution, "Execution Path", 115, 175),
                option(BranchKey::Pierce, "Pierce Path", 115, 175),
            ],
            TowerKind::Support => [
                option(BranchKey::Overclock, "Overclock Path", 105, 165),
                option(BranchKey::Fortify, "Fortify Path", 105, 165),
            ],
            TowerKind::Splash => [
                option(BranchKey::Megablast, "Megablast Path", 105, 165),
                option(BranchKey::Ember, "Ember Path", 105, 165),
            ],
        }
    }

    pub fn branch_option(self, slot: BranchSlot) -> BranchOption {
        let [a, b] = self.branch_options();
        match slot {
            BranchSlot::A => a,
            BranchSlot::B => b,
        }
    }

    /// Stat growth for one level.
    pub fn apply_level_up(self, tower: &mut Tower) {
        let stats = &mut tower.stats;
        match self {
            TowerKind::Support => {
                stats.range += 12.0;
                if let Some(aura) = tower.support_aura.as_mut() {
                    aura.radius += 12.0;
                    aura.damage_mult = (aura.damage_mult + 0.03).min(1.55);
                    aura.fire_interval_mult = (aura.fire_interval_mult - 0.03).max(0.62);
                    aura.range_bonus += 3.0;
                    aura.crit_bonus = (aura.crit_bonus + 0.02).min(0.3);
                }
            }
            TowerKind::Sniper => {
                stats.damage += 14.0;
                stats.range += 20.0;
                stats.fire_interval = (stats.fire_interval * 0.93).max(0.75);
                stats.projectile_speed += 48.0;
                tower.crit_chance = (tower.crit_chance + 0.03).min(0.6);
                tower.crit_multiplier = (tower.crit_multiplier + 0.08).min(3.4);
            }
            TowerKind::Basic | TowerKind::Slow | TowerKind::Splash => {
                let (damage, range, floor) = match self {
                    TowerKind::Slow => (4.0, 14.0, 0.2),
                    TowerKind::Splash => (7.0, 18.0, 0.45),
                    _ => (8.0, 18.0, 0.2),
                };
                stats.damage += damage;
                stats.range += range;
                stats.fire_interval = (stats.fire_interval * 0.9).max(floor);
                stats.projectile_speed += 35.0;
            }
        }
        if let Some(slow) = tower.slow.as_mut() {
            slow.duration += 0.12;
            slow.multiplier = (slow.multiplier - 0.05).max(0.34);
        }
        if tower.splash_radius > 0.0 {
            tower.splash_radius += 8.0;
            tower.splash_ratio = (tower.splash_ratio + 0.04).min(0.9);
        }
    }
}

/// One-time stat change for reaching `tier` on `key`.
pub fn apply_branch_tier(tower: &mut Tower, key: BranchKey, tier: u8) {
    let first = tier <= 1;
    let pick = |t1: f32, t2: f32| if first { t1 } else { t2 };
    let stats = &mut tower.stats;
    match key {
        BranchKey::Sniper => {
            stats.range += pick(40.0, 28.0);
            stats.damage += pick(18.0, 16.0);
            stats.fire_interval = (stats.fire_interval * pick(1.14, 1.1)).min(1.2);
            tower.crit_chance += pick(0.2, 0.18);
            tower.crit_multiplier = tower.crit_multiplier.max(pick(1.85, 2.05));
        }
        BranchKey::Rapid => {
            stats.fire_interval = (stats.fire_interval * pick(0.72, 0.78)).max(0.14);
            stats.projectile_speed += pick(40.0, 30.0);
            stats.damage += pick(4.0, 6.0);
            tower.rapid_double_shot_chance += pick(0.28, 0.22);
        }
        BranchKey::Glacier => {
            if let Some(slow) = tower.slow.as_mut() {
                slow.duration += pick(0.45, 0.35);
                slow.multiplier = (slow.multiplier - pick(0.09, 0.07)).max(0.22);
            }
            tower.slow_pulse_radius += pick(55.0, 45.0);
            stats.range += pick(15.0, 12.0);
        }
        BranchKey::Breaker => {
            let current = tower.armor_break.unwrap_or(ArmorBreakSpec {
                amount: 0.0,
                duration: 0.0,
            });
            tower.armor_break = Some(ArmorBreakSpec {
                amount: (current.amount + pick(0.18, 0.12)).min(0.35),
                duration: (current.duration + pick(1.8, 1.2)).min(4.5),
            });
            stats.damage += pick(5.0, 7.0);
        }
        BranchKey::Megablast => {
            tower.splash_radius += pick(36.0, 28.0);
            tower.splash_ratio = (tower.splash_ratio + pick(0.12, 0.1)).min(1.05);
            stats.damage += pick(8.0, 10.0);
        }
        BranchKey::Ember => {
            let current = tower.burn.unwrap_or(BurnSpec {
                dps: 0.0,
                duration: 0.0,
            });
            tower.burn = Some(BurnSpec {
                dps: current.dps + pick(12.0, 16.0),
                duration: (current.duration + pick(2.2, 1.8)).min(5.0),
            });
            stats.damage += pick(4.0, 6.0);
            tower.splash_radius += pick(8.0, 10.0);
        }
        BranchKey::Execution => {
            tower.crit_chance = (tower.crit_chance + pick(0.18, 0.12)).min(0.8);
            tower.crit_multiplier = (tower.crit_multiplier + pick(0.45, 0.35)).min(4.2);
            tower.execute_threshold = (tower.execute_threshold + pick(0.12, 0.08)).min(0.28);
            stats.damage += pick(12.0, 14.0);
        }
        BranchKey::Pierce => {
            tower.boss_bonus = (tower.boss_bonus + pick(0.28, 0.22)).min(1.9);
            tower.armor_pierce_bonus = (tower.armor_pierce_bonus + pick(0.18, 0.12)).min(0.45);
            stats.range += pick(22.0, 16.0);
            stats.damage += pick(8.0, 10.0);
        }
        BranchKey::Overclock => {
            if let Some(aura) = tower.support_aura.as_mut() {
                aura.fire_interval_mult = (aura.fire_interval_mult - pick(0.07, 0.05)).max(0.5);
                aura.damage_mult = (aura.damage_mult + pick(0.04, 0.03)).min(1.7);
                aura.crit_bonus = (aura.crit_bonus + pick(0.06, 0.04)).min(0.45);
            }
        }
        BranchKey::Fortify => {
            if let Some(aura) = tower.support_aura.as_mut() {
                aura.radius += pick(22.0, 18.0);
                aura.range_bonus += pick(10.0, 8.0);
                aura.armor_pierce_bonus = (aura.armor_pierce_bonus + pick(0.08, 0.05)).min(0.18);
            }
        }
    }
}

/// A fresh level-1 tower built from its catalog spec.
pub fn build_tower(kind: TowerKind, spec: &TowerSpec, cell: Cell, pos: Point, config: &SimConfig) -> Tower {
    Tower {
        kind,
        label: spec.label.clone(),
        cell,
        pos,
        level: 1,
        stats: TowerStats {
            damage: spec.damage,
            range: spec.range,
            fire_interval: spec.fire_interval,
            projectile_speed: spec.projectile_speed,
        },
        upgrade_cost: spec.upgrade_cost,
        slow: spec.slow,
        splash_radius: spec.splash_radius,
        splash_ratio: spec.splash_ratio,
        crit_chance: spec.crit_chance,
        crit_multiplier: spec.crit_multiplier.unwrap_or(config.default_crit_multiplier),
        support_aura: spec.support_aura,
        rapid_double_shot_chance: 0.0,
        slow_pulse_radius: 0.0,
        armor_break: None,
        burn: None,
        execute_threshold: 0.0,
        boss_bonus: 1.0,
        armor_pierce_bonus: 0.0,
        branch: None,
        cooldown: 0.0,
        buff: SupportBuff::NEUTRAL,
    }
}

pub fn place_tower(
    state: &mut ReefState,
    cell: Cell,
    kind: TowerKind,
    events: &mut Vec<ReefEvent>,
) -> Result<TowerId, ActionError> {
    if !state.route.in_bounds(cell) {
        return Err(ActionError::OutOfBounds {
            x: cell.x,
            y: cell.y,
        });
    }
    if state.route.on_path(cell) {
        return Err(ActionError::OnPath);
    }
    if state.world.tower_at(cell).is_some() {
        return Err(ActionError::Occupied);
    }
    let (kind, spec) = state.catalog.towers.spec(kind);
    let cost = spec.cost;
    if state.gold < cost {
        return Err(ActionError::InsufficientGold {
            cost,
            have: state.gold,
        });
    }

    let tower = build_tower(kind, spec, cell, state.route.cell_center(cell), &state.config);
    let label = tower.label.clone();
    spend_gold(&mut state.gold, cost, events);
    let id = state.world.towers.insert(tower);
    state.stats.towers_placed += 1;
    debug!(?id, kind = kind.key(), x = cell.x, y = cell.y, "tower placed");
    if state.progress.mark_tower_seen(kind.key()) {
        events.push(ReefEvent::ProgressChanged);
    }
    events.push(ReefEvent::TowerPlaced {
        id,
        cell,
        kind,
        cost,
    });
    events.push(ReefEvent::Message(format!(
        "Built {label} at ({}, {})",
        cell.x + 1,
        cell.y + 1
    )));
    events.push(ReefEvent::Sfx(SfxCue::TowerPlace));
    Ok(id)
}

pub fn upgrade_tower(
    state: &mut ReefState,
    id: TowerId,
    events: &mut Vec<ReefEvent>,
) -> Result<u8, ActionError> {
    let tower = state.world.towers.get_mut(id).ok_or(ActionError::UnknownTower)?;
    if tower.level >= MAX_LEVEL {
        return Err(ActionError::MaxLevel);
    }
    let cost = tower.upgrade_cost;
    if state.gold < cost {
        return Err(ActionError::InsufficientGold {
            cost,
            have: state.gold,
        });
    }

    spend_gold(&mut state.gold, cost, events);
    tower.level += 1;
    let kind = tower.kind;
    kind.apply_level_up(tower);
    tower.upgrade_cost = (cost as f32 * UPGRADE_COST_GROWTH).round() as u32;
    let (level, pos) = (tower.level, tower.pos);
    state.stats.tower_upgrades += 1;
    debug!(?id, level, next_cost = tower.upgrade_cost, "tower upgraded");
    events.push(ReefEvent::TowerUpgraded { id, level, cost });
    events.push(ReefEvent::Burst {
        pos,
        color: colors::UPGRADE,
    });
    events.push(ReefEvent::Sfx(SfxCue::TowerUpgrade));
    Ok(level)
}

pub fn upgrade_branch(
    state: &mut ReefState,
    id: TowerId,
    slot: BranchSlot,
    events: &mut Vec<ReefEvent>,
) -> Result<BranchState, ActionError> {
    let tower = state.world.towers.get_mut(id).ok_or(ActionError::UnknownTower)?;
    if tower.level < BRANCH_TIER1_LEVEL {
        return Err(ActionError::LevelTooLow {
            required: BRANCH_TIER1_LEVEL,
        });
    }
    let selected = tower.kind.branch_option(slot);
    let tier = match tower.branch {
        None => 1,
        Some(current) if current.key != selected.key => {
            return Err(ActionError::BranchLocked {
                chosen: current.key,
            })
        }
        Some(current) if current.tier >= 2 => return Err(ActionError::BranchMaxed),
        Some(_) if tower.level < BRANCH_TIER2_LEVEL => {
            return Err(ActionError::LevelTooLow {
                required: BRANCH_TIER2_LEVEL,
            })
        }
        Some(_) => 2,
    };
    let cost = selected.cost(tier);
    if state.gold < cost {
        return Err(ActionError::InsufficientGold {
            cost,
            have: state.gold,
        });
    }

    spend_gold(&mut state.gold, cost, events);
    let branch = BranchState {
        key: selected.key,
        tier,
    };
    tower.branch = Some(branch);
    apply_branch_tier(tower, selected.key, tier);
    let pos = tower.pos;
    state.stats.branch_upgrades += 1;
    debug!(?id, branch = ?selected.key, tier, "branch upgraded");
    events.push(ReefEvent::BranchUpgraded {
        id,
        branch: selected.key,
        tier,
        cost,
    });
    events.push(ReefEvent::Burst {
        pos,
        color: if tier == 1 {
            colors::BRANCH
        } else {
            colors::BRANCH_TIER2
        },
    });
    events.push(ReefEvent::Message(format!(
        "{} {}",
        selected.label,
        if tier == 1 { "unlocked" } else { "II unlocked" }
    )));
    events.push(ReefEvent::Sfx(SfxCue::BranchUpgrade));
    Ok(branch)
}

pub fn remove_tower(
    state: &mut ReefState,
    id: TowerId,
    events: &mut Vec<ReefEvent>,
) -> Result<Cell, ActionError> {
    let tower = state.world.towers.remove(id).ok_or(ActionError::UnknownTower)?;
    debug!(?id, "tower removed");
    events.push(ReefEvent::TowerRemoved {
        id,
        cell: tower.cell,
    });
    Ok(tower.cell)
}
