//! Support auras, targeting, firing, projectile flight and impact resolution.

use crate::boss;
use crate::catalog::{SlowSpec, SupportAura, TowerKind};
use crate::config::SimConfig;
use crate::events::{colors, earn_gold, ReefEvent, SfxCue};
use crate::factory;
use crate::world::{
    Point, Projectile, ProjectileId, ReefState, Shot, SupportBuff, Tower, TowerId, Unit, UnitId,
};
use rand::Rng;
use slotmap::SlotMap;
use tracing::trace;

pub const SUPPORT_DAMAGE_CAP: f32 = 1.45;
pub const SUPPORT_FIRE_INTERVAL_FLOOR: f32 = 0.60;
pub const SUPPORT_RANGE_CAP: f32 = 44.0;
pub const SUPPORT_CRIT_CAP: f32 = 0.35;
pub const SUPPORT_PIERCE_CAP: f32 = 0.18;
pub const CRIT_CHANCE_CAP: f32 = 0.95;

const LEVEL_PIERCE_BONUS: f32 = 0.08;
const LEVEL_PIERCE_MIN_LEVEL: u8 = 3;
const RAPID_DAMAGE_RATIO: f32 = 0.65;
const RAPID_SPEED_BONUS: f32 = 20.0;
const RAPID_SPLASH_RADIUS_RATIO: f32 = 0.75;
const RAPID_SPLASH_RATIO_RATIO: f32 = 0.8;
const DEFAULT_SPLASH_RATIO: f32 = 0.6;
const SPLASH_FACTOR_FLOOR: f32 = 0.2;
const BOSS_CLEAR_ALERT_SECONDS: f32 = 2.4;

// ---------------------------------------------------------------------------
// Support auras
// ---------------------------------------------------------------------------

/// Folds one aura into a buff, respecting every per-stat cap.
pub fn stack_aura(buff: &mut SupportBuff, aura: &SupportAura) {
    buff.damage_mult = (buff.damage_mult * aura.damage_mult).min(SUPPORT_DAMAGE_CAP);
    buff.fire_interval_mult =
        (buff.fire_interval_mult * aura.fire_interval_mult).max(SUPPORT_FIRE_INTERVAL_FLOOR);
    buff.range_bonus = (buff.range_bonus + aura.range_bonus).min(SUPPORT_RANGE_CAP);
    buff.crit_bonus = (buff.crit_bonus + aura.crit_bonus).min(SUPPORT_CRIT_CAP);
    buff.armor_pierce_bonus =
        (buff.armor_pierce_bonus + aura.armor_pierce_bonus).min(SUPPORT_PIERCE_CAP);
}

/// Recomputes every tower's support buff from scratch.
pub fn update_support_auras(state: &mut ReefState) {
    let sources: Vec<(Point, SupportAura)> = state
        .world
        .towers
        .values()
        .filter(|t| t.kind == TowerKind::Support)
        .filter_map(|t| t.support_aura.map(|aura| (t.pos, aura)))
        .collect();

    for tower in state.world.towers.values_mut() {
        let mut buff = SupportBuff::NEUTRAL;
        if tower.kind != TowerKind::Support {
            for (pos, aura) in &sources {
                if tower.pos.distance(*pos) <= aura.radius {
                    stack_aura(&mut buff, aura);
                }
            }
        }
        tower.buff = buff;
    }
}

// ---------------------------------------------------------------------------
// Targeting and firing
// ---------------------------------------------------------------------------

/// Prefers units furthest along the route, then the closest, then the healthiest.
pub fn target_score(unit: &Unit, distance: f32) -> f32 {
    unit.path_index as f32 * 1000.0 - distance + unit.hp * 0.02
}

pub fn acquire_target(units: &SlotMap<UnitId, Unit>, origin: Point, range: f32) -> Option<UnitId> {
    let mut best = None;
    let mut best_score = f32::NEG_INFINITY;
    for (id, unit) in units.iter() {
        if !unit.is_alive() {
            continue;
        }
        let d = origin.distance(unit.pos);
        if d > range {
            continue;
        }
        let score = target_score(unit, d);
        if score > best_score {
            best_score = score;
            best = Some(id);
        }
    }
    best
}

pub fn primary_shot(tower: &Tower, target_is_boss: bool) -> Shot {
    let boss_bonus = if target_is_boss { tower.boss_bonus } else { 1.0 };
    Shot {
        tower_kind: tower.kind,
        tower_level: tower.level,
        damage: tower.stats.damage * tower.buff.damage_mult * boss_bonus,
        speed: tower.stats.projectile_speed,
        crit_chance: (tower.crit_chance + tower.buff.crit_bonus).min(CRIT_CHANCE_CAP),
        crit_multiplier: tower.crit_multiplier,
        armor_pierce: tower.armor_pierce_bonus + tower.buff.armor_pierce_bonus,
        splash_radius: tower.splash_radius,
        splash_ratio: tower.splash_ratio,
        slow: tower.slow,
        slow_pulse_radius: tower.slow_pulse_radius,
        armor_break: tower.armor_break,
        burn: tower.burn,
        execute_threshold: tower.execute_threshold,
    }
}

/// The weaker follow-up shot of the rapid branch.
pub fn rapid_shot(primary: &Shot) -> Shot {
    Shot {
        damage: primary.damage * RAPID_DAMAGE_RATIO,
        speed: primary.speed + RAPID_SPEED_BONUS,
        crit_chance: 0.0,
        crit_multiplier: 1.0,
        armor_pierce: 0.0,
        splash_radius: primary.splash_radius * RAPID_SPLASH_RADIUS_RATIO,
        splash_ratio: primary.splash_ratio * RAPID_SPLASH_RATIO_RATIO,
        ..primary.clone()
    }
}

pub fn fire_cooldown(tower: &Tower, config: &SimConfig) -> f32 {
    (tower.stats.fire_interval * tower.buff.fire_interval_mult).max(config.min_fire_interval)
}

fn shot_cue(kind: TowerKind) -> SfxCue {
    match kind {
        TowerKind::Slow => SfxCue::ShotSlow,
        TowerKind::Splash => SfxCue::ShotSplash,
        _ => SfxCue::ShotBasic,
    }
}

pub fn update_towers(state: &mut ReefState, dt: f32, events: &mut Vec<ReefEvent>) {
    let ids: Vec<TowerId> = state.world.towers.keys().collect();
    for tower_id in ids {
        let Some(tower) = state.world.towers.get_mut(tower_id) else {
            continue;
        };
        tower.cooldown -= dt;
        if tower.cooldown > 0.0 || !tower.fires() {
            continue;
        }
        let Some(target) = acquire_target(&state.world.units, tower.pos, tower.effective_range())
        else {
            continue;
        };
        let target_is_boss = state.world.units.get(target).is_some_and(Unit::is_boss);
        let shot = primary_shot(tower, target_is_boss);
        tower.cooldown = fire_cooldown(tower, &state.config);
        let origin = tower.pos;
        let kind = tower.kind;
        let rapid = tower.rapid_double_shot_chance > 0.0
            && state.rng.gen::<f32>() < tower.rapid_double_shot_chance;

        trace!(?tower_id, ?target, damage = shot.damage, "tower fired");
        let follow_up = rapid.then(|| rapid_shot(&shot));
        state.world.projectiles.insert(Projectile {
            pos: origin,
            target,
            shot,
        });
        events.push(ReefEvent::ShotFired {
            tower: tower_id,
            target,
            rapid: false,
        });
        events.push(ReefEvent::Sfx(shot_cue(kind)));

        if let Some(shot) = follow_up {
            let jitter = Point::new(
                state.rng.gen_range(-3.0..=3.0),
                state.rng.gen_range(-3.0..=3.0),
            );
            state.world.projectiles.insert(Projectile {
                pos: Point::new(origin.x + jitter.x, origin.y + jitter.y),
                target,
                shot,
            });
            events.push(ReefEvent::ShotFired {
                tower: tower_id,
                target,
                rapid: true,
            });
            events.push(ReefEvent::Sfx(SfxCue::ShotBasic));
        }
    }
}

// ---------------------------------------------------------------------------
// Projectiles and impacts
// ---------------------------------------------------------------------------

pub fn update_projectiles(state: &mut ReefState, dt: f32, events: &mut Vec<ReefEvent>) {
    let ids: Vec<ProjectileId> = state.world.projectiles.keys().collect();
    for projectile_id in ids {
        let Some(projectile) = state.world.projectiles.get_mut(projectile_id) else {
            continue;
        };
        let target_pos = match state.world.units.get(projectile.target) {
            Some(unit) if unit.is_alive() => unit.pos,
            _ => {
                trace!(?projectile_id, "projectile lost its target");
                state.world.projectiles.remove(projectile_id);
                continue;
            }
        };
        let step = projectile.shot.speed * dt;
        let dist = projectile.pos.distance(target_pos);
        if dist <= state.config.projectile_hit_radius.max(step) {
            if let Some(projectile) = state.world.projectiles.remove(projectile_id) {
                resolve_impact(state, projectile.target, &projectile.shot, events);
            }
        } else {
            projectile.pos = projectile.pos.step_towards(target_pos, step).0;
        }
    }
}

/// Direct hit on `target`, then splash around where it stood.
pub fn resolve_impact(state: &mut ReefState, target: UnitId, shot: &Shot, events: &mut Vec<ReefEvent>) {
    let Some(center) = state.world.units.get(target).map(|u| u.pos) else {
        return;
    };
    apply_damage(state, target, shot, 1.0, events);
    if shot.splash_radius > 0.0 {
        apply_splash(state, target, center, shot, events);
    }
}

fn attach_payloads(unit: &mut Unit, shot: &Shot) {
    if let Some(slow) = shot.slow {
        unit.status.apply_slow(slow);
    }
    if let Some(armor_break) = shot.armor_break {
        unit.status.apply_armor_break(armor_break);
    }
    if let Some(burn) = shot.burn {
        unit.status.apply_burn(burn);
    }
}

pub fn level_pierce(shot: &Shot) -> f32 {
    let level_bonus = if shot.tower_level >= LEVEL_PIERCE_MIN_LEVEL {
        LEVEL_PIERCE_BONUS
    } else {
        0.0
    };
    1.0 + level_bonus + shot.armor_pierce
}

/// Applies one hit scaled by `area_factor`. Returns true when it killed.
pub fn apply_damage(
    state: &mut ReefState,
    id: UnitId,
    shot: &Shot,
    area_factor: f32,
    events: &mut Vec<ReefEvent>,
) -> bool {
    let Some(unit) = state.world.units.get_mut(id) else {
        return false;
    };
    if !unit.is_alive() {
        return false;
    }
    let raw = shot.damage * area_factor;

    if let Some(boss) = unit.boss.as_mut().filter(|b| b.shield > 0.0) {
        boss.shield -= raw;
        attach_payloads(unit, shot);
        events.push(ReefEvent::DamageAbsorbed { unit: id, amount: raw });
        events.push(ReefEvent::Burst {
            pos: unit.pos,
            color: colors::SHIELD,
        });
        events.push(ReefEvent::Sfx(SfxCue::Hit));
        return false;
    }

    let armor = unit.effective_armor_ratio();
    let crit = shot.crit_chance > 0.0 && state.rng.gen::<f32>() < shot.crit_chance;
    let crit_mult = if crit { shot.crit_multiplier } else { 1.0 };
    let amount = raw * armor * level_pierce(shot) * crit_mult;
    unit.hp -= amount;
    attach_payloads(unit, shot);
    let center = unit.pos;
    events.push(ReefEvent::DamageDealt {
        unit: id,
        amount,
        crit,
    });
    events.push(ReefEvent::Burst {
        pos: center,
        color: colors::HIT,
    });
    events.push(ReefEvent::Sfx(SfxCue::Hit));

    if let (Some(slow), true) = (shot.slow, shot.slow_pulse_radius > 0.0) {
        let pulse = SlowSpec {
            multiplier: (slow.multiplier * 0.88).max(0.25),
            duration: slow.duration * 0.8,
        };
        for (other_id, other) in state.world.units.iter_mut() {
            if other_id == id || !other.is_alive() {
                continue;
            }
            if other.pos.distance(center) <= shot.slow_pulse_radius {
                other.status.apply_slow(pulse);
            }
        }
        events.push(ReefEvent::Ring {
            pos: center,
            radius: shot.slow_pulse_radius,
            color: colors::SLOW,
        });
    }

    if let Some(unit) = state.world.units.get_mut(id) {
        if shot.execute_threshold > 0.0 && unit.is_alive() && unit.hp_ratio() <= shot.execute_threshold {
            trace!(?id, "executed");
            unit.hp = 0.0;
        }
    }

    boss::check_thresholds(state, id, events);

    if state.world.units.get(id).is_some_and(|u| !u.is_alive()) {
        kill_unit(state, id, events);
        return true;
    }
    false
}

/// Damage factor for a secondary target `distance` away from the blast.
pub fn splash_factor(ratio: f32, distance: f32, radius: f32) -> f32 {
    let falloff = if radius > 0.0 {
        (1.0 - distance / radius).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (ratio * (0.65 + 0.35 * falloff)).max(SPLASH_FACTOR_FLOOR)
}

fn apply_splash(
    state: &mut ReefState,
    center_id: UnitId,
    center: Point,
    shot: &Shot,
    events: &mut Vec<ReefEvent>,
) {
    let radius = shot.splash_radius;
    let ratio = if shot.splash_ratio > 0.0 {
        shot.splash_ratio
    } else {
        DEFAULT_SPLASH_RATIO
    };
    events.push(ReefEvent::Ring {
        pos: center,
        radius,
        color: colors::SPLASH,
    });

    let hits: Vec<(UnitId, f32)> = state
        .world
        .units
        .iter()
        .filter(|(id, unit)| *id != center_id && unit.is_alive())
        .map(|(id, unit)| (id, unit.pos.distance(center)))
        .filter(|(_, d)| *d <= radius)
        .collect();

    for (id, d) in hits {
        apply_damage(state, id, shot, splash_factor(ratio, d, radius), events);
        let Some(slow) = shot.slow else {
            continue;
        };
        if shot.slow_pulse_radius > 0.0 && d <= shot.slow_pulse_radius {
            if let Some(unit) = state.world.units.get_mut(id).filter(|u| u.is_alive()) {
                unit.status.apply_slow(SlowSpec {
                    multiplier: (slow.multiplier * 0.9).max(0.28),
                    duration: slow.duration * 0.8,
                });
            }
        }
    }
}

/// Death handling: reward, counters, cosmetics, split children, removal.
pub fn kill_unit(state: &mut ReefState, id: UnitId, events: &mut Vec<ReefEvent>) {
    let Some(mut unit) = state.world.units.remove(id) else {
        return;
    };
    state.stats.kills += 1;
    earn_gold(&mut state.gold, unit.reward, events);
    if unit.is_boss() {
        state.stats.boss_kills += 1;
        events.push(ReefEvent::BossAlert {
            label: format!("{} defeated", unit.label),
            badge: "CLEAR".to_string(),
            duration: BOSS_CLEAR_ALERT_SECONDS,
        });
    }
    events.push(ReefEvent::Burst {
        pos: unit.pos,
        color: colors::KILL,
    });
    events.push(ReefEvent::UnitKilled {
        unit: id,
        kind: unit.kind.clone(),
        reward: unit.reward,
        boss: unit.is_boss(),
    });
    events.push(ReefEvent::Sfx(SfxCue::Kill));
    factory::spawn_split_children(state, id, &mut unit, events);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;
    use crate::factory::{spawn_unit, SpawnOverrides};
    use crate::game::test_state;
    use crate::progression::place_tower;
    use reef_types::Cell;

    fn plain_shot(damage: f32) -> Shot {
        Shot {
            tower_kind: TowerKind::Basic,
            tower_level: 1,
            damage,
            speed: 300.0,
            crit_chance: 0.0,
            crit_multiplier: 1.8,
            armor_pierce: 0.0,
            splash_radius: 0.0,
            splash_ratio: 0.0,
            slow: None,
            slow_pulse_radius: 0.0,
            armor_break: None,
            burn: None,
            execute_threshold: 0.0,
        }
    }

    fn spawn(state: &mut ReefState, kind: &str, pos: Point) -> UnitId {
        let overrides = SpawnOverrides {
            pos: Some(pos),
            ..SpawnOverrides::default()
        };
        spawn_unit(state, kind, overrides, &mut Vec::new())
    }

    fn buildable_cell(state: &ReefState) -> Cell {
        (0..state.route.rows)
            .flat_map(|y| (0..state.route.cols).map(move |x| Cell { x, y }))
            .find(|c| !state.route.on_path(*c) && state.world.tower_at(*c).is_none())
            .unwrap()
    }

    #[test]
    fn armored_hit_matches_formula() {
        let mut state = test_state();
        let id = spawn(&mut state, "oarfish", Point::new(0.0, 0.0));
        {
            let unit = &mut state.world.units[id];
            unit.hp = 100.0;
            unit.max_hp = 100.0;
            unit.armor_ratio = 0.8;
        }
        apply_damage(&mut state, id, &plain_shot(20.0), 1.0, &mut Vec::new());
        assert!((state.world.units[id].hp - 84.0).abs() < 1e-4);
    }

    #[test]
    fn level_three_pierces_eight_percent() {
        let mut shot = plain_shot(20.0);
        assert_eq!(level_pierce(&shot), 1.0);
        shot.tower_level = 3;
        assert!((level_pierce(&shot) - 1.08).abs() < 1e-6);
        shot.armor_pierce = 0.1;
        assert!((level_pierce(&shot) - 1.18).abs() < 1e-6);
    }

    #[test]
    fn shield_absorbs_but_payloads_stick() {
        let mut state = test_state();
        let id = spawn(&mut state, defaults::BOSS_UNIT, Point::new(0.0, 0.0));
        state.world.units[id].boss.as_mut().unwrap().shield = 50.0;
        let hp = state.world.units[id].hp;
        let mut shot = plain_shot(20.0);
        shot.slow = Some(SlowSpec {
            multiplier: 0.5,
            duration: 1.0,
        });
        let mut events = Vec::new();
        apply_damage(&mut state, id, &shot, 1.0, &mut events);
        let unit = &state.world.units[id];
        assert_eq!(unit.hp, hp);
        assert_eq!(unit.shield(), 30.0);
        assert!(unit.status.is_slowed());
        assert!(events
            .iter()
            .any(|e| matches!(e, ReefEvent::DamageAbsorbed { amount, .. } if *amount == 20.0)));
    }

    #[test]
    fn execute_finishes_low_units() {
        let mut state = test_state();
        let id = spawn(&mut state, "oarfish", Point::new(0.0, 0.0));
        state.world.units[id].hp = 30.0;
        let gold = state.gold;
        let mut shot = plain_shot(15.0);
        shot.execute_threshold = 0.2;
        assert!(apply_damage(&mut state, id, &shot, 1.0, &mut Vec::new()));
        assert!(state.world.units.get(id).is_none());
        assert_eq!(state.gold, gold + 12);
        assert_eq!(state.stats.kills, 1);
    }

    #[test]
    fn splash_falls_off_with_a_floor() {
        assert!((splash_factor(0.6, 0.0, 48.0) - 0.6).abs() < 1e-6);
        assert!((splash_factor(0.6, 48.0, 48.0) - 0.39).abs() < 1e-6);
        assert_eq!(splash_factor(0.2, 48.0, 48.0), 0.2);
    }

    #[test]
    fn splash_hits_neighbours_but_not_distant_units() {
        let mut state = test_state();
        let center = spawn(&mut state, "oarfish", Point::new(100.0, 100.0));
        let near = spawn(&mut state, "oarfish", Point::new(110.0, 100.0));
        let far = spawn(&mut state, "oarfish", Point::new(300.0, 100.0));
        let mut shot = plain_shot(10.0);
        shot.splash_radius = 48.0;
        shot.splash_ratio = 0.6;
        resolve_impact(&mut state, center, &shot, &mut Vec::new());
        let full = state.world.units[far].max_hp;
        assert!((state.world.units[center].hp - (full - 10.0)).abs() < 1e-4);
        assert!(state.world.units[near].hp < full);
        assert!(state.world.units[near].hp > full - 10.0);
        assert_eq!(state.world.units[far].hp, full);
    }

    #[test]
    fn stacked_auras_respect_caps() {
        let aura = SupportAura {
            radius: 100.0,
            damage_mult: 1.3,
            fire_interval_mult: 0.7,
            range_bonus: 20.0,
            crit_bonus: 0.2,
            armor_pierce_bonus: 0.1,
        };
        let mut buff = SupportBuff::NEUTRAL;
        for _ in 0..6 {
            stack_aura(&mut buff, &aura);
        }
        assert_eq!(buff.damage_mult, SUPPORT_DAMAGE_CAP);
        assert_eq!(buff.fire_interval_mult, SUPPORT_FIRE_INTERVAL_FLOOR);
        assert_eq!(buff.range_bonus, SUPPORT_RANGE_CAP);
        assert_eq!(buff.crit_bonus, SUPPORT_CRIT_CAP);
        assert_eq!(buff.armor_pierce_bonus, SUPPORT_PIERCE_CAP);
    }

    #[test]
    fn targeting_prefers_progress_along_route() {
        let mut state = test_state();
        let behind = spawn(&mut state, "minnow", Point::new(10.0, 0.0));
        let ahead = spawn(&mut state, "minnow", Point::new(50.0, 0.0));
        state.world.units[ahead].path_index = 2;
        let _ = behind;
        assert_eq!(
            acquire_target(&state.world.units, Point::new(0.0, 0.0), 100.0),
            Some(ahead)
        );
        assert_eq!(
            acquire_target(&state.world.units, Point::new(0.0, 0.0), 20.0),
            Some(behind)
        );
        assert_eq!(acquire_target(&state.world.units, Point::new(900.0, 900.0), 20.0), None);
    }

    #[test]
    fn stale_projectiles_are_discarded() {
        let mut state = test_state();
        let id = spawn(&mut state, "minnow", Point::new(0.0, 0.0));
        state.world.projectiles.insert(Projectile {
            pos: Point::new(500.0, 500.0),
            target: id,
            shot: plain_shot(10.0),
        });
        state.world.units.remove(id);
        let mut events = Vec::new();
        update_projectiles(&mut state, 0.05, &mut events);
        assert!(state.world.projectiles.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn support_buff_applies_only_in_radius_and_not_to_support() {
        let mut state = test_state();
        state.gold = 10_000;
        let cell = buildable_cell(&state);
        let basic = place_tower(&mut state, cell, TowerKind::Basic, &mut Vec::new()).unwrap();
        let support_cell = (0..state.route.rows)
            .flat_map(|y| (0..state.route.cols).map(move |x| Cell { x, y }))
            .find(|c| {
                !state.route.on_path(*c)
                    && *c != cell
                    && state.route.cell_center(*c).distance(state.route.cell_center(cell)) <= 60.0
            })
            .unwrap();
        let support =
            place_tower(&mut state, support_cell, TowerKind::Support, &mut Vec::new()).unwrap();
        update_support_auras(&mut state);
        assert!(state.world.towers[basic].buff.is_active());
        assert!(!state.world.towers[support].buff.is_active());
        assert!((state.world.towers[basic].buff.damage_mult - 1.12).abs() < 1e-6);
    }

    #[test]
    fn rapid_shot_is_weaker_and_never_crits() {
        let mut primary = plain_shot(20.0);
        primary.crit_chance = 0.5;
        primary.armor_pierce = 0.1;
        primary.splash_radius = 40.0;
        primary.splash_ratio = 0.5;
        let rapid = rapid_shot(&primary);
        assert!((rapid.damage - 13.0).abs() < 1e-5);
        assert_eq!(rapid.crit_chance, 0.0);
        assert_eq!(rapid.armor_pierce, 0.0);
        assert_eq!(rapid.speed, 320.0);
        assert_eq!(rapid.splash_radius, 30.0);
        assert!((rapid.splash_ratio - 0.4).abs() < 1e-6);
    }

    #[test]
    fn towers_fire_and_reset_cooldown() {
        let mut state = test_state();
        let cell = buildable_cell(&state);
        let tower = place_tower(&mut state, cell, TowerKind::Basic, &mut Vec::new()).unwrap();
        let pos = state.world.towers[tower].pos;
        spawn(&mut state, "minnow", Point::new(pos.x + 30.0, pos.y));
        let mut events = Vec::new();
        update_towers(&mut state, 0.05, &mut events);
        assert_eq!(state.world.projectiles.len(), 1);
        assert!((state.world.towers[tower].cooldown - 0.6).abs() < 1e-6);
        events.clear();
        update_towers(&mut state, 0.05, &mut events);
        assert_eq!(state.world.projectiles.len(), 1);
    }

    #[test]
    fn killing_a_puffer_splits_it() {
        let mut state = test_state();
        let id = spawn(&mut state, "puffer", Point::new(0.0, 0.0));
        let mut events = Vec::new();
        apply_damage(&mut state, id, &plain_shot(1_000.0), 1.0, &mut events);
        let minnows: Vec<&Unit> = state.world.units.values().collect();
        assert_eq!(minnows.len(), 3);
        assert!(minnows.iter().all(|u| u.kind == "minnow" && u.max_hp == 20.0));
        assert!(events
            .iter()
            .any(|e| matches!(e, ReefEvent::UnitSplit { count: 3, .. })));
    }

    #[test]
    fn slow_pulse_weakens_and_floors_for_neighbours() {
        let mut state = test_state();
        let target = spawn(&mut state, "oarfish", Point::new(100.0, 100.0));
        let near = spawn(&mut state, "oarfish", Point::new(130.0, 100.0));
        let far = spawn(&mut state, "oarfish", Point::new(400.0, 100.0));
        let mut shot = plain_shot(1.0);
        shot.slow = Some(SlowSpec {
            multiplier: 0.5,
            duration: 1.0,
        });
        shot.slow_pulse_radius = 60.0;
        let mut events = Vec::new();
        apply_damage(&mut state, target, &shot, 1.0, &mut events);

        let pulse = state.world.units[near].status.slows[0].effect;
        assert!((pulse.multiplier - 0.44).abs() < 1e-6);
        assert!((pulse.duration - 0.8).abs() < 1e-6);
        assert_eq!(state.world.units[target].status.slows.len(), 1);
        assert_eq!(state.world.units[target].status.slows[0].effect.multiplier, 0.5);
        assert!(!state.world.units[far].status.is_slowed());
        assert!(events.iter().any(|e| matches!(e, ReefEvent::Ring { .. })));

        // strong slows bottom out at the floor
        shot.slow = Some(SlowSpec {
            multiplier: 0.2,
            duration: 1.0,
        });
        apply_damage(&mut state, target, &shot, 1.0, &mut Vec::new());
        assert_eq!(state.world.units[near].status.slows[1].effect.multiplier, 0.25);
    }

    #[test]
    fn boss_bonus_only_applies_against_bosses() {
        let mut state = test_state();
        let cell = buildable_cell(&state);
        let id = place_tower(&mut state, cell, TowerKind::Basic, &mut Vec::new()).unwrap();
        state.world.towers[id].boss_bonus = 1.25;
        let tower = &state.world.towers[id];
        assert_eq!(primary_shot(tower, false).damage, 10.0);
        assert!((primary_shot(tower, true).damage - 12.5).abs() < 1e-5);
    }

    #[test]
    fn rapid_towers_fire_a_weaker_second_shot_at_the_same_target() {
        let mut state = test_state();
        let cell = buildable_cell(&state);
        let id = place_tower(&mut state, cell, TowerKind::Basic, &mut Vec::new()).unwrap();
        {
            let tower = &mut state.world.towers[id];
            tower.rapid_double_shot_chance = 1.0;
            tower.crit_chance = 0.3;
            tower.armor_pierce_bonus = 0.1;
        }
        let pos = state.world.towers[id].pos;
        let target = spawn(&mut state, "oarfish", Point::new(pos.x + 30.0, pos.y));
        let mut events = Vec::new();
        update_towers(&mut state, 0.05, &mut events);

        let shots: Vec<&Projectile> = state.world.projectiles.values().collect();
        assert_eq!(shots.len(), 2);
        assert!(shots.iter().all(|p| p.target == target));
        let (primary, rapid) = if shots[0].shot.crit_chance > 0.0 {
            (&shots[0].shot, &shots[1].shot)
        } else {
            (&shots[1].shot, &shots[0].shot)
        };
        assert!((rapid.damage - primary.damage * 0.65).abs() < 1e-5);
        assert_eq!(rapid.crit_chance, 0.0);
        assert_eq!(rapid.armor_pierce, 0.0);
        assert!((primary.armor_pierce - 0.1).abs() < 1e-6);
        assert!(events
            .iter()
            .any(|e| matches!(e, ReefEvent::ShotFired { rapid: true, .. })));
    }

    #[test]
    fn projectiles_in_flight_keep_their_snapshot() {
        let mut state = test_state();
        let cell = buildable_cell(&state);
        let id = place_tower(&mut state, cell, TowerKind::Basic, &mut Vec::new()).unwrap();
        let pos = state.world.towers[id].pos;
        spawn(&mut state, "oarfish", Point::new(pos.x + 100.0, pos.y));
        update_towers(&mut state, 0.05, &mut Vec::new());
        crate::progression::upgrade_tower(&mut state, id, &mut Vec::new()).unwrap();

        assert!(state.world.towers[id].stats.damage > 10.0);
        assert_eq!(state.world.towers[id].level, 2);
        let shot = &state.world.projectiles.values().next().unwrap().shot;
        assert_eq!(shot.damage, 10.0);
        assert_eq!(shot.tower_level, 1);
    }
}
