//! Boss phase ladders.
//!
//! Each boss carries two independent descending threshold lists. Whenever its
//! hp ratio is at or below the head of a list, the head is popped and the
//! phase fires. Popping makes every check idempotent, so callers run this
//! after any damage source without coordinating.

use crate::events::{colors, BossPhaseKind, ReefEvent, SfxCue};
use crate::factory::{spawn_unit, SpawnOverrides};
use crate::world::{Point, ReefState, UnitId};
use rand::Rng;
use tracing::debug;

const SUMMON_ALERT_SECONDS: f32 = 2.2;
const SHIELD_ALERT_SECONDS: f32 = 2.4;

pub fn check_thresholds(state: &mut ReefState, id: UnitId, events: &mut Vec<ReefEvent>) {
    while let Some((threshold, pos, path_index)) = pop_summon_threshold(state, id) {
        debug!(?id, threshold, "boss summon phase");
        events.push(ReefEvent::BossPhase {
            unit: id,
            phase: BossPhaseKind::Summon,
            threshold,
        });
        spawn_summons(state, id, pos, path_index, events);
    }

    let Some(unit) = state.world.units.get_mut(id) else {
        return;
    };
    if !unit.is_alive() {
        return;
    }
    let ratio = unit.hp_ratio();
    let max_hp = unit.max_hp;
    let pos = unit.pos;
    let Some(boss) = unit.boss.as_mut() else {
        return;
    };
    let mut fired = Vec::new();
    while let Some(&threshold) = boss.shield_thresholds.front() {
        if ratio > threshold {
            break;
        }
        boss.shield_thresholds.pop_front();
        boss.shield += max_hp * boss.shield_ratio;
        fired.push(threshold);
    }
    for threshold in fired {
        debug!(?id, threshold, "boss shield phase");
        events.push(ReefEvent::BossPhase {
            unit: id,
            phase: BossPhaseKind::Shield,
            threshold,
        });
        events.push(ReefEvent::Burst {
            pos,
            color: colors::SHIELD,
        });
        events.push(ReefEvent::Message("The boss raises a shield!".to_string()));
        events.push(ReefEvent::Sfx(SfxCue::BossShield));
        events.push(ReefEvent::BossAlert {
            label: "Boss shield phase".to_string(),
            badge: "SHIELD".to_string(),
            duration: SHIELD_ALERT_SECONDS,
        });
    }
}

fn pop_summon_threshold(state: &mut ReefState, id: UnitId) -> Option<(f32, Point, usize)> {
    let unit = state.world.units.get_mut(id)?;
    if !unit.is_alive() {
        return None;
    }
    let ratio = unit.hp_ratio();
    let (pos, path_index) = (unit.pos, unit.path_index);
    let boss = unit.boss.as_mut()?;
    let &threshold = boss.summon_thresholds.front()?;
    if ratio > threshold {
        return None;
    }
    boss.summon_thresholds.pop_front();
    Some((threshold, pos, path_index))
}

fn spawn_summons(
    state: &mut ReefState,
    id: UnitId,
    pos: Point,
    path_index: usize,
    events: &mut Vec<ReefEvent>,
) {
    let Some(boss) = state.world.units.get(id).and_then(|u| u.boss.as_ref()) else {
        return;
    };
    let packs = boss.summon_packs.clone();
    let speed_multiplier = boss.summon_speed_multiplier;
    for pack in &packs {
        let base_speed = state.catalog.units.resolve(&pack.kind).speed;
        let base_speed = if base_speed > 0.0 { base_speed } else { 60.0 };
        for _ in 0..pack.count {
            let offset = Point::new(
                state.rng.gen_range(-14.0..=14.0),
                state.rng.gen_range(-12.0..=12.0),
            );
            let overrides = SpawnOverrides {
                pos: Some(Point::new(pos.x + offset.x, pos.y + offset.y)),
                path_index: Some(path_index),
                speed: Some(base_speed * speed_multiplier),
                from_split: true,
                ..SpawnOverrides::default()
            };
            spawn_unit(state, &pack.kind, overrides, events);
        }
    }
    events.push(ReefEvent::Burst {
        pos,
        color: colors::SUMMON,
    });
    events.push(ReefEvent::Message("The boss calls in reinforcements!".to_string()));
    events.push(ReefEvent::Sfx(SfxCue::BossSummon));
    events.push(ReefEvent::BossAlert {
        label: "Boss summons reinforcements".to_string(),
        badge: "SUMMON".to_string(),
        duration: SUMMON_ALERT_SECONDS,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;
    use crate::game::test_state;

    fn spawn_boss(state: &mut ReefState) -> UnitId {
        let mut events = Vec::new();
        spawn_unit(state, defaults::BOSS_UNIT, SpawnOverrides::default(), &mut events)
    }

    fn phases(events: &[ReefEvent]) -> Vec<(BossPhaseKind, f32)> {
        events
            .iter()
            .filter_map(|e| match e {
                ReefEvent::BossPhase {
                    phase, threshold, ..
                } => Some((*phase, *threshold)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn one_big_hit_fires_every_crossed_threshold_once() {
        let mut state = test_state();
        let id = spawn_boss(&mut state);
        let before = state.world.units.len();
        state.world.units[id].hp = state.world.units[id].max_hp * 0.5;

        let mut events = Vec::new();
        check_thresholds(&mut state, id, &mut events);
        assert_eq!(
            phases(&events),
            vec![
                (BossPhaseKind::Summon, 0.85),
                (BossPhaseKind::Summon, 0.6),
                (BossPhaseKind::Shield, 0.72)
            ]
        );
        // two summon events of 2 + 2 + 1 escorts each
        assert_eq!(state.world.units.len(), before + 10);

        let mut again = Vec::new();
        check_thresholds(&mut state, id, &mut again);
        assert!(phases(&again).is_empty());
    }

    #[test]
    fn shields_stack() {
        let mut state = test_state();
        let id = spawn_boss(&mut state);
        let max_hp = state.world.units[id].max_hp;
        state.world.units[id].hp = max_hp * 0.7;
        check_thresholds(&mut state, id, &mut Vec::new());
        state.world.units[id].hp = max_hp * 0.4;
        check_thresholds(&mut state, id, &mut Vec::new());
        let shield = state.world.units[id].shield();
        assert!((shield - max_hp * 0.32).abs() < 1e-2);
        assert!(state.world.units[id].boss.as_ref().unwrap().shield_thresholds.is_empty());
    }

    #[test]
    fn dead_boss_fires_nothing() {
        let mut state = test_state();
        let id = spawn_boss(&mut state);
        state.world.units[id].hp = 0.0;
        let mut events = Vec::new();
        check_thresholds(&mut state, id, &mut events);
        assert!(events.is_empty());
    }
}
