use crate::boss;
use crate::combat::kill_unit;
use crate::events::{ReefEvent, SfxCue};
use crate::world::{ReefState, UnitId};
use tracing::debug;

/// Per-unit tick: status decay and burn, boss ladders, acceleration, route
/// movement and leaks.
pub fn update_units(state: &mut ReefState, dt: f32, events: &mut Vec<ReefEvent>) {
    let ids: Vec<UnitId> = state.world.units.keys().collect();
    for id in ids {
        let Some(unit) = state.world.units.get_mut(id) else {
            continue;
        };
        // spawned without hp (zero-hp template or zero split scale)
        if !unit.is_alive() {
            kill_unit(state, id, events);
            continue;
        }
        if let Some(boss) = unit.boss.as_mut() {
            boss.shield = boss.shield.max(0.0);
        }
        let burn = unit.status.tick(dt);
        if burn > 0.0 && unit.shield() <= 0.0 {
            unit.hp -= burn;
        }

        boss::check_thresholds(state, id, events);
        if state.world.units.get(id).is_some_and(|u| !u.is_alive()) {
            kill_unit(state, id, events);
            continue;
        }

        let Some(unit) = state.world.units.get_mut(id) else {
            continue;
        };
        if let Some(skill) = unit.acceleration {
            if !unit.accelerated && unit.hp_ratio() <= skill.trigger_hp_ratio {
                unit.accelerated = true;
                unit.speed = unit.base_speed * skill.multiplier;
            }
        }

        let next = unit.path_index + 1;
        let Some(waypoint) = state.route.point(next) else {
            leak(state, id, events);
            continue;
        };
        let step = unit.speed * unit.status.slow_multiplier() * dt;
        let (pos, reached) = unit.pos.step_towards(waypoint, step);
        unit.pos = pos;
        if reached {
            unit.path_index = next;
        }
    }
}

fn leak(state: &mut ReefState, id: UnitId, events: &mut Vec<ReefEvent>) {
    let Some(unit) = state.world.units.remove(id) else {
        return;
    };
    state.lives -= unit.damage;
    state.stats.leaks += 1;
    debug!(kind = %unit.kind, lives = state.lives, "unit leaked");
    events.push(ReefEvent::UnitLeaked {
        unit: id,
        kind: unit.kind.clone(),
        lives_lost: unit.damage,
    });
    events.push(ReefEvent::LivesChanged {
        delta: -unit.damage,
        total: state.lives,
    });
    events.push(ReefEvent::Message(format!(
        "{} broke through! Lives -{}",
        unit.label, unit.damage
    )));
    events.push(ReefEvent::Sfx(SfxCue::EnemyLeak));
}
