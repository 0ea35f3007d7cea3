use crate::progression::MAX_LEVEL;
use crate::waves::current_bonus;
use crate::world::{ReefState, TowerId, UnitId};
use reef_types::{
    BranchInfo, ProjectileInfo, ReefObservation, TowerInfo, UnitInfo, WaveStatus,
};
use sim_core::Tick;
use slotmap::Key;

pub fn tower_id_to_u64(id: TowerId) -> u64 {
    id.data().as_ffi()
}

pub fn tower_id_from_u64(raw: u64) -> TowerId {
    TowerId::from(slotmap::KeyData::from_ffi(raw))
}

pub fn unit_id_to_u64(id: UnitId) -> u64 {
    id.data().as_ffi()
}

/// JSON schema of [`ReefObservation`], for tooling that consumes observations.
pub fn observation_schema() -> schemars::Schema {
    schemars::schema_for!(ReefObservation)
}

pub fn wave_status(state: &ReefState) -> WaveStatus {
    let waves = &state.waves;
    if waves.active {
        return WaveStatus::Active {
            queued: waves.queue.len() as u32,
            alive: state.world.live_units() as u32,
        };
    }
    let counting = waves.auto_start && !state.is_over();
    WaveStatus::Idle {
        auto_start_in: if counting { waves.auto_timer.max(0.0) } else { 0.0 },
        early_start_bonus: current_bonus(state),
    }
}

pub fn build_observation(state: &ReefState, tick: Tick) -> ReefObservation {
    ReefObservation {
        tick,
        stage_id: state.stage.id.clone(),
        stage_label: state.stage.label.clone(),

        gold: state.gold,
        lives: state.lives,
        max_lives: state.max_lives,
        kills: state.stats.kills,

        current_wave: state.waves.wave,
        max_waves: state.stage.wave_plan.max_waves,
        wave_status: wave_status(state),
        early_start_streak: state.waves.streak,
        stage_status: state.status.clone(),

        path: state.route.points.iter().map(|&p| p.into()).collect(),
        towers: state
            .world
            .towers
            .iter()
            .map(|(id, t)| TowerInfo {
                id: tower_id_to_u64(id),
                cell: t.cell,
                position: t.pos.into(),
                tower_type: t.kind.key().to_string(),
                level: t.level,
                damage: t.stats.damage,
                range: t.effective_range(),
                fire_interval: t.stats.fire_interval,
                upgrade_cost: (t.level < MAX_LEVEL).then_some(t.upgrade_cost),
                branch: t.branch.map(|b| BranchInfo {
                    key: b.key.key().to_string(),
                    label: b.key.label().to_string(),
                    tier: b.tier,
                }),
                buffed: t.buff.is_active(),
            })
            .collect(),
        units: state
            .world
            .units
            .iter()
            .filter(|(_, u)| u.is_alive())
            .map(|(id, u)| UnitInfo {
                id: unit_id_to_u64(id),
                kind: u.kind.clone(),
                label: u.label.clone(),
                position: u.pos.into(),
                hp: u.hp,
                max_hp: u.max_hp,
                shield: u.shield(),
                radius: u.radius,
                slowed: u.status.is_slowed(),
                burning: u.status.is_burning(),
                is_boss: u.is_boss(),
            })
            .collect(),
        projectiles: state
            .world
            .projectiles
            .values()
            .map(|p| ProjectileInfo {
                position: p.pos.into(),
                tower_type: p.shot.tower_kind.key().to_string(),
            })
            .collect(),
    }
}
