//! Wave composition, spawn pacing, auto-start countdown and the early-start
//! economy.

use crate::error::ActionError;
use crate::events::{earn_gold, ReefEvent, SfxCue};
use crate::factory::{spawn_unit, SpawnOverrides};
use crate::plan::{ClearCondition, WavePlan};
use crate::stage;
use crate::world::ReefState;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

pub const CONDITION_MULTIPLIER_CAP: f32 = 1.35;
const STREAK_STEP: f32 = 0.1;
const WAVE_FACTOR_CAP: u32 = 8;
const BOSS_ALERT_SECONDS: f32 = 2.8;

/// Bonus multiplier earned by a stage's clear conditions, each distinct
/// condition type counted once.
pub fn condition_multiplier(conditions: &[ClearCondition]) -> f32 {
    let mut seen: Vec<&'static str> = Vec::new();
    let mut percent = 0;
    for condition in conditions {
        let key = condition.type_key();
        if !seen.contains(&key) {
            seen.push(key);
            percent += condition.bonus_percent();
        }
    }
    (1.0 + percent as f32 / 100.0).min(CONDITION_MULTIPLIER_CAP)
}

pub fn wave_factor(wave: u32) -> u32 {
    (wave.saturating_add(1).max(1) / 2).min(WAVE_FACTOR_CAP)
}

pub fn streak_multiplier(streak: u32, cap: f32) -> f32 {
    1.0 + (streak as f32 * STREAK_STEP).min((cap - 1.0).max(0.0))
}

/// Gold for starting the next wave with `remaining` seconds still on the
/// countdown. `wave` is the last wave started.
pub fn early_start_bonus(
    remaining: f32,
    wave: u32,
    streak: u32,
    streak_cap: f32,
    condition_mult: f32,
    epsilon: f32,
) -> u32 {
    if !remaining.is_finite() || remaining <= epsilon {
        return 0;
    }
    let quarters = (remaining * 4.0).ceil().min(u32::MAX as f32) as u32;
    let base = quarters.saturating_add(wave_factor(wave)).max(1);
    let bonus = base as f32 * streak_multiplier(streak, streak_cap) * condition_mult;
    bonus.round().max(0.0) as u32
}

/// What a manual start would pay right now.
pub fn current_bonus(state: &ReefState) -> u32 {
    let waves = &state.waves;
    if !waves.auto_start || waves.active || state.is_over() {
        return 0;
    }
    early_start_bonus(
        waves.auto_timer,
        waves.wave,
        waves.streak,
        state.config.early_start_streak_cap,
        waves.condition_multiplier,
        state.config.early_start_epsilon,
    )
}

/// Builds the spawn queue for `wave`. Only the boss position is deterministic.
pub fn compose_wave<R: Rng + ?Sized>(plan: &WavePlan, wave: u32, rng: &mut R) -> (VecDeque<String>, bool) {
    let mut queue: Vec<String> = Vec::new();
    let mut push = |kind: &str, count: u32| {
        queue.extend(std::iter::repeat(kind.to_string()).take(count as usize));
    };
    for rule in &plan.rules {
        push(&rule.kind, rule.count_for(wave));
    }
    let boss_wave = plan.boss_wave.is_boss_wave(wave);
    if boss_wave {
        for rule in &plan.boss_wave.extra_rules {
            push(&rule.kind, rule.count_for(wave));
        }
    }
    queue.shuffle(rng);

    let mut queue = VecDeque::from(queue);
    if boss_wave {
        let boss = plan.boss_wave.boss_kind.clone();
        if plan.boss_wave.spawn_last {
            queue.push_back(boss);
        } else {
            queue.push_front(boss);
        }
    }
    (queue, boss_wave)
}

fn waves_exhausted(state: &ReefState) -> bool {
    state
        .stage
        .wave_plan
        .max_waves
        .is_some_and(|max| state.waves.wave >= max)
}

pub fn start_next_wave(
    state: &mut ReefState,
    manual: bool,
    events: &mut Vec<ReefEvent>,
) -> Result<u32, ActionError> {
    if state.is_over() {
        return Err(ActionError::StageOver);
    }
    if state.waves.active {
        return Err(ActionError::WaveInProgress);
    }
    if waves_exhausted(state) {
        return Err(ActionError::NoWavesRemaining);
    }

    let had_countdown =
        state.waves.auto_start && state.waves.auto_timer > state.config.early_start_epsilon;
    let bonus = if manual { current_bonus(state) } else { 0 };
    if bonus > 0 {
        earn_gold(&mut state.gold, bonus, events);
        state.waves.streak += 1;
        events.push(ReefEvent::EarlyStartBonus {
            gold: bonus,
            streak: state.waves.streak,
        });
        events.push(ReefEvent::Message(format!("Early start bonus +{bonus} gold")));
        events.push(ReefEvent::Sfx(SfxCue::EarlyStart));
    } else if !had_countdown {
        state.waves.streak = 0;
    }

    let wave = state.waves.wave + 1;
    let (queue, boss_wave) = compose_wave(&state.stage.wave_plan, wave, &mut state.rng);
    let queued = queue.len();
    debug!(wave, ?queue, "wave composed");

    let waves = &mut state.waves;
    waves.wave = wave;
    waves.queue = queue;
    waves.spawn_timer = 0.0;
    waves.active = true;
    waves.auto_timer = state.stage.wave_plan.auto_wave_delay_seconds;
    waves.bonus_preview = 0;
    state.stats.max_wave_reached = state.stats.max_wave_reached.max(wave);

    info!(wave, queued, boss_wave, manual, bonus, "wave started");
    events.push(ReefEvent::WaveStarted {
        wave,
        queued,
        boss_wave,
        early_bonus: bonus,
    });
    if boss_wave {
        events.push(ReefEvent::Sfx(SfxCue::BossAlarm));
        events.push(ReefEvent::BossAlert {
            label: format!("Boss wave {wave}"),
            badge: "BOSS".to_string(),
            duration: BOSS_ALERT_SECONDS,
        });
        events.push(ReefEvent::Message(format!(
            "Boss wave {wave} begins! {queued} units incoming."
        )));
    } else {
        events.push(ReefEvent::Sfx(SfxCue::WaveStart));
        events.push(ReefEvent::Message(format!(
            "Wave {wave} begins, {queued} units incoming."
        )));
    }
    Ok(wave)
}

pub fn set_auto_start(state: &mut ReefState, enabled: bool) {
    state.waves.auto_start = enabled;
    if !enabled {
        state.waves.streak = 0;
        state.waves.bonus_preview = 0;
    }
}

/// Gap imposed by the unit that just spawned.
fn next_spawn_delay(state: &mut ReefState, spawned: &str) -> f32 {
    let plan = &state.stage.wave_plan;
    let timing = plan.spawn_timing;
    if spawned == plan.boss_wave.boss_kind {
        timing.boss_fixed
    } else {
        timing.normal_base + state.rng.gen::<f32>() * timing.normal_jitter
    }
}

/// Countdown between waves, spawn pacing during one.
pub fn update_spawning(state: &mut ReefState, dt: f32, events: &mut Vec<ReefEvent>) {
    if state.is_over() || state.lives <= 0 {
        return;
    }
    if !state.waves.active {
        if waves_exhausted(state) {
            return;
        }
        if !state.waves.auto_start {
            state.waves.bonus_preview = 0;
            state.waves.streak = 0;
            return;
        }
        state.waves.auto_timer = (state.waves.auto_timer - dt).max(0.0);
        state.waves.bonus_preview = current_bonus(state);
        if state.waves.auto_timer <= 0.0 {
            if let Err(err) = start_next_wave(state, false, events) {
                warn!(%err, "auto start refused");
            }
        }
        return;
    }

    if state.waves.queue.is_empty() {
        return;
    }
    state.waves.spawn_timer -= dt;
    if state.waves.spawn_timer <= 0.0 {
        if let Some(kind) = state.waves.queue.pop_front() {
            spawn_unit(state, &kind, SpawnOverrides::default(), events);
            state.waves.spawn_timer = next_spawn_delay(state, &kind);
        }
    }
}

/// Ends the running wave once nothing is queued and nothing is alive.
pub fn check_wave_completion(state: &mut ReefState, events: &mut Vec<ReefEvent>) -> bool {
    if !state.waves.active || !state.waves.queue.is_empty() || state.world.live_units() > 0 {
        return false;
    }
    let wave = state.waves.wave;
    state.waves.active = false;
    info!(wave, "wave completed");
    events.push(ReefEvent::WaveCompleted { wave });

    if waves_exhausted(state) {
        stage::finish_stage(state, events);
    } else {
        events.push(ReefEvent::Message(format!(
            "Wave {wave} cleared! Get ready for the next one."
        )));
        state.waves.auto_timer = state.stage.wave_plan.auto_wave_delay_seconds;
        state.waves.bonus_preview = current_bonus(state);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;
    use crate::game::test_state;
    use crate::plan::{BossWave, CountExpr, SpawnRule};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn condition_types_count_once_and_cap() {
        assert_eq!(condition_multiplier(&[]), 1.0);
        let conds = [
            ClearCondition::MinLives { value: 10 },
            ClearCondition::MaxTowersPlaced { value: 6 },
            ClearCondition::MinLives { value: 12 },
        ];
        assert!((condition_multiplier(&conds) - 1.17).abs() < 1e-6);
        let all = [
            ClearCondition::MinLives { value: 1 },
            ClearCondition::MinKills { value: 1 },
            ClearCondition::MaxLeaks { value: 1 },
            ClearCondition::MaxTowersPlaced { value: 1 },
        ];
        let mult = condition_multiplier(&all);
        assert!((mult - 1.29).abs() < 1e-6);
        assert!(mult <= CONDITION_MULTIPLIER_CAP);
    }

    #[test]
    fn early_start_bonus_formula() {
        assert_eq!(early_start_bonus(1.4, 0, 0, 1.75, 1.0, 0.02), 6);
        assert_eq!(early_start_bonus(1.4, 4, 0, 1.75, 1.0, 0.02), 8);
        assert_eq!(early_start_bonus(1.4, 0, 5, 1.75, 1.0, 0.02), 9);
        assert_eq!(early_start_bonus(1.4, 0, 50, 1.75, 1.0, 0.02), 11);
        assert_eq!(early_start_bonus(1.4, 0, 0, 1.75, 1.17, 0.02), 7);
        assert_eq!(early_start_bonus(0.02, 9, 3, 1.75, 1.3, 0.02), 0);
        assert_eq!(wave_factor(40), 8);
    }

    #[test]
    fn boss_is_pinned_and_rest_is_shuffled() {
        let plan = defaults::catalog().stages.remove(0).wave_plan;
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (queue, boss) = compose_wave(&plan, 5, &mut rng);
        assert!(boss);
        assert_eq!(queue.back().map(String::as_str), Some(defaults::BOSS_UNIT));
        assert_eq!(queue.iter().filter(|k| *k == defaults::BOSS_UNIT).count(), 1);

        let front = WavePlan {
            boss_wave: BossWave {
                spawn_last: false,
                ..BossWave::default()
            },
            rules: vec![SpawnRule::new("minnow", 1, CountExpr::constant(4.0))],
            ..WavePlan::default()
        };
        let (queue, _) = compose_wave(&front, 5, &mut rng);
        assert_eq!(queue.front().map(String::as_str), Some("bossWhaleKing"));
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn same_seed_same_queue() {
        let plan = defaults::catalog().stages.remove(0).wave_plan;
        let a = compose_wave(&plan, 7, &mut ChaCha8Rng::seed_from_u64(9)).0;
        let b = compose_wave(&plan, 7, &mut ChaCha8Rng::seed_from_u64(9)).0;
        assert_eq!(a, b);
    }

    #[test]
    fn manual_early_start_pays_and_builds_streak() {
        let mut state = test_state();
        let gold = state.gold;
        let mut events = Vec::new();
        let preview = current_bonus(&state);
        assert!(preview > 0);
        start_next_wave(&mut state, true, &mut events).unwrap();
        assert_eq!(state.gold, gold + preview);
        assert_eq!(state.waves.streak, 1);
        assert_eq!(
            start_next_wave(&mut state, true, &mut events),
            Err(ActionError::WaveInProgress)
        );
    }

    #[test]
    fn start_without_countdown_resets_streak() {
        let mut state = test_state();
        state.waves.streak = 4;
        state.waves.auto_timer = 0.0;
        let gold = state.gold;
        start_next_wave(&mut state, true, &mut Vec::new()).unwrap();
        assert_eq!(state.waves.streak, 0);
        assert_eq!(state.gold, gold);
    }

    #[test]
    fn disabled_auto_start_pays_nothing() {
        let mut state = test_state();
        set_auto_start(&mut state, false);
        assert_eq!(current_bonus(&state), 0);
        let gold = state.gold;
        start_next_wave(&mut state, true, &mut Vec::new()).unwrap();
        assert_eq!(state.gold, gold);
    }

    #[test]
    fn countdown_auto_starts_the_wave() {
        let mut state = test_state();
        let delay = state.stage.wave_plan.auto_wave_delay_seconds;
        let mut events = Vec::new();
        let mut elapsed = 0.0;
        while !state.waves.active && elapsed < delay + 1.0 {
            update_spawning(&mut state, 0.05, &mut events);
            elapsed += 0.05;
        }
        assert!(state.waves.active);
        assert_eq!(state.waves.wave, 1);
        assert!(events
            .iter()
            .any(|e| matches!(e, ReefEvent::WaveStarted { early_bonus: 0, .. })));
    }

    #[test]
    fn completion_waits_for_queue_and_units() {
        let mut state = test_state();
        start_next_wave(&mut state, false, &mut Vec::new()).unwrap();
        let mut events = Vec::new();
        assert!(!check_wave_completion(&mut state, &mut events));
        update_spawning(&mut state, 0.0, &mut events);
        assert_eq!(state.world.units.len(), 1);
        state.waves.queue.clear();
        assert!(!check_wave_completion(&mut state, &mut events));
        state.world.units.clear();
        assert!(check_wave_completion(&mut state, &mut events));
        assert!(!state.waves.active);
    }

    #[test]
    fn exhausted_plan_refuses_new_waves() {
        let mut state = test_state();
        state.stage.wave_plan.max_waves = Some(1);
        start_next_wave(&mut state, false, &mut Vec::new()).unwrap();
        state.waves.active = false;
        assert_eq!(
            start_next_wave(&mut state, false, &mut Vec::new()),
            Err(ActionError::NoWavesRemaining)
        );
    }

    fn spawn_until_boss(state: &mut ReefState) -> f32 {
        let boss_kind = state.stage.wave_plan.boss_wave.boss_kind.clone();
        for _ in 0..100 {
            state.waves.spawn_timer = 0.0;
            let next = state.waves.queue.front().cloned();
            update_spawning(state, 0.0, &mut Vec::new());
            if next.as_deref() == Some(boss_kind.as_str()) {
                return state.waves.spawn_timer;
            }
        }
        panic!("boss never spawned");
    }

    #[test]
    fn boss_holds_back_the_spawn_after_it() {
        for spawn_last in [true, false] {
            let mut state = test_state();
            state.stage.wave_plan.boss_wave.spawn_last = spawn_last;
            state.waves.wave = 4;
            start_next_wave(&mut state, false, &mut Vec::new()).unwrap();
            let boss_fixed = state.stage.wave_plan.spawn_timing.boss_fixed;
            assert_eq!(spawn_until_boss(&mut state), boss_fixed, "spawn_last = {spawn_last}");
        }
    }

    #[test]
    fn ordinary_spawns_use_jittered_gaps() {
        let mut state = test_state();
        start_next_wave(&mut state, false, &mut Vec::new()).unwrap();
        update_spawning(&mut state, 0.0, &mut Vec::new());
        let timing = state.stage.wave_plan.spawn_timing;
        let gap = state.waves.spawn_timer;
        assert!(gap >= timing.normal_base && gap <= timing.normal_base + timing.normal_jitter);
    }

    #[test]
    fn huge_countdowns_do_not_overflow_the_bonus() {
        let bonus = early_start_bonus(f32::MAX, 40, 0, 1.75, 1.0, 0.02);
        assert!(bonus > 0);
        assert!(early_start_bonus(1.0e12, 40, 30, 1.75, 1.35, 0.02) > 0);
    }
}
