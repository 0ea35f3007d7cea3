//! Stage verdicts, stars and records.

use crate::events::{earn_gold, ReefEvent, SfxCue};
use crate::plan::ClearCondition;
use crate::world::ReefState;
use reef_types::StageStatus;
use tracing::info;

/// Snapshot of the numbers clear conditions are judged against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageTally {
    pub lives: i32,
    pub max_lives: i32,
    pub kills: u32,
    pub towers_placed: u32,
}

impl StageTally {
    pub fn of(state: &ReefState) -> Self {
        Self {
            lives: state.lives,
            max_lives: state.max_lives,
            kills: state.stats.kills,
            towers_placed: state.stats.towers_placed,
        }
    }

    pub fn leaks(&self) -> i32 {
        (self.max_lives - self.lives).max(0)
    }
}

/// First unmet condition, as a player-facing reason.
pub fn evaluate_conditions(conditions: &[ClearCondition], tally: StageTally) -> Result<(), String> {
    for condition in conditions {
        let failure = match *condition {
            ClearCondition::MinLives { value } if tally.lives < value => {
                Some(format!("Not enough lives (need at least {value})"))
            }
            ClearCondition::MinKills { value } if tally.kills < value => {
                Some(format!("Not enough kills (need at least {value})"))
            }
            ClearCondition::MaxLeaks { value } if tally.leaks() > value => Some(format!(
                "Too many leaks (allowed {value}, got {})",
                tally.leaks()
            )),
            ClearCondition::MaxTowersPlaced { value } if tally.towers_placed > value => {
                Some(format!(
                    "Too many towers built (allowed {value}, got {})",
                    tally.towers_placed
                ))
            }
            _ => None,
        };
        if let Some(reason) = failure {
            return Err(reason);
        }
    }
    Ok(())
}

/// Judges a finite stage whose final wave just completed.
pub fn finish_stage(state: &mut ReefState, events: &mut Vec<ReefEvent>) {
    if state.is_over() {
        return;
    }
    let verdict = if state.stage.is_endless() {
        Ok(())
    } else {
        evaluate_conditions(&state.stage.wave_plan.clear_conditions, StageTally::of(state))
    };
    match verdict {
        Ok(()) => clear_stage(state, events),
        Err(reason) => fail_stage(state, reason, events),
    }
}

fn clear_stage(state: &mut ReefState, events: &mut Vec<ReefEvent>) {
    let stars = state.config.stars_for_lives(state.lives);
    let reward = state
        .config
        .clear_reward(state.waves.wave, state.stats.kills, stars);
    earn_gold(&mut state.gold, reward, events);
    state.status = StageStatus::Cleared { stars };
    info!(stage = %state.stage.id, stars, reward, "stage cleared");

    let mut progress_changed = state.progress.record_stars(&state.stage.id, stars);
    if let Some(next) = state.catalog.next_stage_id(&state.stage.id) {
        progress_changed |= state.progress.unlock(next);
    }
    events.push(ReefEvent::StageCleared { stars, reward });
    if progress_changed {
        events.push(ReefEvent::ProgressChanged);
    }
    events.push(ReefEvent::Message(format!(
        "Stage cleared: {} with {stars} star(s), +{reward} gold",
        state.stage.label
    )));
    events.push(ReefEvent::Sfx(SfxCue::StageClear));
}

pub fn fail_stage(state: &mut ReefState, reason: String, events: &mut Vec<ReefEvent>) {
    if state.is_over() {
        return;
    }
    info!(stage = %state.stage.id, %reason, "stage failed");
    state.status = StageStatus::Failed {
        reason: reason.clone(),
    };
    events.push(ReefEvent::Message(format!("Stage failed: {reason}")));
    events.push(ReefEvent::StageFailed { reason });
    events.push(ReefEvent::Sfx(SfxCue::GameOver));
}

/// Out of lives ends the stage immediately, whatever the wave state.
pub fn check_defeat(state: &mut ReefState, events: &mut Vec<ReefEvent>) {
    if state.lives <= 0 && !state.is_over() {
        fail_stage(state, "Out of lives".to_string(), events);
    }
}

/// Raises the endless-mode records while an endless stage runs.
pub fn record_endless_best(state: &mut ReefState, events: &mut Vec<ReefEvent>) {
    if state.stage.is_endless() && state.progress.record_endless(state.waves.wave, state.stats.kills) {
        events.push(ReefEvent::ProgressChanged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;
    use crate::game::test_state_for;

    fn tally(lives: i32, kills: u32, towers_placed: u32) -> StageTally {
        StageTally {
            lives,
            max_lives: 20,
            kills,
            towers_placed,
        }
    }

    #[test]
    fn first_unmet_condition_is_reported() {
        let conds = [
            ClearCondition::MinLives { value: 10 },
            ClearCondition::MaxLeaks { value: 5 },
            ClearCondition::MaxTowersPlaced { value: 4 },
        ];
        assert_eq!(evaluate_conditions(&conds, tally(18, 0, 3)), Ok(()));
        let err = evaluate_conditions(&conds, tally(12, 0, 9)).unwrap_err();
        assert!(err.contains("leaks"), "{err}");
        let err = evaluate_conditions(&conds, tally(16, 0, 9)).unwrap_err();
        assert!(err.contains("towers"), "{err}");
    }

    #[test]
    fn clearing_awards_stars_reward_and_unlock() {
        let mut state = test_state_for(defaults::INTRO_STAGE);
        state.waves.wave = 10;
        state.stats.kills = 33;
        let gold = state.gold;
        let mut events = Vec::new();
        finish_stage(&mut state, &mut events);
        assert_eq!(state.status, StageStatus::Cleared { stars: 3 });
        assert_eq!(state.gold, gold + 183);
        assert_eq!(state.progress.stars_for(defaults::INTRO_STAGE), 3);
        assert!(state.progress.is_unlocked(defaults::KELP_STAGE));
        assert!(events.contains(&ReefEvent::ProgressChanged));

        // a decided stage is never judged twice
        finish_stage(&mut state, &mut Vec::new());
        assert_eq!(state.gold, gold + 183);
    }

    #[test]
    fn unmet_conditions_fail_the_stage() {
        let mut state = test_state_for(defaults::INTRO_STAGE);
        state.lives = 8;
        finish_stage(&mut state, &mut Vec::new());
        assert!(matches!(state.status, StageStatus::Failed { .. }));
    }

    #[test]
    fn no_lives_is_defeat() {
        let mut state = test_state_for(defaults::ENDLESS_STAGE);
        state.lives = 0;
        let mut events = Vec::new();
        check_defeat(&mut state, &mut events);
        assert_eq!(
            state.status,
            StageStatus::Failed {
                reason: "Out of lives".to_string()
            }
        );
    }

    #[test]
    fn endless_records_track_best_run() {
        let mut state = test_state_for(defaults::ENDLESS_STAGE);
        state.waves.wave = 6;
        state.stats.kills = 80;
        let mut events = Vec::new();
        record_endless_best(&mut state, &mut events);
        assert_eq!(events, vec![ReefEvent::ProgressChanged]);
        record_endless_best(&mut state, &mut events);
        assert_eq!(events.len(), 1);
    }
}
