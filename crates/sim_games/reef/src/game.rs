use crate::actions::ReefAction;
use crate::catalog::Catalog;
use crate::combat;
use crate::config::SimConfig;
use crate::defaults;
use crate::error::ActionError;
use crate::events::ReefEvent;
use crate::movement;
use crate::progress::Progress;
use crate::progression;
use crate::stage;
use crate::waves;
use crate::world::ReefState;
use reef_types::{ReefObservation, StageStatus};
use sim_core::{ActionEnvelope, Game, TerminalOutcome, Tick};
use tracing::{debug, warn};

/// Everything needed to open a stage.
#[derive(Clone, Debug)]
pub struct ReefSetup {
    pub sim: SimConfig,
    pub catalog: Catalog,
    pub stage_id: String,
    pub progress: Progress,
}

impl Default for ReefSetup {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            catalog: defaults::catalog(),
            stage_id: defaults::ENDLESS_STAGE.to_string(),
            progress: Progress::default(),
        }
    }
}

pub struct ReefGame {
    state: ReefState,
    #[allow(dead_code)]
    seed: u64,
}

impl ReefGame {
    pub fn state(&self) -> &ReefState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ReefState {
        &mut self.state
    }

    pub fn progress(&self) -> &Progress {
        &self.state.progress
    }

    fn apply(&mut self, action: &ReefAction, out_events: &mut Vec<ReefEvent>) -> Result<(), ActionError> {
        let state = &mut self.state;
        match action {
            ReefAction::PlaceTower { cell, kind } => {
                progression::place_tower(state, *cell, *kind, out_events).map(drop)
            }
            ReefAction::UpgradeTower { tower } => {
                progression::upgrade_tower(state, *tower, out_events).map(drop)
            }
            ReefAction::UpgradeBranch { tower, slot } => {
                progression::upgrade_branch(state, *tower, *slot, out_events).map(drop)
            }
            ReefAction::RemoveTower { tower } => {
                progression::remove_tower(state, *tower, out_events).map(drop)
            }
            ReefAction::StartWave => waves::start_next_wave(state, true, out_events).map(drop),
            ReefAction::SetAutoStart(enabled) => {
                waves::set_auto_start(state, *enabled);
                Ok(())
            }
        }
    }
}

impl Game for ReefGame {
    type Config = ReefSetup;
    type Action = ReefAction;
    type Observation = ReefObservation;
    type Event = ReefEvent;

    fn new(setup: Self::Config, seed: u64) -> Self {
        let ReefSetup {
            sim,
            catalog,
            stage_id,
            progress,
        } = setup;
        let opened = catalog.stage_or_first(&stage_id).cloned();
        let (catalog, stage) = match opened {
            Some(stage) => (catalog, stage),
            None => {
                warn!("catalog has no stages, using the built-in content");
                (defaults::catalog(), defaults::endless_stage())
            }
        };
        debug!(stage = %stage.id, seed, "stage opened");
        Self {
            state: ReefState::new(sim, catalog, stage, progress, seed),
            seed,
        }
    }

    fn step(
        &mut self,
        _tick: Tick,
        dt: f32,
        actions: &[ActionEnvelope<Self::Action>],
        out_events: &mut Vec<Self::Event>,
    ) {
        // 1. Player intents, in submission order
        for envelope in actions {
            if let Err(reason) = self.apply(&envelope.payload, out_events) {
                debug!(action = ?envelope.payload, %reason, "action rejected");
                out_events.push(ReefEvent::Message(reason.to_string()));
                out_events.push(ReefEvent::ActionRejected {
                    action: envelope.payload.clone(),
                    reason,
                });
            }
        }

        let state = &mut self.state;
        if state.is_over() {
            return;
        }

        // 2. Countdown and spawn queue
        waves::update_spawning(state, dt, out_events);

        // 3. Auras, then targeting and firing
        combat::update_support_auras(state);
        combat::update_towers(state, dt, out_events);

        // 4. Projectile flight and impacts
        combat::update_projectiles(state, dt, out_events);

        // 5. Status effects, skills, movement, leaks
        movement::update_units(state, dt, out_events);

        // 6. Verdicts
        stage::check_defeat(state, out_events);
        if !state.is_over() {
            waves::check_wave_completion(state, out_events);
        }
        stage::record_endless_best(state, out_events);
    }

    fn observe(&self, tick: Tick) -> Self::Observation {
        crate::observe::build_observation(&self.state, tick)
    }

    fn is_terminal(&self) -> Option<TerminalOutcome> {
        match self.state.status {
            StageStatus::InProgress => None,
            StageStatus::Cleared { .. } => Some(TerminalOutcome::Win),
            StageStatus::Failed { .. } => Some(TerminalOutcome::Lose),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_state_for(stage_id: &str) -> ReefState {
    let catalog = defaults::catalog();
    let stage = catalog
        .stage(stage_id)
        .cloned()
        .unwrap_or_else(|| panic!("no stage {stage_id}"));
    ReefState::new(SimConfig::default(), catalog, stage, Progress::default(), 7)
}

/// Endless stage with default config and a fixed seed.
#[cfg(test)]
pub(crate) fn test_state() -> ReefState {
    test_state_for(defaults::ENDLESS_STAGE)
}

/// Buildable, unoccupied cells in row-major order.
#[cfg(test)]
pub(crate) fn free_cells(state: &ReefState) -> Vec<reef_types::Cell> {
    let route = &state.route;
    (0..route.rows)
        .flat_map(|y| (0..route.cols).map(move |x| reef_types::Cell { x, y }))
        .filter(|&cell| !route.on_path(cell) && state.world.tower_at(cell).is_none())
        .collect()
}
