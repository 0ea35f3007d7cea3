use sim_core::{ActionEnvelope, FrameClock, Game, TerminalOutcome, Tick};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug)]
pub struct RunResult<G: Game> {
    pub outcome: Option<TerminalOutcome>,
    pub final_tick: Tick,
    pub events: Vec<G::Event>,
}

/// Owns a game instance and drives it one frame at a time.
pub struct MatchHost<G: Game> {
    game: G,
    current_tick: Tick,
    clock: FrameClock,
    next_action_id: u64,
    sim_time: f64,
    pending_actions: BTreeMap<Tick, Vec<ActionEnvelope<G::Action>>>,
}

impl<G: Game> MatchHost<G> {
    pub fn new(config: G::Config, seed: u64) -> Self {
        Self::with_clock(config, seed, FrameClock::default())
    }

    pub fn with_clock(config: G::Config, seed: u64, clock: FrameClock) -> Self {
        Self {
            game: G::new(config, seed),
            current_tick: 0,
            clock,
            next_action_id: 0,
            sim_time: 0.0,
            pending_actions: BTreeMap::new(),
        }
    }

    /// Queue an action for the next frame. Returns the tick it will execute on.
    pub fn submit(&mut self, payload: G::Action) -> Tick {
        self.submit_at(self.current_tick + 1, payload)
    }

    /// Submit an action to be executed at the given tick.
    /// Ticks in the past or present are moved to the next tick.
    pub fn submit_at(&mut self, intended_tick: Tick, payload: G::Action) -> Tick {
        let scheduled_tick = if intended_tick <= self.current_tick {
            self.current_tick + 1
        } else {
            intended_tick
        };

        let action_id = self.next_action_id;
        self.next_action_id += 1;
        self.pending_actions
            .entry(scheduled_tick)
            .or_default()
            .push(ActionEnvelope {
                action_id,
                intended_tick: scheduled_tick,
                payload,
            });

        scheduled_tick
    }

    /// Advance by one frame of `raw_dt` real seconds.
    /// Returns None if the game is already terminal, otherwise this frame's events.
    pub fn advance(&mut self, raw_dt: f32) -> Option<Vec<G::Event>> {
        if self.game.is_terminal().is_some() {
            return None;
        }

        self.current_tick += 1;
        let dt = self.clock.sim_dt(raw_dt);
        self.sim_time += f64::from(dt);

        let mut actions = self
            .pending_actions
            .remove(&self.current_tick)
            .unwrap_or_default();
        actions.sort_by_key(|a| a.action_id);

        let mut tick_events = Vec::new();
        self.game
            .step(self.current_tick, dt, &actions, &mut tick_events);

        if let Some(outcome) = self.game.is_terminal() {
            debug!(tick = self.current_tick, ?outcome, "match reached terminal state");
        }

        Some(tick_events)
    }

    /// Run up to `max_frames` frames of `frame_dt` seconds each, stopping early on a terminal state.
    pub fn run_for_frames(&mut self, max_frames: u64, frame_dt: f32) -> RunResult<G> {
        let mut all_events = Vec::new();

        for _ in 0..max_frames {
            match self.advance(frame_dt) {
                Some(events) => all_events.extend(events),
                None => break,
            }
        }

        RunResult {
            outcome: self.game.is_terminal(),
            final_tick: self.current_tick,
            events: all_events,
        }
    }

    pub fn observe(&self) -> G::Observation {
        self.game.observe(self.current_tick)
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut G {
        &mut self.game
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut FrameClock {
        &mut self.clock
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    /// Total simulated seconds elapsed.
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn is_terminal(&self) -> Option<TerminalOutcome> {
        self.game.is_terminal()
    }
}
