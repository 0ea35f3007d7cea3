use crate::envelope::ActionEnvelope;
use crate::types::Tick;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalOutcome {
    Win,
    Lose,
}

pub trait Game: Sized {
    type Config: Clone + Send + Sync + 'static;
    type Action: Clone + Send + Sync + 'static;
    type Observation: Clone + Send + Sync + 'static;
    type Event: Clone + Send + Sync + 'static;

    fn new(config: Self::Config, seed: u64) -> Self;

    /// Advances the simulation by `dt` simulated seconds.
    ///
    /// `dt` has already been clamped, scaled and gated by the driver, so it
    /// may be zero (paused) while actions still need to resolve.
    fn step(
        &mut self,
        tick: Tick,
        dt: f32,
        actions: &[ActionEnvelope<Self::Action>],
        out_events: &mut Vec<Self::Event>,
    );

    fn observe(&self, tick: Tick) -> Self::Observation;

    fn is_terminal(&self) -> Option<TerminalOutcome>;
}
