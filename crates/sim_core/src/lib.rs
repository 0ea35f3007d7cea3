pub mod clock;
pub mod envelope;
pub mod game;
pub mod types;

pub use clock::FrameClock;
pub use envelope::ActionEnvelope;
pub use game::{Game, TerminalOutcome};
pub use types::{ActionId, Tick};
