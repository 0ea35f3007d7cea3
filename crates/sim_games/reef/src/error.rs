use crate::world::BranchKey;
use thiserror::Error;

/// Why a player command was refused. Rejected commands mutate nothing; the
/// `Display` text is the reason shown to the player.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("cell ({x}, {y}) is outside the map")]
    OutOfBounds { x: u32, y: u32 },
    #[error("cannot build on the unit path")]
    OnPath,
    #[error("a tower already occupies this cell")]
    Occupied,
    #[error("not enough gold: need {cost}, have {have}")]
    InsufficientGold { cost: u32, have: u32 },
    #[error("no such tower")]
    UnknownTower,
    #[error("tower is already at max level")]
    MaxLevel,
    #[error("requires tower level {required}")]
    LevelTooLow { required: u8 },
    #[error("tower already follows the {chosen:?} branch")]
    BranchLocked { chosen: BranchKey },
    #[error("branch is already at its highest tier")]
    BranchMaxed,
    #[error("the current wave is still running")]
    WaveInProgress,
    #[error("every wave of this stage has been started")]
    NoWavesRemaining,
    #[error("the stage is already decided")]
    StageOver,
}
