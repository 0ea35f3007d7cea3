//! Canonical serializable types for the reef defense simulation.
//!
//! Produced by `sim_reef` each frame and consumed read-only by renderers,
//! HUDs and tooling. Nothing in here carries decision logic.

use serde::{Deserialize, Serialize};

/// Position in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// Grid cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct Cell {
    pub x: u32,
    pub y: u32,
}

/// Current wave status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(tag = "type")]
pub enum WaveStatus {
    /// Between waves.
    Idle {
        /// Seconds until the next wave auto-starts. Zero when auto-start is off.
        #[serde(default)]
        auto_start_in: f32,
        /// Gold paid if the player starts the next wave right now.
        #[serde(default)]
        early_start_bonus: u32,
    },
    /// A wave is running.
    Active {
        /// Units still waiting in the spawn queue.
        queued: u32,
        /// Units currently alive on the route.
        alive: u32,
    },
}

impl Default for WaveStatus {
    fn default() -> Self {
        Self::Idle {
            auto_start_in: 0.0,
            early_start_bonus: 0,
        }
    }
}

/// Outcome of the current stage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(tag = "type")]
pub enum StageStatus {
    #[default]
    InProgress,
    Cleared {
        stars: u8,
    },
    Failed {
        reason: String,
    },
}

/// Branch progress on a tower.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct BranchInfo {
    pub key: String,
    pub label: String,
    pub tier: u8,
}

/// Information about a tower.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct TowerInfo {
    pub id: u64,
    pub cell: Cell,
    pub position: Position,
    pub tower_type: String,
    pub level: u8,
    pub damage: f32,
    pub range: f32,
    pub fire_interval: f32,
    /// Gold required for the next level, absent at max level.
    pub upgrade_cost: Option<u32>,
    pub branch: Option<BranchInfo>,
    /// Whether a support aura is currently buffing this tower.
    pub buffed: bool,
}

/// Information about a hostile unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct UnitInfo {
    pub id: u64,
    pub kind: String,
    pub label: String,
    pub position: Position,
    pub hp: f32,
    pub max_hp: f32,
    pub shield: f32,
    pub radius: f32,
    pub slowed: bool,
    pub burning: bool,
    pub is_boss: bool,
}

/// Information about a projectile in flight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ProjectileInfo {
    pub position: Position,
    pub tower_type: String,
}

/// Full simulation observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ReefObservation {
    pub tick: u64,
    pub stage_id: String,
    pub stage_label: String,

    pub gold: u32,
    pub lives: i32,
    pub max_lives: i32,
    pub kills: u32,

    pub current_wave: u32,
    /// Absent in endless mode.
    pub max_waves: Option<u32>,
    pub wave_status: WaveStatus,
    pub early_start_streak: u32,
    pub stage_status: StageStatus,

    pub path: Vec<Position>,
    pub towers: Vec<TowerInfo>,
    pub units: Vec<UnitInfo>,
    pub projectiles: Vec<ProjectileInfo>,
}
