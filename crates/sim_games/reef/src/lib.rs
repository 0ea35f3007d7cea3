//! Reef defense: a deterministic, frame-stepped tower defense engine.
//!
//! [`ReefGame`] implements [`sim_core::Game`]; everything else is the
//! per-system machinery it drives each step.

pub mod actions;
pub mod boss;
pub mod catalog;
pub mod combat;
pub mod config;
pub mod defaults;
pub mod error;
pub mod events;
pub mod factory;
pub mod game;
pub mod movement;
pub mod observe;
pub mod plan;
pub mod progress;
pub mod progression;
pub mod stage;
pub mod status;
pub mod waves;
pub mod world;

pub use actions::{BranchSlot, ReefAction};
pub use catalog::{Catalog, CatalogError, TowerKind};
pub use config::SimConfig;
pub use error::ActionError;
pub use events::{ReefEvent, SfxCue};
pub use game::{ReefGame, ReefSetup};
pub use observe::{tower_id_from_u64, tower_id_to_u64};
pub use progress::{MemoryStore, Progress, ProgressStore};
pub use world::{BranchKey, ReefState, TowerId, UnitId};
