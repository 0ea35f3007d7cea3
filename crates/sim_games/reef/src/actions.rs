use crate::catalog::TowerKind;
use crate::world::TowerId;
use reef_types::Cell;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchSlot {
    A,
    B,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReefAction {
    PlaceTower { cell: Cell, kind: TowerKind },
    UpgradeTower { tower: TowerId },
    UpgradeBranch { tower: TowerId, slot: BranchSlot },
    RemoveTower { tower: TowerId },
    /// Manual wave start; pays the early-start bonus while a countdown runs.
    StartWave,
    SetAutoStart(bool),
}
