use crate::actions::ReefAction;
use crate::catalog::TowerKind;
use crate::error::ActionError;
use crate::world::{BranchKey, Point, TowerId, UnitId};
use reef_types::Cell;

pub mod colors {
    pub const HIT: &str = "#e7fbff";
    pub const KILL: &str = "#ffffff";
    pub const SHIELD: &str = "#7de9ff";
    pub const SPLASH: &str = "#ffb17c";
    pub const SLOW: &str = "#9fd8ff";
    pub const SUMMON: &str = "#ffd166";
    pub const UPGRADE: &str = "#55d8ff";
    pub const BRANCH: &str = "#ffd166";
    pub const BRANCH_TIER2: &str = "#ffe9ad";
}

/// Sound cues for the audio layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SfxCue {
    TowerPlace,
    TowerUpgrade,
    BranchUpgrade,
    ShotBasic,
    ShotSlow,
    ShotSplash,
    Hit,
    Kill,
    EnemyLeak,
    WaveStart,
    BossAlarm,
    BossSummon,
    BossShield,
    EarlyStart,
    StageClear,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BossPhaseKind {
    Summon,
    Shield,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReefEvent {
    TowerPlaced {
        id: TowerId,
        cell: Cell,
        kind: TowerKind,
        cost: u32,
    },
    TowerUpgraded {
        id: TowerId,
        level: u8,
        cost: u32,
    },
    BranchUpgraded {
        id: TowerId,
        branch: BranchKey,
        tier: u8,
        cost: u32,
    },
    TowerRemoved {
        id: TowerId,
        cell: Cell,
    },
    ActionRejected {
        action: ReefAction,
        reason: ActionError,
    },
    WaveStarted {
        wave: u32,
        queued: usize,
        boss_wave: bool,
        early_bonus: u32,
    },
    WaveCompleted {
        wave: u32,
    },
    EarlyStartBonus {
        gold: u32,
        streak: u32,
    },
    UnitSpawned {
        id: UnitId,
        kind: String,
        boss: bool,
    },
    ShotFired {
        tower: TowerId,
        target: UnitId,
        rapid: bool,
    },
    DamageDealt {
        unit: UnitId,
        amount: f32,
        crit: bool,
    },
    DamageAbsorbed {
        unit: UnitId,
        amount: f32,
    },
    UnitKilled {
        unit: UnitId,
        kind: String,
        reward: u32,
        boss: bool,
    },
    UnitLeaked {
        unit: UnitId,
        kind: String,
        lives_lost: i32,
    },
    UnitSplit {
        parent: UnitId,
        into: String,
        count: u32,
    },
    BossPhase {
        unit: UnitId,
        phase: BossPhaseKind,
        threshold: f32,
    },
    BossAlert {
        label: String,
        badge: String,
        duration: f32,
    },
    Burst {
        pos: Point,
        color: &'static str,
    },
    Ring {
        pos: Point,
        radius: f32,
        color: &'static str,
    },
    GoldChanged {
        delta: i64,
        total: u32,
    },
    LivesChanged {
        delta: i32,
        total: i32,
    },
    StageCleared {
        stars: u8,
        reward: u32,
    },
    StageFailed {
        reason: String,
    },
    ProgressChanged,
    Message(String),
    Sfx(SfxCue),
}

impl ReefEvent {
    /// Short stable name, used for log fields and summaries.
    pub fn name(&self) -> &'static str {
        match self {
            ReefEvent::TowerPlaced { .. } => "tower_placed",
            ReefEvent::TowerUpgraded { .. } => "tower_upgraded",
            ReefEvent::BranchUpgraded { .. } => "branch_upgraded",
            ReefEvent::TowerRemoved { .. } => "tower_removed",
            ReefEvent::ActionRejected { .. } => "action_rejected",
            ReefEvent::WaveStarted { .. } => "wave_started",
            ReefEvent::WaveCompleted { .. } => "wave_completed",
            ReefEvent::EarlyStartBonus { .. } => "early_start_bonus",
            ReefEvent::UnitSpawned { .. } => "unit_spawned",
            ReefEvent::ShotFired { .. } => "shot_fired",
            ReefEvent::DamageDealt { .. } => "damage_dealt",
            ReefEvent::DamageAbsorbed { .. } => "damage_absorbed",
            ReefEvent::UnitKilled { .. } => "unit_killed",
            ReefEvent::UnitLeaked { .. } => "unit_leaked",
            ReefEvent::UnitSplit { .. } => "unit_split",
            ReefEvent::BossPhase { .. } => "boss_phase",
            ReefEvent::BossAlert { .. } => "boss_alert",
            ReefEvent::Burst { .. } => "burst",
            ReefEvent::Ring { .. } => "ring",
            ReefEvent::GoldChanged { .. } => "gold_changed",
            ReefEvent::LivesChanged { .. } => "lives_changed",
            ReefEvent::StageCleared { .. } => "stage_cleared",
            ReefEvent::StageFailed { .. } => "stage_failed",
            ReefEvent::ProgressChanged => "progress_changed",
            ReefEvent::Message(_) => "message",
            ReefEvent::Sfx(_) => "sfx",
        }
    }
}

/// Credits gold and reports the change.
pub fn earn_gold(gold: &mut u32, amount: u32, events: &mut Vec<ReefEvent>) {
    if amount == 0 {
        return;
    }
    *gold = gold.saturating_add(amount);
    events.push(ReefEvent::GoldChanged {
        delta: i64::from(amount),
        total: *gold,
    });
}

/// Debits gold the caller already checked is available.
pub fn spend_gold(gold: &mut u32, amount: u32, events: &mut Vec<ReefEvent>) {
    *gold = gold.saturating_sub(amount);
    events.push(ReefEvent::GoldChanged {
        delta: -i64::from(amount),
        total: *gold,
    });
}
