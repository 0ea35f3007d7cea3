use crate::catalog::{
    ArmorBreakSpec, BurnSpec, Catalog, MapSpec, SlowSpec, Stage, SummonPack, SupportAura, TowerKind,
};
use crate::config::SimConfig;
use crate::progress::Progress;
use crate::status::StatusEffects;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use reef_types::{Cell, StageStatus};
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use std::collections::{HashSet, VecDeque};

new_key_type! { pub struct UnitId; }
new_key_type! { pub struct TowerId; }
new_key_type! { pub struct ProjectileId; }

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Moves up to `step` towards `target`. Returns the new point and whether
    /// the target was reached.
    pub fn step_towards(self, target: Point, step: f32) -> (Point, bool) {
        let dist = self.distance(target);
        if dist <= step {
            return (target, true);
        }
        let ratio = step / dist;
        let next = Point::new(
            self.x + (target.x - self.x) * ratio,
            self.y + (target.y - self.y) * ratio,
        );
        (next, false)
    }
}

impl From<Point> for reef_types::Position {
    fn from(p: Point) -> Self {
        reef_types::Position { x: p.x, y: p.y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AccelerationSkill {
    pub trigger_hp_ratio: f32,
    pub multiplier: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SplitSkill {
    pub count: u32,
    pub into: String,
    pub hp_scale: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BossState {
    /// Descending; the front is the next threshold to cross.
    pub summon_thresholds: VecDeque<f32>,
    pub shield_thresholds: VecDeque<f32>,
    pub shield: f32,
    pub shield_ratio: f32,
    pub summon_packs: Vec<SummonPack>,
    pub summon_speed_multiplier: f32,
}

#[derive(Clone, Debug)]
pub struct Unit {
    pub kind: String,
    pub label: String,
    pub hp: f32,
    pub max_hp: f32,
    pub pos: Point,
    /// Index of the last route point reached.
    pub path_index: usize,
    pub base_speed: f32,
    pub speed: f32,
    pub accelerated: bool,
    pub acceleration: Option<AccelerationSkill>,
    pub split: Option<SplitSkill>,
    pub split_spawned: bool,
    pub spawned_from_split: bool,
    pub armor_ratio: f32,
    pub damage: i32,
    pub reward: u32,
    pub radius: f32,
    pub status: StatusEffects,
    pub boss: Option<BossState>,
}

impl Unit {
    pub fn hp_ratio(&self) -> f32 {
        if self.max_hp > 0.0 {
            self.hp / self.max_hp
        } else {
            0.0
        }
    }

    pub fn is_boss(&self) -> bool {
        self.boss.is_some()
    }

    pub fn shield(&self) -> f32 {
        self.boss.as_ref().map_or(0.0, |b| b.shield)
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    /// Base armor combined with the strongest active armor break, in `[0, 1]`.
    pub fn effective_armor_ratio(&self) -> f32 {
        self.status.effective_armor_ratio(self.armor_ratio)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKey {
    Sniper,
    Rapid,
    Glacier,
    Breaker,
    Megablast,
    Ember,
    Execution,
    Pierce,
    Overclock,
    Fortify,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchState {
    pub key: BranchKey,
    /// 1 or 2.
    pub tier: u8,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerStats {
    pub damage: f32,
    pub range: f32,
    pub fire_interval: f32,
    pub projectile_speed: f32,
}

/// Net effect of every support aura covering a tower this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SupportBuff {
    pub damage_mult: f32,
    pub fire_interval_mult: f32,
    pub range_bonus: f32,
    pub crit_bonus: f32,
    pub armor_pierce_bonus: f32,
}

impl SupportBuff {
    pub const NEUTRAL: SupportBuff = SupportBuff {
        damage_mult: 1.0,
        fire_interval_mult: 1.0,
        range_bonus: 0.0,
        crit_bonus: 0.0,
        armor_pierce_bonus: 0.0,
    };

    pub fn is_active(&self) -> bool {
        *self != Self::NEUTRAL
    }
}

impl Default for SupportBuff {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

#[derive(Clone, Debug)]
pub struct Tower {
    pub kind: TowerKind,
    pub label: String,
    pub cell: Cell,
    pub pos: Point,
    pub level: u8,
    pub stats: TowerStats,
    pub upgrade_cost: u32,
    pub slow: Option<SlowSpec>,
    pub splash_radius: f32,
    pub splash_ratio: f32,
    pub crit_chance: f32,
    pub crit_multiplier: f32,
    pub support_aura: Option<SupportAura>,
    pub rapid_double_shot_chance: f32,
    pub slow_pulse_radius: f32,
    pub armor_break: Option<ArmorBreakSpec>,
    pub burn: Option<BurnSpec>,
    pub execute_threshold: f32,
    pub boss_bonus: f32,
    pub armor_pierce_bonus: f32,
    pub branch: Option<BranchState>,
    pub cooldown: f32,
    pub buff: SupportBuff,
}

impl Tower {
    pub fn effective_range(&self) -> f32 {
        self.stats.range + self.buff.range_bonus
    }

    pub fn fires(&self) -> bool {
        self.kind != TowerKind::Support && self.stats.damage > 0.0
    }
}

/// Everything a projectile needs, frozen when it is fired.
#[derive(Clone, Debug, PartialEq)]
pub struct Shot {
    pub tower_kind: TowerKind,
    pub tower_level: u8,
    pub damage: f32,
    pub speed: f32,
    pub crit_chance: f32,
    pub crit_multiplier: f32,
    pub armor_pierce: f32,
    pub splash_radius: f32,
    pub splash_ratio: f32,
    pub slow: Option<SlowSpec>,
    pub slow_pulse_radius: f32,
    pub armor_break: Option<ArmorBreakSpec>,
    pub burn: Option<BurnSpec>,
    pub execute_threshold: f32,
}

#[derive(Clone, Debug)]
pub struct Projectile {
    pub pos: Point,
    /// May dangle; resolved through the unit arena on every update.
    pub target: UnitId,
    pub shot: Shot,
}

/// The fixed route plus the buildable grid around it.
#[derive(Clone, Debug)]
pub struct Route {
    pub cols: u32,
    pub rows: u32,
    pub cell_size: f32,
    pub origin: Point,
    pub points: Vec<Point>,
    path_cells: HashSet<(u32, u32)>,
}

impl Route {
    pub fn from_map(map: &MapSpec) -> Self {
        let origin = Point::new(map.offset_x, map.offset_y);
        let mut route = Self {
            cols: map.cols,
            rows: map.rows,
            cell_size: map.cell_size,
            origin,
            points: Vec::with_capacity(map.path_cells.len()),
            path_cells: HashSet::with_capacity(map.path_cells.len()),
        };
        for &[x, y] in &map.path_cells {
            route.points.push(route.cell_center(Cell { x, y }));
            route.path_cells.insert((x, y));
        }
        route
    }

    pub fn cell_center(&self, cell: Cell) -> Point {
        Point::new(
            self.origin.x + (cell.x as f32 + 0.5) * self.cell_size,
            self.origin.y + (cell.y as f32 + 0.5) * self.cell_size,
        )
    }

    #[inline]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x < self.cols && cell.y < self.rows
    }

    #[inline]
    pub fn on_path(&self, cell: Cell) -> bool {
        self.path_cells.contains(&(cell.x, cell.y))
    }

    pub fn start(&self) -> Point {
        self.points.first().copied().unwrap_or(self.origin)
    }

    pub fn point(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied()
    }

    pub fn last_index(&self) -> usize {
        self.points.len().saturating_sub(1)
    }
}

#[derive(Clone, Debug, Default)]
pub struct World {
    pub units: SlotMap<UnitId, Unit>,
    pub towers: SlotMap<TowerId, Tower>,
    pub projectiles: SlotMap<ProjectileId, Projectile>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tower_at(&self, cell: Cell) -> Option<TowerId> {
        self.towers
            .iter()
            .find(|(_, t)| t.cell == cell)
            .map(|(id, _)| id)
    }

    pub fn live_units(&self) -> usize {
        self.units.values().filter(|u| u.is_alive()).count()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub kills: u32,
    pub boss_kills: u32,
    pub leaks: u32,
    pub towers_placed: u32,
    pub tower_upgrades: u32,
    pub branch_upgrades: u32,
    pub max_wave_reached: u32,
}

#[derive(Clone, Debug)]
pub struct WaveState {
    /// Last wave started; 0 before the first.
    pub wave: u32,
    pub active: bool,
    pub queue: VecDeque<String>,
    pub spawn_timer: f32,
    pub auto_timer: f32,
    pub bonus_preview: u32,
    pub streak: u32,
    pub auto_start: bool,
    pub condition_multiplier: f32,
}

#[derive(Clone, Debug)]
pub struct ReefState {
    pub config: SimConfig,
    pub catalog: Catalog,
    pub stage: Stage,
    pub route: Route,
    pub world: World,
    pub gold: u32,
    pub lives: i32,
    pub max_lives: i32,
    pub stats: Stats,
    pub waves: WaveState,
    pub status: StageStatus,
    pub rng: ChaCha8Rng,
    pub progress: Progress,
}

impl ReefState {
    pub fn new(config: SimConfig, catalog: Catalog, stage: Stage, progress: Progress, seed: u64) -> Self {
        let route = Route::from_map(&stage.map);
        let condition_multiplier = crate::waves::condition_multiplier(&stage.wave_plan.clear_conditions);
        let waves = WaveState {
            wave: 0,
            active: false,
            queue: VecDeque::new(),
            spawn_timer: 0.0,
            auto_timer: stage.wave_plan.auto_wave_delay_seconds,
            bonus_preview: 0,
            streak: 0,
            auto_start: config.auto_start_waves,
            condition_multiplier,
        };
        Self {
            gold: config.starting_gold,
            lives: config.starting_lives,
            max_lives: config.starting_lives,
            config,
            catalog,
            stage,
            route,
            world: World::new(),
            stats: Stats::default(),
            waves,
            status: StageStatus::InProgress,
            rng: ChaCha8Rng::seed_from_u64(seed),
            progress,
        }
    }

    pub fn is_over(&self) -> bool {
        !matches!(self.status, StageStatus::InProgress)
    }

    pub fn kills(&self) -> u32 {
        self.stats.kills
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_towards_clamps_at_target() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.step_towards(b, 10.0), (b, true));
        let (mid, reached) = a.step_towards(b, 2.5);
        assert!(!reached);
        assert!((mid.x - 1.5).abs() < 1e-5 && (mid.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn route_marks_path_cells() {
        let stage = crate::defaults::catalog().stages.remove(0);
        let route = Route::from_map(&stage.map);
        let [x, y] = stage.map.path_cells[0];
        assert!(route.on_path(Cell { x, y }));
        assert!(!route.in_bounds(Cell { x: route.cols, y: 0 }));
        assert_eq!(route.points.len(), stage.map.path_cells.len());
        assert_eq!(route.start(), route.cell_center(Cell { x, y }));
    }
}
