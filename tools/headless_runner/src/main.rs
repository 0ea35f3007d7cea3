use anyhow::{Context, Result};
use clap::Parser;
use reef_types::{Cell, WaveStatus};
use sim_host::MatchHost;
use sim_reef::catalog::TowerKind;
use sim_reef::progress::{load_progress, save_progress};
use sim_reef::{
    BranchSlot, Catalog, MemoryStore, ReefAction, ReefEvent, ReefGame, ReefSetup, ReefState,
    SimConfig,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "headless-runner")]
#[command(about = "Runs a scripted reef defense session without a renderer")]
struct Args {
    /// RNG seed
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Frame budget
    #[arg(long, default_value_t = 72_000)]
    frames: u64,

    /// Seconds per frame, before clamping
    #[arg(long, default_value_t = 1.0 / 60.0)]
    frame_dt: f32,

    /// Simulation speed multiplier
    #[arg(long, default_value_t = 1.0)]
    speed: f32,

    /// Stage to open; unknown ids open the first stage
    #[arg(long, default_value = sim_reef::defaults::ENDLESS_STAGE)]
    stage: String,

    /// TOML file with SimConfig overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON catalog replacing the built-in content
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Sleep between frames and print events as they happen
    #[arg(short, long)]
    realtime: bool,

    /// Start waves by hand as soon as the previous one clears
    #[arg(long)]
    eager: bool,

    /// Print the final observation as JSON
    #[arg(long)]
    json: bool,

    /// Print the observation JSON schema and exit
    #[arg(long)]
    schema: bool,
}

fn load_setup(args: &Args) -> Result<ReefSetup> {
    let sim = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str::<SimConfig>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    let catalog = match &args.catalog {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Catalog::from_json(&text).with_context(|| format!("loading {}", path.display()))?
        }
        None => Catalog::default(),
    };
    Ok(ReefSetup {
        sim,
        catalog,
        stage_id: args.stage.clone(),
        progress: Default::default(),
    })
}

/// Greedy build order: cheapest useful action each frame.
struct Script {
    cells: Vec<Cell>,
    eager: bool,
}

impl Script {
    fn new(state: &ReefState, eager: bool) -> Self {
        let route = &state.route;
        let mid = route
            .point(route.points.len() / 2)
            .unwrap_or_else(|| route.start());
        let mut cells: Vec<Cell> = (0..route.rows)
            .flat_map(|y| (0..route.cols).map(move |x| Cell { x, y }))
            .filter(|&cell| !route.on_path(cell))
            .filter(|&cell| {
                let center = route.cell_center(cell);
                route
                    .points
                    .iter()
                    .any(|p| p.distance(center) <= route.cell_size * 1.5)
            })
            .collect();
        cells.sort_by(|a, b| {
            let da = route.cell_center(*a).distance(mid);
            let db = route.cell_center(*b).distance(mid);
            da.total_cmp(&db)
        });
        Self { cells, eager }
    }

    fn kind_for(index: usize) -> TowerKind {
        match index % 6 {
            2 => TowerKind::Slow,
            4 => TowerKind::Splash,
            5 => TowerKind::Sniper,
            _ => TowerKind::Basic,
        }
    }

    fn next_action(&self, state: &ReefState) -> Option<ReefAction> {
        if state.is_over() {
            return None;
        }
        if self.eager && !state.waves.active {
            return Some(ReefAction::StartWave);
        }

        let placed = state.world.towers.len();
        if let Some(&cell) = self.cells.get(placed) {
            let kind = Self::kind_for(placed);
            let cost = state.catalog.towers.spec(kind).1.cost;
            if state.gold >= cost && state.world.tower_at(cell).is_none() {
                return Some(ReefAction::PlaceTower { cell, kind });
            }
            if placed < 6 {
                return None;
            }
        }

        let (id, tower) = state
            .world
            .towers
            .iter()
            .min_by_key(|(_, t)| (t.level, t.upgrade_cost))?;
        if tower.level >= 2 && tower.branch.is_none() {
            let cost = tower.kind.branch_option(BranchSlot::A).cost(1);
            return (state.gold >= cost).then_some(ReefAction::UpgradeBranch {
                tower: id,
                slot: BranchSlot::A,
            });
        }
        (tower.level < sim_reef::progression::MAX_LEVEL && state.gold >= tower.upgrade_cost)
            .then_some(ReefAction::UpgradeTower { tower: id })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    if args.schema {
        let schema = sim_reef::observe::observation_schema();
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }
    let setup = load_setup(&args)?;

    let mut store = MemoryStore::new();
    let stage_ids: Vec<String> = setup.catalog.stage_ids().map(str::to_string).collect();
    let known: Vec<&str> = stage_ids.iter().map(String::as_str).collect();
    let setup = ReefSetup {
        progress: load_progress(&store, &known),
        ..setup
    };

    let mut host = MatchHost::<ReefGame>::new(setup, args.seed);
    host.clock_mut().set_time_scale(args.speed);
    let script = Script::new(host.game().state(), args.eager);
    info!(stage = %host.game().state().stage.id, seed = args.seed, "session started");

    let frame = Duration::from_secs_f32(args.frame_dt.max(0.0));
    let mut all_events = Vec::new();
    let mut last_status = Instant::now();

    for _ in 0..args.frames {
        let started = Instant::now();
        // actions resolve at the start of the frame they are queued for
        if let Some(action) = script.next_action(host.game().state()) {
            host.submit(action);
        }

        let Some(events) = host.advance(args.frame_dt) else {
            break;
        };
        if events.contains(&ReefEvent::ProgressChanged) {
            save_progress(&mut store, host.game().progress());
        }
        if args.realtime {
            for event in &events {
                print_event(host.current_tick(), event);
            }
            if last_status.elapsed() >= Duration::from_secs(1) {
                print_status(&host);
                last_status = Instant::now();
            }
            let elapsed = started.elapsed();
            if elapsed < frame {
                std::thread::sleep(frame - elapsed);
            }
        }
        all_events.extend(events);
    }

    println!("=== Reef Defense Session Complete ===");
    println!("Outcome: {:?}", host.is_terminal());
    println!("Final tick: {}", host.current_tick());
    println!("Simulated time: {:.1}s", host.sim_time());
    print_status(&host);
    print_event_summary(&all_events);

    if args.json {
        let observation = host.observe();
        println!("{}", serde_json::to_string_pretty(&observation)?);
        println!("{}", host.game().progress().to_json()?);
    }
    Ok(())
}

fn print_event(tick: u64, event: &ReefEvent) {
    match event {
        ReefEvent::Message(text) => println!("[{tick:>7}] {text}"),
        ReefEvent::BossAlert { label, badge, .. } => println!("[{tick:>7}] !! {badge}: {label}"),
        ReefEvent::StageCleared { stars, reward } => {
            println!("[{tick:>7}] stage cleared, {stars} star(s), +{reward} gold")
        }
        ReefEvent::StageFailed { reason } => println!("[{tick:>7}] stage failed: {reason}"),
        _ => {}
    }
}

fn print_status(host: &MatchHost<ReefGame>) {
    let obs = host.observe();
    let wave = match obs.wave_status {
        WaveStatus::Active { queued, alive } => format!("active, {queued} queued, {alive} alive"),
        WaveStatus::Idle {
            auto_start_in,
            early_start_bonus,
        } => format!("idle, next in {auto_start_in:.1}s, early bonus {early_start_bonus}"),
    };
    let max_waves = obs
        .max_waves
        .map_or_else(|| "endless".to_string(), |m| m.to_string());
    println!(
        "  [{:>6.1}s] Wave {}/{} ({}), Units: {}, Towers: {}, Gold: {}, Lives: {}/{}, Kills: {}",
        host.sim_time(),
        obs.current_wave,
        max_waves,
        wave,
        obs.units.len(),
        obs.towers.len(),
        obs.gold,
        obs.lives,
        obs.max_lives,
        obs.kills,
    );
}

fn print_event_summary(events: &[ReefEvent]) {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for event in events {
        *counts.entry(event.name()).or_default() += 1;
    }

    println!("\n=== Event Summary ===");
    for (name, count) in counts {
        println!("{name:<20} {count}");
    }
}
