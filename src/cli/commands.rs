use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::simulation::SimulationConfig;
use crate::persistence;
use crate::render::Frame;
use crate::simulation::scheduler::TickScheduler;
use crate::simulation::statistics::{FactionRow, PopulationStats, StatsSnapshot};
use crate::simulation::{self, TickResult};
use crate::world::generation::print_world_summary;
use crate::world::person::Cell;
use crate::world::terrain::{TerrainOracle, TerrainType};
use crate::world::World;

fn load_world(config: &SimulationConfig, world_path: Option<&Path>) -> Result<World, String> {
    let loaded = match world_path {
        Some(path) => {
            info!(path = %path.display(), "Loading world");
            persistence::load_snapshot(path)
        }
        None => {
            info!(dir = %config.snapshot_directory, "Loading latest snapshot");
            persistence::load_latest_valid_snapshot(Path::new(&config.snapshot_directory))
        }
    };
    loaded.map_err(|e| format!("Failed to load snapshot: {}", e))
}

fn save_and_prune(world: &World, config: &SimulationConfig) {
    let dir = Path::new(&config.snapshot_directory);
    match persistence::save_snapshot(world, dir) {
        Ok(path) => {
            info!(tick = world.tick_count, path = %path.display(), "Snapshot saved");
            if let Err(e) = persistence::prune_snapshots(dir, config.max_snapshots as usize) {
                warn!(error = %e, "Snapshot pruning failed");
            }
        }
        Err(e) => warn!(error = %e, "Snapshot save failed"),
    }
}

/// Tracks tick throughput between stats reports.
struct StatsReporter {
    interval: Duration,
    last_report: Instant,
    ticks_since_report: u64,
}

impl StatsReporter {
    fn new(interval_ms: u64) -> Self {
        StatsReporter {
            interval: Duration::from_millis(interval_ms),
            last_report: Instant::now(),
            ticks_since_report: 0,
        }
    }

    /// Count a finished tick; returns a report once the interval has elapsed.
    fn on_tick(&mut self, result: &TickResult) -> Option<StatsSnapshot> {
        self.ticks_since_report += 1;
        let elapsed = self.last_report.elapsed();
        if elapsed < self.interval {
            return None;
        }
        let tps = self.ticks_since_report as f32 / elapsed.as_secs_f32().max(f32::EPSILON);
        self.last_report = Instant::now();
        self.ticks_since_report = 0;
        Some(StatsSnapshot::new(result.tick, tps, &result.statistics))
    }
}

/// Run the simulation loop until Ctrl-C, a tick failure, or `max_ticks` ticks.
///
/// The world is saved every `snapshot_interval` ticks and once more on exit.
pub async fn run_simulation(
    config: &SimulationConfig,
    world_path: Option<&Path>,
    max_ticks: Option<u64>,
) -> Result<(), String> {
    let mut world = load_world(config, world_path)?;
    let scheduler =
        TickScheduler::from_config(config).map_err(|e| format!("Cannot start workers: {}", e))?;

    info!(
        name = %world.name,
        tick = world.tick_count,
        width = world.grid.width(),
        height = world.grid.height(),
        population = world.grid.population(),
        workers = scheduler.worker_count(),
        "World loaded"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let tick_interval = Duration::from_millis(config.tick_interval_ms);
    let mut reporter = StatsReporter::new(config.stats_interval_ms);
    let mut ticks_run: u64 = 0;
    let mut ticks_since_snapshot: u32 = 0;
    let mut failure = None;

    loop {
        if max_ticks.is_some_and(|max| ticks_run >= max) {
            info!(ticks_run, "Tick limit reached");
            break;
        }

        let tick_start = Instant::now();
        let result = match simulation::execute_tick(&mut world, &scheduler) {
            Ok(result) => result,
            Err(e) => {
                error!(tick = world.tick_count, error = %e, "Simulation halted");
                failure = Some(format!("Tick {} failed: {}", world.tick_count, e));
                break;
            }
        };
        ticks_run += 1;

        if let Some(report) = reporter.on_tick(&result) {
            print!("{}", report);
            info!(
                tick = report.tick,
                ticks_per_second = report.ticks_per_second,
                population = result.population,
                diseased = result.statistics.total_diseased(),
                "Stats"
            );
        }

        ticks_since_snapshot += 1;
        if ticks_since_snapshot >= config.snapshot_interval {
            save_and_prune(&world, config);
            ticks_since_snapshot = 0;
        }

        let remaining = tick_interval.saturating_sub(tick_start.elapsed());
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            _ = tokio::time::sleep(remaining) => {}
        }
    }

    save_and_prune(&world, config);
    info!(tick = world.tick_count, ticks_run, "Simulation stopped");

    match failure {
        Some(message) => Err(message),
        None => Ok(()),
    }
}

/// What `inspect` should show.
#[derive(Debug, Clone, PartialEq)]
pub enum InspectTarget {
    Cell { x: u32, y: u32 },
    World,
    Frame(PathBuf),
}

#[derive(Debug, Serialize)]
struct CellReport {
    x: u32,
    y: u32,
    terrain: TerrainType,
    cell: Cell,
}

#[derive(Debug, Serialize)]
struct WorldReport {
    id: String,
    name: String,
    tick: u64,
    seed: u64,
    width: u32,
    height: u32,
    population: usize,
    factions: Vec<FactionRow>,
}

fn cell_report(world: &World, x: u32, y: u32) -> Result<CellReport, String> {
    let cell = world.grid.get(x, y).map_err(|e| e.to_string())?;
    Ok(CellReport {
        x,
        y,
        terrain: world.terrain.classify(x, y),
        cell,
    })
}

fn world_report(world: &World) -> WorldReport {
    WorldReport {
        id: world.id.to_string(),
        name: world.name.clone(),
        tick: world.tick_count,
        seed: world.seed,
        width: world.grid.width(),
        height: world.grid.height(),
        population: world.grid.population(),
        factions: PopulationStats::census(&world.grid).rows(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}

/// Inspect a cell, the whole world, or export a frame from a snapshot.
pub fn inspect(
    config: &SimulationConfig,
    world_path: Option<&Path>,
    target: InspectTarget,
    json: bool,
) -> Result<(), String> {
    let world = load_world(config, world_path)?;

    match target {
        InspectTarget::Cell { x, y } => {
            let report = cell_report(&world, x, y)?;
            if json {
                return print_json(&report);
            }
            println!("=== Cell ({}, {}) ===", report.x, report.y);
            println!("Terrain: {:?}", report.terrain);
            match report.cell.person() {
                None => println!("Empty"),
                Some(p) => {
                    println!("Faction: {}", p.faction.name());
                    println!("Sex: {:?}", p.sex);
                    println!("Age: {:.2}", p.age);
                    println!("Strength: {}", p.strength);
                    println!("Reproduction cooldown: {:.2}", p.reproduction_cooldown);
                    println!("Disease remaining: {:.2}", p.disease_remaining);
                }
            }
            Ok(())
        }
        InspectTarget::World => {
            if json {
                return print_json(&world_report(&world));
            }
            print_world_summary(&world);
            println!();
            print!(
                "{}",
                StatsSnapshot::new(world.tick_count, 0.0, &PopulationStats::census(&world.grid))
            );
            Ok(())
        }
        InspectTarget::Frame(path) => {
            Frame::from_world(&world)
                .save_ppm(&path)
                .map_err(|e| format!("Cannot write {}: {}", path.display(), e))?;
            println!(
                "Frame {}x{} at tick {} written to {}",
                world.grid.width(),
                world.grid.height(),
                world.tick_count,
                path.display()
            );
            Ok(())
        }
    }
}
