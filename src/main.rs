use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use pixelciv::cli::commands::{self, InspectTarget};
use pixelciv::config::simulation::SimulationConfig;
use pixelciv::config::worldgen::WorldgenParams;
use pixelciv::persistence;
use pixelciv::world::generation::{generate_world, print_world_summary};

#[derive(Parser)]
#[command(name = "pixelciv")]
#[command(about = "A grid population simulation of competing factions")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new world and save it as the first snapshot
    Generate {
        /// World generation config file; built-in defaults when omitted
        #[arg(short, long)]
        worldgen: Option<PathBuf>,

        /// Override the generation seed
        #[arg(long)]
        seed: Option<u64>,

        /// Output snapshot directory; defaults to the configured one
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the simulation
    Run {
        /// Path to a specific world snapshot to load
        #[arg(short, long)]
        world: Option<PathBuf>,

        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Inspect a cell, the world, or export a frame
    Inspect {
        /// Snapshot to read; the latest valid one when omitted
        #[arg(short, long)]
        world: Option<PathBuf>,

        /// Cell to inspect, as X,Y
        #[arg(long, value_parser = parse_cell, conflicts_with_all = ["frame"])]
        cell: Option<(u32, u32)>,

        /// Write the grid as a PPM image to this path
        #[arg(long)]
        frame: Option<PathBuf>,

        /// Print reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage world snapshots
    Snapshots {
        #[command(subcommand)]
        action: SnapshotAction,
    },
}

#[derive(Subcommand)]
enum SnapshotAction {
    /// List available snapshots
    List {
        /// Snapshot directory; defaults to the configured one
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Load a snapshot file and print its summary
    Restore {
        /// Path to the snapshot file
        file: PathBuf,
    },
}

fn parse_cell(s: &str) -> Result<(u32, u32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got '{}'", s))?;
    let x = x.trim().parse::<u32>().map_err(|e| format!("bad X '{}': {}", x, e))?;
    let y = y.trim().parse::<u32>().map_err(|e| format!("bad Y '{}': {}", y, e))?;
    Ok((x, y))
}

fn exit_with(context: &str, e: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", context, e);
    std::process::exit(1);
}

/// Load the config file, falling back to defaults when the file does not exist.
fn load_config(path: &Path) -> SimulationConfig {
    if !path.exists() {
        return SimulationConfig::default();
    }
    SimulationConfig::from_file(path).unwrap_or_else(|e| exit_with("Error loading config", e))
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(&cli.config);
    init_logging(&config.log_level, cli.log_json);
    if !cli.config.exists() {
        warn!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    match cli.command {
        Commands::Generate {
            worldgen,
            seed,
            output,
        } => {
            let mut params = match worldgen {
                Some(path) => WorldgenParams::from_file(&path)
                    .unwrap_or_else(|e| exit_with("Error loading generation config", e)),
                None => WorldgenParams::default(),
            };
            if let Some(seed) = seed {
                params.seed = seed;
            }

            let world = generate_world(
                &params,
                config.grid_width,
                config.grid_height,
                &config.population,
            )
            .unwrap_or_else(|e| exit_with("Cannot generate world", e));
            print_world_summary(&world);

            let dir = output.unwrap_or_else(|| PathBuf::from(&config.snapshot_directory));
            match persistence::save_snapshot(&world, &dir) {
                Ok(path) => println!("\nWorld saved to {}", path.display()),
                Err(e) => exit_with("Cannot save snapshot", e),
            }
        }

        Commands::Run { world, ticks } => {
            if let Err(e) = commands::run_simulation(&config, world.as_deref(), ticks).await {
                exit_with("Simulation error", e);
            }
        }

        Commands::Inspect {
            world,
            cell,
            frame,
            json,
        } => {
            let target = match (cell, frame) {
                (Some((x, y)), _) => InspectTarget::Cell { x, y },
                (None, Some(path)) => InspectTarget::Frame(path),
                (None, None) => InspectTarget::World,
            };
            if let Err(e) = commands::inspect(&config, world.as_deref(), target, json) {
                exit_with("Error", e);
            }
        }

        Commands::Snapshots { action } => match action {
            SnapshotAction::List { dir } => {
                let dir = dir.unwrap_or_else(|| PathBuf::from(&config.snapshot_directory));
                let snapshots = persistence::list_snapshots(&dir)
                    .unwrap_or_else(|e| exit_with("Error listing snapshots", e));
                if snapshots.is_empty() {
                    println!("No snapshots found in {}", dir.display());
                    return;
                }
                println!("{:<48} {:>10} {:>10}", "File", "Tick", "Size");
                println!("{}", "-".repeat(70));
                for s in &snapshots {
                    let name = s.path.file_name().and_then(|n| n.to_str()).unwrap_or("?");
                    println!("{:<48} {:>10} {:>7} KB", name, s.tick_count, s.file_size / 1024);
                }
                println!("\n{} snapshot(s) in {}", snapshots.len(), dir.display());
            }
            SnapshotAction::Restore { file } => match persistence::load_snapshot(&file) {
                Ok(world) => {
                    println!("Restored world from {}", file.display());
                    print_world_summary(&world);
                }
                Err(e) => exit_with("Error restoring snapshot", e),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_argument_parses() {
        assert_eq!(parse_cell("3,4"), Ok((3, 4)));
        assert_eq!(parse_cell(" 10 , 0 "), Ok((10, 0)));
        assert!(parse_cell("3").is_err());
        assert!(parse_cell("a,1").is_err());
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
