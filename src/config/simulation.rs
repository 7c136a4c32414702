use serde::{Deserialize, Serialize};
use std::path::Path;

/// Numeric parameters of the per-person update rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationParams {
    /// Extra aging per year while diseased.
    pub diseased_aging_factor: f32,
    /// A healthy person catches a disease with probability `1 / chance_for_disease` per tick.
    pub chance_for_disease: u32,
    /// Longest disease duration in years.
    pub max_length_disease: u32,
    pub min_years_until_reproduce: u32,
    pub max_years_until_reproduce: u32,
    pub min_start_strength: u32,
    pub max_start_strength: u32,
    pub max_lifespan: f32,
}

impl Default for PopulationParams {
    fn default() -> Self {
        PopulationParams {
            diseased_aging_factor: 16.0,
            chance_for_disease: 20000,
            max_length_disease: 2,
            min_years_until_reproduce: 3,
            max_years_until_reproduce: 12,
            min_start_strength: 40,
            max_start_strength: 85,
            max_lifespan: 85.0,
        }
    }
}

impl PopulationParams {
    fn collect_errors(&self, errors: &mut Vec<String>) {
        if self.diseased_aging_factor < 0.0 {
            errors.push(format!(
                "population.diseased_aging_factor must be >= 0.0, got {}. Example: diseased_aging_factor = 16.0",
                self.diseased_aging_factor
            ));
        }
        if self.chance_for_disease == 0 {
            errors.push(
                "population.chance_for_disease must be > 0. Example: chance_for_disease = 20000"
                    .to_string(),
            );
        }
        if self.max_length_disease == 0 {
            errors.push(
                "population.max_length_disease must be > 0. Example: max_length_disease = 2"
                    .to_string(),
            );
        }
        if self.min_years_until_reproduce > self.max_years_until_reproduce {
            errors.push(format!(
                "population.min_years_until_reproduce ({}) must be <= max_years_until_reproduce ({})",
                self.min_years_until_reproduce, self.max_years_until_reproduce
            ));
        }
        if self.min_start_strength > self.max_start_strength {
            errors.push(format!(
                "population.min_start_strength ({}) must be <= max_start_strength ({})",
                self.min_start_strength, self.max_start_strength
            ));
        }
        if self.max_lifespan <= 0.0 {
            errors.push(format!(
                "population.max_lifespan must be > 0.0, got {}. Example: max_lifespan = 85.0",
                self.max_lifespan
            ));
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_grid_width")]
    pub grid_width: u32,
    #[serde(default = "default_grid_height")]
    pub grid_height: u32,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Simulated years that pass per tick.
    #[serde(default = "default_tick_delta_years")]
    pub tick_delta_years: f32,
    /// Minimum wall time between ticks; 0 runs unthrottled.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_stats_interval_ms")]
    pub stats_interval_ms: u64,
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: u32,
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: u32,
    #[serde(default = "default_snapshot_directory")]
    pub snapshot_directory: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub population: PopulationParams,
}

fn default_grid_width() -> u32 {
    640
}
fn default_grid_height() -> u32 {
    360
}
fn default_worker_count() -> usize {
    4
}
fn default_tick_delta_years() -> f32 {
    0.02
}
fn default_tick_interval_ms() -> u64 {
    10
}
fn default_stats_interval_ms() -> u64 {
    1000
}
fn default_snapshot_interval() -> u32 {
    10_000
}
fn default_max_snapshots() -> u32 {
    10
}
fn default_snapshot_directory() -> String {
    "./snapshots".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            grid_width: default_grid_width(),
            grid_height: default_grid_height(),
            worker_count: default_worker_count(),
            tick_delta_years: default_tick_delta_years(),
            tick_interval_ms: default_tick_interval_ms(),
            stats_interval_ms: default_stats_interval_ms(),
            snapshot_interval: default_snapshot_interval(),
            max_snapshots: default_max_snapshots(),
            snapshot_directory: default_snapshot_directory(),
            log_level: default_log_level(),
            population: PopulationParams::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content, path)
    }

    pub fn from_toml_str(content: &str, source_path: &Path) -> Result<Self, String> {
        let config: SimulationConfig =
            toml::from_str(content).map_err(|e| format!("{}: {}", source_path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();

        if self.grid_width == 0 || self.grid_height == 0 {
            errors.push(format!(
                "grid_width and grid_height must be > 0, got {}x{}. Example: grid_width = 640",
                self.grid_width, self.grid_height
            ));
        }

        if self.worker_count == 0 {
            errors.push(
                "worker_count must be > 0, got 0. Example: worker_count = 4".to_string(),
            );
        }

        if self.tick_delta_years <= 0.0 {
            errors.push(format!(
                "tick_delta_years must be > 0.0, got {}. Example: tick_delta_years = 0.02",
                self.tick_delta_years
            ));
        }

        if self.stats_interval_ms == 0 {
            errors.push(
                "stats_interval_ms must be > 0, got 0. Example: stats_interval_ms = 1000"
                    .to_string(),
            );
        }

        if self.snapshot_interval == 0 {
            errors.push(format!(
                "snapshot_interval must be > 0, got {}. Example: snapshot_interval = 10000",
                self.snapshot_interval
            ));
        }

        if self.max_snapshots == 0 {
            errors.push(format!(
                "max_snapshots must be > 0, got {}. Example: max_snapshots = 10",
                self.max_snapshots
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            errors.push(format!(
                "log_level must be one of {:?}, got '{}'. Example: log_level = \"info\"",
                valid_levels, self.log_level
            ));
        }

        self.population.collect_errors(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    }
}
