pub mod intent;
pub mod rng;
pub mod rule;
pub mod scheduler;
pub mod statistics;

use std::time::Instant;
use tracing::{debug, warn};

use crate::error::SimError;
use crate::simulation::intent::IntentCounts;
use crate::simulation::scheduler::TickScheduler;
use crate::simulation::statistics::PopulationStats;
use crate::world::World;

/// Result of executing a single tick.
#[derive(Debug, Clone)]
pub struct TickResult {
    /// Index of the tick that ran (the world's tick count before it advanced).
    pub tick: u64,
    /// Population as seen at the start of the tick.
    pub statistics: PopulationStats,
    pub applied: IntentCounts,
    /// Intents that lost a destination conflict.
    pub discarded: usize,
    pub deaths: usize,
    /// Population after the tick was applied.
    pub population: usize,
    pub tick_duration_ms: f32,
}

/// Execute a single simulation tick on the world.
///
/// The tick count only advances when the tick succeeds. On failure the world
/// is exactly as it was before the call.
pub fn execute_tick(world: &mut World, scheduler: &TickScheduler) -> Result<TickResult, SimError> {
    let tick_start = Instant::now();
    let tick = world.tick_count;

    let outcome = scheduler
        .execute_tick(&mut world.grid, &world.terrain, world.seed, tick)
        .inspect_err(|e| warn!(tick, error = %e, "Tick failed, world unchanged"))?;

    world.tick_count += 1;

    let population = world.grid.population();
    if population == 0 && outcome.stats.total_alive() > 0 {
        warn!(tick, "Population died out");
    }

    let tick_duration_ms = tick_start.elapsed().as_secs_f32() * 1000.0;
    debug!(
        tick,
        population,
        deaths = outcome.deaths,
        intents = outcome.applied.total(),
        duration_ms = tick_duration_ms,
        "Tick complete"
    );

    Ok(TickResult {
        tick,
        statistics: outcome.stats,
        applied: outcome.applied,
        discarded: outcome.discarded,
        deaths: outcome.deaths,
        population,
        tick_duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::simulation::PopulationParams;
    use crate::config::worldgen::{TribeConfig, WorldgenParams};
    use crate::world::generation::generate_world;
    use crate::world::person::Faction;
    use crate::world::terrain::{TerrainOracle, TerrainType};

    fn small_world(seed: u64) -> World {
        let params = WorldgenParams {
            seed,
            water_ratio: 0.3,
            mountain_ratio: 0.05,
            terrain_roughness: 0.5,
            tribes: vec![
                TribeConfig {
                    faction: Faction::Red,
                    upper_left: [0, 0],
                    lower_right: [23, 23],
                    population: 80,
                },
                TribeConfig {
                    faction: Faction::Blue,
                    upper_left: [24, 0],
                    lower_right: [47, 23],
                    population: 80,
                },
            ],
        };
        generate_world(&params, 48, 24, &PopulationParams::default()).unwrap()
    }

    fn scheduler(workers: usize) -> TickScheduler {
        TickScheduler::new(workers, PopulationParams::default(), 0.25).unwrap()
    }

    #[test]
    fn tick_advances_count_and_reports_population() {
        let mut world = small_world(42);
        let before = world.grid.population();
        let result = execute_tick(&mut world, &scheduler(2)).unwrap();

        assert_eq!(result.tick, 0);
        assert_eq!(world.tick_count, 1);
        assert_eq!(result.statistics.total_alive() as usize, before);
        assert_eq!(result.population, world.grid.population());
        assert_eq!(
            result.population,
            before - result.deaths + result.applied.spawns as usize
        );
    }

    #[test]
    fn identical_worlds_stay_identical() {
        let mut a = small_world(7);
        let mut b = a.clone();
        let single = scheduler(1);
        let quad = scheduler(4);
        for _ in 0..100 {
            execute_tick(&mut a, &single).unwrap();
            execute_tick(&mut b, &quad).unwrap();
        }
        assert_eq!(a.tick_count, 100);
        assert_eq!(a, b);
    }

    #[test]
    fn everyone_stays_on_habitable_land() {
        let mut world = small_world(99);
        let sched = scheduler(3);
        for _ in 0..50 {
            execute_tick(&mut world, &sched).unwrap();
            for (i, _) in world.grid.persons() {
                let (x, y) = world.grid.coords(i);
                assert_eq!(world.terrain.classify(x, y), TerrainType::Habitable);
            }
        }
    }

    #[test]
    fn failed_tick_leaves_world_untouched() {
        let mut world = small_world(3);
        let before = world.clone();
        let broken = TickScheduler::new(
            2,
            PopulationParams {
                chance_for_disease: 1,
                max_length_disease: 0,
                ..PopulationParams::default()
            },
            0.25,
        )
        .unwrap();

        let err = execute_tick(&mut world, &broken).unwrap_err();
        assert!(matches!(err, SimError::InvalidRange { min: 1, max: 0 }));
        assert_eq!(world, before);
    }
}
