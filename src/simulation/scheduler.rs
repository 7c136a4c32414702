use rayon::prelude::*;
use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error};

use crate::config::simulation::{PopulationParams, SimulationConfig};
use crate::error::SimError;
use crate::simulation::intent::{resolve_conflicts, Combatant, Intent, IntentCounts};
use crate::simulation::rng::SimRng;
use crate::simulation::rule::{update_cell, RuleContext};
use crate::simulation::statistics::PopulationStats;
use crate::world::person::{Cell, Person};
use crate::world::terrain::TerrainOracle;
use crate::world::Grid;

/// What one worker produced for its partition.
#[derive(Debug, Default)]
struct WorkerOutput {
    stats: PopulationStats,
    /// Next state of every occupied cell in the partition, in index order.
    updates: Vec<(usize, Option<Person>)>,
    intents: Vec<Intent>,
}

/// Summary of an applied tick.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    /// Stats recorded before any mutation, merged across workers.
    pub stats: PopulationStats,
    pub applied: IntentCounts,
    pub discarded: usize,
    pub deaths: usize,
}

/// Drives one tick: parallel scan over disjoint partitions, join, conflict
/// resolution, then a single-threaded apply.
pub struct TickScheduler {
    pool: rayon::ThreadPool,
    worker_count: usize,
    params: PopulationParams,
    dt: f32,
}

impl TickScheduler {
    pub fn new(worker_count: usize, params: PopulationParams, dt: f32) -> Result<Self, SimError> {
        let worker_count = worker_count.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .thread_name(|i| format!("pixelciv-worker-{}", i))
            .build()?;
        Ok(TickScheduler {
            pool,
            worker_count,
            params,
            dt,
        })
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self, SimError> {
        Self::new(
            config.worker_count,
            config.population.clone(),
            config.tick_delta_years,
        )
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Run one tick over `grid`.
    ///
    /// Workers read the grid as it stood at the start of the tick. If any of
    /// them fails, the error is returned and the grid is left untouched.
    pub fn execute_tick<T: TerrainOracle>(
        &self,
        grid: &mut Grid,
        terrain: &T,
        seed: u64,
        tick: u64,
    ) -> Result<TickOutcome, SimError> {
        let partitions = partition(grid.total_cells(), self.worker_count);

        let ctx = RuleContext {
            grid: &*grid,
            terrain,
            params: &self.params,
            dt: self.dt,
        };

        let results: Vec<Result<WorkerOutput, SimError>> = self.pool.install(|| {
            partitions
                .par_iter()
                .enumerate()
                .map(|(worker, range)| {
                    panic::catch_unwind(AssertUnwindSafe(|| {
                        scan_partition(&ctx, range.clone(), seed, tick)
                    }))
                    .unwrap_or_else(|payload| {
                        Err(SimError::WorkerFailure {
                            worker,
                            reason: panic_message(payload.as_ref()),
                        })
                    })
                })
                .collect()
        });

        let mut stats = PopulationStats::default();
        let mut updates = Vec::new();
        let mut intents = Vec::new();
        for (worker, result) in results.into_iter().enumerate() {
            match result {
                Ok(output) => {
                    stats.merge(&output.stats);
                    updates.extend(output.updates);
                    intents.extend(output.intents);
                }
                Err(e) => {
                    error!(tick, worker, error = %e, "Partition scan failed, tick aborted");
                    return Err(e);
                }
            }
        }

        let resolution = resolve_conflicts(intents);
        let deaths = updates.iter().filter(|(_, next)| next.is_none()).count();
        let applied = apply_changes(grid, updates, &resolution.winners);

        debug!(
            tick,
            moves = applied.moves,
            spawns = applied.spawns,
            infections = applied.infections,
            fights = applied.fights,
            discarded = resolution.discarded.len(),
            deaths,
            "Tick applied"
        );

        Ok(TickOutcome {
            stats,
            applied,
            discarded: resolution.discarded.len(),
            deaths,
        })
    }
}

/// Split `0..total` into `k` contiguous ranges whose lengths differ by at most one.
pub fn partition(total: usize, k: usize) -> Vec<Range<usize>> {
    let k = k.max(1);
    let base = total / k;
    let extra = total % k;
    let mut ranges = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let len = base + usize::from(i < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

fn scan_partition<T: TerrainOracle>(
    ctx: &RuleContext<'_, T>,
    range: Range<usize>,
    seed: u64,
    tick: u64,
) -> Result<WorkerOutput, SimError> {
    let mut rng = SimRng::for_tick(seed, tick);
    let mut output = WorkerOutput::default();

    // No marked-cell skip here: placements are written after every scan has
    // finished, so a person placed this tick cannot be reached by this loop.
    for index in range {
        let Cell::Occupied(person) = ctx.grid.cell(index) else {
            continue;
        };
        rng.select_cell(index);
        let outcome = update_cell(ctx, index, person, &mut rng, &mut output.stats)?;
        output.updates.push((index, outcome.next));
        if let Some(intent) = outcome.intent {
            output.intents.push(intent);
        }
    }

    Ok(output)
}

/// Write per-actor updates, then in-place effects, then occupancy changes.
///
/// Effects land before anyone relocates, so a fight or infection reaches the
/// person that stood at `dest` during the scan even if they move this tick.
/// Several effects on one target apply in ascending origin order, so when two
/// winners beat the same defender the higher origin's strength is what sticks.
/// Returns the count of intents that took effect.
fn apply_changes(
    grid: &mut Grid,
    updates: Vec<(usize, Option<Person>)>,
    winners: &[Intent],
) -> IntentCounts {
    let mut applied = IntentCounts::default();

    for (origin, next) in updates {
        *grid.cell_mut(origin) = Cell::from(next);
    }

    for intent in winners.iter().filter(|i| !i.changes_occupancy()) {
        match *intent {
            Intent::Infect { dest, duration, .. } => {
                if let Some(target) = grid.cell_mut(dest).person_mut() {
                    target.disease_remaining = duration;
                    applied.add(intent);
                }
            }
            Intent::Fight {
                dest,
                loser,
                loser_age,
                ..
            } => {
                if loser == Combatant::Defender {
                    let Some(target) = grid.cell_mut(dest).person_mut() else {
                        continue;
                    };
                    target.age = loser_age;
                }
                applied.add(intent);
            }
            Intent::Move { .. } | Intent::Spawn { .. } => {}
        }
    }

    for intent in winners.iter().filter(|i| i.changes_occupancy()) {
        let dest = intent.dest();
        if !grid.cell(dest).is_empty() {
            continue;
        }
        match *intent {
            Intent::Move { origin, .. } => {
                let Cell::Occupied(mut mover) = std::mem::take(grid.cell_mut(origin)) else {
                    continue;
                };
                mover.recently_placed = true;
                *grid.cell_mut(dest) = Cell::Occupied(mover);
            }
            Intent::Spawn {
                origin,
                child,
                mother_cooldown,
                ..
            } => {
                let Some(mother) = grid.cell_mut(origin).person_mut() else {
                    continue;
                };
                mother.reproduction_cooldown = mother_cooldown;
                *grid.cell_mut(dest) = Cell::Occupied(child);
            }
            Intent::Infect { .. } | Intent::Fight { .. } => {}
        }
        applied.add(intent);
    }

    applied
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
