use rand::prelude::*;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::simulation::PopulationParams;
use crate::config::worldgen::{TribeConfig, WorldgenParams};
use crate::error::SimError;
use crate::simulation::rng::SimRng;
use crate::world::grid::Grid;
use crate::world::person::{Cell, Faction, Person, Sex};
use crate::world::terrain::{TerrainMap, TerrainOracle, TerrainType};
use crate::world::World;

/// Placement attempts per requested person before a tribe gives up.
const MAX_ATTEMPTS_PER_PERSON: u32 = 20;

/// Generate a new world: procedural terrain plus the configured starting tribes.
///
/// If `params.seed` is 0, a random seed is chosen. The actual seed used
/// is stored in the returned World for reproducibility.
pub fn generate_world(
    params: &WorldgenParams,
    width: u32,
    height: u32,
    population: &PopulationParams,
) -> Result<World, SimError> {
    let seed = if params.seed == 0 {
        rand::thread_rng().r#gen()
    } else {
        params.seed
    };
    let resolved_params = WorldgenParams {
        seed,
        ..params.clone()
    };

    let terrain = TerrainMap::generate(
        width,
        height,
        seed as u32,
        params.water_ratio,
        params.mountain_ratio,
        params.terrain_roughness,
    );

    let mut grid = Grid::new(width, height);
    let mut rng = SimRng::seed_from_u64(seed);
    for tribe in &params.tribes {
        let placed = seed_tribe(&mut grid, &terrain, &mut rng, tribe, population)?;
        info!(
            faction = tribe.faction.name(),
            requested = tribe.population,
            placed,
            "Tribe seeded"
        );
    }

    let id = Uuid::from_bytes(rand_chacha::ChaCha8Rng::seed_from_u64(seed).r#gen());

    Ok(World {
        id,
        name: format!("World-{}", seed),
        created_at: format!(
            "{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs()
        ),
        tick_count: 0,
        seed,
        worldgen_params: resolved_params,
        terrain,
        grid,
    })
}

/// Place up to `tribe.population` persons of one faction inside the tribe's region.
///
/// Positions are drawn by rejection sampling: only habitable, empty cells are
/// accepted. Returns how many persons were actually placed.
pub fn seed_tribe(
    grid: &mut Grid,
    terrain: &impl TerrainOracle,
    rng: &mut SimRng,
    tribe: &TribeConfig,
    population: &PopulationParams,
) -> Result<usize, SimError> {
    let max_x = tribe.lower_right[0].min(grid.width().saturating_sub(1));
    let max_y = tribe.lower_right[1].min(grid.height().saturating_sub(1));
    let (min_x, min_y) = (tribe.upper_left[0], tribe.upper_left[1]);
    if min_x > max_x || min_y > max_y || grid.total_cells() == 0 {
        warn!(
            faction = tribe.faction.name(),
            upper_left = ?tribe.upper_left,
            lower_right = ?tribe.lower_right,
            "Tribe region lies outside the grid, skipped"
        );
        return Ok(0);
    }

    let wanted = tribe.population as usize;
    let max_attempts = tribe.population.saturating_mul(MAX_ATTEMPTS_PER_PERSON);
    let mut placed = 0;

    for _ in 0..max_attempts {
        if placed == wanted {
            break;
        }
        let x = rng.uniform_int(min_x as i64, max_x as i64)? as u32;
        let y = rng.uniform_int(min_y as i64, max_y as i64)? as u32;
        if !terrain.is_habitable(x, y) || !grid.get(x, y)?.is_empty() {
            continue;
        }
        let person = spawn_settler(rng, tribe.faction, population)?;
        grid.set(x, y, Cell::Occupied(person))?;
        placed += 1;
    }

    if placed < wanted {
        warn!(
            faction = tribe.faction.name(),
            wanted,
            placed,
            "Not enough habitable space for the full tribe"
        );
    }

    Ok(placed)
}

fn spawn_settler(
    rng: &mut SimRng,
    faction: Faction,
    population: &PopulationParams,
) -> Result<Person, SimError> {
    let sex = if rng.coin_flip() { Sex::Male } else { Sex::Female };
    let reproduction_cooldown = rng.uniform_int(1, 20)? as f32;
    let age = rng.uniform_int(1, 35)? as f32;
    let strength = rng.uniform_int(
        population.min_start_strength as i64,
        population.max_start_strength as i64,
    )? as u32;

    Ok(Person {
        faction,
        sex,
        age,
        strength,
        reproduction_cooldown,
        disease_remaining: 0.0,
        recently_placed: false,
    })
}

/// Print a human-readable summary of a world.
pub fn print_world_summary(world: &World) {
    let total = world.grid.total_cells();
    println!("=== World: {} ===", world.name);
    println!("ID: {}", world.id);
    println!("Seed: {}", world.seed);
    println!("Tick: {}", world.tick_count);
    println!("Grid: {}x{} ({} cells)", world.grid.width(), world.grid.height(), total);
    println!();

    println!("--- Terrain ---");
    for terrain in [TerrainType::Habitable, TerrainType::Water, TerrainType::Other] {
        let count = world.terrain.count(terrain);
        let pct = if total > 0 {
            count as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        println!("  {:?}: {} ({:.1}%)", terrain, count, pct);
    }
    println!();

    println!("--- Population ---");
    println!("  Alive: {}", world.grid.population());
    for faction in Faction::all() {
        let count = world
            .grid
            .persons()
            .filter(|(_, p)| p.faction == *faction)
            .count();
        if count > 0 {
            println!("  {}: {}", faction.name(), count);
        }
    }
}
