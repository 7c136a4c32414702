pub mod generation;
pub mod grid;
pub mod person;
pub mod terrain;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::worldgen::WorldgenParams;
pub use grid::Grid;
pub use person::{Cell, Faction, Person, Sex};
pub use terrain::{TerrainMap, TerrainOracle, TerrainType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub id: Uuid,
    pub name: String,
    pub created_at: String,
    pub tick_count: u64,
    /// Base seed for per-tick RNG streams.
    pub seed: u64,
    pub worldgen_params: WorldgenParams,
    pub terrain: TerrainMap,
    pub grid: Grid,
}
