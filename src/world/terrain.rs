use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainType {
    Habitable,
    Water,
    Other,
}

/// Classifies grid coordinates. Must be a pure function of `(x, y)` for a fixed world.
pub trait TerrainOracle: Sync {
    fn classify(&self, x: u32, y: u32) -> TerrainType;

    fn is_habitable(&self, x: u32, y: u32) -> bool {
        self.classify(x, y) == TerrainType::Habitable
    }
}

/// Terrain stored per cell, row-major like the population grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainMap {
    width: u32,
    height: u32,
    cells: Vec<TerrainType>,
}

impl TerrainMap {
    pub fn uniform(width: u32, height: u32, terrain: TerrainType) -> Self {
        TerrainMap {
            width,
            height,
            cells: vec![terrain; width as usize * height as usize],
        }
    }

    /// Build from text rows: `.` habitable, `~` water, anything else other.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as u32;
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0) as u32;
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for row in rows {
            for c in row.chars().take(width as usize) {
                cells.push(match c {
                    '.' => TerrainType::Habitable,
                    '~' => TerrainType::Water,
                    _ => TerrainType::Other,
                });
            }
        }
        cells.resize(width as usize * height as usize, TerrainType::Other);
        TerrainMap {
            width,
            height,
            cells,
        }
    }

    /// Procedural terrain from Perlin elevation.
    ///
    /// Cells are ranked by elevation: the lowest `water_ratio` share becomes water,
    /// the highest `mountain_ratio` share of the remaining land becomes impassable.
    pub fn generate(
        width: u32,
        height: u32,
        seed: u32,
        water_ratio: f32,
        mountain_ratio: f32,
        roughness: f32,
    ) -> Self {
        let perlin = Perlin::new(seed);
        let scale = 0.03 / roughness.max(0.05) as f64;
        let total = width as usize * height as usize;

        let elevation: Vec<f64> = (0..total)
            .map(|i| {
                let x = (i % width as usize) as f64 + 0.5;
                let y = (i / width as usize) as f64 + 0.5;
                perlin.get([x * scale, y * scale])
            })
            .collect();

        let mut indices: Vec<usize> = (0..total).collect();
        indices.sort_by(|&a, &b| elevation[a].total_cmp(&elevation[b]));

        let water_count = ((total as f32 * water_ratio).round() as usize).min(total);
        let land_count = total - water_count;
        let mountain_count = (land_count as f32 * mountain_ratio).round() as usize;

        let mut cells = vec![TerrainType::Habitable; total];
        for &idx in &indices[..water_count] {
            cells[idx] = TerrainType::Water;
        }
        for &idx in indices.iter().rev().take(mountain_count) {
            cells[idx] = TerrainType::Other;
        }

        TerrainMap {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cells(&self) -> &[TerrainType] {
        &self.cells
    }

    pub fn count(&self, terrain: TerrainType) -> usize {
        self.cells.iter().filter(|&&t| t == terrain).count()
    }
}

impl TerrainOracle for TerrainMap {
    fn classify(&self, x: u32, y: u32) -> TerrainType {
        if x >= self.width || y >= self.height {
            return TerrainType::Other;
        }
        self.cells[y as usize * self.width as usize + x as usize]
    }
}
