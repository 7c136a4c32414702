use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::world::person::Rgb;
use crate::world::terrain::{TerrainOracle, TerrainType};
use crate::world::World;

const GRASS: Rgb = Rgb(0, 255, 0);
const WATER: Rgb = Rgb(0, 0, 255);
const ROCK: Rgb = Rgb(128, 128, 128);

/// Brightness kept for a diseased person's faction color.
const DISEASED_SHADE: f32 = 0.55;

/// Read-only color image of the grid, one pixel per cell, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl Frame {
    pub fn from_world(world: &World) -> Self {
        let grid = &world.grid;
        let pixels = grid
            .cells()
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell.person() {
                Some(p) if p.is_diseased() => p.faction.color().shade(DISEASED_SHADE),
                Some(p) => p.faction.color(),
                None => {
                    let (x, y) = grid.coords(i);
                    terrain_color(world.terrain.classify(x, y))
                }
            })
            .collect();

        Frame {
            width: grid.width(),
            height: grid.height(),
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize).copied()
    }

    /// Encode as binary PPM (P6).
    pub fn write_ppm<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        let bytes: Vec<u8> = self.pixels.iter().flat_map(|p| [p.0, p.1, p.2]).collect();
        out.write_all(&bytes)
    }

    pub fn save_ppm(&self, path: &Path) -> io::Result<()> {
        let mut buf = Vec::with_capacity(self.pixels.len() * 3 + 32);
        self.write_ppm(&mut buf)?;
        fs::write(path, buf)
    }
}

fn terrain_color(terrain: TerrainType) -> Rgb {
    match terrain {
        TerrainType::Habitable => GRASS,
        TerrainType::Water => WATER,
        TerrainType::Other => ROCK,
    }
}
