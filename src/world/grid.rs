use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::world::person::{Cell, Person};

/// Dense, fixed-size store of cells addressed by `y * width + x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Self {
        Grid {
            width,
            height,
            cells: vec![Cell::Empty; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Flat index of `(x, y)`, or `OutOfRange`.
    pub fn index(&self, x: u32, y: u32) -> Result<usize, SimError> {
        if !self.contains(x, y) {
            return Err(SimError::OutOfRange {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y as usize * self.width as usize + x as usize)
    }

    /// Coordinates of a flat index. The caller guarantees `index < total_cells()`.
    pub fn coords(&self, index: usize) -> (u32, u32) {
        let w = self.width as usize;
        ((index % w) as u32, (index / w) as u32)
    }

    pub fn get(&self, x: u32, y: u32) -> Result<Cell, SimError> {
        let i = self.index(x, y)?;
        Ok(self.cells[i])
    }

    pub fn set(&mut self, x: u32, y: u32, cell: Cell) -> Result<(), SimError> {
        let i = self.index(x, y)?;
        self.cells[i] = cell;
        Ok(())
    }

    pub fn cell(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    pub fn cell_mut(&mut self, index: usize) -> &mut Cell {
        &mut self.cells[index]
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Iterate over `(index, person)` for every occupied cell.
    pub fn persons(&self) -> impl Iterator<Item = (usize, &Person)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.person().map(|p| (i, p)))
    }

    pub fn population(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }
}
