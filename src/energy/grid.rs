//! Uniform Grid Spatial Partitioning
//!
//! Hashes particle positions into cubic cells of side `cell_size`. With
//! `cell_size` equal to the interaction cutoff, every particle within the
//! cutoff sphere of a query particle is guaranteed to sit in the 3×3×3
//! block of cells around the query's cell, so neighbor candidates never
//! include false negatives.

use std::collections::HashMap;

use nalgebra::Point3;

use super::EnergyError;

/// Integer cell coordinates
type Cell = (i64, i64, i64);

const EMPTY_CELL: &[usize] = &[];

/// Spatial hash of particle indices by grid cell.
///
/// Positions change every simulation step, so the grid is rebuilt per step
/// rather than incrementally updated.
#[derive(Debug)]
pub struct UniformGrid {
    cell_size: f64,
    cells: HashMap<Cell, Vec<usize>>,
    /// Cell assignment per particle, indexed by particle
    particle_cells: Vec<Cell>,
}

impl UniformGrid {
    /// Assign each particle to cell `floor(position / cell_size)`.
    ///
    /// Floor division keeps negative coordinates in the correct cell
    /// (truncation would fold the two cells around zero together).
    pub fn build(positions: &[Point3<f64>], cell_size: f64) -> Result<Self, EnergyError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(EnergyError::InvalidCellSize(cell_size));
        }

        let mut cells: HashMap<Cell, Vec<usize>> = HashMap::new();
        let mut particle_cells = Vec::with_capacity(positions.len());

        for (index, position) in positions.iter().enumerate() {
            if !position.coords.iter().all(|c| c.is_finite()) {
                return Err(EnergyError::NonFinitePosition { index });
            }
            let cell = Self::cell_of(position, cell_size);
            cells.entry(cell).or_default().push(index);
            particle_cells.push(cell);
        }

        Ok(Self {
            cell_size,
            cells,
            particle_cells,
        })
    }

    #[inline]
    fn cell_of(position: &Point3<f64>, cell_size: f64) -> Cell {
        (
            (position.x / cell_size).floor() as i64,
            (position.y / cell_size).floor() as i64,
            (position.z / cell_size).floor() as i64,
        )
    }

    /// Cell side length
    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of particles in the grid
    #[inline]
    pub fn len(&self) -> usize {
        self.particle_cells.len()
    }

    /// Whether the grid holds no particles
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particle_cells.is_empty()
    }

    /// Number of occupied cells
    #[inline]
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Candidate neighbors of `particle`: every particle index in the 27
    /// cells forming the 3×3×3 block around its cell (its own cell
    /// included), excluding `particle` itself.
    ///
    /// The sequence is lazy, finite, and non-restartable. It approximates
    /// "all particles within cutoff": the caller must still apply the exact
    /// `r² <= cutoff²` check.
    ///
    /// # Panics
    ///
    /// Panics if `particle` is out of range for the positions the grid was
    /// built from.
    pub fn neighbors_of(&self, particle: usize) -> NeighborIter<'_> {
        let center = self.particle_cells[particle];
        NeighborIter {
            grid: self,
            query: particle,
            center,
            block: 0,
            current: EMPTY_CELL.iter(),
        }
    }
}

/// Lazy iterator over the candidate neighbors of one particle.
pub struct NeighborIter<'a> {
    grid: &'a UniformGrid,
    query: usize,
    center: Cell,
    /// Next cell offset in the 3×3×3 block (0..27)
    block: u8,
    current: std::slice::Iter<'a, usize>,
}

impl<'a> Iterator for NeighborIter<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            for &candidate in self.current.by_ref() {
                if candidate != self.query {
                    return Some(candidate);
                }
            }

            if self.block >= 27 {
                return None;
            }
            let offset = self.block as i64;
            self.block += 1;

            let cell = (
                self.center.0 + offset / 9 - 1,
                self.center.1 + (offset / 3) % 3 - 1,
                self.center.2 + offset % 3 - 1,
            );
            self.current = self
                .grid
                .cells
                .get(&cell)
                .map(|indices| indices.iter())
                .unwrap_or(EMPTY_CELL.iter());
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
