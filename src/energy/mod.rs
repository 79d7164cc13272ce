//! Spatial Pairwise Energy Evaluation
//!
//! Grid-accelerated non-bonded energy and force computation for a particle
//! system. A uniform grid with cell size equal to the interaction cutoff
//! bounds each particle's neighbor search to the 27 surrounding cells,
//! replacing the O(n²) all-pairs scan with an O(n) average-case walk; the
//! exact cutoff filter and a pluggable pairwise potential do the rest.

mod evaluator;
mod grid;
mod potentials;

use thiserror::Error;

pub use evaluator::{PairPotentialEvaluator, PairResult};
pub use grid::{NeighborIter, UniformGrid};
pub use potentials::{LennardJones, PairPotential, PotentialFn};

/// Errors from grid construction and energy evaluation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnergyError {
    /// Grid cell size must be finite and positive
    #[error("cell size must be finite and positive, got {0}")]
    InvalidCellSize(f64),

    /// Interaction cutoff must be finite and positive
    #[error("cutoff must be finite and positive, got {0}")]
    InvalidCutoff(f64),

    /// A particle position contains NaN or infinity
    #[error("position {index} has a non-finite coordinate")]
    NonFinitePosition { index: usize },
}
