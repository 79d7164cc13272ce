//! Non-Bonded Pair Energy and Force Evaluation
//!
//! Consumes grid-provided neighbor candidates, applies the exact cutoff
//! filter, and accumulates energy and per-particle forces with a pluggable
//! pairwise potential.

use nalgebra::{Point3, Vector3};

use super::grid::UniformGrid;
use super::potentials::PairPotential;
use super::EnergyError;

/// Accumulated result of one evaluation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PairResult {
    /// Sum of pair energies within the cutoff
    pub total_energy: f64,
    /// Per-particle force vectors; equal and opposite contributions per
    /// pair, so the sum over a closed system is zero up to rounding
    pub forces: Vec<Vector3<f64>>,
    /// Number of within-cutoff pairs evaluated (each pair exactly once)
    pub pair_count: usize,
}

impl PairResult {
    fn zeros(n: usize) -> Self {
        Self {
            total_energy: 0.0,
            forces: vec![Vector3::zeros(); n],
            pair_count: 0,
        }
    }

    /// Net force over all particles. For a closed system this is zero up
    /// to floating-point error — a useful sanity check after a step.
    pub fn net_force(&self) -> Vector3<f64> {
        self.forces
            .iter()
            .fold(Vector3::zeros(), |acc, force| acc + force)
    }
}

/// Cutoff-bounded pairwise energy evaluator.
///
/// One `evaluate` call is a single synchronous computation over a borrowed
/// position slice: it builds a fresh [`UniformGrid`] with cell size equal
/// to the cutoff, walks each particle's 27-cell candidate block, and
/// processes each pair exactly once (the lower index owns the pair).
pub struct PairPotentialEvaluator {
    cutoff: f64,
}

impl PairPotentialEvaluator {
    /// Create an evaluator for the given interaction cutoff.
    pub fn new(cutoff: f64) -> Result<Self, EnergyError> {
        if !cutoff.is_finite() || cutoff <= 0.0 {
            return Err(EnergyError::InvalidCutoff(cutoff));
        }
        Ok(Self { cutoff })
    }

    /// Interaction cutoff radius
    #[inline]
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Compute total energy and per-particle forces.
    ///
    /// Candidate pairs come from the grid; the exact `r² <= cutoff²` check
    /// decides membership. For each within-cutoff pair the potential's
    /// `(energy, dE/dr / r)` is accumulated as
    /// `forces[i] += f_over_r * (p_j - p_i)` and the opposite onto `j`.
    ///
    /// Zero or one particle yields zero energy and forces. Coincident
    /// particles (`r² == 0`) are not special-cased: typical potentials
    /// divide by `r²` there, so callers must guard against overlapping
    /// input positions.
    pub fn evaluate<P: PairPotential>(
        &self,
        positions: &[Point3<f64>],
        potential: &P,
    ) -> Result<PairResult, EnergyError> {
        if positions.len() < 2 {
            return Ok(PairResult::zeros(positions.len()));
        }

        let grid = UniformGrid::build(positions, self.cutoff)?;
        let cutoff2 = self.cutoff * self.cutoff;
        let mut result = PairResult::zeros(positions.len());

        for i in 0..positions.len() {
            for j in grid.neighbors_of(i) {
                // The grid yields each cross-cell pair in both directions;
                // the lower index owns it.
                if j <= i {
                    continue;
                }

                let separation = positions[j] - positions[i];
                let r2 = separation.norm_squared();
                if r2 > cutoff2 {
                    continue;
                }

                let (energy, force_over_r) = potential.energy_and_force_over_r(r2);
                let force = separation * force_over_r;

                result.total_energy += energy;
                result.forces[i] += force;
                result.forces[j] -= force;
                result.pair_count += 1;
            }
        }

        Ok(result)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::potentials::LennardJones;
    use assert_matches::assert_matches;

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    #[test]
    fn test_rejects_bad_cutoff() {
        assert_matches!(
            PairPotentialEvaluator::new(0.0),
            Err(EnergyError::InvalidCutoff(_))
        );
        assert_matches!(
            PairPotentialEvaluator::new(f64::NAN),
            Err(EnergyError::InvalidCutoff(_))
        );
    }

    #[test]
    fn test_empty_and_single_particle() {
        let evaluator = PairPotentialEvaluator::new(5.0).unwrap();
        let lj = LennardJones::new(3.4, 0.238);

        let empty = evaluator.evaluate(&[], &lj).unwrap();
        assert_eq!(empty.total_energy, 0.0);
        assert!(empty.forces.is_empty());
        assert_eq!(empty.pair_count, 0);

        let single = evaluator.evaluate(&[p(1.0, 2.0, 3.0)], &lj).unwrap();
        assert_eq!(single.total_energy, 0.0);
        assert_eq!(single.forces, vec![Vector3::zeros()]);
    }

    #[test]
    fn test_two_particles_at_lj_minimum() {
        let lj = LennardJones::new(2.0, 1.0);
        let r_min = 2.0_f64.powf(1.0 / 6.0) * 2.0;
        let evaluator = PairPotentialEvaluator::new(10.0).unwrap();

        let result = evaluator
            .evaluate(&[p(0.0, 0.0, 0.0), p(r_min, 0.0, 0.0)], &lj)
            .unwrap();

        assert_eq!(result.pair_count, 1);
        assert!((result.total_energy + 1.0).abs() < 1e-9);
        assert!(result.forces[0].norm() < 1e-9);
        assert!(result.forces[1].norm() < 1e-9);
    }

    #[test]
    fn test_forces_are_equal_and_opposite() {
        let lj = LennardJones::new(3.0, 1.0);
        let evaluator = PairPotentialEvaluator::new(10.0).unwrap();

        let result = evaluator
            .evaluate(&[p(0.0, 0.0, 0.0), p(2.5, 0.0, 0.0)], &lj)
            .unwrap();

        assert!((result.forces[0] + result.forces[1]).norm() < 1e-12);
        // Inside sigma the pair is repulsive: particle 0 is pushed to -x.
        assert!(result.forces[0].x < 0.0);
        assert!(result.forces[1].x > 0.0);
    }

    #[test]
    fn test_pair_outside_cutoff_is_skipped() {
        let lj = LennardJones::new(3.0, 1.0);
        let evaluator = PairPotentialEvaluator::new(4.0).unwrap();

        // Same 3×3×3 block, but beyond the exact cutoff.
        let result = evaluator
            .evaluate(&[p(0.0, 0.0, 0.0), p(4.5, 0.0, 0.0)], &lj)
            .unwrap();

        assert_eq!(result.pair_count, 0);
        assert_eq!(result.total_energy, 0.0);
    }

    #[test]
    fn test_result_independent_of_particle_order() {
        let lj = LennardJones::new(3.0, 0.5);
        let evaluator = PairPotentialEvaluator::new(8.0).unwrap();

        let forward = [
            p(0.0, 0.0, 0.0),
            p(3.1, 0.2, -0.3),
            p(-2.5, 4.0, 1.0),
            p(1.0, -3.0, 2.5),
        ];
        let mut reversed = forward;
        reversed.reverse();

        let a = evaluator.evaluate(&forward, &lj).unwrap();
        let b = evaluator.evaluate(&reversed, &lj).unwrap();

        assert_eq!(a.pair_count, b.pair_count);
        assert!((a.total_energy - b.total_energy).abs() < 1e-12);
        // Forces map through the index reversal.
        for (i, force) in a.forces.iter().enumerate() {
            let mirrored = b.forces[b.forces.len() - 1 - i];
            assert!((force - mirrored).norm() < 1e-12);
        }
    }

    #[test]
    fn test_matches_brute_force_on_small_cluster() {
        let lj = LennardJones::new(3.0, 1.0);
        let cutoff = 6.0;
        let evaluator = PairPotentialEvaluator::new(cutoff).unwrap();

        // 2×2×2 lattice with 3.5 Å spacing.
        let mut positions = Vec::new();
        for ix in 0..2 {
            for iy in 0..2 {
                for iz in 0..2 {
                    positions.push(p(ix as f64 * 3.5, iy as f64 * 3.5, iz as f64 * 3.5));
                }
            }
        }

        let result = evaluator.evaluate(&positions, &lj).unwrap();

        let mut brute_energy = 0.0;
        let mut brute_pairs = 0;
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let r2 = (positions[j] - positions[i]).norm_squared();
                if r2 <= cutoff * cutoff {
                    brute_energy += lj.energy_and_force_over_r(r2).0;
                    brute_pairs += 1;
                }
            }
        }

        assert_eq!(result.pair_count, brute_pairs);
        assert!((result.total_energy - brute_energy).abs() < 1e-9 * brute_energy.abs());
    }

    #[test]
    fn test_net_force_vanishes_for_closed_system() {
        let lj = LennardJones::new(3.0, 1.0);
        let evaluator = PairPotentialEvaluator::new(7.0).unwrap();

        let positions = [
            p(0.0, 0.0, 0.0),
            p(3.4, 0.1, 0.0),
            p(0.3, 3.6, -0.2),
            p(-3.1, 0.4, 3.0),
            p(1.5, -2.9, -3.3),
        ];

        let result = evaluator.evaluate(&positions, &lj).unwrap();
        assert!(result.net_force().norm() < 1e-9);
    }
}
