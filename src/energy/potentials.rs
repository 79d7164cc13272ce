//! Pairwise Potential Functions

/// A pairwise potential as a function of squared inter-particle distance.
///
/// `energy_and_force_over_r(r2)` returns `(E(r), E'(r) / r)`. Working from
/// the squared distance avoids a square root per pair, and the `E'(r) / r`
/// form lets the evaluator scale the raw separation vector directly:
/// the force on particle `i` from `j` is `f_over_r * (p_j - p_i)`.
///
/// Behavior at `r2 == 0` is the caller's responsibility. Typical forms
/// divide by `r2` and produce non-finite output for coincident particles;
/// the evaluator does not guard against this.
pub trait PairPotential {
    /// Energy and `dE/dr / r` at squared distance `r2`
    fn energy_and_force_over_r(&self, r2: f64) -> (f64, f64);
}

/// Adapter turning a plain `Fn(f64) -> (f64, f64)` closure into a
/// [`PairPotential`], so force-field parameter lookups can be supplied as
/// pure functions of the squared distance.
pub struct PotentialFn<F>(pub F);

impl<F> PairPotential for PotentialFn<F>
where
    F: Fn(f64) -> (f64, f64),
{
    fn energy_and_force_over_r(&self, r2: f64) -> (f64, f64) {
        (self.0)(r2)
    }
}

/// Lennard-Jones 12-6 potential: `4ε((σ/r)¹² − (σ/r)⁶)`.
///
/// `sigma` is the zero-crossing distance, `epsilon` the well depth; the
/// minimum sits at `r = 2^(1/6) σ` with energy `-ε`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LennardJones {
    pub sigma: f64,
    pub epsilon: f64,
}

impl LennardJones {
    pub fn new(sigma: f64, epsilon: f64) -> Self {
        Self { sigma, epsilon }
    }
}

impl PairPotential for LennardJones {
    #[inline]
    fn energy_and_force_over_r(&self, r2: f64) -> (f64, f64) {
        let s2 = (self.sigma * self.sigma) / r2;
        let s6 = s2 * s2 * s2;
        let s12 = s6 * s6;

        let energy = 4.0 * self.epsilon * (s12 - s6);
        // dE/dr = -24ε(2(σ/r)¹² − (σ/r)⁶)/r, so dE/dr / r = 24ε(s6 − 2·s12)/r².
        let force_over_r = 24.0 * self.epsilon * (s6 - 2.0 * s12) / r2;

        (energy, force_over_r)
    }
}

// =============================================================================
// Tests
// =============================================================================
