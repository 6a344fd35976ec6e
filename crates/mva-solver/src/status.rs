//! Outcome of a solve.

use std::fmt;

/// Counters reported by every solver.
///
/// A solve that hits the iteration cap still returns `Ok` with `converged == false`;
/// its results remain readable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolveStatus {
    pub converged: bool,
    /// Number of MVA steps
    pub iterations: usize,
    /// Number of station wait evaluations
    pub waits: usize,
    /// Iteration-limit and floating-point faults
    pub faults: usize,
}

impl SolveStatus {
    pub fn is_diverged(&self) -> bool {
        !self.converged
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} after {} steps ({} waits, {} faults)",
            if self.converged { "converged" } else { "diverged" },
            self.iterations,
            self.waits,
            self.faults
        )
    }
}
