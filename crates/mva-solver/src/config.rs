//! Solver configuration.

pub use mva_station::Phase2Correction;

/// What to do when a step produces a NaN.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FpPolicy {
    /// Count the fault, log it and keep iterating.
    #[default]
    Lenient,
    /// Abort the solve at the offending step.
    Strict,
}

/// Fixed-point iteration configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MvaConfig {
    /// Iteration cap for the approximate solvers
    pub max_iterations: usize,
    /// Iteration after which queue lengths are underrelaxed toward the previous iterate
    pub underrelax_after: usize,
    /// Filter applied to Rolia multi-server waits by the approximate solvers
    pub multiserver_underrelaxation: f64,
    /// Exponent of the tau overlap correction (disabled when not positive)
    pub bounds_limit: f64,
    /// Second-phase correction for phased servers
    pub phase2: Phase2Correction,
    /// Floating-point fault handling
    pub fp_policy: FpPolicy,
    /// Convergence threshold on `max |dL| / N_k`; derived from the population when unset
    pub termination: Option<f64>,
}

impl Default for MvaConfig {
    fn default() -> Self {
        Self {
            max_iterations: 80,
            underrelax_after: 50,
            multiserver_underrelaxation: 0.5,
            bounds_limit: 0.0,
            phase2: Phase2Correction::Complex,
            fp_policy: FpPolicy::Lenient,
            termination: None,
        }
    }
}

impl MvaConfig {
    /// Convergence threshold for a total population of `customers`.
    pub fn termination_for(&self, customers: u32) -> f64 {
        self.termination
            .unwrap_or_else(|| 1.0 / (4000.0 + 16.0 * customers as f64))
    }
}
