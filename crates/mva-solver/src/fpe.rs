//! Floating-point fault monitoring.
//!
//! Hardware exceptions are not trapped, so each step's outputs are scanned for NaN
//! instead. Infinities are legitimate (saturated stations) and are not faults.

use crate::config::FpPolicy;
use crate::error::{SolverError, SolverResult};
use tracing::warn;

#[derive(Clone, Debug, Default)]
pub struct FpMonitor {
    policy: FpPolicy,
    faults: usize,
}

impl FpMonitor {
    pub fn new(policy: FpPolicy) -> Self {
        Self { policy, faults: 0 }
    }

    pub fn policy(&self) -> FpPolicy {
        self.policy
    }

    pub fn faults(&self) -> usize {
        self.faults
    }

    /// Record a fault that is not a NaN (e.g. the iteration limit).
    pub fn record(&mut self) {
        self.faults += 1;
    }

    pub fn reset(&mut self) {
        self.faults = 0;
    }

    /// Scan `values` produced by step `step`.
    pub fn check<I>(&mut self, values: I, what: &str, step: usize) -> SolverResult<()>
    where
        I: IntoIterator<Item = f64>,
    {
        if !values.into_iter().any(f64::is_nan) {
            return Ok(());
        }
        match self.policy {
            FpPolicy::Strict => Err(SolverError::FloatingPoint {
                what: what.to_string(),
                step,
            }),
            FpPolicy::Lenient => {
                self.faults += 1;
                warn!(what, step, "invalid floating point operation");
                Ok(())
            }
        }
    }
}
