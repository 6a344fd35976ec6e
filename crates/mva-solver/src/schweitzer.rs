//! Bard-Schweitzer approximate MVA.

use crate::config::MvaConfig;
use crate::error::SolverResult;
use crate::mva::{Layout, Mva};
use crate::network::Network;
use crate::solver::{Solver, SolverKind};
use crate::status::SolveStatus;
use tracing::debug;

/// Estimates `L(N - e_j)` as `(N_k - d_jk) L_k(N) / N_k` and iterates to a fixed point.
#[derive(Debug)]
pub struct Schweitzer {
    mva: Mva,
}

impl Schweitzer {
    pub fn new(network: Network, config: MvaConfig) -> SolverResult<Self> {
        Ok(Self {
            mva: Mva::new(network, Layout::Single, config)?,
        })
    }
}

impl Solver for Schweitzer {
    fn solve(&mut self) -> SolverResult<SolveStatus> {
        let mva = &mut self.mva;
        mva.clear();
        mva.reset_counters();
        mva.initialize()?;
        let n = mva.population.clone();
        mva.converged = mva.core(&n)?;
        if !mva.converged {
            mva.fp.record();
        }
        let status = mva.status();
        debug!(solver = "schweitzer", %status, "solved");
        Ok(status)
    }

    fn mva(&self) -> &Mva {
        &self.mva
    }

    fn mva_mut(&mut self) -> &mut Mva {
        &mut self.mva
    }

    fn kind(&self) -> SolverKind {
        SolverKind::Schweitzer
    }
}

/// A single estimate-and-step pass at `N`.
///
/// Each call continues from the previous one, so an outer loop that adjusts the
/// stations between calls converges together with them.
#[derive(Debug)]
pub struct OneStepSchweitzer {
    mva: Mva,
}

impl OneStepSchweitzer {
    pub fn new(network: Network, config: MvaConfig) -> SolverResult<Self> {
        Ok(Self {
            mva: Mva::new(network, Layout::Single, config)?,
        })
    }
}

impl Solver for OneStepSchweitzer {
    fn solve(&mut self) -> SolverResult<SolveStatus> {
        let mva = &mut self.mva;
        mva.reset_counters();
        if !mva.initialized {
            mva.initialize()?;
        }
        let n = mva.population.clone();
        mva.estimate_l(&n)?;
        mva.estimate_p(&n)?;
        mva.step(&n)?;
        mva.converged = true;
        Ok(mva.status())
    }

    fn mva(&self) -> &Mva {
        &self.mva
    }

    fn mva_mut(&mut self) -> &mut Mva {
        &mut self.mva
    }

    fn kind(&self) -> SolverKind {
        SolverKind::OneStep
    }
}
