//! Exact MVA over the full population lattice.

use crate::config::MvaConfig;
use crate::error::SolverResult;
use crate::mva::{Layout, Mva};
use crate::network::Network;
use crate::solver::{Solver, SolverKind};
use crate::status::SolveStatus;
use mva_pop::PopulationIter;
use tracing::debug;

/// Steps every population `0 ..= N` in offset order, so each `N - e_k` is solved
/// before `N`. Cost grows with the product of `N_k + 1`.
#[derive(Debug)]
pub struct ExactMva {
    mva: Mva,
}

impl ExactMva {
    pub fn new(network: Network, config: MvaConfig) -> SolverResult<Self> {
        Ok(Self {
            mva: Mva::new(network, Layout::Full, config)?,
        })
    }
}

impl Solver for ExactMva {
    fn solve(&mut self) -> SolverResult<SolveStatus> {
        let mva = &mut self.mva;
        mva.clear();
        mva.reset_counters();
        for n in PopulationIter::new(&mva.population.clone()) {
            mva.step(&n)?;
        }
        mva.converged = true;
        let status = mva.status();
        debug!(solver = "exact", %status, "solved");
        Ok(status)
    }

    fn mva(&self) -> &Mva {
        &self.mva
    }

    fn mva_mut(&mut self) -> &mut Mva {
        &mut self.mva
    }

    fn kind(&self) -> SolverKind {
        SolverKind::Exact
    }
}
