//! Linearizer approximate MVA (Chandy and Neuse) and its variants.
//!
//! The Bard-Schweitzer estimate is corrected by `D[k][j]`, the change in class
//! `k`'s queue fraction when one class `j` customer is removed. The corrections
//! are learned from `K` sub-problems at `N - e_c`, each solved by the same core
//! iteration as Bard-Schweitzer.

use crate::config::MvaConfig;
use crate::error::SolverResult;
use crate::mva::{Layout, Mva};
use crate::network::Network;
use crate::solver::{Solver, SolverKind};
use crate::status::SolveStatus;
use mva_pop::Population;
use tracing::debug;

/// Outer passes over the sub-problems before the final solve at `N`.
const PASSES: usize = 2;

/// Point the estimates at sub-problem `N - e_c`.
fn remove_class(mva: &mut Mva, c: Option<usize>) {
    if let Some(delta) = mva.delta.as_mut() {
        delta.c = c;
    }
}

/// Slots of `N - e_c - e_j` for every `j`.
fn neighbours(mva: &Mva, c: Option<usize>) -> Vec<usize> {
    match mva.delta.as_ref() {
        Some(delta) => (0..mva.classes())
            .map(|j| delta.map.address(c, Some(j)))
            .collect(),
        None => Vec::new(),
    }
}

/// `None` for `N` itself, then every class with customers.
fn sub_problems(population: &Population) -> Vec<(Option<usize>, Population)> {
    let mut out = vec![(None, population.clone())];
    for c in 0..population.classes() {
        if let Ok(n) = population.decremented(c) {
            out.push((Some(c), n));
        }
    }
    out
}

fn start(mva: &mut Mva) -> SolverResult<()> {
    mva.clear();
    remove_class(mva, None);
    mva.initialize()
}

/// Full Linearizer.
#[derive(Debug)]
pub struct Linearizer {
    mva: Mva,
}

impl Linearizer {
    pub fn new(network: Network, config: MvaConfig) -> SolverResult<Self> {
        Self::with_layout(network, config, false)
    }

    fn with_layout(network: Network, config: MvaConfig, fast: bool) -> SolverResult<Self> {
        Ok(Self {
            mva: Mva::new(network, Layout::Partial { fast }, config)?,
        })
    }

    fn run(&mut self) -> SolverResult<SolveStatus> {
        let mva = &mut self.mva;
        mva.reset_counters();
        let population = mva.population.clone();

        // A later solve starts from the previous fixed point.
        if !mva.initialized {
            start(mva)?;
            mva.estimate_l(&population)?;
            mva.estimate_p(&population)?;
        }

        for pass in 0..PASSES {
            for (c, n) in sub_problems(&population) {
                remove_class(mva, c);
                let saved = mva.save_slots(&neighbours(mva, c));
                // a sub-problem that runs out of iterations still improves D
                if !mva.core(&n)? {
                    debug!(pass, class = ?c, "sub-problem hit the iteration limit");
                }
                mva.restore_slots(saved);
            }
            remove_class(mva, None);
            mva.update_delta();
        }

        mva.converged = mva.core(&population)?;
        if !mva.converged {
            mva.fp.record();
        }
        Ok(mva.status())
    }
}

impl Solver for Linearizer {
    fn solve(&mut self) -> SolverResult<SolveStatus> {
        let status = self.run()?;
        debug!(solver = "linearizer", %status, "solved");
        Ok(status)
    }

    fn mva(&self) -> &Mva {
        &self.mva
    }

    fn mva_mut(&mut self) -> &mut Mva {
        &mut self.mva
    }

    fn kind(&self) -> SolverKind {
        SolverKind::Linearizer
    }
}

/// Linearizer with the per-station `S L` sums and `S N D` products cached, so each
/// wait costs `O(K)` instead of `O(K^2)`. Priority stations fall back to the full sums.
#[derive(Debug)]
pub struct FastLinearizer(Linearizer);

impl FastLinearizer {
    pub fn new(network: Network, config: MvaConfig) -> SolverResult<Self> {
        Ok(Self(Linearizer::with_layout(network, config, true)?))
    }
}

impl Solver for FastLinearizer {
    fn solve(&mut self) -> SolverResult<SolveStatus> {
        let status = self.0.run()?;
        debug!(solver = "fast-linearizer", %status, "solved");
        Ok(status)
    }

    fn mva(&self) -> &Mva {
        &self.0.mva
    }

    fn mva_mut(&mut self) -> &mut Mva {
        &mut self.0.mva
    }

    fn kind(&self) -> SolverKind {
        SolverKind::FastLinearizer
    }
}

/// One estimate-and-step per sub-problem, then one at `N`.
///
/// Meant to be called repeatedly by an outer iteration; the corrections carry
/// over between calls.
#[derive(Debug)]
pub struct OneStepLinearizer {
    mva: Mva,
}

impl OneStepLinearizer {
    pub fn new(network: Network, config: MvaConfig) -> SolverResult<Self> {
        Ok(Self {
            mva: Mva::new(network, Layout::Partial { fast: false }, config)?,
        })
    }
}

impl Solver for OneStepLinearizer {
    fn solve(&mut self) -> SolverResult<SolveStatus> {
        let mva = &mut self.mva;
        mva.reset_counters();
        let population = mva.population.clone();
        if !mva.initialized {
            start(mva)?;
        }

        for (c, n) in sub_problems(&population) {
            remove_class(mva, c);
            let saved = mva.save_slots(&neighbours(mva, c));
            mva.estimate_l(&n)?;
            mva.estimate_p(&n)?;
            mva.step(&n)?;
            mva.restore_slots(saved);
        }
        remove_class(mva, None);
        mva.update_delta();

        mva.estimate_l(&population)?;
        mva.estimate_p(&population)?;
        mva.step(&population)?;
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
        SolverKind::OneStepLinearizer
    }
}
