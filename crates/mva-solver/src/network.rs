//! Closed network handed to a solver.

use crate::error::{SolverError, SolverResult};
use mva_core::Real;
use mva_pop::Population;
use mva_station::Station;

/// Stations plus the per-chain population, think times and priorities.
#[derive(Clone, Debug)]
pub struct Network {
    pub stations: Vec<Station>,
    pub population: Population,
    pub think_times: Vec<Real>,
    /// Larger value means higher priority
    pub priorities: Vec<u32>,
}

impl Network {
    /// Network with zero think time and equal priority for every chain.
    pub fn new(stations: Vec<Station>, population: Population) -> Self {
        let classes = population.classes();
        Self {
            stations,
            population,
            think_times: vec![0.0; classes],
            priorities: vec![0; classes],
        }
    }

    pub fn with_think_times(mut self, think_times: Vec<Real>) -> Self {
        self.think_times = think_times;
        self
    }

    pub fn with_priorities(mut self, priorities: Vec<u32>) -> Self {
        self.priorities = priorities;
        self
    }

    pub fn classes(&self) -> usize {
        self.population.classes()
    }

    /// Check that every per-chain vector and every station agree on the chain count.
    pub fn validate(&self) -> SolverResult<()> {
        let classes = self.classes();
        if self.think_times.len() != classes {
            return Err(SolverError::ProblemSetup {
                what: format!(
                    "{} think times for {} chains",
                    self.think_times.len(),
                    classes
                ),
            });
        }
        if self.priorities.len() != classes {
            return Err(SolverError::ProblemSetup {
                what: format!(
                    "{} priorities for {} chains",
                    self.priorities.len(),
                    classes
                ),
            });
        }
        if let Some((k, z)) = self
            .think_times
            .iter()
            .enumerate()
            .find(|(_, z)| !z.is_finite() || **z < 0.0)
        {
            return Err(SolverError::ProblemSetup {
                what: format!("think time {z} for chain {k}"),
            });
        }
        for (m, station) in self.stations.iter().enumerate() {
            if station.classes() != classes {
                return Err(SolverError::ProblemSetup {
                    what: format!(
                        "station {m} ({}) has {} chains, expected {}",
                        station.name(),
                        station.classes(),
                        classes
                    ),
                });
            }
        }
        Ok(())
    }
}
