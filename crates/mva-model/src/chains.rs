//! Closed and open chains, and the dense class indices the solver uses.

use crate::{ModelError, ModelResult};
use mva_core::{ChainId, Real};
use mva_pop::Population;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChainKind {
    Closed {
        population: u32,
        #[serde(default)]
        think_time: Real,
    },
    Open {
        arrival_rate: Real,
    },
}

impl ChainKind {
    pub fn is_closed(&self) -> bool {
        matches!(self, ChainKind::Closed { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub name: String,
    pub kind: ChainKind,
    pub priority: u32,
    /// Dense index among the chains of the same kind
    pub index: usize,
}

/// Chains in insertion order. Closed chains become solver classes `0..K` and open
/// chains are numbered `0..K_open` separately; both indices never change once assigned.
#[derive(Debug, Clone, Default)]
pub struct ChainSet {
    chains: Vec<Chain>,
    closed: Vec<usize>,
    open: Vec<usize>,
}

impl ChainSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_closed_chain(
        &mut self,
        name: impl Into<String>,
        population: u32,
        think_time: Real,
    ) -> ModelResult<ChainId> {
        let name = name.into();
        if !think_time.is_finite() || think_time < 0.0 {
            return Err(ModelError::InvalidChain {
                name,
                reason: format!("think time {think_time} must be finite and non-negative"),
            });
        }
        let index = self.closed.len();
        let id = self.push(Chain {
            name,
            kind: ChainKind::Closed {
                population,
                think_time,
            },
            priority: 0,
            index,
        })?;
        self.closed.push(id.index());
        Ok(id)
    }

    pub fn add_open_chain(&mut self, name: impl Into<String>, arrival_rate: Real) -> ModelResult<ChainId> {
        let name = name.into();
        if !arrival_rate.is_finite() || arrival_rate < 0.0 {
            return Err(ModelError::InvalidChain {
                name,
                reason: format!("arrival rate {arrival_rate} must be finite and non-negative"),
            });
        }
        let index = self.open.len();
        let id = self.push(Chain {
            name,
            kind: ChainKind::Open { arrival_rate },
            priority: 0,
            index,
        })?;
        self.open.push(id.index());
        Ok(id)
    }

    fn push(&mut self, chain: Chain) -> ModelResult<ChainId> {
        if self.chain(&chain.name).is_some() {
            return Err(ModelError::InvalidChain {
                name: chain.name,
                reason: "duplicate chain name".to_string(),
            });
        }
        self.chains.push(chain);
        Ok(ChainId::from_index(self.chains.len() - 1))
    }

    /// Priorities order closed chains at HOL and PR stations; larger is served first.
    pub fn set_priority(&mut self, id: ChainId, priority: u32) -> ModelResult<()> {
        let chain = self
            .chains
            .get_mut(id.index())
            .ok_or_else(|| ModelError::UnknownChain {
                name: id.to_string(),
            })?;
        if !chain.kind.is_closed() && priority != 0 {
            return Err(ModelError::InvalidChain {
                name: chain.name.clone(),
                reason: "only closed chains carry a priority".to_string(),
            });
        }
        chain.priority = priority;
        Ok(())
    }

    pub fn get(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id.index())
    }

    pub fn chain(&self, name: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.name == name)
    }

    /// Solver class of the closed chain `name`.
    pub fn closed_index(&self, name: &str) -> Option<usize> {
        self.chain(name)
            .filter(|c| c.kind.is_closed())
            .map(|c| c.index)
    }

    pub fn open_index(&self, name: &str) -> Option<usize> {
        self.chain(name)
            .filter(|c| !c.kind.is_closed())
            .map(|c| c.index)
    }

    pub fn closed(&self) -> impl Iterator<Item = &Chain> {
        self.closed.iter().map(|&i| &self.chains[i])
    }

    pub fn open(&self) -> impl Iterator<Item = &Chain> {
        self.open.iter().map(|&i| &self.chains[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chain> {
        self.chains.iter()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn closed_count(&self) -> usize {
        self.closed.len()
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn population(&self) -> Population {
        Population::from(
            self.closed()
                .map(|c| match c.kind {
                    ChainKind::Closed { population, .. } => population,
                    ChainKind::Open { .. } => 0,
                })
                .collect::<Vec<u32>>(),
        )
    }

    pub fn think_times(&self) -> Vec<Real> {
        self.closed()
            .map(|c| match c.kind {
                ChainKind::Closed { think_time, .. } => think_time,
                ChainKind::Open { .. } => 0.0,
            })
            .collect()
    }

    pub fn priorities(&self) -> Vec<u32> {
        self.closed().map(|c| c.priority).collect()
    }
}
