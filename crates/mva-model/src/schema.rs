//! Model file schema.

use crate::chains::ChainKind;
use mva_core::Real;
use mva_solver::MvaConfig;
use mva_station::StationKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDef {
    pub name: String,
    #[serde(default)]
    pub solver: MvaConfig,
    #[serde(default)]
    pub chains: Vec<ChainDef>,
    #[serde(default)]
    pub stations: Vec<StationDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainDef {
    pub name: String,
    #[serde(flatten)]
    pub kind: ChainKind,
    #[serde(default)]
    pub priority: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StationDef {
    pub name: String,
    pub kind: StationKind,
    #[serde(default = "one")]
    pub copies: u32,
    #[serde(default = "one_phase")]
    pub phases: usize,
    pub entries: Vec<EntryDef>,
    /// Scaling of one chain's queue as seen by another chain's arrivals
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlap: Vec<OverlapDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryDef {
    pub name: String,
    #[serde(default)]
    pub demands: Vec<DemandDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interlock: Vec<InterlockDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overtaking: Vec<OvertakingDef>,
}

/// Service and visits of one chain at one phase of an entry.
///
/// For an open chain the visits are multiplied by the chain's arrival rate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DemandDef {
    pub chain: String,
    #[serde(default = "one_phase")]
    pub phase: usize,
    pub service: Real,
    #[serde(default = "one_visit")]
    pub visits: Real,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance: Option<Real>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterlockDef {
    pub chain: String,
    pub flow: Real,
}

/// Probability that a caller in phase `from_phase` finds its previous request in `to_phase`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OvertakingDef {
    pub chain: String,
    pub from_phase: usize,
    pub to_phase: usize,
    pub probability: Real,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlapDef {
    pub chain: String,
    pub seen_by: String,
    pub factor: Real,
}

fn one() -> u32 {
    1
}

fn one_phase() -> usize {
    1
}

fn one_visit() -> Real {
    1.0
}
