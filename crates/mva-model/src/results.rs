//! Solution of a model, keyed by the model's names.

use crate::build::BuiltModel;
use crate::chains::ChainKind;
use mva_core::Real;
use mva_solver::{Mva, SolveStatus, SolverKind};
use mva_station::Station;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelResults {
    pub model: String,
    /// Absent when the model has no closed chains
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<SolverKind>,
    pub status: SolveStatus,
    #[serde(default)]
    pub chains: Vec<ChainRow>,
    #[serde(default)]
    pub open: Vec<OpenRow>,
    pub stations: Vec<StationRow>,
}

/// Closed chain totals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainRow {
    pub name: String,
    pub population: u32,
    pub think_time: Real,
    pub throughput: Real,
    pub response_time: Real,
}

/// Open chain totals. The response time is infinite when a visited station saturates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenRow {
    pub name: String,
    pub arrival_rate: Real,
    pub response_time: Real,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StationRow {
    pub name: String,
    pub kind: String,
    pub copies: u32,
    /// Closed-chain utilization
    pub utilization: Real,
    pub queue_length: Real,
    pub open_throughput: Real,
    pub open_utilization: Real,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<ClassRow>,
}

/// One closed chain at one station.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassRow {
    pub chain: String,
    pub throughput: Real,
    pub utilization: Real,
    pub queue_length: Real,
    pub residence_time: Real,
}

impl ModelResults {
    /// Results of a closed or mixed solve.
    pub fn from_mva(built: &BuiltModel, mva: &Mva, kind: SolverKind, status: SolveStatus) -> Self {
        let chains = built
            .chains
            .closed()
            .enumerate()
            .map(|(k, chain)| {
                let (population, think_time) = match chain.kind {
                    ChainKind::Closed {
                        population,
                        think_time,
                    } => (population, think_time),
                    ChainKind::Open { .. } => (0, 0.0),
                };
                ChainRow {
                    name: chain.name.clone(),
                    population,
                    think_time,
                    throughput: mva.throughput(k),
                    response_time: mva.response_time(k),
                }
            })
            .collect();

        let stations = mva
            .stations()
            .iter()
            .enumerate()
            .map(|(m, station)| {
                let mut row = station_row(station);
                row.utilization = mva.utilization(m);
                row.queue_length = mva.queue_length(m);
                row.classes = built
                    .chains
                    .closed()
                    .enumerate()
                    .filter(|&(k, _)| station.class_visits(k) > 0.0)
                    .map(|(k, chain)| ClassRow {
                        chain: chain.name.clone(),
                        throughput: mva.station_class_throughput(m, k),
                        utilization: mva.utilization_class(m, k),
                        queue_length: mva.queue_length_class(m, k),
                        residence_time: mva.residence_time(m, k),
                    })
                    .collect();
                row
            })
            .collect();

        Self {
            model: built.name.clone(),
            solver: Some(kind),
            status,
            chains,
            open: open_rows(built, mva.stations()),
            stations,
        }
    }

    /// Results of a model with open chains only.
    pub fn from_open(built: &BuiltModel, stations: &[Station]) -> Self {
        Self {
            model: built.name.clone(),
            solver: None,
            status: SolveStatus {
                converged: true,
                ..SolveStatus::default()
            },
            chains: Vec::new(),
            open: open_rows(built, stations),
            stations: stations.iter().map(station_row).collect(),
        }
    }

    pub fn chain(&self, name: &str) -> Option<&ChainRow> {
        self.chains.iter().find(|c| c.name == name)
    }

    pub fn open_chain(&self, name: &str) -> Option<&OpenRow> {
        self.open.iter().find(|c| c.name == name)
    }

    pub fn station(&self, name: &str) -> Option<&StationRow> {
        self.stations.iter().find(|s| s.name == name)
    }
}

fn station_row(station: &Station) -> StationRow {
    StationRow {
        name: station.name().to_string(),
        kind: station.kind().to_string(),
        copies: station.copies(),
        utilization: 0.0,
        queue_length: 0.0,
        open_throughput: station.open_throughput(),
        open_utilization: station.open_utilization(),
        classes: Vec::new(),
    }
}

/// Response time of open chain `c`: its visits times the open wait, summed over every entry.
fn open_rows(built: &BuiltModel, stations: &[Station]) -> Vec<OpenRow> {
    built
        .chains
        .open()
        .zip(&built.open_visits)
        .map(|(chain, visits)| {
            let arrival_rate = match chain.kind {
                ChainKind::Open { arrival_rate } => arrival_rate,
                ChainKind::Closed { .. } => 0.0,
            };
            let response_time = stations
                .iter()
                .zip(visits)
                .flat_map(|(station, v)| {
                    v.iter()
                        .enumerate()
                        .filter(|&(_, &v)| v > 0.0)
                        .map(move |(e, &v)| v * station.open_wait_time(e, 0))
                })
                .sum();
            OpenRow {
                name: chain.name.clone(),
                arrival_rate,
                response_time,
            }
        })
        .collect()
}
