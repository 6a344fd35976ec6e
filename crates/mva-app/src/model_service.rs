//! Model loading, validation and introspection.

use mva_model::{ChainKind, ModelDef, ModelError};
use serde::Serialize;
use std::path::Path;

use crate::error::{AppError, AppResult};

/// One chain as listed by front ends.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChainSummary {
    pub name: String,
    pub kind: &'static str,
    /// Solver class for closed chains, open index otherwise
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_rate: Option<f64>,
    pub priority: u32,
    /// Stations with at least one demand from this chain
    pub stations: Vec<String>,
}

/// Load and validate a YAML or JSON model.
pub fn load_model(path: &Path) -> AppResult<ModelDef> {
    mva_model::load_model(path).map_err(|e| match e {
        ModelError::Io(source) => AppError::ModelFileRead {
            path: path.to_path_buf(),
            source,
        },
        other => other.into(),
    })
}

pub fn validate_model(model: &ModelDef) -> AppResult<()> {
    mva_model::validate_model(model).map_err(|e| AppError::Validation(e.to_string()))
}

pub fn list_chains(model: &ModelDef) -> Vec<ChainSummary> {
    let (mut closed, mut open) = (0, 0);
    model
        .chains
        .iter()
        .map(|chain| {
            let stations = model
                .stations
                .iter()
                .filter(|s| {
                    s.entries
                        .iter()
                        .flat_map(|e| &e.demands)
                        .any(|d| d.chain == chain.name)
                })
                .map(|s| s.name.clone())
                .collect();
            let mut summary = ChainSummary {
                name: chain.name.clone(),
                kind: "closed",
                index: 0,
                population: None,
                think_time: None,
                arrival_rate: None,
                priority: chain.priority,
                stations,
            };
            match chain.kind {
                ChainKind::Closed {
                    population,
                    think_time,
                } => {
                    summary.index = closed;
                    summary.population = Some(population);
                    summary.think_time = Some(think_time);
                    closed += 1;
                }
                ChainKind::Open { arrival_rate } => {
                    summary.kind = "open";
                    summary.index = open;
                    summary.arrival_rate = Some(arrival_rate);
                    open += 1;
                }
            }
            summary
        })
        .collect()
}
