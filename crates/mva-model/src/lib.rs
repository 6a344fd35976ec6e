//! mva-model: model file format, chain bookkeeping and network construction.
//!
//! A model names its closed and open chains and its stations; `build` turns it
//! into the dense `Network` the solvers consume, and `results` collects what a
//! solve produced back under the model's names.

pub mod build;
pub mod chains;
pub mod results;
pub mod schema;
pub mod validate;

pub use build::{BuiltModel, build_model};
pub use chains::{Chain, ChainKind, ChainSet};
pub use results::{ChainRow, ClassRow, ModelResults, OpenRow, StationRow};
pub use schema::*;
pub use validate::{ValidationError, validate_model};

use mva_solver::SolverError;
use mva_station::StationError;
use std::path::Path;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid chain '{name}': {reason}")]
    InvalidChain { name: String, reason: String },

    #[error("Unknown chain: {name}")]
    UnknownChain { name: String },

    #[error("Station '{station}': {source}")]
    Station {
        station: String,
        #[source]
        source: StationError,
    },

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Unsupported model file extension: {0}")]
    Extension(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &Path) -> ModelResult<ModelDef> {
    let content = std::fs::read_to_string(path)?;
    let model: ModelDef = serde_yaml::from_str(&content)?;
    validate_model(&model)?;
    Ok(model)
}

pub fn save_yaml(path: &Path, model: &ModelDef) -> ModelResult<()> {
    validate_model(model)?;
    let content = serde_yaml::to_string(model)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ModelResult<ModelDef> {
    let content = std::fs::read_to_string(path)?;
    let model: ModelDef = serde_json::from_str(&content)?;
    validate_model(&model)?;
    Ok(model)
}

pub fn save_json(path: &Path, model: &ModelDef) -> ModelResult<()> {
    validate_model(model)?;
    let content = serde_json::to_string_pretty(model)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load a model as YAML or JSON depending on the file extension.
pub fn load_model(path: &Path) -> ModelResult<ModelDef> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => load_yaml(path),
        Some("json") => load_json(path),
        other => Err(ModelError::Extension(other.unwrap_or("").to_string())),
    }
}
