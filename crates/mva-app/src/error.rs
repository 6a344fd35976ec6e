//! Error types for the mva-app service layer.

use std::path::PathBuf;

/// Unified error for the command line and any other front end.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Model error: {0}")]
    Model(String),

    #[error("Failed to read model file: {path}")]
    ModelFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Model validation failed: {0}")]
    Validation(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<mva_model::ModelError> for AppError {
    fn from(err: mva_model::ModelError) -> Self {
        match err {
            mva_model::ModelError::Validation(e) => AppError::Validation(e.to_string()),
            mva_model::ModelError::Solver(e) => AppError::Solver(e.to_string()),
            other => AppError::Model(other.to_string()),
        }
    }
}

impl From<mva_solver::SolverError> for AppError {
    fn from(err: mva_solver::SolverError) -> Self {
        AppError::Solver(err.to_string())
    }
}

impl From<mva_results::ResultsError> for AppError {
    fn from(err: mva_results::ResultsError) -> Self {
        match err {
            mva_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
