//! Error types for station parameters and waiting-time evaluation.

use mva_core::MvaError;
use mva_pop::PopError;
use thiserror::Error;

/// Errors raised by station setters and the per-kind formulas.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StationError {
    #[error("Negative value for {what}: {value}")]
    Negative { what: &'static str, value: f64 },

    #[error("Non-finite value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("{what} index {index} out of range (limit {limit})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        limit: usize,
    },

    #[error("Not supported: {what}")]
    Unsupported { what: String },

    #[error("Queue lengths at population {population} have not been computed")]
    NotSolved { population: String },

    #[error("Range error in {what}")]
    Range { what: &'static str },

    #[error(transparent)]
    Population(#[from] PopError),
}

pub type StationResult<T> = Result<T, StationError>;

impl StationError {
    pub fn unsupported(kind: impl std::fmt::Display, what: &str) -> Self {
        StationError::Unsupported {
            what: format!("{what} for {kind} stations"),
        }
    }
}

impl From<StationError> for MvaError {
    fn from(e: StationError) -> Self {
        match e {
            StationError::Negative { what, value } => MvaError::Negative { what, value },
            StationError::NonFinite { what, value } => MvaError::NonFinite { what, value },
            StationError::OutOfRange { what, index, limit } => MvaError::IndexOob {
                what,
                index,
                len: limit,
            },
            StationError::Unsupported { what } => MvaError::NotSupported { what },
            StationError::NotSolved { population } => MvaError::NotSolved { what: population },
            StationError::Range { what } => MvaError::InvalidArg {
                what: format!("range error in {what}"),
            },
            StationError::Population(p) => p.into(),
        }
    }
}
