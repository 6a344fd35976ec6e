//! Error types for solver operations.

use mva_core::MvaError;
use mva_pop::PopError;
use mva_station::StationError;
use thiserror::Error;

/// Errors that can occur while setting up or running a solve.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Station {station}: {source}")]
    Station {
        station: usize,
        #[source]
        source: StationError,
    },

    #[error("Population error: {0}")]
    Population(#[from] PopError),

    #[error("Floating point fault in {what} at step {step}")]
    FloatingPoint { what: String, step: usize },

    #[error("Open model overflow at station {station}")]
    Overflow { station: usize },

    #[error("Index out of range: {what} {index} (limit {limit})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        limit: usize,
    },
}

pub type SolverResult<T> = Result<T, SolverError>;

impl SolverError {
    pub(crate) fn station(station: usize) -> impl FnOnce(StationError) -> SolverError {
        move |source| SolverError::Station { station, source }
    }
}

impl From<SolverError> for MvaError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::ProblemSetup { what } => MvaError::InvalidArg { what },
            SolverError::Station { source, .. } => source.into(),
            SolverError::Population(p) => p.into(),
            SolverError::FloatingPoint { what, step } => MvaError::Invariant {
                what: format!("floating point fault in {what} at step {step}"),
            },
            SolverError::Overflow { station } => MvaError::InvalidArg {
                what: format!("open model overflow at station {station}"),
            },
            SolverError::OutOfRange { what, index, limit } => MvaError::IndexOob {
                what,
                index,
                len: limit,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SolverError::Station {
            station: 2,
            source: StationError::Range { what: "alpha" },
        };
        assert_eq!(err.to_string(), "Station 2: Range error in alpha");
    }

    #[test]
    fn error_conversion() {
        let err = SolverError::Station {
            station: 0,
            source: StationError::Unsupported {
                what: "open waits".into(),
            },
        };
        assert!(matches!(MvaError::from(err), MvaError::NotSupported { .. }));

        let err = SolverError::FloatingPoint {
            what: "throughput".into(),
            step: 3,
        };
        assert!(matches!(MvaError::from(err), MvaError::Invariant { .. }));
    }
}
