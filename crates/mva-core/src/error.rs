use thiserror::Error;

pub type MvaResult<T> = Result<T, MvaError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MvaError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Negative value for {what}: {value}")]
    Negative { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Population not solved: {what}")]
    NotSolved { what: String },

    #[error("Not supported: {what}")]
    NotSupported { what: String },

    #[error("Invariant violated: {what}")]
    Invariant { what: String },
}
