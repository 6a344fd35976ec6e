//! Population-specific error types.

use mva_core::MvaError;

pub type PopResult<T> = Result<T, PopError>;

/// Population construction and addressing errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopError {
    /// A class with no customers was decremented.
    EmptyClass { class: usize },

    /// A population exceeds the bound of the map that addresses it.
    OutOfBounds { class: usize, value: u32, bound: u32 },

    /// Population vectors of different lengths were combined.
    ClassCount { expected: usize, actual: usize },

    /// The Linearizer map only holds points at most two customers below its bound.
    NotInNeighbourhood { population: String },

    /// Class index beyond the population length.
    NoSuchClass { class: usize, classes: usize },

    /// The lattice `0 ..= N` has more points than fit in a `usize`.
    LatticeTooLarge { population: String },
}

impl std::fmt::Display for PopError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PopError::EmptyClass { class } => {
                write!(f, "Class {} has no customers to remove", class)
            }
            PopError::OutOfBounds {
                class,
                value,
                bound,
            } => {
                write!(
                    f,
                    "Class {} population {} exceeds bound {}",
                    class, value, bound
                )
            }
            PopError::ClassCount { expected, actual } => {
                write!(f, "Expected {} classes, got {}", expected, actual)
            }
            PopError::NotInNeighbourhood { population } => {
                write!(
                    f,
                    "Population {} is not addressable by the Linearizer map",
                    population
                )
            }
            PopError::NoSuchClass { class, classes } => {
                write!(f, "Class {} out of range ({} classes)", class, classes)
            }
            PopError::LatticeTooLarge { population } => {
                write!(f, "Population lattice of {} is too large to address", population)
            }
        }
    }
}

impl std::error::Error for PopError {}

impl From<PopError> for MvaError {
    fn from(err: PopError) -> Self {
        match err {
            PopError::NoSuchClass { class, classes } => MvaError::IndexOob {
                what: "class",
                index: class,
                len: classes,
            },
            other => MvaError::InvalidArg {
                what: other.to_string(),
            },
        }
    }
}
