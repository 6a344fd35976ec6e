//! The `Solver` trait and the solver selector.

use crate::config::MvaConfig;
use crate::error::{SolverError, SolverResult};
use crate::exact::ExactMva;
use crate::linearizer::{FastLinearizer, Linearizer, OneStepLinearizer};
use crate::mva::Mva;
use crate::network::Network;
use crate::schweitzer::{OneStepSchweitzer, Schweitzer};
use crate::status::SolveStatus;
use std::fmt;
use std::str::FromStr;

/// A closed-network MVA solver.
///
/// After `solve` the results are read through [`Solver::mva`], whether or not the
/// iteration converged.
pub trait Solver: fmt::Debug + Send {
    fn solve(&mut self) -> SolverResult<SolveStatus>;

    fn mva(&self) -> &Mva;

    fn mva_mut(&mut self) -> &mut Mva;

    fn kind(&self) -> SolverKind;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum SolverKind {
    Exact,
    Schweitzer,
    Linearizer,
    FastLinearizer,
    OneStep,
    OneStepLinearizer,
}

impl SolverKind {
    pub const ALL: [SolverKind; 6] = [
        SolverKind::Exact,
        SolverKind::Schweitzer,
        SolverKind::Linearizer,
        SolverKind::FastLinearizer,
        SolverKind::OneStep,
        SolverKind::OneStepLinearizer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SolverKind::Exact => "exact",
            SolverKind::Schweitzer => "schweitzer",
            SolverKind::Linearizer => "linearizer",
            SolverKind::FastLinearizer => "fast-linearizer",
            SolverKind::OneStep => "one-step",
            SolverKind::OneStepLinearizer => "one-step-linearizer",
        }
    }

    /// Build a solver of this kind over `network`.
    pub fn build(self, network: Network, config: MvaConfig) -> SolverResult<Box<dyn Solver>> {
        Ok(match self {
            SolverKind::Exact => Box::new(ExactMva::new(network, config)?),
            SolverKind::Schweitzer => Box::new(Schweitzer::new(network, config)?),
            SolverKind::Linearizer => Box::new(Linearizer::new(network, config)?),
            SolverKind::FastLinearizer => Box::new(FastLinearizer::new(network, config)?),
            SolverKind::OneStep => Box::new(OneStepSchweitzer::new(network, config)?),
            SolverKind::OneStepLinearizer => Box::new(OneStepLinearizer::new(network, config)?),
        })
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SolverKind {
    type Err = SolverError;

    fn from_str(s: &str) -> SolverResult<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        SolverKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| SolverError::ProblemSetup {
                what: format!("unknown solver '{s}'"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for kind in SolverKind::ALL {
            assert_eq!(kind.name().parse::<SolverKind>().unwrap(), kind);
        }
        assert_eq!(
            "Fast_Linearizer".parse::<SolverKind>().unwrap(),
            SolverKind::FastLinearizer
        );
        assert!("mol".parse::<SolverKind>().is_err());
    }
}
