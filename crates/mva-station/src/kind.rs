//! The closed set of station kinds.

use crate::error::{StationError, StationResult};
use std::fmt;
use std::str::FromStr;

/// Scheduling and service model of a station.
///
/// `Hol*` kinds serve classes in head-of-line priority order, `Pr*` kinds
/// preempt lower priorities. `*Phased*` kinds split service into a visible
/// first phase and a second phase that may overlap the next request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum StationKind {
    Infinite,
    Client,

    Ps,
    HolPs,
    PrPs,
    Fcfs,
    HolFcfs,
    PrFcfs,
    Hvfcfs,
    HolHvfcfs,
    PrHvfcfs,

    Reiser,
    ReiserPs,
    PhasedReiser,
    MarkovPhasedReiser,
    Conway,
    PhasedConway,
    MarkovPhasedConway,
    Rolia,
    RoliaPs,
    PhasedRolia,
    MarkovPhasedRolia,
    PhasedRoliaPs,
    MarkovPhasedRoliaPs,
    Bruell,
    Schmidt,
    Suri,

    RoliaPhased,
    HolRoliaPhased,
    PrRoliaPhased,
    HvfcfsRoliaPhased,
    HolHvfcfsRoliaPhased,
    PrHvfcfsRoliaPhased,
    SimplePhased,
    HolSimplePhased,
    PrSimplePhased,
    HvfcfsSimplePhased,
    HolHvfcfsSimplePhased,
    PrHvfcfsSimplePhased,
    MarkovPhased,
    HolMarkovPhased,
    PrMarkovPhased,
    HvfcfsMarkovPhased,
    HolHvfcfsMarkovPhased,
    PrHvfcfsMarkovPhased,
}

/// How a station's marginal queue-length probabilities are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marginals {
    None,
    /// `P(j)` for `j = 0 ..= J` customers.
    Scalar,
    /// One probability per population vector of the lattice.
    Vector,
}

impl StationKind {
    pub const ALL: [StationKind; 45] = [
        StationKind::Infinite,
        StationKind::Client,
        StationKind::Ps,
        StationKind::HolPs,
        StationKind::PrPs,
        StationKind::Fcfs,
        StationKind::HolFcfs,
        StationKind::PrFcfs,
        StationKind::Hvfcfs,
        StationKind::HolHvfcfs,
        StationKind::PrHvfcfs,
        StationKind::Reiser,
        StationKind::ReiserPs,
        StationKind::PhasedReiser,
        StationKind::MarkovPhasedReiser,
        StationKind::Conway,
        StationKind::PhasedConway,
        StationKind::MarkovPhasedConway,
        StationKind::Rolia,
        StationKind::RoliaPs,
        StationKind::PhasedRolia,
        StationKind::MarkovPhasedRolia,
        StationKind::PhasedRoliaPs,
        StationKind::MarkovPhasedRoliaPs,
        StationKind::Bruell,
        StationKind::Schmidt,
        StationKind::Suri,
        StationKind::RoliaPhased,
        StationKind::HolRoliaPhased,
        StationKind::PrRoliaPhased,
        StationKind::HvfcfsRoliaPhased,
        StationKind::HolHvfcfsRoliaPhased,
        StationKind::PrHvfcfsRoliaPhased,
        StationKind::SimplePhased,
        StationKind::HolSimplePhased,
        StationKind::PrSimplePhased,
        StationKind::HvfcfsSimplePhased,
        StationKind::HolHvfcfsSimplePhased,
        StationKind::PrHvfcfsSimplePhased,
        StationKind::MarkovPhased,
        StationKind::HolMarkovPhased,
        StationKind::PrMarkovPhased,
        StationKind::HvfcfsMarkovPhased,
        StationKind::HolHvfcfsMarkovPhased,
        StationKind::PrHvfcfsMarkovPhased,
    ];

    pub fn name(self) -> &'static str {
        use StationKind::*;
        match self {
            Infinite => "infinite",
            Client => "client",
            Ps => "ps",
            HolPs => "hol-ps",
            PrPs => "pr-ps",
            Fcfs => "fcfs",
            HolFcfs => "hol-fcfs",
            PrFcfs => "pr-fcfs",
            Hvfcfs => "hvfcfs",
            HolHvfcfs => "hol-hvfcfs",
            PrHvfcfs => "pr-hvfcfs",
            Reiser => "reiser",
            ReiserPs => "reiser-ps",
            PhasedReiser => "phased-reiser",
            MarkovPhasedReiser => "markov-phased-reiser",
            Conway => "conway",
            PhasedConway => "phased-conway",
            MarkovPhasedConway => "markov-phased-conway",
            Rolia => "rolia",
            RoliaPs => "rolia-ps",
            PhasedRolia => "phased-rolia",
            MarkovPhasedRolia => "markov-phased-rolia",
            PhasedRoliaPs => "phased-rolia-ps",
            MarkovPhasedRoliaPs => "markov-phased-rolia-ps",
            Bruell => "bruell",
            Schmidt => "schmidt",
            Suri => "suri",
            RoliaPhased => "rolia-phased",
            HolRoliaPhased => "hol-rolia-phased",
            PrRoliaPhased => "pr-rolia-phased",
            HvfcfsRoliaPhased => "hvfcfs-rolia-phased",
            HolHvfcfsRoliaPhased => "hol-hvfcfs-rolia-phased",
            PrHvfcfsRoliaPhased => "pr-hvfcfs-rolia-phased",
            SimplePhased => "simple-phased",
            HolSimplePhased => "hol-simple-phased",
            PrSimplePhased => "pr-simple-phased",
            HvfcfsSimplePhased => "hvfcfs-simple-phased",
            HolHvfcfsSimplePhased => "hol-hvfcfs-simple-phased",
            PrHvfcfsSimplePhased => "pr-hvfcfs-simple-phased",
            MarkovPhased => "markov-phased",
            HolMarkovPhased => "hol-markov-phased",
            PrMarkovPhased => "pr-markov-phased",
            HvfcfsMarkovPhased => "hvfcfs-markov-phased",
            HolHvfcfsMarkovPhased => "hol-hvfcfs-markov-phased",
            PrHvfcfsMarkovPhased => "pr-hvfcfs-markov-phased",
        }
    }

    /// Delay-type stations: no queueing, infinite capacity.
    pub fn is_delay(self) -> bool {
        matches!(self, StationKind::Infinite | StationKind::Client)
    }

    /// Head-of-line priority scheduling.
    pub fn is_hol(self) -> bool {
        use StationKind::*;
        matches!(
            self,
            HolPs
                | HolFcfs
                | HolHvfcfs
                | HolRoliaPhased
                | HolHvfcfsRoliaPhased
                | HolSimplePhased
                | HolHvfcfsSimplePhased
                | HolMarkovPhased
                | HolHvfcfsMarkovPhased
        )
    }

    /// Preemptive-resume priority scheduling.
    pub fn is_preemptive(self) -> bool {
        use StationKind::*;
        matches!(
            self,
            PrPs | PrFcfs
                | PrHvfcfs
                | PrRoliaPhased
                | PrHvfcfsRoliaPhased
                | PrSimplePhased
                | PrHvfcfsSimplePhased
                | PrMarkovPhased
                | PrHvfcfsMarkovPhased
        )
    }

    /// Lower priority classes are hidden from higher ones at this station.
    pub fn is_priority(self) -> bool {
        self.is_hol() || self.is_preemptive()
    }

    /// Residual service uses the service-time variance.
    pub fn is_high_variance(self) -> bool {
        use StationKind::*;
        matches!(
            self,
            Hvfcfs
                | HolHvfcfs
                | PrHvfcfs
                | HvfcfsRoliaPhased
                | HolHvfcfsRoliaPhased
                | PrHvfcfsRoliaPhased
                | HvfcfsSimplePhased
                | HolHvfcfsSimplePhased
                | PrHvfcfsSimplePhased
                | HvfcfsMarkovPhased
                | HolHvfcfsMarkovPhased
                | PrHvfcfsMarkovPhased
        )
    }

    /// Stations with `J` identical servers.
    pub fn is_multi_server(self) -> bool {
        use StationKind::*;
        matches!(
            self,
            Reiser
                | ReiserPs
                | PhasedReiser
                | MarkovPhasedReiser
                | Conway
                | PhasedConway
                | MarkovPhasedConway
                | Rolia
                | RoliaPs
                | PhasedRolia
                | MarkovPhasedRolia
                | PhasedRoliaPs
                | MarkovPhasedRoliaPs
                | Bruell
                | Schmidt
                | Suri
        )
    }

    pub fn is_reiser(self) -> bool {
        use StationKind::*;
        matches!(self, Reiser | ReiserPs | PhasedReiser | MarkovPhasedReiser)
    }

    pub fn is_conway(self) -> bool {
        use StationKind::*;
        matches!(self, Conway | PhasedConway | MarkovPhasedConway)
    }

    pub fn is_rolia(self) -> bool {
        use StationKind::*;
        matches!(
            self,
            Rolia | RoliaPs | PhasedRolia | MarkovPhasedRolia | PhasedRoliaPs | MarkovPhasedRoliaPs
        )
    }

    /// Overtaking probabilities `prOt` drive the second-phase terms.
    pub fn is_markov(self) -> bool {
        use StationKind::*;
        matches!(
            self,
            MarkovPhasedReiser
                | MarkovPhasedConway
                | MarkovPhasedRolia
                | MarkovPhasedRoliaPs
                | MarkovPhased
                | HolMarkovPhased
                | PrMarkovPhased
                | HvfcfsMarkovPhased
                | HolHvfcfsMarkovPhased
                | PrHvfcfsMarkovPhased
        )
    }

    /// Overtaking probability `Gamma` is recomputed at the start of every step.
    pub fn uses_gamma(self) -> bool {
        use StationKind::*;
        matches!(
            self,
            RoliaPhased
                | HolRoliaPhased
                | PrRoliaPhased
                | HvfcfsRoliaPhased
                | HolHvfcfsRoliaPhased
                | PrHvfcfsRoliaPhased
                | SimplePhased
                | HolSimplePhased
                | PrSimplePhased
                | HvfcfsSimplePhased
                | HolHvfcfsSimplePhased
                | PrHvfcfsSimplePhased
        )
    }

    /// Gamma kinds that also carry the second-phase utilization correction.
    pub fn is_simple_phased(self) -> bool {
        use StationKind::*;
        matches!(
            self,
            SimplePhased
                | HolSimplePhased
                | PrSimplePhased
                | HvfcfsSimplePhased
                | HolHvfcfsSimplePhased
                | PrHvfcfsSimplePhased
        )
    }

    /// Single-server phased kinds (open waits use the M/G+G/1 form).
    pub fn is_phased_server(self) -> bool {
        use StationKind::*;
        self.uses_gamma()
            || matches!(
                self,
                MarkovPhased
                    | HolMarkovPhased
                    | PrMarkovPhased
                    | HvfcfsMarkovPhased
                    | HolHvfcfsMarkovPhased
                    | PrHvfcfsMarkovPhased
            )
    }

    /// The FCFS family whose sums accept the tau overlap correction.
    pub fn has_tau(self) -> bool {
        use StationKind::*;
        matches!(
            self,
            Fcfs | HolFcfs | PrFcfs | Hvfcfs | HolHvfcfs | PrHvfcfs
        )
    }

    pub fn marginals(self) -> Marginals {
        use StationKind::*;
        if self.is_reiser() || self.is_conway() {
            Marginals::Scalar
        } else if matches!(self, Bruell | Schmidt) {
            Marginals::Vector
        } else {
            Marginals::None
        }
    }
}

impl fmt::Display for StationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StationKind {
    type Err = StationError;

    fn from_str(s: &str) -> StationResult<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        StationKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| StationError::Unsupported {
                what: format!("station kind '{s}'"),
            })
    }
}
