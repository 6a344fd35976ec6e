//! The view of solver state that the waiting-time formulas read.
//!
//! A context is bound to one station. Every `sum_*` quantity is taken over the
//! results at the sub-population `N - e_j` and returns 0 when `N_j` is zero. The
//! solver applies the priority filter and overlap scaling before handing the value
//! back, so the formulas only see the final sums.

use crate::error::StationResult;
use mva_core::Real;
use mva_pop::Population;

/// Correction for a customer that finds a server still busy in its second phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Phase2Correction {
    /// Weight the phase-2 residual by the chance the phase is not overtaken.
    Simple,
    /// Use the full utilization-weighted overtaking expression.
    #[default]
    Complex,
}

pub trait QueueContext {
    /// Underrelaxation weight for filtered (Rolia) waits.
    fn filter(&self) -> Real;

    fn phase2(&self) -> Phase2Correction;

    /// `sum_k L(N - e_j)`.
    fn sum_l(&self, n: &Population, j: usize) -> StationResult<Real>;

    /// `sum_k S(k) L(N - e_j)`.
    fn sum_sl(&self, n: &Population, j: usize) -> StationResult<Real>;

    /// `sum_k S(k) (L - U)(N - e_j)`, queued customers only.
    fn sum_sq(&self, n: &Population, j: usize) -> StationResult<Real>;

    /// `sum_k S(k) U(N - e_j)`; at priority stations only over classes of
    /// strictly lower priority than `j`.
    fn sum_su(&self, n: &Population, j: usize) -> StationResult<Real>;

    /// `sum_k r(k) U(N - e_j)` with the residual service of each class.
    fn sum_ru(&self, n: &Population, j: usize) -> StationResult<Real>;

    /// `sum_k S_2(e,k) U(N - e_j)` for one entry.
    fn sum_s2u_entry(&self, e: usize, n: &Population, j: usize) -> StationResult<Real>;

    /// Total utilization at `N - e_j`.
    fn sum_u(&self, n: &Population, j: usize) -> StationResult<Real>;

    /// `sum_k sum_e U(N - e_j) S_2/S`, second-phase busy time.
    fn sum_u2(&self, n: &Population, j: usize) -> StationResult<Real>;

    /// Phase-2 residual weighted by the chance `prot` of being overtaken.
    fn sum_us_prot(&self, e: usize, prot: Real, n: &Population, j: usize)
    -> StationResult<Real>;

    /// `sum_{i < J-1} (J - 1 - i) P_i(N - e_j)`.
    fn sum_p(&self, n: &Population, j: usize) -> StationResult<Real>;

    /// Bruell/Schmidt busy-server term over the vector marginals.
    fn sum_sp2(&self, n: &Population, j: usize) -> StationResult<Real>;

    /// Probability that every server is busy at `N - e_j`.
    fn pb(&self, n: &Population, j: usize) -> StationResult<Real>;

    /// Utilization of higher priority classes seen by class `j`.
    fn priority_inflation(&self, n: &Population, j: usize) -> StationResult<Real>;

    /// Class `i` share of the utilization at `N - e_j`.
    fn utilization_fraction(&self, i: usize, n: &Population, j: usize) -> StationResult<Real>;

    /// Total utilization at `N`.
    fn utilization(&self, n: &Population) -> StationResult<Real>;

    /// Class `i` customers waiting (not in service) at `N - e_j`.
    fn queue_only(&self, i: usize, n: &Population, j: usize) -> StationResult<Real>;

    /// Total queue length at `N`.
    fn queue_length(&self, n: &Population) -> StationResult<Real>;

    /// Chain throughput `X_k(N)`.
    fn throughput(&self, n: &Population, k: usize) -> StationResult<Real>;

    /// Think time plus the residence time of class `k` at every other station.
    fn response_time_excluding(&self, k: usize) -> Real;

    /// Marginal probabilities at `N`.
    fn marginals(&self, n: &Population) -> StationResult<Vec<Real>>;
}
