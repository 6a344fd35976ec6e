//! Open-class waiting times, alone and mixed with closed classes.
//!
//! Open arrivals at a station are described by the per-entry open visits
//! `V(e,0)` (arrival rate times visits) and open service `S(e,0)`.

use crate::context::QueueContext;
use crate::error::{StationError, StationResult};
use crate::kind::StationKind;
use crate::station::{MAX_PHASES, PhaseVec, Station};
use mva_core::{Real, square};
use mva_pop::Population;

/// Open waits for every entry with open arrivals.
pub type OpenWaits = Vec<(usize, PhaseVec)>;

impl Station {
    /// Open waits when the station has no closed customers.
    pub fn open_wait(&self) -> StationResult<OpenWaits> {
        use StationKind::*;
        let kind = self.kind();
        if kind.is_priority() {
            return Err(StationError::unsupported(kind, "open waits"));
        }
        let rho = self.stable_open_load("open wait")?;
        let waits = match kind {
            Infinite | Client => self.open_fill(|e, p| {
                if p == 0 {
                    self.open_service(e)
                } else {
                    self.open_phase_service(e, 1)
                }
            }),
            Ps => self.open_fill(|e, _| self.open_service(e) / (1.0 - rho)),
            Fcfs => {
                let w = self.mean_open_service() / (1.0 - rho);
                self.open_fill(|_, _| w)
            }
            Hvfcfs => self.open_fill(|e, _| self.open_service(e) + self.mg1(e)),
            Suri => return Err(StationError::unsupported(kind, "open waits")),
            kind if kind.is_multi_server() => {
                let w = self.erlang_c_wait();
                self.open_fill(|_, _| w)
            }
            _ => {
                let backlog: Real = (0..self.entries())
                    .map(|e| self.open_visits(e) * square(self.open_service(e)))
                    .sum::<Real>()
                    / (2.0 * (1.0 - rho));
                self.open_fill(|e, _| self.open_phase_service(e, 1) + backlog)
            }
        };
        Ok(waits)
    }

    /// Open waits inflated by the closed customers present at population `n`.
    pub fn mixed_wait(&self, ctx: &dyn QueueContext, n: &Population) -> StationResult<OpenWaits> {
        let kind = self.kind();
        if kind.is_delay() {
            return self.open_wait();
        }
        if kind.is_reiser() || kind.is_conway() {
            let waits = self.open_wait()?;
            let visits = self.total_open_visits();
            let queue = self.open_demand() * self.sum_of_alpha_p(ctx, n)?;
            return Ok(waits
                .into_iter()
                .map(|(e, mut w)| {
                    w[0] = queue / visits;
                    (e, w)
                })
                .collect());
        }
        if kind.is_multi_server() {
            return Err(StationError::unsupported(kind, "mixed waits"));
        }
        let queue = 1.0 + ctx.queue_length(n)?;
        Ok(self
            .open_wait()?
            .into_iter()
            .map(|(e, mut w)| {
                w[0] *= queue;
                (e, w)
            })
            .collect())
    }

    /// Factor relating the open-loaded station to its closed equivalent at `n` customers.
    pub fn alpha(&self, n: usize) -> StationResult<Real> {
        if self.kind().is_delay() {
            return Ok(self.open_demand().exp());
        }
        if self.kind().is_multi_server() {
            return self.reiser_alpha(n);
        }
        self.base_alpha(n)
    }

    fn base_alpha(&self, n: usize) -> StationResult<Real> {
        let rho = self.stable_open_load("alpha")?;
        Ok(1.0 / (1.0 - rho).powi(n as i32 + 1))
    }

    fn reiser_alpha(&self, n: usize) -> StationResult<Real> {
        let j = self.copies() as usize;
        let rho = self.stable_open_load("multi-server alpha")?;
        if n + 1 < j {
            let mu_j1 = self.capacity_at(j - 1);
            Ok(self.capacity() / (mu_j1 * (1.0 - rho).powi(n as i32 + 1)) + self.sum_of_rho(n))
        } else {
            self.base_alpha(n)
        }
    }

    fn sum_of_rho(&self, n: usize) -> Real {
        let j = self.copies() as usize;
        let demand = self.open_demand();
        let mu = self.capacity();
        let mu_j1 = self.capacity_at(j - 1);
        let mut sum = 0.0;
        for i in 0..=(j - 2) {
            let product: Real = ((n + 1)..=(n + i)).map(|h| self.capacity_at(h)).product();
            let diff = 1.0 / product - 1.0 / (mu_j1 * mu.powi(i as i32 - 1));
            sum += self.factorials().binomial(n + i, i) * demand.powi(i as i32) * diff;
        }
        sum
    }

    /// `sum_j (j+1) alpha(j+1) / (mu(j+1) alpha(j)) P_j(N)`.
    fn sum_of_alpha_p(&self, ctx: &dyn QueueContext, n: &Population) -> StationResult<Real> {
        let j = self.copies() as usize;
        if j < 2 {
            return Ok(0.0);
        }
        let marginals = ctx.marginals(n)?;
        let mut sum = 0.0;
        for (i, p) in marginals.iter().enumerate().take(j + 1) {
            let next = (i + 1) as Real * self.alpha(i + 1)?;
            sum += next / (self.capacity_at(i + 1) * self.alpha(i)?) * p;
        }
        Ok(sum)
    }

    /// Open load per server, or [`StationError::Range`] once the open
    /// arrivals alone saturate the station. Delay stations never saturate.
    fn stable_open_load(&self, what: &'static str) -> StationResult<Real> {
        let rho = self.open_load();
        if rho < 1.0 {
            Ok(rho)
        } else {
            Err(StationError::Range { what })
        }
    }

    /// Erlang-C waiting time of the multi-server; the load is below one.
    fn erlang_c_wait(&self) -> Real {
        let rho = self.open_load();
        let j = self.copies();
        let s = self.mean_open_service();
        let a = self.erlang_a();
        if j < 50 {
            let num = rho * (j as Real * rho).powi(j as i32 - 1);
            let den = self.factorials().factorial(j as usize) * a * square(1.0 - rho);
            s * (1.0 + num / den)
        } else {
            let num = rho.ln() + (j as Real * rho).ln() * (j as Real - 1.0);
            let den = self.factorials().log_factorial(j as usize) + (a * square(1.0 - rho)).ln();
            s * (1.0 + (num - den).exp())
        }
    }

    /// Normalising sum of the M/M/J state probabilities.
    fn erlang_a(&self) -> Real {
        let j = self.copies();
        let rho = self.open_load();
        let rho_j = j as Real * rho;
        let mut product = 1.0;
        let mut sum = 1.0;
        for i in 1..j {
            product *= rho_j / i as Real;
            sum += product;
        }
        if 1.0 - rho > 0.0 {
            sum += product * rho_j / (j as Real * (1.0 - rho));
        }
        sum
    }

    /// M/G/1 queueing delay using the open service variance of entry `e`.
    fn mg1(&self, e: usize) -> Real {
        let s = self.mean_open_service();
        if s == 0.0 {
            return 0.0;
        }
        let rho = self.open_load();
        rho * (s + self.open_variance(e) / s) / (2.0 * (1.0 - rho))
    }

    fn open_fill(&self, mut f: impl FnMut(usize, usize) -> Real) -> OpenWaits {
        (0..self.entries())
            .filter(|&e| self.open_visits(e) != 0.0)
            .map(|e| {
                let mut w = [0.0; MAX_PHASES + 1];
                for (p, slot) in w.iter_mut().enumerate() {
                    *slot = f(e, p);
                }
                (e, w)
            })
            .collect()
    }

    /// Open throughput of entry `e`, capped when the station is saturated.
    pub fn open_entry_throughput(&self, e: usize) -> Real {
        let v = self.open_visits(e);
        let demand = self.open_demand();
        let mu = self.capacity();
        if v == 0.0 || demand < mu {
            v
        } else if !mu.is_finite() && !self.open_service(e).is_finite() {
            v
        } else {
            v * mu / demand
        }
    }

    pub fn open_throughput(&self) -> Real {
        (0..self.entries())
            .map(|e| self.open_entry_throughput(e))
            .sum()
    }

    pub fn open_entry_utilization(&self, e: usize) -> Real {
        self.open_entry_throughput(e) * self.open_service(e)
    }

    pub fn open_utilization(&self) -> Real {
        (0..self.entries())
            .map(|e| self.open_entry_utilization(e))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wait::tests::FixedContext;

    fn open_station(kind: StationKind, copies: u32, s: Real, lambda: Real) -> Station {
        let mut st = Station::new(kind, 1, 1).with_copies(copies).unwrap();
        st.set_open_service(0, 1, s).unwrap();
        st.set_open_visits(0, lambda).unwrap();
        st
    }

    fn w0(waits: &OpenWaits) -> Real {
        waits[0].1[0]
    }

    #[test]
    fn mm1() {
        let st = open_station(StationKind::Fcfs, 1, 1.0, 0.5);
        assert!((w0(&st.open_wait().unwrap()) - 2.0).abs() < 1e-12);
        let ps = open_station(StationKind::Ps, 1, 1.0, 0.5);
        assert!((w0(&ps.open_wait().unwrap()) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn single_server_erlang_c_is_mm1() {
        let st = open_station(StationKind::Reiser, 1, 1.0, 0.5);
        assert!((w0(&st.open_wait().unwrap()) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn mm2_erlang_c() {
        // lambda = 1, S = 1, two servers: rho = 0.5, Pw = 1/3, W = 1 + (1/3) / (2 * 0.5)
        let st = open_station(StationKind::Reiser, 2, 1.0, 1.0);
        assert!((w0(&st.open_wait().unwrap()) - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn saturated_multi_server_is_a_range_error() {
        let st = open_station(StationKind::Reiser, 2, 1.0, 2.0);
        assert!(matches!(st.open_wait(), Err(StationError::Range { .. })));
        assert!(matches!(st.alpha(1), Err(StationError::Range { .. })));
    }

    #[test]
    fn overloaded_single_server_never_yields_negative_times() {
        let ctx = FixedContext::default();
        let n = Population::from(vec![2]);
        for kind in [StationKind::Fcfs, StationKind::Ps, StationKind::MarkovPhased] {
            let st = open_station(kind, 1, 1.0, 2.0);
            assert!(matches!(st.open_wait(), Err(StationError::Range { .. })), "{kind:?}");
            assert!(matches!(st.mixed_wait(&ctx, &n), Err(StationError::Range { .. })), "{kind:?}");
            assert!(matches!(st.alpha(1), Err(StationError::Range { .. })), "{kind:?}");
        }
        let delay = open_station(StationKind::Infinite, 1, 1.0, 2.0);
        assert!((w0(&delay.open_wait().unwrap()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mg1_with_exponential_variance_is_mm1() {
        let mut st = open_station(StationKind::Hvfcfs, 1, 1.0, 0.5);
        st.set_open_variance(0, 1, 1.0).unwrap();
        assert!((w0(&st.open_wait().unwrap()) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn priority_and_suri_are_unsupported() {
        let hol = open_station(StationKind::HolFcfs, 1, 1.0, 0.5);
        assert!(matches!(hol.open_wait(), Err(StationError::Unsupported { .. })));
        let suri = open_station(StationKind::Suri, 2, 1.0, 0.5);
        assert!(suri.open_wait().is_err());
        let rolia = open_station(StationKind::Rolia, 2, 1.0, 0.5);
        assert!(rolia.open_wait().is_ok());
        assert!(rolia.mixed_wait(&FixedContext::default(), &Population::from(vec![1])).is_err());
    }

    #[test]
    fn mixed_wait_scales_by_closed_queue() {
        let st = open_station(StationKind::Fcfs, 1, 1.0, 0.5);
        let ctx = FixedContext {
            l: 1.0,
            ..Default::default()
        };
        let waits = st.mixed_wait(&ctx, &Population::from(vec![2])).unwrap();
        assert!((w0(&waits) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn alpha_forms() {
        let delay = open_station(StationKind::Infinite, 1, 2.0, 0.5);
        assert!((delay.alpha(3).unwrap() - 1.0_f64.exp()).abs() < 1e-12);
        let fcfs = open_station(StationKind::Fcfs, 1, 1.0, 0.5);
        assert!((fcfs.alpha(1).unwrap() - 4.0).abs() < 1e-12);
        let saturated = open_station(StationKind::Fcfs, 1, 1.0, 1.0);
        assert!(saturated.alpha(0).is_err());
    }

    #[test]
    fn overloaded_throughput_is_capped() {
        let st = open_station(StationKind::Fcfs, 1, 1.0, 2.0);
        assert!((st.open_throughput() - 1.0).abs() < 1e-12);
        assert!((st.open_utilization() - 1.0).abs() < 1e-12);
        let ok = open_station(StationKind::Fcfs, 1, 1.0, 0.5);
        assert_eq!(ok.open_throughput(), 0.5);
    }
}
