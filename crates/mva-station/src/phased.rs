//! Single-server stations with a second phase of service.
//!
//! Rolia-phased kinds charge the arriving customer for the chance that the server
//! is still in its second phase. Simple-phased kinds add a utilization correction on
//! top, and Markov-phased kinds replace both with the per-phase `prOt` probabilities.

use crate::context::{Phase2Correction, QueueContext};
use crate::error::StationResult;
use crate::station::{MAX_PHASES, Station};
use crate::wait::Waits;
use mva_core::Real;
use mva_pop::Population;

impl Station {
    pub(crate) fn phased_wait(
        &self,
        ctx: &dyn QueueContext,
        k: usize,
        n: &Population,
    ) -> StationResult<Waits> {
        let kind = self.kind();
        let high_variance = kind.is_high_variance();

        let mut queue = if high_variance {
            ctx.sum_sq(n, k)? + ctx.sum_ru(n, k)?
        } else {
            ctx.sum_sl(n, k)?
        };
        let mut divisor = 1.0;
        if kind.is_hol() {
            queue += ctx.sum_su(n, k)?;
            divisor -= ctx.priority_inflation(n, k)?;
        }

        let mut waits = if kind.is_markov() {
            if high_variance {
                queue = queue.max(0.0);
            }
            let mut correction = [0.0; MAX_PHASES + 1];
            for (p, c) in correction.iter_mut().enumerate() {
                *c = self.markov_overtaking(k, p) + self.markov_s2u(ctx, p, n, k)?;
            }
            self.fill_visited_phases(k, |e, p| {
                self.phase_service(e, k, 1) + (queue + correction[p]) / divisor
            })
        } else {
            let mut extra = self.gamma_overtaking(k);
            if kind.is_simple_phased() {
                extra += self.gamma_s2u(ctx, n, k)?;
            }
            let mut delay = (queue + extra) / divisor;
            if high_variance {
                delay = delay.max(0.0);
            }
            self.fill(k, |e, _| self.phase_service(e, k, 1) + delay)
        };

        if kind.is_preemptive() {
            waits.scale(self.preemption(ctx, k, n)?);
        }
        Ok(waits)
    }

    /// Like `fill`, but only for the phase slots class `k` actually visits.
    pub(crate) fn fill_visited_phases(
        &self,
        k: usize,
        mut f: impl FnMut(usize, usize) -> Real,
    ) -> Waits {
        let mut waits = Waits::new(k);
        for e in 0..self.entries() {
            for p in 0..=MAX_PHASES {
                if self.phase_visits(e, k, p) != 0.0 {
                    waits.set(e, p, f(e, p));
                }
            }
        }
        waits
    }

    /// Residual second-phase time left behind by the caller's previous visit.
    fn gamma_overtaking(&self, k: usize) -> Real {
        (0..self.entries())
            .map(|e| self.eta(e, k) * self.gamma(e, k) * self.residual(e, k, 2))
            .sum()
    }

    /// Second-phase busy time of other customers, discounted by `Gamma`.
    fn gamma_s2u(&self, ctx: &dyn QueueContext, n: &Population, k: usize) -> StationResult<Real> {
        let mut sum = 0.0;
        for e in 0..self.entries() {
            let gamma = self.gamma(e, k);
            sum += match ctx.phase2() {
                Phase2Correction::Simple => (1.0 - gamma) * ctx.sum_s2u_entry(e, n, k)?,
                Phase2Correction::Complex => ctx.sum_us_prot(e, gamma, n, k)?,
            };
        }
        Ok(sum)
    }

    /// `sum_e sum_{p_j >= 2} prOt(e,k,p_i,p_j) residual(e,k,p_j)`.
    pub(crate) fn markov_overtaking(&self, k: usize, p_i: usize) -> Real {
        let mut sum = 0.0;
        for e in 0..self.entries() {
            for p_j in 2..=self.phases() {
                sum += self.overtaking(e, k, p_i, p_j) * self.residual(e, k, p_j);
            }
        }
        sum
    }

    /// Second-phase busy time of other customers, discounted by `prOt`.
    pub(crate) fn markov_s2u(
        &self,
        ctx: &dyn QueueContext,
        p_i: usize,
        n: &Population,
        k: usize,
    ) -> StationResult<Real> {
        let mut sum = 0.0;
        for e in 0..self.entries() {
            let prot: Real = (2..=self.phases())
                .map(|p_j| self.overtaking(e, k, p_i, p_j))
                .sum();
            sum += match ctx.phase2() {
                Phase2Correction::Simple => (1.0 - prot) * ctx.sum_s2u_entry(e, n, k)?,
                Phase2Correction::Complex => ctx.sum_us_prot(e, prot, n, k)?,
            };
        }
        Ok(sum)
    }
}

#[cfg(test)]
mod tests {
    use crate::kind::StationKind;
    use crate::station::Station;
    use crate::wait::tests::FixedContext;
    use mva_pop::Population;

    fn two_phase(kind: StationKind) -> Station {
        let mut st = Station::new(kind, 1, 1).with_phases(2).unwrap();
        st.set_service(0, 0, 1, 0.5).unwrap();
        st.set_service(0, 0, 2, 1.0).unwrap();
        st.set_visits(0, 0, 1, 1.0).unwrap();
        st
    }

    #[test]
    fn rolia_phased_charges_overtaking() {
        let ctx = FixedContext {
            sl: 1.0,
            response: 3.0,
            ..Default::default()
        };
        let mut st = two_phase(StationKind::RoliaPhased);
        let gamma = st.init_step(&ctx).unwrap();
        st.store_gamma(gamma);
        let waits = st.wait(&ctx, 0, &Population::from(vec![2])).unwrap();
        // S1 + SL + Gamma * S2 = 0.5 + 1 + 0.25
        assert!((waits.get(0, 0).unwrap() - 1.75).abs() < 1e-12);
    }

    #[test]
    fn simple_phased_adds_second_phase_utilization() {
        let ctx = FixedContext {
            s2u: 0.4,
            response: 3.0,
            ..Default::default()
        };
        let mut st = two_phase(StationKind::SimplePhased);
        st.store_gamma(st.init_step(&ctx).unwrap());
        let waits = st.wait(&ctx, 0, &Population::from(vec![2])).unwrap();
        // 0.5 + 0.25 + (1 - 0.25) * 0.4
        assert!((waits.get(0, 0).unwrap() - 1.05).abs() < 1e-12);
    }

    #[test]
    fn markov_phased_uses_prot() {
        let ctx = FixedContext::default();
        let mut st = two_phase(StationKind::MarkovPhased);
        st.set_overtaking(0, 0, 0, 2, 0.5).unwrap();
        st.set_overtaking(0, 0, 1, 2, 0.5).unwrap();
        let waits = st.wait(&ctx, 0, &Population::from(vec![1])).unwrap();
        assert!((waits.get(0, 0).unwrap() - 1.0).abs() < 1e-12);
        assert!((waits.get(0, 1).unwrap() - 1.0).abs() < 1e-12);
        // phase 2 is never visited by the caller
        assert!(waits.get(0, 2).is_none());
    }
}
