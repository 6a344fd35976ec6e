//! Multi-server approximations: Reiser, Conway, Rolia, Bruell/Schmidt and Suri.

use crate::context::QueueContext;
use crate::error::{StationError, StationResult};
use crate::kind::StationKind;
use crate::station::{MAX_PHASES, Station};
use crate::wait::Waits;
use mva_core::Real;
use mva_pop::{Population, PopulationIter};

impl Station {
    pub(crate) fn multi_server_wait(
        &self,
        ctx: &dyn QueueContext,
        k: usize,
        n: &Population,
    ) -> StationResult<Waits> {
        use StationKind::*;
        let j = self.capacity();
        match self.kind() {
            Reiser => {
                let sum = self.reiser_sum(ctx, k, n)?;
                Ok(self.fill(k, |e, _| (self.service(e, k) + sum) / j))
            }
            ReiserPs => {
                let factor = 1.0 + ctx.sum_l(n, k)? + ctx.sum_p(n, k)?;
                Ok(self.fill(k, |e, _| self.service(e, k) / j * factor))
            }
            PhasedReiser => {
                let sum = self.reiser_sum(ctx, k, n)? + self.sum_s2u(ctx, n, k)?;
                Ok(self.fill(k, |e, p| {
                    let w0 = (sum + self.service(e, k)) / j;
                    if p == 0 {
                        w0
                    } else {
                        w0 - self.service(e, k) + self.phase_service(e, k, 1)
                    }
                }))
            }
            MarkovPhasedReiser => {
                let sum = self.reiser_sum(ctx, k, n)?;
                Ok(self.fill_visited_phases(k, |e, p| {
                    (self.phase_service(e, k, 1) + sum + self.markov_overtaking(k, p)) / j
                }))
            }
            Conway => {
                let sum = self.conway_sum(ctx, k, n)?;
                Ok(self.fill(k, |e, _| self.service(e, k) + sum))
            }
            PhasedConway => {
                let sum = self.conway_sum(ctx, k, n)?;
                Ok(self.fill(k, |e, p| {
                    if p == 0 {
                        sum + self.service(e, k)
                    } else {
                        sum + self.phase_service(e, k, 1)
                    }
                }))
            }
            MarkovPhasedConway => {
                let sum = self.conway_sum(ctx, k, n)?;
                let mut overtaking = [0.0; MAX_PHASES + 1];
                for p in 0..=MAX_PHASES {
                    overtaking[p] = self.mean_minimum_overtaking(ctx, k, p, n)?;
                }
                Ok(self.fill_visited_phases(k, |e, p| {
                    self.phase_service(e, k, 1) + sum + overtaking[p]
                }))
            }
            Rolia | RoliaPs | PhasedRolia | MarkovPhasedRolia | PhasedRoliaPs
            | MarkovPhasedRoliaPs => self.rolia_wait(ctx, k, n),
            Bruell | Schmidt => {
                let sum = ctx.sum_sp2(n, k)?;
                Ok(self.fill(k, |_, _| sum))
            }
            Suri => {
                let mut factor = 1.0;
                if n.sum() as Real > j {
                    let rho = ctx.utilization(n)? / j;
                    factor += ctx.sum_l(n, k)? * rho.powf(4.464 * (j.powf(0.676) - 1.0)) / j;
                }
                Ok(self.fill(k, |e, _| self.service(e, k) * factor))
            }
            kind => Err(StationError::unsupported(kind, "multi-server wait")),
        }
    }

    /// Mean service time at `N`, weighted by throughput.
    pub(crate) fn throughput_weighted_service(
        &self,
        ctx: &dyn QueueContext,
        n: &Population,
    ) -> StationResult<Real> {
        let mut sum_v: Real = 0.0;
        let mut sum_s: Real = 0.0;
        for k in 0..self.classes() {
            let visits = self.class_visits(k);
            if visits == 0.0 {
                continue;
            }
            let x = ctx.throughput(n, k)?;
            sum_v += visits * x;
            for e in 0..self.entries() {
                sum_s += self.visits(e, k) * x * self.service(e, k);
            }
        }
        Ok(if !sum_v.is_finite() {
            0.0
        } else if sum_v > 0.0 {
            sum_s / sum_v
        } else {
            self.mean_service()
        })
    }

    fn reiser_sum(&self, ctx: &dyn QueueContext, k: usize, n: &Population) -> StationResult<Real> {
        Ok(ctx.sum_sl(n, k)? + self.throughput_weighted_service(ctx, n)? * ctx.sum_p(n, k)?)
    }

    pub(crate) fn sum_s2u(
        &self,
        ctx: &dyn QueueContext,
        n: &Population,
        k: usize,
    ) -> StationResult<Real> {
        let mut sum = 0.0;
        for e in 0..self.entries() {
            sum += ctx.sum_s2u_entry(e, n, k)?;
        }
        Ok(sum)
    }

    /// Probability that all servers are busy, from utilization alone.
    fn pb2(&self, ctx: &dyn QueueContext, n: &Population, k: usize) -> StationResult<Real> {
        let j = self.capacity();
        let u = (ctx.sum_u(n, k)? / j).min(1.0);
        Ok(u.powi(self.copies() as i32))
    }

    fn rolia_wait(
        &self,
        ctx: &dyn QueueContext,
        k: usize,
        n: &Population,
    ) -> StationResult<Waits> {
        use StationKind::*;
        let j = self.capacity();
        let f = ctx.filter();
        let filtered = |e: usize, p: usize, w: Real| f * w + (1.0 - f) * self.wait_time(e, k, p);

        let waits = match self.kind() {
            Rolia => {
                let sl = ctx.sum_sl(n, k)?;
                if !sl.is_finite() {
                    return Ok(self.fill(k, |_, _| Real::INFINITY));
                }
                let sum = self.pb2(ctx, n, k)? * sl / j;
                self.fill(k, |e, p| filtered(e, p, self.service(e, k) + sum))
            }
            RoliaPs => {
                let factor = 1.0 + self.pb2(ctx, n, k)? * ctx.sum_l(n, k)?;
                self.fill(k, |e, p| filtered(e, p, self.service(e, k) * factor))
            }
            PhasedRolia => {
                let sum =
                    self.pb2(ctx, n, k)? * (ctx.sum_sl(n, k)? + self.sum_s2u(ctx, n, k)?) / j;
                self.fill(k, |e, p| filtered(e, p, self.phase_service(e, k, 1) + sum))
            }
            MarkovPhasedRolia => {
                let sum = self.pb2(ctx, n, k)? * ctx.sum_sl(n, k)? / j;
                self.fill_visited_phases(k, |e, p| {
                    let w = self.phase_service(e, k, 1) + sum;
                    filtered(e, p, w + self.markov_overtaking(k, p) / j)
                })
            }
            PhasedRoliaPs | MarkovPhasedRoliaPs => {
                let markov = self.kind() == MarkovPhasedRoliaPs;
                let busy = self.pb2(ctx, n, k)? * (ctx.sum_l(n, k)? + ctx.sum_u2(n, k)?);
                let w = |e: usize, p: usize| {
                    let mut w = self.phase_service(e, k, 1) + self.service(e, k) * busy;
                    if markov {
                        w += self.markov_overtaking(k, p) / j;
                    }
                    filtered(e, p, w)
                };
                if markov {
                    self.fill_visited_phases(k, w)
                } else {
                    self.fill(k, w)
                }
            }
            kind => return Err(StationError::unsupported(kind, "Rolia wait")),
        };
        Ok(waits)
    }

    // ------------------------------------------------------------------
    // Conway
    // ------------------------------------------------------------------

    fn conway_sum(&self, ctx: &dyn QueueContext, k: usize, n: &Population) -> StationResult<Real> {
        Ok(self.effective_backlog(ctx, k, n)? + ctx.pb(n, k)? * self.departure_time(ctx, k, n)?)
    }

    /// Server-occupancy vectors: `sum(b) = J`, each `b_x <= N_x` (less the arriving
    /// customer for class `k`), optionally with class `i` present.
    fn busy_states(&self, n: &Population, k: usize, with: Option<usize>) -> Vec<Population> {
        let limit: Vec<u32> = (0..self.classes())
            .map(|x| {
                let cap = if self.class_visits(x) != 0.0 { n.get(x) } else { 0 };
                if x == k { cap.saturating_sub(1) } else { cap }
            })
            .collect();
        let j = self.copies();
        PopulationIter::new(&Population::from(limit))
            .filter(|b| b.sum() == j)
            .filter(|b| with.is_none_or(|i| b.get(i) != 0))
            .collect()
    }

    /// Relative weight of busy state `b`: the multinomial of the class utilizations.
    fn busy_state_weight(
        &self,
        ctx: &dyn QueueContext,
        b: &Population,
        n: &Population,
        k: usize,
    ) -> StationResult<Real> {
        let mut product = 1.0;
        let mut denominator = 1.0;
        for i in 0..self.classes() {
            let b_i = b.get(i);
            if b_i == 0 {
                continue;
            }
            let u = ctx.utilization_fraction(i, n, k)?;
            if u > 0.0 {
                product *= u.powi(b_i as i32);
            }
            denominator *= self.factorials().factorial(b_i as usize);
        }
        Ok(self.factorials().factorial(self.copies() as usize) * product / denominator)
    }

    /// Mean time to the first departure with the servers occupied as in `b`.
    fn mean_min_service(&self, b: &Population) -> Real {
        let mut rate = 0.0;
        for k in 0..self.classes() {
            if b.get(k) == 0 || self.class_visits(k) == 0.0 {
                continue;
            }
            let s = self.class_service(k);
            if s == 0.0 {
                return 0.0;
            }
            rate += b.get(k) as Real / s;
        }
        if rate > 0.0 { 1.0 / rate } else { 0.0 }
    }

    fn weighted_min_service(
        &self,
        ctx: &dyn QueueContext,
        n: &Population,
        k: usize,
        states: &[Population],
    ) -> StationResult<Real> {
        let mut sum_a = 0.0;
        let mut sum_c = 0.0;
        for b in states {
            let a = self.busy_state_weight(ctx, b, n, k)?;
            sum_a += a * self.mean_min_service(b);
            sum_c += a;
        }
        Ok(if sum_c != 0.0 { sum_a / sum_c } else { 0.0 })
    }

    fn effective_backlog(
        &self,
        ctx: &dyn QueueContext,
        k: usize,
        n: &Population,
    ) -> StationResult<Real> {
        if n.get(k) == 0 || self.class_visits(k) == 0.0 {
            return Ok(0.0);
        }
        let mut sum = 0.0;
        for i in 0..self.classes() {
            if n.get(i) == 0 {
                continue;
            }
            let states = self.busy_states(n, k, Some(i));
            let service = self.weighted_min_service(ctx, n, k, &states)?;
            sum += service * ctx.queue_only(i, n, k)?;
        }
        Ok(sum)
    }

    fn departure_time(
        &self,
        ctx: &dyn QueueContext,
        k: usize,
        n: &Population,
    ) -> StationResult<Real> {
        if n.get(k) == 0 || self.class_visits(k) == 0.0 {
            return Ok(0.0);
        }
        let states = self.busy_states(n, k, None);
        self.weighted_min_service(ctx, n, k, &states)
    }

    /// Expected wait until the first of the servers ends its second phase.
    fn mean_minimum_overtaking(
        &self,
        ctx: &dyn QueueContext,
        k: usize,
        p_i: usize,
        n: &Population,
    ) -> StationResult<Real> {
        if n.get(k) == 0 {
            return Ok(0.0);
        }
        let servers = self.copies();
        let clients = servers.min(n.sum());
        let prob = self.overtaking_probability(k, p_i);
        let mean = servers as Real / clients as Real;
        let x1 = mean.floor();
        let x2 = mean.ceil();
        let s2 = self.class_second_phase(k);

        let mut product = 1.0;
        let mut sum = 0.0;
        let mut y1 = 0.0;
        let mut y2 = 0.0;
        for i in 1..=servers {
            product *= prob;
            if product == 0.0 {
                break;
            }
            sum += 1.0 / (product * s2);
            if i as Real == x1 {
                y1 = 1.0 / sum;
            }
            if i as Real == x2 {
                y2 = 1.0 / sum;
            }
        }

        let overtaking = if x2 != x1 && y1 != 0.0 {
            let m = (y2 / y1).ln() / (x2 - x1);
            let kk = y1 * (-m * x1).exp();
            kk * (m * mean).exp()
        } else {
            y1
        };
        Ok(overtaking + self.markov_s2u(ctx, p_i, n, k)?)
    }

    // ------------------------------------------------------------------
    // Bruell / Schmidt
    // ------------------------------------------------------------------

    /// Mean time for a class `k` departure with occupancy `i` at the station.
    pub fn mu_s(&self, i: &Population, k: usize) -> Real {
        let n = i.sum() as usize;
        if self.kind() == StationKind::Bruell {
            return n as Real * self.class_service(k) / self.capacity_at(n);
        }
        let j = self.capacity();
        let mut sum = self.class_service(k);
        let v_k = self.class_visits(k);
        if n as Real > j && v_k > 0.0 {
            let mix: Real = (0..self.classes())
                .map(|c| i.get(c) as Real * self.class_visits(c) * self.class_service(c))
                .sum::<Real>()
                / v_k;
            sum += (n as Real - j) / (j * (n as Real - 1.0)) * (mix - self.class_service(k));
        }
        sum
    }
}
