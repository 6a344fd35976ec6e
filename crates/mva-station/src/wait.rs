//! Closed-class waiting times, dispatched on [`StationKind`].
//!
//! Multi-server formulas live in `multiserver`, phased single servers in `phased`.

use crate::context::QueueContext;
use crate::error::{StationError, StationResult};
use crate::kind::StationKind;
use crate::station::{MAX_PHASES, Station};
use mva_core::Real;
use mva_pop::Population;

/// Waiting times of one class, keyed by `(entry, phase)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Waits {
    class: usize,
    values: Vec<(usize, usize, Real)>,
}

impl Waits {
    pub fn new(class: usize) -> Self {
        Self {
            class,
            values: Vec::new(),
        }
    }

    pub fn class(&self) -> usize {
        self.class
    }

    pub fn values(&self) -> &[(usize, usize, Real)] {
        &self.values
    }

    pub fn set(&mut self, e: usize, p: usize, w: Real) {
        match self.values.iter_mut().find(|(ee, pp, _)| *ee == e && *pp == p) {
            Some(slot) => slot.2 = w,
            None => self.values.push((e, p, w)),
        }
    }

    pub fn get(&self, e: usize, p: usize) -> Option<Real> {
        self.values
            .iter()
            .find(|(ee, pp, _)| *ee == e && *pp == p)
            .map(|v| v.2)
    }

    pub fn scale(&mut self, factor: Real) {
        for v in &mut self.values {
            v.2 *= factor;
        }
    }

    pub fn map(&mut self, mut f: impl FnMut(usize, usize, Real) -> Real) {
        for v in &mut self.values {
            v.2 = f(v.0, v.1, v.2);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Station {
    /// Waits for class `k` at population `n`, computed from `ctx`.
    ///
    /// Entries that class `k` never visits are left out of the result.
    pub fn wait(
        &self,
        ctx: &dyn QueueContext,
        k: usize,
        n: &Population,
    ) -> StationResult<Waits> {
        use StationKind::*;
        match self.kind() {
            Infinite => Ok(self.fill(k, |e, _| self.phase_service(e, k, 1))),
            Client => Ok(self.fill(k, |e, p| {
                if p == 0 {
                    self.service(e, k)
                } else {
                    self.phase_service(e, k, 1)
                }
            })),
            Ps | HolPs | PrPs | Fcfs | HolFcfs | PrFcfs | Hvfcfs | HolHvfcfs | PrHvfcfs => {
                self.single_server_wait(ctx, k, n)
            }
            kind if kind.is_multi_server() => self.multi_server_wait(ctx, k, n),
            _ => self.phased_wait(ctx, k, n),
        }
    }

    /// Per-iteration preparation. Phased servers return their new overtaking
    /// probabilities, one per `(e, k)`.
    pub fn init_step(&self, ctx: &dyn QueueContext) -> Option<Vec<Real>> {
        if !self.kind().uses_gamma() {
            return None;
        }
        let mut gamma = Vec::with_capacity(self.entries() * self.classes());
        for e in 0..self.entries() {
            for k in 0..self.classes() {
                let busy = self.visits(e, k) * self.second_phase(e, k);
                gamma.push(if busy == 0.0 {
                    0.0
                } else {
                    busy / (busy + ctx.response_time_excluding(k))
                });
            }
        }
        Some(gamma)
    }

    /// Set every phase slot of every visited entry.
    pub(crate) fn fill(&self, k: usize, mut f: impl FnMut(usize, usize) -> Real) -> Waits {
        let mut waits = Waits::new(k);
        for e in 0..self.entries() {
            if self.visits(e, k) == 0.0 {
                continue;
            }
            for p in 0..=MAX_PHASES {
                waits.set(e, p, f(e, p));
            }
        }
        waits
    }

    /// `1 / (1 - inflation)` applied by the preemptive forms.
    pub(crate) fn preemption(
        &self,
        ctx: &dyn QueueContext,
        k: usize,
        n: &Population,
    ) -> StationResult<Real> {
        Ok(1.0 / (1.0 - ctx.priority_inflation(n, k)?))
    }

    fn single_server_wait(
        &self,
        ctx: &dyn QueueContext,
        k: usize,
        n: &Population,
    ) -> StationResult<Waits> {
        use StationKind::*;
        let kind = self.kind();
        let mut waits = match kind {
            Ps | PrPs => {
                let factor = 1.0 + ctx.sum_l(n, k)?;
                self.fill(k, |e, _| self.service(e, k) * factor)
            }
            Fcfs | PrFcfs => {
                let sum = ctx.sum_sl(n, k)?;
                self.fill(k, |e, _| self.service(e, k) + sum)
            }
            Hvfcfs | PrHvfcfs => {
                let sum = (ctx.sum_sq(n, k)? + ctx.sum_ru(n, k)?).max(0.0);
                self.fill(k, |e, _| self.service(e, k) + sum)
            }
            HolPs | HolFcfs => {
                let sum = (ctx.sum_sl(n, k)? + ctx.sum_su(n, k)?)
                    / (1.0 - ctx.priority_inflation(n, k)?);
                self.fill(k, |e, _| self.service(e, k) + sum)
            }
            HolHvfcfs => {
                let sum = (ctx.sum_sq(n, k)? + ctx.sum_ru(n, k)? + ctx.sum_su(n, k)?)
                    / (1.0 - ctx.priority_inflation(n, k)?);
                self.fill(k, |e, _| self.service(e, k) + sum)
            }
            _ => return Err(StationError::unsupported(kind, "single-server wait")),
        };
        if kind.is_preemptive() {
            waits.scale(self.preemption(ctx, k, n)?);
        }
        Ok(waits)
    }
}
