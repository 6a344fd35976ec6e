//! Station parameters and the quantities derived from them.
//!
//! Entries `e` and classes `k` are 0-based. Phase arrays hold the phase total in
//! slot 0 and phases `1 ..= MAX_PHASES` after it; setters keep slot 0 equal to the
//! sum of the phase slots.

use crate::error::{StationError, StationResult};
use crate::kind::{Marginals, StationKind};
use crate::wait::Waits;
use mva_core::{FactorialTable, Real};
use mva_pop::{Population, PopResult, lattice_size};

pub const MAX_PHASES: usize = 3;

/// Per-phase values, slot 0 is the total.
pub type PhaseVec = [Real; MAX_PHASES + 1];

/// Overtaking probabilities `prOt[p_i][p_j]` for one `(e, k)` pair.
pub type Overtaking = [[Real; MAX_PHASES + 1]; MAX_PHASES + 1];

#[derive(Clone, Debug)]
pub struct Station {
    name: String,
    kind: StationKind,
    entries: usize,
    classes: usize,
    phases: usize,
    copies: u32,

    service: Vec<PhaseVec>,
    visits: Vec<PhaseVec>,
    variance: Vec<PhaseVec>,
    interlock: Vec<Real>,
    overtaking: Vec<Overtaking>,
    overlap: Vec<Real>,

    open_service: Vec<PhaseVec>,
    open_visits: Vec<Real>,
    open_variance: Vec<PhaseVec>,

    waits: Vec<PhaseVec>,
    open_waits: Vec<PhaseVec>,
    gamma: Vec<Real>,

    factorials: FactorialTable,
}

fn set_and_total(slot: &mut PhaseVec, p: usize, value: Real) {
    slot[p] = value;
    slot[0] = slot[1..].iter().sum();
}

fn check_value(value: Real, what: &'static str) -> StationResult<Real> {
    if !value.is_finite() {
        Err(StationError::NonFinite { what, value })
    } else if value < 0.0 {
        Err(StationError::Negative { what, value })
    } else {
        Ok(value)
    }
}

fn check_probability(value: Real, what: &'static str) -> StationResult<Real> {
    let value = check_value(value, what)?;
    if value > 1.0 {
        Err(StationError::OutOfRange {
            what,
            index: value.ceil() as usize,
            limit: 1,
        })
    } else {
        Ok(value)
    }
}

fn check_index(what: &'static str, index: usize, limit: usize) -> StationResult<()> {
    if index < limit {
        Ok(())
    } else {
        Err(StationError::OutOfRange { what, index, limit })
    }
}

impl Station {
    /// A single-phase, single-server station with all parameters zero.
    pub fn new(kind: StationKind, entries: usize, classes: usize) -> Self {
        let ek = entries * classes;
        Self {
            name: String::new(),
            kind,
            entries,
            classes,
            phases: 1,
            copies: 1,
            service: vec![[0.0; MAX_PHASES + 1]; ek],
            visits: vec![[0.0; MAX_PHASES + 1]; ek],
            variance: vec![[0.0; MAX_PHASES + 1]; ek],
            interlock: vec![0.0; ek],
            overtaking: vec![[[0.0; MAX_PHASES + 1]; MAX_PHASES + 1]; ek],
            overlap: vec![1.0; classes * classes],
            open_service: vec![[0.0; MAX_PHASES + 1]; entries],
            open_visits: vec![0.0; entries],
            open_variance: vec![[0.0; MAX_PHASES + 1]; entries],
            waits: vec![[0.0; MAX_PHASES + 1]; ek],
            open_waits: vec![[0.0; MAX_PHASES + 1]; entries],
            gamma: vec![0.0; ek],
            factorials: FactorialTable::new(1),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_phases(mut self, phases: usize) -> StationResult<Self> {
        if phases == 0 || phases > MAX_PHASES {
            return Err(StationError::OutOfRange {
                what: "phase count",
                index: phases,
                limit: MAX_PHASES + 1,
            });
        }
        self.phases = phases;
        Ok(self)
    }

    /// Number of identical servers. Only multi-server kinds use more than one.
    pub fn with_copies(mut self, copies: u32) -> StationResult<Self> {
        if copies == 0 {
            return Err(StationError::OutOfRange {
                what: "server copies",
                index: 0,
                limit: 1,
            });
        }
        if copies > 1 && !self.kind.is_multi_server() {
            return Err(StationError::unsupported(self.kind, "multiple copies"));
        }
        self.copies = copies;
        self.factorials = FactorialTable::new(copies as usize);
        Ok(self)
    }

    #[inline]
    fn idx(&self, e: usize, k: usize) -> usize {
        e * self.classes + k
    }

    fn check_ek(&self, e: usize, k: usize) -> StationResult<()> {
        check_index("entry", e, self.entries)?;
        check_index("class", k, self.classes)
    }

    fn check_phase(&self, p: usize, limit: usize) -> StationResult<()> {
        if p == 0 || p > limit {
            Err(StationError::OutOfRange {
                what: "phase",
                index: p,
                limit: limit + 1,
            })
        } else {
            Ok(())
        }
    }

    // ------------------------------------------------------------------
    // Setters
    // ------------------------------------------------------------------

    pub fn set_service(&mut self, e: usize, k: usize, p: usize, value: Real) -> StationResult<()> {
        self.check_ek(e, k)?;
        self.check_phase(p, self.phases)?;
        let value = check_value(value, "service time")?;
        let i = self.idx(e, k);
        set_and_total(&mut self.service[i], p, value);
        Ok(())
    }

    pub fn set_visits(&mut self, e: usize, k: usize, p: usize, value: Real) -> StationResult<()> {
        self.check_ek(e, k)?;
        self.check_phase(p, MAX_PHASES)?;
        let value = check_value(value, "visits")?;
        let i = self.idx(e, k);
        set_and_total(&mut self.visits[i], p, value);
        Ok(())
    }

    pub fn set_variance(&mut self, e: usize, k: usize, p: usize, value: Real) -> StationResult<()> {
        self.check_ek(e, k)?;
        self.check_phase(p, self.phases)?;
        let value = check_value(value, "variance")?;
        let i = self.idx(e, k);
        set_and_total(&mut self.variance[i], p, value);
        Ok(())
    }

    pub fn set_open_service(&mut self, e: usize, p: usize, value: Real) -> StationResult<()> {
        check_index("entry", e, self.entries)?;
        self.check_phase(p, self.phases)?;
        let value = check_value(value, "open service time")?;
        set_and_total(&mut self.open_service[e], p, value);
        Ok(())
    }

    /// Open arrivals at entry `e` (arrival rate times visits).
    pub fn set_open_visits(&mut self, e: usize, value: Real) -> StationResult<()> {
        check_index("entry", e, self.entries)?;
        self.open_visits[e] = check_value(value, "open visits")?;
        Ok(())
    }

    pub fn set_open_variance(&mut self, e: usize, p: usize, value: Real) -> StationResult<()> {
        check_index("entry", e, self.entries)?;
        self.check_phase(p, self.phases)?;
        let value = check_value(value, "open variance")?;
        set_and_total(&mut self.open_variance[e], p, value);
        Ok(())
    }

    /// Fraction of the class `k` queue at entry `e` that an arrival cannot see.
    pub fn set_interlock(&mut self, e: usize, k: usize, flow: Real) -> StationResult<()> {
        self.check_ek(e, k)?;
        let i = self.idx(e, k);
        self.interlock[i] = check_probability(flow, "interlock")?;
        Ok(())
    }

    /// Probability that a caller in phase `p_i` finds its previous request in phase `p_j`.
    pub fn set_overtaking(
        &mut self,
        e: usize,
        k: usize,
        p_i: usize,
        p_j: usize,
        pr: Real,
    ) -> StationResult<()> {
        self.check_ek(e, k)?;
        check_index("calling phase", p_i, MAX_PHASES + 1)?;
        self.check_phase(p_j, self.phases)?;
        let i = self.idx(e, k);
        self.overtaking[i][p_i][p_j] = check_probability(pr, "overtaking probability")?;
        Ok(())
    }

    /// Scaling of class `k` queue as seen by class `j` arrivals.
    pub fn set_overlap(&mut self, k: usize, j: usize, factor: Real) -> StationResult<()> {
        check_index("class", k, self.classes)?;
        check_index("class", j, self.classes)?;
        self.overlap[k * self.classes + j] = check_value(factor, "overlap factor")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Shape
    // ------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StationKind {
        self.kind
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn classes(&self) -> usize {
        self.classes
    }

    pub fn phases(&self) -> usize {
        self.phases
    }

    pub fn copies(&self) -> u32 {
        self.copies
    }

    pub fn factorials(&self) -> &FactorialTable {
        &self.factorials
    }

    pub fn is_priority(&self) -> bool {
        self.kind.is_priority()
    }

    pub fn has_tau(&self) -> bool {
        self.kind.has_tau()
    }

    pub fn vector_probabilities(&self) -> bool {
        self.kind.marginals() == Marginals::Vector
    }

    /// Highest index of the marginal probability vector, 0 when none is kept.
    pub fn marginal_size(&self, bound: &Population) -> PopResult<usize> {
        Ok(match self.kind.marginals() {
            Marginals::None => 0,
            Marginals::Scalar => self.copies as usize,
            Marginals::Vector => lattice_size(bound)? - 1,
        })
    }

    // ------------------------------------------------------------------
    // Closed-class parameters
    // ------------------------------------------------------------------

    pub fn service(&self, e: usize, k: usize) -> Real {
        self.service[self.idx(e, k)][0]
    }

    pub fn phase_service(&self, e: usize, k: usize, p: usize) -> Real {
        self.service[self.idx(e, k)][p]
    }

    pub fn visits(&self, e: usize, k: usize) -> Real {
        self.visits[self.idx(e, k)][0]
    }

    pub fn phase_visits(&self, e: usize, k: usize, p: usize) -> Real {
        self.visits[self.idx(e, k)][p]
    }

    pub fn variance(&self, e: usize, k: usize, p: usize) -> Real {
        self.variance[self.idx(e, k)][p]
    }

    pub fn interlock(&self, e: usize, k: usize) -> Real {
        self.interlock[self.idx(e, k)]
    }

    pub fn overtaking(&self, e: usize, k: usize, p_i: usize, p_j: usize) -> Real {
        self.overtaking[self.idx(e, k)][p_i][p_j]
    }

    pub fn overlap(&self, k: usize, j: usize) -> Real {
        self.overlap[k * self.classes + j]
    }

    /// Total visits of class `k` over all entries.
    pub fn class_visits(&self, k: usize) -> Real {
        (0..self.entries).map(|e| self.visits(e, k)).sum()
    }

    /// Visit-weighted mean service time of class `k`.
    pub fn class_service(&self, k: usize) -> Real {
        let visits = self.class_visits(k);
        if visits == 0.0 {
            return 0.0;
        }
        (0..self.entries)
            .map(|e| self.visits(e, k) * self.service(e, k))
            .sum::<Real>()
            / visits
    }

    /// Visit-weighted mean service time over all closed classes.
    pub fn mean_service(&self) -> Real {
        let mut sum_v = 0.0;
        let mut sum_s = 0.0;
        for k in 0..self.classes {
            for e in 0..self.entries {
                sum_s += self.visits(e, k) * self.service(e, k);
                sum_v += self.visits(e, k);
            }
        }
        if sum_v > 0.0 { sum_s / sum_v } else { 0.0 }
    }

    /// Service after the first phase.
    pub fn second_phase(&self, e: usize, k: usize) -> Real {
        let s = &self.service[self.idx(e, k)];
        s[0] - s[1]
    }

    pub fn class_second_phase(&self, k: usize) -> Real {
        let visits = self.class_visits(k);
        if visits == 0.0 {
            return 0.0;
        }
        (0..self.entries)
            .map(|e| self.visits(e, k) * self.second_phase(e, k))
            .sum::<Real>()
            / visits
    }

    /// Fraction of class `k` visits that go to entry `e`.
    pub fn eta(&self, e: usize, k: usize) -> Real {
        let visits = self.class_visits(k);
        if visits == 0.0 { 0.0 } else { self.visits(e, k) / visits }
    }

    /// Residual service seen by an arrival: the mean, or `(S + var/S)/2` for high-variance kinds.
    pub fn residual_service(&self, e: usize, k: usize, p: usize) -> Real {
        let s = self.phase_service(e, k, p);
        if !self.kind.is_high_variance() || s == 0.0 || !s.is_finite() {
            return s;
        }
        (s + self.variance(e, k, p) / s) / 2.0
    }

    /// Residual service of phase `p` plus every later phase.
    pub fn residual(&self, e: usize, k: usize, p: usize) -> Real {
        self.residual_service(e, k, p)
            + ((p + 1)..=self.phases)
                .map(|q| self.phase_service(e, k, q))
                .sum::<Real>()
    }

    /// Overtaking probability of a phase `p_i` caller over all entries and later phases.
    pub fn overtaking_probability(&self, k: usize, p_i: usize) -> Real {
        (0..self.entries)
            .map(|e| {
                (2..=self.phases)
                    .map(|p_j| self.overtaking(e, k, p_i, p_j))
                    .sum::<Real>()
            })
            .sum()
    }

    /// Server capacity: 1, `J` copies, or infinite for delay kinds.
    pub fn capacity(&self) -> Real {
        if self.kind.is_delay() {
            Real::INFINITY
        } else if self.kind.is_multi_server() {
            self.copies as Real
        } else {
            1.0
        }
    }

    /// Servers busy with `n` customers present.
    pub fn capacity_at(&self, n: usize) -> Real {
        if self.kind.is_multi_server() {
            n.min(self.copies as usize) as Real
        } else {
            self.capacity()
        }
    }

    // ------------------------------------------------------------------
    // Open-class parameters
    // ------------------------------------------------------------------

    pub fn open_service(&self, e: usize) -> Real {
        self.open_service[e][0]
    }

    pub fn open_phase_service(&self, e: usize, p: usize) -> Real {
        self.open_service[e][p]
    }

    pub fn open_visits(&self, e: usize) -> Real {
        self.open_visits[e]
    }

    pub fn open_variance(&self, e: usize) -> Real {
        self.open_variance[e][0]
    }

    pub fn total_open_visits(&self) -> Real {
        self.open_visits.iter().sum()
    }

    pub fn has_open_arrivals(&self) -> bool {
        self.open_visits.iter().any(|&v| v > 0.0)
    }

    pub fn has_closed_visits(&self) -> bool {
        self.visits.iter().any(|v| v[0] > 0.0)
    }

    /// Visit-weighted mean open service time.
    pub fn mean_open_service(&self) -> Real {
        let visits = self.total_open_visits();
        if visits == 0.0 {
            return 0.0;
        }
        (0..self.entries)
            .map(|e| self.open_visits(e) * self.open_service(e))
            .sum::<Real>()
            / visits
    }

    /// Open demand `Rho = sum_e V(e,0) S(e,0)`.
    pub fn open_demand(&self) -> Real {
        (0..self.entries)
            .map(|e| self.open_visits(e) * self.open_service(e))
            .sum()
    }

    /// Open utilization per server, `rho = Rho / mu`.
    pub fn open_load(&self) -> Real {
        self.open_demand() / self.capacity()
    }

    // ------------------------------------------------------------------
    // Waiting times
    // ------------------------------------------------------------------

    pub fn wait_time(&self, e: usize, k: usize, p: usize) -> Real {
        self.waits[self.idx(e, k)][p]
    }

    pub fn open_wait_time(&self, e: usize, p: usize) -> Real {
        self.open_waits[e][p]
    }

    /// Residence time `R(e,k) = V(e,k) W(e,k)`.
    pub fn residence(&self, e: usize, k: usize) -> Real {
        let v = self.visits(e, k);
        if v == 0.0 { 0.0 } else { v * self.wait_time(e, k, 0) }
    }

    pub fn class_residence(&self, k: usize) -> Real {
        (0..self.entries).map(|e| self.residence(e, k)).sum()
    }

    pub fn open_residence(&self, e: usize) -> Real {
        let v = self.open_visits(e);
        if v == 0.0 { 0.0 } else { v * self.open_wait_time(e, 0) }
    }

    pub(crate) fn gamma(&self, e: usize, k: usize) -> Real {
        self.gamma[self.idx(e, k)]
    }

    /// Store the waits computed by [`Station::wait`].
    pub fn store_waits(&mut self, waits: &Waits) {
        let k = waits.class();
        for &(e, p, w) in waits.values() {
            let i = self.idx(e, k);
            self.waits[i][p] = w;
        }
    }

    /// Store the open waits computed by the open or mixed formulas.
    pub fn store_open_waits(&mut self, waits: &[(usize, PhaseVec)]) {
        for &(e, w) in waits {
            self.open_waits[e] = w;
        }
    }

    /// Store the overtaking probabilities computed by [`Station::init_step`].
    pub fn store_gamma(&mut self, gamma: Vec<Real>) {
        if gamma.len() == self.gamma.len() {
            self.gamma = gamma;
        }
    }

    /// Reset every computed wait to zero.
    pub fn clear_waits(&mut self) {
        for w in self.waits.iter_mut().chain(self.open_waits.iter_mut()) {
            *w = [0.0; MAX_PHASES + 1];
        }
        self.gamma.iter_mut().for_each(|g| *g = 0.0);
    }

    // ------------------------------------------------------------------
    // Service scaling for the mixed-network conversion
    // ------------------------------------------------------------------

    /// Multiply every closed service time by `factor`.
    pub fn scale_service(&mut self, factor: Real) {
        for s in &mut self.service {
            for x in s.iter_mut() {
                *x *= factor;
            }
        }
    }

    /// Divide every closed service time by `factor`.
    pub fn unscale_service(&mut self, factor: Real) {
        for s in &mut self.service {
            for x in s.iter_mut() {
                *x /= factor;
            }
        }
    }

    /// Force visited closed service times and all open waits to `value`.
    pub fn saturate(&mut self, value: Real) {
        for (s, v) in self.service.iter_mut().zip(&self.visits) {
            for p in 0..=MAX_PHASES {
                if v[p] != 0.0 {
                    s[p] = value;
                }
            }
        }
        for w in &mut self.open_waits {
            *w = [value; MAX_PHASES + 1];
        }
    }
}
