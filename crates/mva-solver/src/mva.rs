//! The MVA fixed-point engine shared by every solver.
//!
//! `Mva` owns the stations, the population, the result arena and the counters.
//! One `step` computes waits, throughputs, queue lengths, utilizations and
//! marginal probabilities at a population from the results already held for its
//! sub-populations. The solvers differ only in which populations they step and
//! how the sub-population results are obtained (exact recursion or estimation).

use crate::config::MvaConfig;
use crate::error::{SolverError, SolverResult};
use crate::fpe::FpMonitor;
use crate::network::Network;
use crate::status::SolveStatus;
use crate::table::{Slot, StationShape, Table};
use crate::view::StationView;
use mva_core::Real;
use mva_pop::{FullMap, PartialMap, PopError, Population, PopulationMap, SingleMap};
use mva_station::{Marginals, Station, Waits};
use nalgebra::DMatrix;
use tracing::trace;

/// Arena layout used by a solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Layout {
    /// Every population of the lattice (exact MVA)
    Full,
    /// `N` and its `K` neighbours (Bard-Schweitzer)
    Single,
    /// The Linearizer neighbourhood, optionally with the fast station sums
    Partial { fast: bool },
}

/// Linearizer correction terms.
#[derive(Clone, Debug)]
pub(crate) struct Delta {
    pub(crate) map: PartialMap,
    /// Per station and entry, `D[k][j]`
    pub(crate) d: Vec<Vec<DMatrix<Real>>>,
    /// Per station, `Dk[e][j] = sum_k S(e,k) N_k D[k][j]` (fast variant)
    pub(crate) dk: Vec<DMatrix<Real>>,
    /// Per slot and station, `sum_k S L` of the current sub-problem (fast variant)
    pub(crate) lm: DMatrix<Real>,
    /// Class removed by the current sub-problem
    pub(crate) c: Option<usize>,
    pub(crate) fast: bool,
}

impl Delta {
    fn new(population: &Population, stations: &[Station], fast: bool) -> Self {
        let classes = population.classes();
        let map = PartialMap::new(population);
        let slots = map.len();
        Self {
            map,
            d: stations
                .iter()
                .map(|s| vec![DMatrix::zeros(classes, classes); s.entries()])
                .collect(),
            dk: stations
                .iter()
                .map(|s| DMatrix::zeros(s.entries(), classes))
                .collect(),
            lm: DMatrix::zeros(slots, stations.len()),
            c: None,
            fast,
        }
    }

    /// Slot of `N - e_c - e_j` for the current sub-problem.
    pub(crate) fn slot(&self, j: Option<usize>) -> usize {
        self.map.address(self.c, j)
    }
}

pub struct Mva {
    pub(crate) stations: Vec<Station>,
    pub(crate) population: Population,
    pub(crate) think: Vec<Real>,
    pub(crate) priority: Vec<u32>,
    /// Distinct priorities, highest first
    levels: Vec<u32>,
    pub(crate) map: Box<dyn PopulationMap>,
    pub(crate) table: Table,
    pub(crate) config: MvaConfig,
    pub(crate) exact: bool,
    pub(crate) filter: Real,
    pub(crate) termination: Real,
    pub(crate) delta: Option<Delta>,
    pub(crate) fp: FpMonitor,
    pub(crate) initialized: bool,
    steps: usize,
    waits: usize,
    pub(crate) converged: bool,
}

impl std::fmt::Debug for Mva {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mva")
            .field("stations", &self.stations.len())
            .field("population", &self.population.to_string())
            .field("slots", &self.table.len())
            .field("steps", &self.steps)
            .finish()
    }
}

fn too_large(err: PopError) -> SolverError {
    SolverError::ProblemSetup {
        what: err.to_string(),
    }
}

impl Mva {
    pub(crate) fn new(network: Network, layout: Layout, config: MvaConfig) -> SolverResult<Self> {
        network.validate()?;
        let Network {
            stations,
            population,
            think_times,
            priorities,
        } = network;

        let map: Box<dyn PopulationMap> = match layout {
            Layout::Full => Box::new(FullMap::new(&population).map_err(too_large)?),
            Layout::Single => Box::new(SingleMap::new(&population)),
            Layout::Partial { .. } => Box::new(PartialMap::new(&population)),
        };
        let delta = match layout {
            Layout::Partial { fast } => Some(Delta::new(&population, &stations, fast)),
            _ => None,
        };
        let shapes = stations
            .iter()
            .map(|s| {
                Ok(StationShape {
                    entries: s.entries(),
                    marginals: match s.kind().marginals() {
                        Marginals::None => 0,
                        _ => s.marginal_size(&population).map_err(too_large)? + 1,
                    },
                })
            })
            .collect::<SolverResult<Vec<StationShape>>>()?;
        let table = Table::new(map.len(), population.classes(), &shapes);

        let mut levels = priorities.clone();
        levels.sort_unstable_by(|a, b| b.cmp(a));
        levels.dedup();

        let exact = layout == Layout::Full;
        let filter = if exact {
            1.0
        } else {
            config.multiserver_underrelaxation
        };
        let termination = config.termination_for(population.sum());
        let fp = FpMonitor::new(config.fp_policy);

        Ok(Self {
            stations,
            population,
            think: think_times,
            priority: priorities,
            levels,
            map,
            table,
            config,
            exact,
            filter,
            termination,
            delta,
            fp,
            initialized: false,
            steps: 0,
            waits: 0,
            converged: false,
        })
    }

    pub(crate) fn view(&self, m: usize) -> StationView<'_> {
        StationView::new(self, m)
    }

    pub(crate) fn classes(&self) -> usize {
        self.population.classes()
    }

    pub(crate) fn reset_counters(&mut self) {
        self.steps = 0;
        self.waits = 0;
        self.fp.reset();
    }

    /// Drop every result so the next solve starts cold.
    pub(crate) fn clear(&mut self) {
        let shapes: Vec<StationShape> = (0..self.stations.len())
            .map(|m| StationShape {
                entries: self.stations[m].entries(),
                marginals: self.table.slot(0).p[m].len(),
            })
            .collect();
        self.table = Table::new(self.map.len(), self.classes(), &shapes);
        for station in &mut self.stations {
            station.clear_waits();
        }
        self.initialized = false;
    }

    pub(crate) fn status(&self) -> SolveStatus {
        SolveStatus {
            converged: self.converged,
            iterations: self.steps,
            waits: self.waits,
            faults: self.fp.faults(),
        }
    }

    // ------------------------------------------------------------------
    // Step
    // ------------------------------------------------------------------

    /// One MVA step at population `n`.
    pub(crate) fn step(&mut self, n: &Population) -> SolverResult<()> {
        self.steps += 1;

        let gammas: Vec<Option<Vec<Real>>> = (0..self.stations.len())
            .map(|m| self.stations[m].init_step(&self.view(m)))
            .collect();
        for (station, gamma) in self.stations.iter_mut().zip(gammas) {
            if let Some(gamma) = gamma {
                station.store_gamma(gamma);
            }
        }

        let off = self.map.offset(n)?;
        for level in self.levels.clone() {
            self.step_priority(n, off, level)?;
        }
        self.update_marginals(n, off)?;

        let slot = self.table.slot_mut(off);
        slot.solved = true;
        trace!(population = %n, x = ?slot.x, "step");
        let residences = self
            .stations
            .iter()
            .flat_map(|s| (0..s.classes()).map(move |k| s.class_residence(k)));
        self.fp.check(
            self.table.slot(off).values().chain(residences),
            "step",
            self.steps,
        )
    }

    fn step_priority(&mut self, n: &Population, off: usize, level: u32) -> SolverResult<()> {
        let classes: Vec<usize> = (0..self.classes())
            .filter(|&k| self.priority[k] == level)
            .collect();

        let mut computed: Vec<(usize, Waits)> = Vec::with_capacity(self.stations.len() * classes.len());
        for m in 0..self.stations.len() {
            let view = self.view(m);
            for &k in &classes {
                let waits = self.stations[m]
                    .wait(&view, k, n)
                    .map_err(SolverError::station(m))?;
                computed.push((m, waits));
            }
        }
        self.waits += computed.len();
        for (m, waits) in &computed {
            self.stations[*m].store_waits(waits);
        }

        for &k in &classes {
            let x = self.chain_throughput(n, k);
            let slot = self.table.slot_mut(off);
            slot.x[k] = x;
            for (m, station) in self.stations.iter().enumerate() {
                for e in 0..station.entries() {
                    let (l, u) = if !x.is_finite() || x == 0.0 {
                        (0.0, 0.0)
                    } else {
                        (
                            (1.0 - station.interlock(e, k)) * x * station.residence(e, k),
                            x * station.visits(e, k) * station.service(e, k),
                        )
                    };
                    slot.l[m][(e, k)] = l;
                    slot.u[m][(e, k)] = u;
                }
            }
        }
        Ok(())
    }

    /// `N_k / (Z_k + sum R)`: infinite for a zero cycle time, zero for an infinite one.
    fn chain_throughput(&self, n: &Population, k: usize) -> Real {
        let mut cycle = self.think[k];
        'stations: for station in &self.stations {
            for e in 0..station.entries() {
                let r = station.residence(e, k);
                if !r.is_finite() {
                    cycle = Real::INFINITY;
                    break 'stations;
                }
                cycle += r;
            }
        }
        if cycle <= 0.0 {
            Real::INFINITY
        } else if !cycle.is_finite() {
            0.0
        } else {
            n[k] as Real / cycle
        }
    }

    /// Slot of `n - e_j`, or `None` when chain `j` is empty at `n`.
    pub(crate) fn sub_slot(&self, n: &Population, j: usize) -> mva_station::StationResult<Option<usize>> {
        if n.get(j) == 0 {
            return Ok(None);
        }
        let off = self.map.offset_e_j(n, j)?;
        if !self.table.slot(off).solved {
            return Err(mva_station::StationError::NotSolved {
                population: n.decremented(j)?.to_string(),
            });
        }
        Ok(Some(off))
    }

    /// Copies of `slots`, put back by [`Mva::restore_slots`] after a sub-problem.
    pub(crate) fn save_slots(&self, slots: &[usize]) -> Vec<(usize, Slot)> {
        slots
            .iter()
            .map(|&s| (s, self.table.slot(s).clone()))
            .collect()
    }

    pub(crate) fn restore_slots(&mut self, saved: Vec<(usize, Slot)>) {
        for (s, slot) in saved {
            self.table.replace(s, slot);
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    fn full(&self) -> &Slot {
        // the full population is always addressable by the solver's own map
        let off = self.map.offset(&self.population).unwrap_or(0);
        self.table.slot(off)
    }

    fn slot_at(&self, n: &Population) -> SolverResult<&Slot> {
        Ok(self.table.slot(self.map.offset(n)?))
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn station(&self, m: usize) -> SolverResult<&Station> {
        self.stations.get(m).ok_or(SolverError::OutOfRange {
            what: "station",
            index: m,
            limit: self.stations.len(),
        })
    }

    pub fn stations_mut(&mut self) -> &mut [Station] {
        &mut self.stations
    }

    pub fn into_stations(self) -> Vec<Station> {
        self.stations
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn think_times(&self) -> &[Real] {
        &self.think
    }

    pub fn priorities(&self) -> &[u32] {
        &self.priority
    }

    pub fn config(&self) -> &MvaConfig {
        &self.config
    }
}

/// Result accessors.
///
/// Station `m`, entry `e`, chain `k` and phase `p` are indices into the network
/// as built, and like slice indexing these accessors panic when one is out of
/// range; [`Mva::station`] is the checked way to look a station up. Only the
/// population argument of the `_at` forms is checked and reported as an error.
impl Mva {
    /// Throughput of chain `k` at the full population.
    pub fn throughput(&self, k: usize) -> Real {
        self.full().x[k]
    }

    pub fn throughput_at(&self, k: usize, n: &Population) -> SolverResult<Real> {
        Ok(self.slot_at(n)?.x[k])
    }

    /// Visits-weighted throughput at station `m` over all chains.
    pub fn station_throughput(&self, m: usize) -> Real {
        let station = &self.stations[m];
        let x = &self.full().x;
        let mut sum = 0.0;
        for (k, &xk) in x.iter().enumerate() {
            if xk.is_finite() {
                sum += station.class_visits(k) * xk;
            } else if station.class_visits(k) > 0.0 {
                return xk;
            }
        }
        sum
    }

    pub fn station_class_throughput(&self, m: usize, k: usize) -> Real {
        let x = self.full().x[k];
        if x.is_finite() {
            self.stations[m].class_visits(k) * x
        } else {
            x
        }
    }

    pub fn entry_throughput(&self, m: usize, e: usize) -> Real {
        let station = &self.stations[m];
        let mut sum = 0.0;
        for (k, &xk) in self.full().x.iter().enumerate() {
            if !xk.is_finite() {
                return xk;
            }
            sum += station.visits(e, k) * xk;
        }
        sum
    }

    pub fn entry_class_throughput(&self, m: usize, e: usize, k: usize) -> Real {
        self.stations[m].visits(e, k) * self.full().x[k]
    }

    /// Entry throughput per customer of chain `k`.
    pub fn normalized_throughput(&self, m: usize, e: usize, k: usize) -> Real {
        let v = self.stations[m].visits(e, k);
        let customers = self.population[k];
        if v == 0.0 || customers == 0 {
            return 0.0;
        }
        let x = self.full().x[k];
        if x.is_finite() {
            v * x / customers as Real
        } else {
            0.0
        }
    }

    pub fn utilization(&self, m: usize) -> Real {
        self.full().utilization(m)
    }

    pub fn utilization_class(&self, m: usize, k: usize) -> Real {
        self.full().class_utilization(m, k)
    }

    pub fn utilization_entry(&self, m: usize, e: usize, k: usize) -> Real {
        self.full().u[m][(e, k)]
    }

    pub fn utilization_at(&self, m: usize, n: &Population) -> SolverResult<Real> {
        Ok(self.slot_at(n)?.utilization(m))
    }

    pub fn queue_length(&self, m: usize) -> Real {
        self.full().queue_length(m)
    }

    pub fn queue_length_class(&self, m: usize, k: usize) -> Real {
        self.full().class_queue_length(m, k)
    }

    pub fn queue_length_entry(&self, m: usize, e: usize, k: usize) -> Real {
        self.full().l[m][(e, k)]
    }

    pub fn queue_length_at(&self, m: usize, n: &Population) -> SolverResult<Real> {
        Ok(self.slot_at(n)?.queue_length(m))
    }

    /// Marginal probabilities of station `m` at the full population, empty when none are kept.
    pub fn marginal_probabilities(&self, m: usize) -> &[Real] {
        &self.full().p[m]
    }

    pub fn waiting_time(&self, m: usize, e: usize, k: usize, p: usize) -> Real {
        self.stations[m].wait_time(e, k, p)
    }

    /// Residence time `R_k` of chain `k` at station `m`.
    pub fn residence_time(&self, m: usize, k: usize) -> Real {
        self.stations[m].class_residence(k)
    }

    /// Sum of the residence times of chain `k`, think time excluded.
    pub fn response_time(&self, k: usize) -> Real {
        self.stations.iter().map(|s| s.class_residence(k)).sum()
    }

    /// Think time plus the residence of chain `k` at every station except `m`.
    pub fn response_time_excluding(&self, m: usize, k: usize) -> Real {
        self.think[k]
            + self
                .stations
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != m)
                .map(|(_, s)| s.class_residence(k))
                .sum::<Real>()
    }

    /// Arrival rate of chain `k` at entry `e` of station `m` seen at population `n`.
    pub fn arrival_rate(&self, m: usize, e: usize, k: usize, n: &Population) -> SolverResult<Real> {
        let slot = self.slot_at(n)?;
        let station = &self.stations[m];
        let x = slot.x[k];
        if n.get(k) == 0 || x == 0.0 {
            let cycle = self.think[k]
                + self
                    .stations
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != m)
                    .map(|(_, s)| s.class_service(k))
                    .sum::<Real>();
            return Ok(mva_core::positive(station.visits(e, k) / cycle));
        }
        let outside = n[k] as Real - slot.l[m][(e, k)];
        if outside < 0.0 {
            return Ok(0.0);
        }
        Ok(mva_core::positive(
            n[k] as Real * station.visits(e, k) / (outside / x),
        ))
    }

    /// Newton-Raphson adjustment `X_k L(e,k) / N_k`.
    pub fn nr_factor(&self, m: usize, e: usize, k: usize) -> Real {
        let slot = self.full();
        let x = slot.x[k];
        if x.is_finite() && self.population[k] > 0 {
            x * slot.l[m][(e, k)] / self.population[k] as Real
        } else {
            0.0
        }
    }

    pub fn iterations(&self) -> usize {
        self.steps
    }

    pub fn waits(&self) -> usize {
        self.waits
    }

    pub fn faults(&self) -> usize {
        self.fp.faults()
    }

    pub fn converged(&self) -> bool {
        self.converged
    }
}
