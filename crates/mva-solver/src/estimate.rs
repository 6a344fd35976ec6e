//! Estimation machinery of the approximate solvers.
//!
//! Bard-Schweitzer and the Linearizer never solve the sub-populations `N - e_j`.
//! They estimate them from the queue lengths at `N` (plus a correction `D`
//! for the Linearizer), step at `N`, and iterate to a fixed point.

use crate::error::SolverResult;
use crate::mva::Mva;
use mva_core::Real;
use mva_pop::Population;
use mva_station::{Marginals, Waits};
use nalgebra::DMatrix;
use tracing::{debug, warn};

impl Mva {
    /// Spread each chain's customers over the stations in proportion to demand.
    pub(crate) fn initialize(&mut self) -> SolverResult<()> {
        let n = self.population.clone();
        let off = self.map.offset(&n)?;
        let classes = self.classes();
        let stations = self.stations.len();

        let mut demand: Vec<Real> = vec![0.0; classes];
        for (k, d) in demand.iter_mut().enumerate() {
            for station in &self.stations {
                for e in 0..station.entries() {
                    if station.visits(e, k) == 0.0 || !d.is_finite() {
                        continue;
                    }
                    *d += station.service(e, k) * station.visits(e, k);
                }
            }
        }

        let mut station_queue: Vec<Real> = vec![0.0; stations];
        {
            let slot = self.table.slot_mut(off);
            for (m, station) in self.stations.iter().enumerate() {
                for e in 0..station.entries() {
                    for k in 0..classes {
                        let s = station.service(e, k);
                        let l = if demand[k] > 0.0 {
                            if !s.is_finite() {
                                station_queue[m] = s;
                                slot.l[m][(e, k)] = s;
                                continue;
                            }
                            s * station.visits(e, k) * n[k] as Real / demand[k]
                        } else {
                            n[k] as Real / (stations * station.entries()) as Real
                        };
                        slot.l[m][(e, k)] = l;
                        station_queue[m] += l;
                    }
                }
            }
        }

        for k in 0..classes {
            let x = if n[k] == 0 {
                0.0
            } else {
                let l = &self.table.slot(off).l;
                let mut cycle: Real = 0.0;
                for (m, station) in self.stations.iter().enumerate() {
                    if !station_queue[m].is_finite() {
                        cycle = station_queue[m];
                        continue;
                    }
                    let servers = station.capacity();
                    for e in 0..station.entries() {
                        let mut factor = 1.0;
                        if servers != 0.0 && servers.is_finite() {
                            factor += (station_queue[m] - l[m][(e, k)] / n[k] as Real) / servers;
                        }
                        cycle += factor * station.service(e, k) * station.visits(e, k);
                    }
                }
                if cycle <= 0.0 {
                    Real::INFINITY
                } else if !cycle.is_finite() {
                    0.0
                } else {
                    n[k] as Real / cycle
                }
            };
            self.table.slot_mut(off).x[k] = x;
        }

        for m in 0..stations {
            let mut waits: Vec<Waits> = (0..classes).map(Waits::new).collect();
            {
                let station = &self.stations[m];
                let slot = self.table.slot_mut(off);
                for (k, w) in waits.iter_mut().enumerate() {
                    let x = slot.x[k];
                    for e in 0..station.entries() {
                        let (v, s) = (station.visits(e, k), station.service(e, k));
                        if v == 0.0 || s == 0.0 || x == 0.0 || !x.is_finite() {
                            slot.u[m][(e, k)] = 0.0;
                            w.set(e, 0, 0.0);
                        } else {
                            let u = v * s * x;
                            slot.u[m][(e, k)] = u;
                            w.set(e, 0, slot.l[m][(e, k)] * s / u);
                        }
                    }
                }
            }
            for w in &waits {
                self.stations[m].store_waits(w);
            }

            let p = match self.stations[m].kind().marginals() {
                Marginals::None => continue,
                Marginals::Scalar => self.initial_marginals(m, &n),
                Marginals::Vector => self.binomial_marginals(m, &n, off)?,
            };
            self.table.slot_mut(off).p[m] = p;
        }

        self.table.slot_mut(off).solved = true;
        self.initialized = true;
        Ok(())
    }

    /// Even spread over the partially busy states, the remainder all busy or idle.
    fn initial_marginals(&self, m: usize, n: &Population) -> Vec<Real> {
        let copies = self.stations[m].copies() as usize;
        let customers = n.sum() as usize;
        let mut p = vec![0.0; copies + 1];
        let share = if customers > 0 {
            2.0 / (copies * (customers + 1)) as Real
        } else {
            0.0
        };
        let mut sum = 0.0;
        for pj in p.iter_mut().take(copies).skip(1) {
            *pj = share;
            sum += share;
        }
        let busy = if customers >= copies {
            share * (customers + 1 - copies) as Real
        } else {
            0.0
        };
        p[copies] = (1.0 - sum).min(busy);
        p[0] = 1.0 - (sum + p[copies]);
        p
    }

    /// Estimate `L(n - e_j)` for station `m` from the queue lengths at slot `off`.
    fn estimate_station(&mut self, m: usize, n: &Population, off: usize) -> SolverResult<()> {
        let l_n = self.table.slot(off).l[m].clone();
        let u_n = self.table.slot(off).u[m].clone();
        let classes = self.classes();

        for j in 0..classes {
            if n[j] == 0 {
                continue;
            }
            let nej = self.map.offset_e_j(n, j)?;
            let d = self.delta.as_ref().map(|delta| &delta.d[m]);
            let mut l_ej = self.table.slot(nej).l[m].clone();
            let mut u_ej = self.table.slot(nej).u[m].clone();
            for k in 0..classes {
                if n[k] == 0 {
                    continue;
                }
                let remaining = (n[k] - u32::from(k == j)) as Real;
                for e in 0..l_n.nrows() {
                    let l = l_n[(e, k)];
                    if !l.is_finite() {
                        continue;
                    }
                    let correction = d.map_or(0.0, |d| d[e][(k, j)]);
                    let estimate = (remaining * (l / n[k] as Real + correction)).max(0.0);
                    l_ej[(e, k)] = estimate;
                    u_ej[(e, k)] = if l > 0.0 {
                        estimate / l * u_n[(e, k)]
                    } else {
                        0.0
                    };
                }
            }
            let slot = self.table.slot_mut(nej);
            slot.l[m] = l_ej;
            slot.u[m] = u_ej;
            slot.solved = true;
        }
        Ok(())
    }

    /// Estimate every `L(n - e_j)`, and for the fast Linearizer the station sums `Lm`.
    pub(crate) fn estimate_l(&mut self, n: &Population) -> SolverResult<()> {
        let off = self.map.offset(n)?;
        let fast = self.delta.as_ref().is_some_and(|d| d.fast);
        for m in 0..self.stations.len() {
            self.estimate_station(m, n, off)?;
            if fast {
                self.estimate_station_sum(m, n, off);
            }
        }
        Ok(())
    }

    fn estimate_station_sum(&mut self, m: usize, n: &Population, off: usize) {
        let Some(delta) = self.delta.as_mut() else {
            return;
        };
        let station = &self.stations[m];
        let l = &self.table.slot(off).l[m];
        let classes = n.classes();
        let c = delta.c;

        for j in (0..classes).filter(|&j| n[j] > 0) {
            let s = delta.slot(Some(j));
            delta.lm[(s, m)] = 0.0;
        }
        for e in 0..station.entries() {
            let total: Real = (0..classes)
                .filter(|&k| n[k] > 0)
                .map(|k| station.service(e, k) * l[(e, k)])
                .sum();
            for j in (0..classes).filter(|&j| n[j] > 0) {
                let d = &delta.d[m][e];
                let mut own = station.service(e, j) * (l[(e, j)] / n[j] as Real + d[(j, j)]);
                if let Some(c) = c {
                    own += station.service(e, c) * d[(c, j)];
                }
                let s = delta.slot(Some(j));
                delta.lm[(s, m)] += (total + delta.dk[m][(e, j)] - own).max(0.0);
            }
        }
    }

    /// Copy the marginals at `n` into every estimated `n - e_j` slot.
    pub(crate) fn estimate_p(&mut self, n: &Population) -> SolverResult<()> {
        let off = self.map.offset(n)?;
        for k in 0..n.classes() {
            if n[k] == 0 {
                continue;
            }
            let nek = self.map.offset_e_j(n, k)?;
            self.table.copy_marginals(off, nek);
        }
        Ok(())
    }

    /// Iterate estimate and step at `n` until the queue lengths settle.
    ///
    /// Returns `false` when the iteration limit is reached; the results of the
    /// last step are kept.
    pub(crate) fn core(&mut self, n: &Population) -> SolverResult<bool> {
        let off = self.map.offset(n)?;
        let mut i = 0;
        loop {
            let last: Vec<DMatrix<Real>> = self.table.slot(off).l.clone();
            self.estimate_l(n)?;
            self.estimate_p(n)?;
            self.step(n)?;
            i += 1;

            if i > self.config.max_iterations {
                warn!(population = %n, iterations = i, "iteration limit reached");
                return Ok(false);
            }
            let slot = self.table.slot_mut(off);
            if i > self.config.underrelax_after {
                let weight = i.min(100) as Real / 100.0;
                for (l, prev) in slot.l.iter_mut().zip(&last) {
                    for k in (0..n.classes()).filter(|&k| n[k] > 0) {
                        for e in 0..l.nrows() {
                            l[(e, k)] = (1.0 - weight) * l[(e, k)] + weight * prev[(e, k)];
                        }
                    }
                }
            }

            let mut max_delta: Real = 0.0;
            for (l, prev) in slot.l.iter().zip(&last) {
                for k in (0..n.classes()).filter(|&k| n[k] > 0) {
                    for e in 0..l.nrows() {
                        max_delta = max_delta.max((l[(e, k)] - prev[(e, k)]).abs() / n[k] as Real);
                    }
                }
            }
            debug!(population = %n, iteration = i, max_delta, "core");
            if max_delta < self.termination {
                return Ok(true);
            }
        }
    }

    /// Linearizer correction `D = L(N - e_j)/(N_k - d_jk) - L(N)/N_k`.
    pub(crate) fn update_delta(&mut self) {
        let Some(delta) = self.delta.as_mut() else {
            return;
        };
        let n = &self.population;
        let classes = n.classes();
        let full = delta.map.address(None, None);

        for (m, station) in self.stations.iter().enumerate() {
            for j in 0..classes {
                if !delta.fast && n[j] == 0 {
                    continue;
                }
                let nej = delta.map.address(None, Some(j));
                let l_n = &self.table.slot(full).l[m];
                let l_ej = &self.table.slot(nej).l[m];
                for e in 0..station.entries() {
                    if delta.fast {
                        delta.dk[m][(e, j)] = 0.0;
                    }
                    for k in 0..classes {
                        let own = u32::from(k == j);
                        let d = if n[k] > own {
                            l_ej[(e, k)] / (n[k] - own) as Real - l_n[(e, k)] / n[k] as Real
                        } else {
                            0.0
                        };
                        delta.d[m][e][(k, j)] = d;
                        if delta.fast {
                            delta.dk[m][(e, j)] += station.service(e, k) * n[k] as Real * d;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MvaConfig;
    use crate::mva::Layout;
    use crate::network::Network;
    use mva_station::{Station, StationKind};

    fn station(kind: StationKind, s: Real) -> Station {
        let mut st = Station::new(kind, 1, 1);
        st.set_service(0, 0, 1, s).unwrap();
        st.set_visits(0, 0, 1, 1.0).unwrap();
        st
    }

    #[test]
    fn initial_queue_follows_demand() {
        let net = Network::new(
            vec![station(StationKind::Fcfs, 1.0), station(StationKind::Fcfs, 3.0)],
            Population::from(vec![4]),
        );
        let mut mva = Mva::new(net, Layout::Single, MvaConfig::default()).unwrap();
        mva.initialize().unwrap();
        assert!((mva.queue_length(0) - 1.0).abs() < 1e-12);
        assert!((mva.queue_length(1) - 3.0).abs() < 1e-12);
        assert!(mva.throughput(0) > 0.0);
    }

    #[test]
    fn initial_marginals_are_a_distribution() {
        let st = Station::new(StationKind::Reiser, 1, 1)
            .with_copies(3)
            .unwrap();
        let net = Network::new(vec![st], Population::from(vec![6]));
        let mva = Mva::new(net, Layout::Single, MvaConfig::default()).unwrap();
        let p = mva.initial_marginals(0, &Population::from(vec![6]));
        assert_eq!(p.len(), 4);
        assert!((p.iter().sum::<Real>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn estimates_scale_queue_lengths() {
        let net = Network::new(
            vec![station(StationKind::Fcfs, 1.0)],
            Population::from(vec![4]),
        );
        let mut mva = Mva::new(net, Layout::Single, MvaConfig::default()).unwrap();
        mva.initialize().unwrap();
        mva.estimate_l(&Population::from(vec![4])).unwrap();
        // slot 1 holds N - e_0
        assert!((mva.table.slot(1).l[0][(0, 0)] - 3.0).abs() < 1e-12);
        assert!(mva.table.slot(1).solved);
    }
}
