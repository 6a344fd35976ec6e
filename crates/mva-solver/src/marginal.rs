//! Marginal queue-length probabilities of the multi-server stations.

use crate::error::SolverResult;
use crate::mva::Mva;
use mva_core::Real;
use mva_pop::{BoundedIter, Population};
use mva_station::Marginals;

impl Mva {
    /// Refresh the marginals of every station that keeps them, at slot `off` holding `n`.
    pub(crate) fn update_marginals(&mut self, n: &Population, off: usize) -> SolverResult<()> {
        for m in 0..self.stations.len() {
            let p = match (self.stations[m].kind().marginals(), self.exact) {
                (Marginals::None, _) => continue,
                (Marginals::Scalar, true) => self.exact_marginals(m, n, off)?,
                (Marginals::Scalar, false) => self.estimated_marginals(m, n, off),
                (Marginals::Vector, true) => self.exact_vector_marginals(m, n, off)?,
                (Marginals::Vector, false) => self.binomial_marginals(m, n, off)?,
            };
            self.table.slot_mut(off).p[m] = p;
        }
        Ok(())
    }

    /// Recursion over `P(N - e_k)`, renormalised when the busy states exceed one.
    fn exact_marginals(&self, m: usize, n: &Population, off: usize) -> SolverResult<Vec<Real>> {
        let copies = self.stations[m].copies() as usize;
        let current = self.table.slot(off);
        let mut p = current.p[m].clone();

        let mut subs = Vec::with_capacity(self.classes());
        for k in 0..self.classes() {
            if n.get(k) == 0 {
                continue;
            }
            let nek = self.map.offset_e_j(n, k)?;
            subs.push((current.class_utilization(m, k), &self.table.slot(nek).p[m]));
        }

        let mut busy = 0.0;
        for j in 1..copies {
            let sum: Real = subs.iter().map(|(u, sub)| u * sub[j - 1]).sum();
            p[j] = sum / j as Real;
            busy += p[j];
        }
        let sum: Real = subs
            .iter()
            .map(|(u, sub)| u * (sub[copies] + sub[copies - 1]))
            .sum();
        p[copies] = sum / self.stations[m].capacity();
        busy += p[copies];

        if busy > 1.0 {
            p[0] = 0.0;
            p[1..].iter_mut().for_each(|x| *x /= busy);
        } else {
            p[0] = 1.0 - busy;
        }
        Ok(p)
    }

    /// Krzesinski's estimate from the station utilization alone.
    fn estimated_marginals(&self, m: usize, n: &Population, off: usize) -> Vec<Real> {
        let station = &self.stations[m];
        let copies = station.copies() as usize;
        let jj = copies.min(n.sum() as usize);
        let current = self.table.slot(off);
        let u = (copies as Real).min(current.utilization(m));
        let mut p = current.p[m].clone();

        if u < station.capacity() {
            let mut total = 1.0;
            let mut product = u / station.capacity_at(1);
            for j in 1..jj {
                p[j] = product;
                total += product;
                product *= u / station.capacity_at(j + 1);
            }
            p[jj + 1..].iter_mut().for_each(|x| *x = 0.0);
            p[jj] = product * u / (copies as Real - u);
            total += p[jj];
            let p0 = 1.0 / total;
            p[0] = p0;
            if p0 != 0.0 {
                p[1..=jj].iter_mut().for_each(|x| *x *= p0);
            }
        } else {
            p[1..jj.max(1)].iter_mut().for_each(|x| *x = 0.0);
            p[jj] = 1.0;
        }
        p
    }

    /// One probability per occupancy vector `I <= n`.
    fn exact_vector_marginals(
        &self,
        m: usize,
        n: &Population,
        off: usize,
    ) -> SolverResult<Vec<Real>> {
        let station = &self.stations[m];
        let current = self.table.slot(off);
        let mut p = current.p[m].clone();

        let mut subs = Vec::with_capacity(self.classes());
        for k in 0..self.classes() {
            if n.get(k) == 0 {
                continue;
            }
            let nek = self.map.offset_e_j(n, k)?;
            subs.push((k, current.class_utilization(m, k), &self.table.slot(nek).p[m]));
        }

        let lattice = BoundedIter::new(&self.population, n)?;
        let strides: Vec<usize> = (0..self.classes()).map(|k| lattice.stride(k)).collect();
        let mut total = 0.0;
        for (i, o) in lattice {
            let sum: Real = subs
                .iter()
                .filter(|(k, _, _)| i[*k] > 0)
                .map(|(k, u, sub)| u * sub[o - strides[*k]])
                .sum();
            let value = sum / station.capacity_at(i.sum() as usize);
            p[o] = value;
            total += value;
        }

        if total > 1.0 {
            p[0] = 0.0;
            p[1..].iter_mut().for_each(|x| *x /= total);
        } else {
            p[0] = 1.0 - total;
        }
        Ok(p)
    }

    /// Schmidt's binomial occupancy per chain, with success probability `L_k / N_k`.
    pub(crate) fn binomial_marginals(
        &self,
        m: usize,
        n: &Population,
        off: usize,
    ) -> SolverResult<Vec<Real>> {
        let station = &self.stations[m];
        let current = self.table.slot(off);
        let mut p = vec![0.0; current.p[m].len()];
        let total = &self.population;
        let fraction: Vec<Real> = (0..self.classes())
            .map(|k| match total.get(k) {
                0 => 0.0,
                c => (current.class_queue_length(m, k) / c as Real).clamp(0.0, 1.0),
            })
            .collect();
        let factorials = station.factorials();
        let probability = |i: &Population| -> Real {
            (0..i.classes())
                .map(|k| {
                    let (c, x) = (total.get(k), i[k]);
                    factorials.binomial(c as usize, x as usize)
                        * fraction[k].powi(x as i32)
                        * (1.0 - fraction[k]).powi((c - x) as i32)
                })
                .product()
        };

        if let Some(p0) = p.first_mut() {
            *p0 = probability(&Population::zeros(self.classes()));
        }
        for (i, o) in BoundedIter::new(&self.population, n)? {
            p[o] = probability(&i);
        }
        Ok(p)
    }
}
