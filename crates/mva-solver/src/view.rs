//! Solver state as seen by one station's waiting-time formulas.

use crate::mva::Mva;
use mva_core::{Real, positive};
use mva_pop::{BoundedIter, Population};
use mva_station::{Phase2Correction, QueueContext, Station, StationResult};
use nalgebra::DMatrix;

pub(crate) struct StationView<'a> {
    mva: &'a Mva,
    m: usize,
}

impl<'a> StationView<'a> {
    pub(crate) fn new(mva: &'a Mva, m: usize) -> Self {
        Self { mva, m }
    }

    fn station(&self) -> &'a Station {
        &self.mva.stations[self.m]
    }

    fn classes(&self) -> usize {
        self.mva.classes()
    }

    /// Priority servers ignore classes of lower priority than `j`.
    fn skipped(&self, k: usize, j: usize) -> bool {
        self.station().is_priority() && self.mva.priority[k] < self.mva.priority[j]
    }

    fn l_at(&self, slot: usize) -> &'a DMatrix<Real> {
        &self.mva.table.slot(slot).l[self.m]
    }

    fn u_at(&self, slot: usize) -> &'a DMatrix<Real> {
        &self.mva.table.slot(slot).u[self.m]
    }

    fn at(&self, n: &Population) -> StationResult<usize> {
        Ok(self.mva.map.offset(n)?)
    }

    /// Overlap factor and, when enabled, the tau correction for chain `k` seen by `j`.
    fn scaling(&self, j: usize, k: usize, n: &Population) -> StationResult<Real> {
        if k == j {
            return Ok(1.0);
        }
        let station = self.station();
        let mut scaling = station.overlap(k, j);
        let limit = self.mva.config.bounds_limit;
        if station.has_tau() && limit > 0.0 {
            scaling *= self.tau(j, k, n, limit)?;
        }
        Ok(scaling)
    }

    fn tau(&self, j: usize, k: usize, n: &Population, limit: Real) -> StationResult<Real> {
        let x = &self.mva.table.slot(self.at(n)?).x;
        if n.get(j) == 0 || !x[j].is_finite() || !x[k].is_finite() {
            return Ok(1.0);
        }
        let station = self.station();
        let lambda_j = x[j] * station.class_visits(j);
        let lambda_k = x[k] * station.class_visits(k);
        if lambda_j == 0.0 || lambda_k == 0.0 {
            return Ok(1.0);
        }
        let nej = self.mva.map.offset_e_j(n, j)?;
        let l_k = self.l_at(nej).column(k).sum() * station.overlap(k, j);
        let ratio = (l_k * lambda_j) / (lambda_k * n[j] as Real);
        Ok(1.0 / (1.0 + ratio.powf(limit)).powf(1.0 / limit))
    }

    /// Fast Linearizer station sum for non-priority servers.
    fn cached_sl(&self, j: usize) -> Option<Real> {
        let delta = self.mva.delta.as_ref()?;
        if !delta.fast || self.station().is_priority() {
            return None;
        }
        Some(delta.lm[(delta.slot(Some(j)), self.m)])
    }
}

impl QueueContext for StationView<'_> {
    fn filter(&self) -> Real {
        self.mva.filter
    }

    fn phase2(&self) -> Phase2Correction {
        self.mva.config.phase2
    }

    fn sum_l(&self, n: &Population, j: usize) -> StationResult<Real> {
        let Some(nej) = self.mva.sub_slot(n, j)? else {
            return Ok(0.0);
        };
        let l = self.l_at(nej);
        let mut sum = 0.0;
        for k in 0..self.classes() {
            if self.skipped(k, j) {
                continue;
            }
            sum += l.column(k).sum() * self.scaling(j, k, n)?;
        }
        Ok(sum)
    }

    fn sum_sl(&self, n: &Population, j: usize) -> StationResult<Real> {
        let Some(nej) = self.mva.sub_slot(n, j)? else {
            return Ok(0.0);
        };
        if let Some(sum) = self.cached_sl(j) {
            return Ok(sum);
        }
        let station = self.station();
        let l = self.l_at(nej);
        let mut sum = 0.0;
        for k in 0..self.classes() {
            if self.skipped(k, j) {
                continue;
            }
            let scaling = self.scaling(j, k, n)?;
            for e in 0..station.entries() {
                let s = station.service(e, k);
                if !s.is_finite() {
                    return Ok(s);
                }
                sum += s * l[(e, k)] * scaling;
            }
        }
        Ok(sum)
    }

    fn sum_sq(&self, n: &Population, j: usize) -> StationResult<Real> {
        let Some(nej) = self.mva.sub_slot(n, j)? else {
            return Ok(0.0);
        };
        let station = self.station();
        let (l, u) = (self.l_at(nej), self.u_at(nej));
        let mut sum = 0.0;
        for k in 0..self.classes() {
            if self.skipped(k, j) {
                continue;
            }
            let scaling = self.scaling(j, k, n)?;
            for e in 0..station.entries() {
                let queued = l[(e, k)] - u[(e, k)];
                if queued <= 0.0 {
                    continue;
                }
                let s = station.service(e, k);
                if !s.is_finite() {
                    return Ok(s);
                }
                sum += s * queued * scaling;
            }
        }
        Ok(sum)
    }

    fn sum_su(&self, n: &Population, j: usize) -> StationResult<Real> {
        let Some(nej) = self.mva.sub_slot(n, j)? else {
            return Ok(0.0);
        };
        let station = self.station();
        let u = self.u_at(nej);
        let mut sum = 0.0;
        for k in 0..self.classes() {
            if station.is_priority() && self.mva.priority[k] >= self.mva.priority[j] {
                continue;
            }
            let scaling = self.scaling(j, k, n)?;
            for e in 0..station.entries() {
                sum += station.service(e, k) * u[(e, k)] * scaling;
            }
        }
        Ok(sum)
    }

    fn sum_ru(&self, n: &Population, j: usize) -> StationResult<Real> {
        let Some(nej) = self.mva.sub_slot(n, j)? else {
            return Ok(0.0);
        };
        let station = self.station();
        let u = self.u_at(nej);
        let mut sum = 0.0;
        for k in 0..self.classes() {
            if self.skipped(k, j) {
                continue;
            }
            let scaling = self.scaling(j, k, n)?;
            for e in 0..station.entries() {
                let r = station.residual_service(e, k, 0);
                if !r.is_finite() {
                    return Ok(r);
                }
                sum += r * u[(e, k)] * scaling;
            }
        }
        Ok(sum)
    }

    fn sum_s2u_entry(&self, e: usize, n: &Population, j: usize) -> StationResult<Real> {
        let Some(nej) = self.mva.sub_slot(n, j)? else {
            return Ok(0.0);
        };
        let station = self.station();
        let u = self.u_at(nej);
        let mut sum = 0.0;
        for k in 0..self.classes() {
            if self.skipped(k, j) {
                continue;
            }
            sum += station.second_phase(e, k) * u[(e, k)] * self.scaling(j, k, n)?;
        }
        Ok(sum)
    }

    fn sum_u(&self, n: &Population, j: usize) -> StationResult<Real> {
        let Some(nej) = self.mva.sub_slot(n, j)? else {
            return Ok(0.0);
        };
        let u = self.u_at(nej);
        let mut sum = 0.0;
        for k in 0..self.classes() {
            sum += u.column(k).sum() * self.scaling(j, k, n)?;
        }
        Ok(sum)
    }

    fn sum_u2(&self, n: &Population, j: usize) -> StationResult<Real> {
        let Some(nej) = self.mva.sub_slot(n, j)? else {
            return Ok(0.0);
        };
        let station = self.station();
        let u = self.u_at(nej);
        let mut sum = 0.0;
        for k in 0..self.classes() {
            if self.skipped(k, j) {
                continue;
            }
            let scaling = self.scaling(j, k, n)?;
            for e in 0..station.entries() {
                let s = station.service(e, k);
                if s == 0.0 {
                    continue;
                }
                sum += u[(e, k)] * (station.second_phase(e, k) / s) * scaling;
            }
        }
        Ok(sum)
    }

    fn sum_us_prot(
        &self,
        e: usize,
        prot: Real,
        n: &Population,
        j: usize,
    ) -> StationResult<Real> {
        let Some(nej) = self.mva.sub_slot(n, j)? else {
            return Ok(0.0);
        };
        let station = self.station();
        let u = self.u_at(nej);
        let mut sum = 0.0;
        for k in 0..self.classes() {
            let s = station.service(e, k);
            if !s.is_finite() || s == 0.0 || u[(e, k)] == 0.0 {
                continue;
            }
            let s2 = station.second_phase(e, k);
            let overtaken = (1.0 - prot) * s2 * s2 / s - prot * station.phase_service(e, k, 1);
            if overtaken <= 0.0 {
                continue;
            }
            sum += overtaken * u[(e, k)] * self.scaling(j, k, n)?;
        }
        Ok(sum)
    }

    fn sum_p(&self, n: &Population, j: usize) -> StationResult<Real> {
        let Some(nej) = self.mva.sub_slot(n, j)? else {
            return Ok(0.0);
        };
        let copies = self.station().copies() as usize;
        if copies < 2 {
            return Ok(0.0);
        }
        let p = &self.mva.table.slot(nej).p[self.m];
        Ok((0..copies - 1)
            .map(|i| (copies - 1 - i) as Real * p.get(i).copied().unwrap_or(0.0))
            .sum())
    }

    fn sum_sp2(&self, n: &Population, j: usize) -> StationResult<Real> {
        let Some(nej) = self.mva.sub_slot(n, j)? else {
            return Ok(0.0);
        };
        let station = self.station();
        let p = &self.mva.table.slot(nej).p[self.m];
        let lattice = BoundedIter::new(&self.mva.population, n)?;
        let stride = lattice.stride(j);
        let mut sum = 0.0;
        for (i, off) in lattice {
            if i[j] == 0 {
                continue;
            }
            sum += station.mu_s(&i, j) * p.get(off - stride).copied().unwrap_or(0.0);
        }
        Ok(sum)
    }

    fn pb(&self, n: &Population, j: usize) -> StationResult<Real> {
        let Some(nej) = self.mva.sub_slot(n, j)? else {
            return Ok(0.0);
        };
        let busy = self.station().marginal_size(&self.mva.population)?;
        Ok(self.mva.table.slot(nej).p[self.m]
            .get(busy)
            .copied()
            .unwrap_or(0.0))
    }

    fn priority_inflation(&self, n: &Population, j: usize) -> StationResult<Real> {
        let station = self.station();
        let off = self.at(n)?;
        let (l, u) = (self.l_at(off), self.u_at(off));
        let mut util = 0.0;
        for k in 0..self.classes() {
            if self.mva.priority[k] <= self.mva.priority[j] || n.get(k) == 0 {
                continue;
            }
            if self.mva.exact {
                // interpolate the utilization at N - L e_k
                for e in 0..station.entries() {
                    let queue = l[(e, k)];
                    let frac = queue.fract();
                    let mut lo = n.clone();
                    lo[k] = n[k].saturating_sub(queue.floor() as u32);
                    let mut hi = n.clone();
                    hi[k] = n[k].saturating_sub(queue.ceil() as u32);
                    util += (1.0 - frac) * self.u_at(self.at(&lo)?)[(e, k)]
                        + frac * self.u_at(self.at(&hi)?)[(e, k)];
                }
            } else {
                let nek = self.mva.map.offset_e_j(n, k)?;
                let u_ek = self.u_at(nek);
                for e in 0..station.entries() {
                    util += positive(u[(e, k)] - l[(e, k)] * (u[(e, k)] - u_ek[(e, k)]));
                }
            }
        }
        Ok(util)
    }

    fn utilization_fraction(&self, i: usize, n: &Population, j: usize) -> StationResult<Real> {
        let Some(nej) = self.mva.sub_slot(n, j)? else {
            return Ok(0.0);
        };
        let u = self.u_at(nej);
        let total = u.sum();
        Ok(if total == 0.0 {
            0.0
        } else {
            u.column(i).sum() / total
        })
    }

    fn utilization(&self, n: &Population) -> StationResult<Real> {
        Ok(self.u_at(self.at(n)?).sum())
    }

    fn queue_only(&self, i: usize, n: &Population, j: usize) -> StationResult<Real> {
        let Some(nej) = self.mva.sub_slot(n, j)? else {
            return Ok(0.0);
        };
        let station = self.station();
        let (l, u) = (self.l_at(nej), self.u_at(nej));
        Ok((0..station.entries())
            .filter(|&e| station.service(e, i) != 0.0)
            .map(|e| positive(l[(e, i)] - u[(e, i)]))
            .sum())
    }

    fn queue_length(&self, n: &Population) -> StationResult<Real> {
        Ok(self.l_at(self.at(n)?).sum())
    }

    fn throughput(&self, n: &Population, k: usize) -> StationResult<Real> {
        Ok(self.mva.table.slot(self.at(n)?).x[k])
    }

    fn response_time_excluding(&self, k: usize) -> Real {
        self.mva.response_time_excluding(self.m, k)
    }

    fn marginals(&self, n: &Population) -> StationResult<Vec<Real>> {
        Ok(self.mva.table.slot(self.at(n)?).p[self.m].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MvaConfig;
    use crate::mva::Layout;
    use crate::network::Network;
    use mva_station::StationKind;

    fn three_classes(kind: StationKind) -> Mva {
        let mut st = Station::new(kind, 1, 3);
        for k in 0..3 {
            st.set_service(0, k, 1, 1.0 + k as Real).unwrap();
            st.set_visits(0, k, 1, 1.0).unwrap();
        }
        let network = Network::new(vec![st], Population::from(vec![1, 1, 1]))
            .with_priorities(vec![3, 2, 1]);
        let mut mva = Mva::new(network, Layout::Single, MvaConfig::default()).unwrap();
        // slot j + 1 holds N - e_j
        for j in 0..3 {
            let slot = mva.table.slot_mut(j + 1);
            for k in 0..3 {
                slot.u[0][(0, k)] = 0.1;
            }
            slot.solved = true;
        }
        mva
    }

    #[test]
    fn sum_su_counts_only_lower_priorities_at_priority_stations() {
        let n = Population::from(vec![1, 1, 1]);
        let hol = three_classes(StationKind::HolFcfs);
        let view = hol.view(0);
        // class 1 (priority 2) sees class 2 (priority 1, S = 3) only
        assert!((view.sum_su(&n, 1).unwrap() - 0.3).abs() < 1e-12);
        assert!((view.sum_su(&n, 0).unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(view.sum_su(&n, 2).unwrap(), 0.0);

        let fcfs = three_classes(StationKind::Fcfs);
        assert!((fcfs.view(0).sum_su(&n, 2).unwrap() - 0.6).abs() < 1e-12);
    }
}
