//! Open classes, alone or mixed with a solved closed network.
//!
//! Open arrivals are described on each station by its open visits (arrival rate
//! times visits) and open service. In a mixed network the closed classes are
//! solved first on service times inflated by [`OpenModel::convert`], then the open
//! waits are computed from the closed queue lengths by [`Mva::solve_mixed`].

use crate::error::{SolverError, SolverResult};
use crate::mva::Mva;
use mva_core::Real;
use mva_pop::Population;
use mva_station::{OpenWaits, Station, StationResult};
use tracing::warn;

#[derive(Debug)]
pub struct OpenModel<'a> {
    stations: &'a mut [Station],
}

impl<'a> OpenModel<'a> {
    pub fn new(stations: &'a mut [Station]) -> Self {
        Self { stations }
    }

    /// Scale the closed service times by `alpha(n) / alpha(n - 1)`, `n = |N|`.
    ///
    /// A station whose factor cannot be formed is saturated and the last such
    /// station is reported as [`SolverError::Overflow`]; the others are still converted.
    pub fn convert(&mut self, n: &Population) -> SolverResult<()> {
        let customers = n.sum() as usize;
        let mut overflow = None;
        for (m, station) in self.stations.iter_mut().enumerate() {
            let factor = match (station.alpha(customers.saturating_sub(1)), station.alpha(customers)) {
                (Ok(num), Ok(den)) if num.is_finite() && den.is_finite() => Some(den / num),
                _ => None,
            };
            match factor {
                Some(f) => station.scale_service(f),
                None => {
                    warn!(station = m, customers, "open load overflows the station");
                    station.saturate(Real::INFINITY);
                    overflow = Some(m);
                }
            }
        }
        overflow.map_or(Ok(()), |station| Err(SolverError::Overflow { station }))
    }

    /// Open waits with no closed customers present.
    pub fn solve(&mut self) -> SolverResult<()> {
        let results = self
            .stations
            .iter()
            .map(|station| {
                if station.has_open_arrivals() {
                    station.open_wait().map(Some)
                } else {
                    Ok(None)
                }
            })
            .collect();
        store_results(&mut *self.stations, results)
    }

    pub fn throughput(&self, m: usize) -> Real {
        self.stations[m].open_throughput()
    }

    /// Open throughput of entry `e`, scaled back when the station is overloaded.
    pub fn entry_throughput(&self, m: usize, e: usize) -> Real {
        self.stations[m].open_entry_throughput(e)
    }

    pub fn utilization(&self, m: usize) -> Real {
        self.stations[m].open_utilization()
    }

    pub fn entry_utilization(&self, m: usize, e: usize) -> Real {
        self.stations[m].open_entry_utilization(e)
    }
}

/// Store the computed waits; a failing station is saturated and the last one
/// is reported once all stations are done.
fn store_results(
    stations: &mut [Station],
    results: Vec<StationResult<Option<OpenWaits>>>,
) -> SolverResult<()> {
    let mut overflow = None;
    for (m, (station, result)) in stations.iter_mut().zip(results).enumerate() {
        match result {
            Ok(Some(waits)) => station.store_open_waits(&waits),
            Ok(None) => {}
            Err(e) => {
                warn!(station = m, error = %e, "open wait failed");
                station.saturate(Real::INFINITY);
                overflow = Some(m);
            }
        }
    }
    overflow.map_or(Ok(()), |station| Err(SolverError::Overflow { station }))
}

impl Mva {
    /// Open waits of a mixed network from the solved closed population `N`.
    ///
    /// Stations without open arrivals are skipped. Stations that also serve closed
    /// classes use the mixed formula, the rest the plain open one.
    pub fn solve_mixed(&mut self) -> SolverResult<()> {
        let results: Vec<StationResult<Option<OpenWaits>>> = (0..self.stations.len())
            .map(|m| {
                let station = &self.stations[m];
                if !station.has_open_arrivals() {
                    Ok(None)
                } else if station.has_closed_visits() {
                    station.mixed_wait(&self.view(m), &self.population).map(Some)
                } else {
                    station.open_wait().map(Some)
                }
            })
            .collect();
        store_results(&mut self.stations, results)
    }
}
