//! Turn a validated `ModelDef` into the solver's `Network`.

use crate::chains::{ChainKind, ChainSet};
use crate::schema::{EntryDef, ModelDef, StationDef};
use crate::validate::validate_model;
use crate::{ModelError, ModelResult};
use mva_core::Real;
use mva_solver::{MvaConfig, Network};
use mva_station::{MAX_PHASES, Station, StationError};
use tracing::debug;

/// A model lowered to dense indices, plus the names needed to report on it.
#[derive(Debug, Clone)]
pub struct BuiltModel {
    pub name: String,
    pub config: MvaConfig,
    pub chains: ChainSet,
    pub network: Network,
    /// `entries[m]` are the entry names of station `m`
    pub entries: Vec<Vec<String>>,
    /// `open_visits[c][m][e]`: visits of open chain `c` to entry `e` of station `m`, per arrival
    pub open_visits: Vec<Vec<Vec<Real>>>,
}

impl BuiltModel {
    pub fn station_names(&self) -> impl Iterator<Item = &str> {
        self.network.stations.iter().map(|s| s.name())
    }

    pub fn has_open_chains(&self) -> bool {
        self.chains.open_count() > 0
    }

    pub fn has_closed_chains(&self) -> bool {
        self.chains.closed_count() > 0
    }
}

pub fn build_model(model: &ModelDef) -> ModelResult<BuiltModel> {
    validate_model(model)?;

    let mut chains = ChainSet::new();
    for def in &model.chains {
        let id = match def.kind {
            ChainKind::Closed {
                population,
                think_time,
            } => chains.add_closed_chain(&def.name, population, think_time)?,
            ChainKind::Open { arrival_rate } => chains.add_open_chain(&def.name, arrival_rate)?,
        };
        chains.set_priority(id, def.priority)?;
    }

    let mut open_visits = vec![Vec::with_capacity(model.stations.len()); chains.open_count()];
    let mut stations = Vec::with_capacity(model.stations.len());
    let mut entries = Vec::with_capacity(model.stations.len());
    for def in &model.stations {
        let (station, visits) =
            build_station(def, &chains).map_err(|source| ModelError::Station {
                station: def.name.clone(),
                source,
            })?;
        for (c, v) in visits.into_iter().enumerate() {
            open_visits[c].push(v);
        }
        stations.push(station);
        entries.push(def.entries.iter().map(|e| e.name.clone()).collect());
    }

    let network = Network::new(stations, chains.population())
        .with_think_times(chains.think_times())
        .with_priorities(chains.priorities());
    network.validate()?;

    debug!(
        model = %model.name,
        closed = chains.closed_count(),
        open = chains.open_count(),
        stations = network.stations.len(),
        "built model"
    );

    Ok(BuiltModel {
        name: model.name.clone(),
        config: model.solver.clone(),
        chains,
        network,
        entries,
        open_visits,
    })
}

/// One open chain's demand at one entry.
#[derive(Default, Clone, Copy)]
struct OpenDemand {
    visits: Option<Real>,
    service: [Real; MAX_PHASES + 1],
    variance: [Real; MAX_PHASES + 1],
}

/// Build one station, returning its per-arrival open visits as `[chain][entry]`.
fn build_station(
    def: &StationDef,
    chains: &ChainSet,
) -> Result<(Station, Vec<Vec<Real>>), StationError> {
    let mut station = Station::new(def.kind, def.entries.len(), chains.closed_count())
        .with_name(&def.name)
        .with_phases(def.phases)?
        .with_copies(def.copies)?;
    let mut open_visits = vec![vec![0.0; def.entries.len()]; chains.open_count()];

    for (e, entry) in def.entries.iter().enumerate() {
        let mut open = vec![OpenDemand::default(); chains.open_count()];
        for demand in &entry.demands {
            if let Some(k) = chains.closed_index(&demand.chain) {
                station.set_service(e, k, demand.phase, demand.service)?;
                station.set_visits(e, k, demand.phase, demand.visits)?;
                if let Some(variance) = demand.variance {
                    station.set_variance(e, k, demand.phase, variance)?;
                }
            } else if let Some(c) = chains.open_index(&demand.chain) {
                let slot = &mut open[c];
                slot.visits.get_or_insert(demand.visits);
                slot.service[demand.phase] = demand.service;
                slot.variance[demand.phase] = demand.variance.unwrap_or(0.0);
            }
        }
        for (c, slot) in open.iter().enumerate() {
            open_visits[c][e] = slot.visits.unwrap_or(0.0);
        }
        set_open_demand(&mut station, e, &open, chains)?;
        set_entry_coupling(&mut station, e, entry, chains)?;
    }

    for overlap in &def.overlap {
        if let (Some(k), Some(j)) = (
            chains.closed_index(&overlap.chain),
            chains.closed_index(&overlap.seen_by),
        ) {
            station.set_overlap(k, j, overlap.factor)?;
        }
    }

    Ok((station, open_visits))
}

/// Open chains sharing an entry are merged: arrivals add up and each phase's
/// service is the arrival-weighted mean of the chains' service.
fn set_open_demand(
    station: &mut Station,
    e: usize,
    open: &[OpenDemand],
    chains: &ChainSet,
) -> Result<(), StationError> {
    let flows: Vec<Real> = chains
        .open()
        .zip(open)
        .map(|(chain, demand)| match chain.kind {
            ChainKind::Open { arrival_rate } => arrival_rate * demand.visits.unwrap_or(0.0),
            ChainKind::Closed { .. } => 0.0,
        })
        .collect();
    let total: Real = flows.iter().sum();
    if total == 0.0 {
        return Ok(());
    }

    station.set_open_visits(e, total)?;
    for p in 1..=station.phases() {
        let mean = |f: fn(&OpenDemand) -> [Real; MAX_PHASES + 1]| {
            flows.iter().zip(open).map(|(x, d)| x * f(d)[p]).sum::<Real>() / total
        };
        station.set_open_service(e, p, mean(|d| d.service))?;
        station.set_open_variance(e, p, mean(|d| d.variance))?;
    }
    Ok(())
}

fn set_entry_coupling(
    station: &mut Station,
    e: usize,
    entry: &EntryDef,
    chains: &ChainSet,
) -> Result<(), StationError> {
    for interlock in &entry.interlock {
        if let Some(k) = chains.closed_index(&interlock.chain) {
            station.set_interlock(e, k, interlock.flow)?;
        }
    }
    for overtaking in &entry.overtaking {
        if let Some(k) = chains.closed_index(&overtaking.chain) {
            station.set_overtaking(
                e,
                k,
                overtaking.from_phase,
                overtaking.to_phase,
                overtaking.probability,
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mva_pop::Population;
    use mva_station::StationKind;

    fn parse(text: &str) -> ModelDef {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn closed_chains_become_classes() {
        let model = parse(
            r#"
name: two-class
chains:
  - { name: a, type: closed, population: 3, think_time: 2.0 }
  - { name: web, type: open, arrival_rate: 0.5 }
  - { name: b, type: closed, population: 1, priority: 1 }
stations:
  - name: disk
    kind: hol-fcfs
    entries:
      - name: read
        demands:
          - { chain: a, service: 0.2, visits: 3.0 }
          - { chain: b, service: 0.4 }
"#,
        );
        let built = build_model(&model).unwrap();
        assert_eq!(built.network.population, Population::from(vec![3, 1]));
        assert_eq!(built.network.think_times, vec![2.0, 0.0]);
        assert_eq!(built.network.priorities, vec![0, 1]);

        let disk = &built.network.stations[0];
        assert_eq!(disk.name(), "disk");
        assert_eq!(disk.kind(), StationKind::HolFcfs);
        assert_eq!(disk.visits(0, 0), 3.0);
        assert_eq!(disk.service(0, 1), 0.4);
        assert!(!disk.has_open_arrivals());
        assert_eq!(built.entries, vec![vec!["read".to_string()]]);
    }

    #[test]
    fn open_chains_merge_per_entry() {
        let model = parse(
            r#"
name: open
chains:
  - { name: x, type: open, arrival_rate: 1.0 }
  - { name: y, type: open, arrival_rate: 0.5 }
stations:
  - name: cpu
    kind: fcfs
    entries:
      - name: e
        demands:
          - { chain: x, service: 0.1 }
          - { chain: y, service: 0.4, visits: 2.0 }
"#,
        );
        let built = build_model(&model).unwrap();
        let cpu = &built.network.stations[0];
        // flows 1.0 and 1.0, so the mean service is 0.25
        assert!((cpu.open_visits(0) - 2.0).abs() < 1e-12);
        assert!((cpu.open_service(0) - 0.25).abs() < 1e-12);
        assert_eq!(built.open_visits[1][0], vec![2.0]);
        assert!(!built.has_closed_chains());
    }

    #[test]
    fn multiserver_builds_and_bad_coupling_fails() {
        let mut model = parse(
            r#"
name: bad
chains:
  - { name: a, type: closed, population: 1 }
stations:
  - name: pool
    kind: rolia
    copies: 2
    entries:
      - name: e
        demands:
          - { chain: a, service: 1.0 }
"#,
        );
        build_model(&model).unwrap();

        model.stations[0].entries[0].interlock.push(crate::schema::InterlockDef {
            chain: "a".to_string(),
            flow: 2.0,
        });
        assert!(build_model(&model).is_err());
    }
}
