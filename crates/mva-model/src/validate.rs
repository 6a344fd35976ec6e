//! Model validation.

use crate::chains::ChainKind;
use crate::schema::{ChainDef, EntryDef, ModelDef, StationDef};
use mva_station::MAX_PHASES;
use std::collections::{HashMap, HashSet};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate name: {name} in {context}")]
    DuplicateName { name: String, context: String },

    #[error("Missing reference: {name} in {context}")]
    MissingReference { name: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported feature: {feature} - {reason}")]
    Unsupported { feature: String, reason: String },

    #[error("Model has no {what}")]
    Empty { what: &'static str },
}

pub fn validate_model(model: &ModelDef) -> Result<(), ValidationError> {
    if model.chains.is_empty() {
        return Err(ValidationError::Empty { what: "chains" });
    }
    if model.stations.is_empty() {
        return Err(ValidationError::Empty { what: "stations" });
    }

    let mut chains = HashMap::new();
    for chain in &model.chains {
        if chains.insert(chain.name.as_str(), chain).is_some() {
            return Err(ValidationError::DuplicateName {
                name: chain.name.clone(),
                context: "chains".to_string(),
            });
        }
        validate_chain(chain)?;
    }

    let mut station_names = HashSet::new();
    for station in &model.stations {
        if !station_names.insert(&station.name) {
            return Err(ValidationError::DuplicateName {
                name: station.name.clone(),
                context: "stations".to_string(),
            });
        }
        validate_station(station, &chains)?;
    }

    non_negative("solver multiserver_underrelaxation", model.solver.multiserver_underrelaxation)?;
    if let Some(epsilon) = model.solver.termination
        && (!epsilon.is_finite() || epsilon <= 0.0)
    {
        return Err(ValidationError::InvalidValue {
            field: "solver termination".to_string(),
            value: epsilon.to_string(),
            reason: "must be positive and finite".to_string(),
        });
    }

    Ok(())
}

fn validate_chain(chain: &ChainDef) -> Result<(), ValidationError> {
    match chain.kind {
        ChainKind::Closed { think_time, .. } => {
            non_negative(&format!("chain '{}' think_time", chain.name), think_time)
        }
        ChainKind::Open { arrival_rate } => {
            non_negative(&format!("chain '{}' arrival_rate", chain.name), arrival_rate)?;
            if chain.priority != 0 {
                return Err(ValidationError::InvalidValue {
                    field: format!("chain '{}' priority", chain.name),
                    value: chain.priority.to_string(),
                    reason: "only closed chains carry a priority".to_string(),
                });
            }
            Ok(())
        }
    }
}

fn validate_station(
    station: &StationDef,
    chains: &HashMap<&str, &ChainDef>,
) -> Result<(), ValidationError> {
    if station.copies == 0 {
        return Err(ValidationError::InvalidValue {
            field: format!("station '{}' copies", station.name),
            value: "0".to_string(),
            reason: "at least one server is required".to_string(),
        });
    }
    if station.copies > 1 && !station.kind.is_multi_server() {
        return Err(ValidationError::Unsupported {
            feature: format!("{} copies of '{}'", station.copies, station.name),
            reason: format!("{} is a single-server kind", station.kind),
        });
    }
    if station.phases == 0 || station.phases > MAX_PHASES {
        return Err(ValidationError::InvalidValue {
            field: format!("station '{}' phases", station.name),
            value: station.phases.to_string(),
            reason: format!("must be between 1 and {MAX_PHASES}"),
        });
    }
    if station.entries.is_empty() {
        return Err(ValidationError::Empty { what: "entries" });
    }

    let mut entry_names = HashSet::new();
    for entry in &station.entries {
        if !entry_names.insert(&entry.name) {
            return Err(ValidationError::DuplicateName {
                name: entry.name.clone(),
                context: format!("station '{}' entries", station.name),
            });
        }
        validate_entry(station, entry, chains)?;
    }

    if station.kind.is_multi_server() && !station.kind.is_reiser() && !station.kind.is_conway() {
        let kinds: HashSet<bool> = station
            .entries
            .iter()
            .flat_map(|e| &e.demands)
            .filter_map(|d| chains.get(d.chain.as_str()))
            .map(|c| c.kind.is_closed())
            .collect();
        if kinds.len() > 1 {
            return Err(ValidationError::Unsupported {
                feature: format!("open and closed chains at '{}'", station.name),
                reason: format!("{} stations have no mixed waiting time", station.kind),
            });
        }
    }

    for overlap in &station.overlap {
        for name in [&overlap.chain, &overlap.seen_by] {
            closed_chain(chains, name, &format!("station '{}' overlap", station.name))?;
        }
        non_negative(&format!("station '{}' overlap factor", station.name), overlap.factor)?;
    }

    Ok(())
}

fn validate_entry(
    station: &StationDef,
    entry: &EntryDef,
    chains: &HashMap<&str, &ChainDef>,
) -> Result<(), ValidationError> {
    let context = format!("station '{}' entry '{}'", station.name, entry.name);

    for demand in &entry.demands {
        let chain = chains
            .get(demand.chain.as_str())
            .ok_or_else(|| ValidationError::MissingReference {
                name: demand.chain.clone(),
                context: context.clone(),
            })?;
        if demand.phase == 0 || demand.phase > station.phases {
            return Err(ValidationError::InvalidValue {
                field: format!("{context} phase"),
                value: demand.phase.to_string(),
                reason: format!("station has {} phase(s)", station.phases),
            });
        }
        non_negative(&format!("{context} service"), demand.service)?;
        non_negative(&format!("{context} visits"), demand.visits)?;
        if let Some(variance) = demand.variance {
            non_negative(&format!("{context} variance"), variance)?;
        }
        if !chain.kind.is_closed() && open_unsupported(station) {
            return Err(ValidationError::Unsupported {
                feature: format!("open chain '{}' at {context}", chain.name),
                reason: format!("{} stations have no open-class waiting time", station.kind),
            });
        }
    }

    for interlock in &entry.interlock {
        closed_chain(chains, &interlock.chain, &context)?;
        probability(&format!("{context} interlock"), interlock.flow)?;
    }

    for overtaking in &entry.overtaking {
        closed_chain(chains, &overtaking.chain, &context)?;
        if overtaking.from_phase > MAX_PHASES
            || overtaking.to_phase == 0
            || overtaking.to_phase > station.phases
        {
            return Err(ValidationError::InvalidValue {
                field: format!("{context} overtaking phases"),
                value: format!("{} -> {}", overtaking.from_phase, overtaking.to_phase),
                reason: "phase out of range".to_string(),
            });
        }
        probability(&format!("{context} overtaking"), overtaking.probability)?;
    }

    Ok(())
}

/// Open arrivals at these kinds have no waiting-time formula.
fn open_unsupported(station: &StationDef) -> bool {
    station.kind.is_priority() || station.kind == mva_station::StationKind::Suri
}

fn closed_chain(
    chains: &HashMap<&str, &ChainDef>,
    name: &str,
    context: &str,
) -> Result<(), ValidationError> {
    match chains.get(name) {
        Some(chain) if chain.kind.is_closed() => Ok(()),
        Some(_) => Err(ValidationError::InvalidValue {
            field: context.to_string(),
            value: name.to_string(),
            reason: "must name a closed chain".to_string(),
        }),
        None => Err(ValidationError::MissingReference {
            name: name.to_string(),
            context: context.to_string(),
        }),
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    mva_core::ensure_non_negative(value, "value")
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "must be finite and non-negative".to_string(),
        })
}

fn probability(field: &str, value: f64) -> Result<(), ValidationError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "must be a probability".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DemandDef;
    use mva_station::StationKind;

    fn model() -> ModelDef {
        serde_yaml::from_str(
            r#"
name: two
chains:
  - { name: users, type: closed, population: 2 }
stations:
  - name: cpu
    kind: fcfs
    entries:
      - name: e
        demands:
          - { chain: users, service: 1.0 }
"#,
        )
        .unwrap()
    }

    #[test]
    fn accepts_minimal_model() {
        validate_model(&model()).unwrap();
    }

    #[test]
    fn rejects_unknown_chain() {
        let mut m = model();
        m.stations[0].entries[0].demands.push(DemandDef {
            chain: "ghost".to_string(),
            phase: 1,
            service: 1.0,
            visits: 1.0,
            variance: None,
        });
        assert!(matches!(
            validate_model(&m),
            Err(ValidationError::MissingReference { .. })
        ));
    }

    #[test]
    fn rejects_bad_numbers() {
        let mut m = model();
        m.stations[0].entries[0].demands[0].service = -1.0;
        assert!(matches!(validate_model(&m), Err(ValidationError::InvalidValue { .. })));

        let mut m = model();
        m.stations[0].entries[0].demands[0].phase = 2;
        assert!(validate_model(&m).is_err());

        let mut m = model();
        m.stations[0].copies = 2;
        assert!(matches!(validate_model(&m), Err(ValidationError::Unsupported { .. })));
    }

    #[test]
    fn rejects_open_chain_at_priority_station() {
        let mut m = model();
        m.chains.push(ChainDef {
            name: "arrivals".to_string(),
            kind: ChainKind::Open { arrival_rate: 0.2 },
            priority: 0,
        });
        m.stations[0].kind = StationKind::HolFcfs;
        m.stations[0].entries[0].demands.push(DemandDef {
            chain: "arrivals".to_string(),
            phase: 1,
            service: 1.0,
            visits: 1.0,
            variance: None,
        });
        assert!(matches!(validate_model(&m), Err(ValidationError::Unsupported { .. })));
    }

    #[test]
    fn rejects_duplicates() {
        let mut m = model();
        let copy = m.stations[0].clone();
        m.stations.push(copy);
        assert!(matches!(validate_model(&m), Err(ValidationError::DuplicateName { .. })));
    }
}
