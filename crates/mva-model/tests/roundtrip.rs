use mva_model::*;
use mva_solver::{MvaConfig, SolverKind};
use mva_station::StationKind;
use std::path::Path;

fn models_dir() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../models")
}

fn two_station_model() -> ModelDef {
    ModelDef {
        name: "Two Stations".to_string(),
        solver: MvaConfig::default(),
        chains: vec![
            ChainDef {
                name: "users".to_string(),
                kind: ChainKind::Closed {
                    population: 2,
                    think_time: 1.0,
                },
                priority: 0,
            },
            ChainDef {
                name: "batch".to_string(),
                kind: ChainKind::Open { arrival_rate: 0.1 },
                priority: 0,
            },
        ],
        stations: vec![StationDef {
            name: "cpu".to_string(),
            kind: StationKind::Ps,
            copies: 1,
            phases: 2,
            entries: vec![EntryDef {
                name: "serve".to_string(),
                demands: vec![
                    DemandDef {
                        chain: "users".to_string(),
                        phase: 1,
                        service: 0.5,
                        visits: 1.0,
                        variance: None,
                    },
                    DemandDef {
                        chain: "users".to_string(),
                        phase: 2,
                        service: 0.25,
                        visits: 1.0,
                        variance: Some(0.1),
                    },
                    DemandDef {
                        chain: "batch".to_string(),
                        phase: 1,
                        service: 1.0,
                        visits: 1.0,
                        variance: None,
                    },
                ],
                interlock: vec![],
                overtaking: vec![],
            }],
            overlap: vec![],
        }],
    }
}

#[test]
fn roundtrip_yaml() {
    let model = two_station_model();
    let path = std::env::temp_dir().join("mva_model_roundtrip.yaml");

    save_yaml(&path, &model).unwrap();
    let loaded = load_yaml(&path).unwrap();

    assert_eq!(model, loaded);
}

#[test]
fn roundtrip_json() {
    let model = two_station_model();
    let path = std::env::temp_dir().join("mva_model_roundtrip.json");

    save_json(&path, &model).unwrap();
    let loaded = load_model(&path).unwrap();

    assert_eq!(model, loaded);
}

#[test]
fn save_refuses_invalid_model() {
    let mut model = two_station_model();
    model.stations[0].entries[0].demands[0].chain = "nobody".to_string();
    let path = std::env::temp_dir().join("mva_model_invalid.yaml");

    assert!(matches!(
        save_yaml(&path, &model),
        Err(ModelError::Validation(ValidationError::MissingReference { .. }))
    ));
}

#[test]
fn unknown_extension_is_rejected() {
    let path = std::env::temp_dir().join("mva_model.toml");
    assert!(matches!(load_model(&path), Err(ModelError::Extension(_))));
}

#[test]
fn bundled_models_load_and_build() {
    for name in ["terminals.yaml", "mixed.yaml", "priority.yaml"] {
        let path = models_dir().join(name);
        let model = load_model(&path).unwrap_or_else(|e| panic!("Failed to load {name}: {e}"));
        build_model(&model).unwrap_or_else(|e| panic!("Failed to build {name}: {e}"));
    }
}

#[test]
fn terminals_model_solves_to_known_throughput() {
    let model = load_model(&models_dir().join("terminals.yaml")).unwrap();
    let built = build_model(&model).unwrap();

    let mut solver = SolverKind::Exact
        .build(built.network.clone(), built.config.clone())
        .unwrap();
    let status = solver.solve().unwrap();
    let results = ModelResults::from_mva(&built, solver.mva(), SolverKind::Exact, status);

    let users = results.chain("users").unwrap();
    assert!((users.throughput - 2.0 / 5.2).abs() < 1e-9);
    let cpu = results.station("cpu").unwrap();
    assert_eq!(cpu.kind, "fcfs");
    assert_eq!(cpu.classes.len(), 1);
    assert!((cpu.utilization - 2.0 / 5.2).abs() < 1e-9);

    let text = serde_json::to_string(&results).unwrap();
    let back: ModelResults = serde_json::from_str(&text).unwrap();
    assert_eq!(back.solver, Some(SolverKind::Exact));
    assert!((back.chains[0].throughput - users.throughput).abs() < 1e-12);
}
