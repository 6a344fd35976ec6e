use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use mva_app::{AppError, SolveOptions, SolveRequest, ensure_run, list_runs, load_run, solve_batch};
use mva_solver::SolverKind;

fn models_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../models")
}

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{}_{}", prefix, nanos));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn write_model(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).expect("failed to write model");
    path
}

fn solve(path: &Path, solver: SolverKind) -> Result<mva_model::ModelResults, AppError> {
    let model = mva_app::load_model(path)?;
    mva_app::solve_model(&model, solver)
}

#[test]
fn closed_model_matches_hand_computation() {
    let results = solve(&models_dir().join("terminals.yaml"), SolverKind::Exact).unwrap();
    assert_eq!(results.solver, Some(SolverKind::Exact));
    assert!(results.status.converged);
    let users = results.chain("users").unwrap();
    assert!((users.throughput - 2.0 / 5.2).abs() < 1e-9);
    assert!(results.open.is_empty());
}

#[test]
fn mixed_model_inflates_closed_service_and_reports_open_waits() {
    let results = solve(&models_dir().join("mixed.yaml"), SolverKind::Exact).unwrap();

    // Open load 0.2 inflates the closed service time from 1 to 1.25; with one
    // customer the queue is 1.25 / 5.25.
    let users = results.chain("users").unwrap();
    assert!((users.throughput - 2.0 / (4.0 + 1.25 * (1.0 + 1.25 / 5.25))).abs() < 1e-6);

    // The open arrivals wait 1.25 times (1 + closed queue).
    let batch = results.open_chain("batch").unwrap();
    assert!(batch.response_time > 1.875 && batch.response_time < 2.0, "{batch:?}");
    let cpu = results.station("cpu").unwrap();
    assert!((cpu.open_utilization - 0.2).abs() < 1e-12);
}

#[test]
fn open_only_model_is_mm1() {
    let dir = unique_temp_dir("mva_app_open");
    let path = write_model(
        &dir,
        "open.yaml",
        r#"
name: open
chains:
  - { name: web, type: open, arrival_rate: 0.5 }
stations:
  - name: cpu
    kind: fcfs
    entries:
      - name: e
        demands:
          - { chain: web, service: 1.0 }
"#,
    );
    let results = solve(&path, SolverKind::Linearizer).unwrap();
    assert_eq!(results.solver, None);
    assert!(results.chains.is_empty());
    let web = results.open_chain("web").unwrap();
    assert!((web.response_time - 2.0).abs() < 1e-12);
    assert!((results.stations[0].open_utilization - 0.5).abs() < 1e-12);
}

#[test]
fn overloaded_open_model_is_an_error() {
    let dir = unique_temp_dir("mva_app_overload");
    let path = write_model(
        &dir,
        "overload.yaml",
        r#"
name: overload
chains:
  - { name: web, type: open, arrival_rate: 2.0 }
stations:
  - name: cpu
    kind: fcfs
    entries:
      - name: e
        demands:
          - { chain: web, service: 1.0 }
"#,
    );
    assert!(matches!(solve(&path, SolverKind::Exact), Err(AppError::Solver(_))));
}

#[test]
fn overloaded_mixed_model_is_an_error() {
    let dir = unique_temp_dir("mva_app_mixed_overload");
    let path = write_model(
        &dir,
        "mixed_overload.yaml",
        r#"
name: mixed_overload
chains:
  - { name: users, type: closed, population: 2, think_time: 4.0 }
  - { name: web, type: open, arrival_rate: 2.0 }
stations:
  - name: cpu
    kind: fcfs
    entries:
      - name: e
        demands:
          - { chain: users, service: 1.0 }
          - { chain: web, service: 1.0 }
"#,
    );
    for kind in [SolverKind::Exact, SolverKind::Linearizer] {
        assert!(
            matches!(solve(&path, kind), Err(AppError::Solver(_))),
            "{kind}"
        );
    }
}

#[test]
fn every_solver_handles_the_priority_model() {
    let path = models_dir().join("priority.yaml");
    for kind in SolverKind::ALL {
        let results = solve(&path, kind).unwrap_or_else(|e| panic!("{kind}: {e}"));
        for chain in &results.chains {
            assert!(
                chain.throughput.is_finite() && chain.throughput > 0.0,
                "{kind}: {chain:?}"
            );
        }
        let disks = results.station("disks").unwrap();
        assert_eq!(disks.copies, 2);
        assert_eq!(disks.classes.len(), 2);
    }
}

#[test]
fn batch_keeps_order_and_isolates_failures() {
    let paths = vec![
        models_dir().join("terminals.yaml"),
        models_dir().join("does-not-exist.yaml"),
        models_dir().join("mixed.yaml"),
    ];
    let items = solve_batch(&paths, SolverKind::Schweitzer);
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].path, paths[0]);
    assert!(items[0].is_ok());
    assert!(matches!(items[1].result, Err(AppError::ModelFileRead { .. })));
    assert!(items[2].is_ok());
}

#[test]
fn saved_runs_are_listed_and_reused() {
    let dir = unique_temp_dir("mva_app_runs");
    let source = fs::read_to_string(models_dir().join("terminals.yaml")).unwrap();
    let path = write_model(&dir, "terminals.yaml", &source);

    let request = SolveRequest {
        model_path: &path,
        options: SolveOptions {
            solver: SolverKind::Exact,
            use_cache: true,
            save: true,
            solver_version: "test".to_string(),
        },
    };
    let first = ensure_run(&request).unwrap();
    assert!(!first.loaded_from_cache);
    let manifest = first.manifest.clone().unwrap();
    assert_eq!(manifest.solver, "exact");
    assert!(manifest.converged);

    let second = ensure_run(&request).unwrap();
    assert!(second.loaded_from_cache);
    assert_eq!(second.run_id, first.run_id);

    let store_dir = dir.join(".mva").join("runs");
    let runs = list_runs(&store_dir).unwrap();
    assert_eq!(runs.len(), 1);
    let (loaded, results) = load_run(&store_dir, &first.run_id).unwrap();
    assert_eq!(loaded.model, "terminals");
    assert_eq!(results.chains.len(), 1);

    assert!(matches!(
        load_run(&store_dir, "missing"),
        Err(AppError::RunNotFound(_))
    ));
}
