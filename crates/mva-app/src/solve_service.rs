//! Solving models and persisting their reports.

use mva_model::{BuiltModel, ModelDef, ModelResults, build_model};
use mva_results::{ReportStore, RunManifest, compute_run_id};
use mva_solver::{OpenModel, SolverKind};
use std::path::Path;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::model_service;

/// Solver name recorded for models without closed chains.
pub const OPEN_SOLVER: &str = "open";

#[derive(Debug, Clone)]
pub struct SolveOptions {
    pub solver: SolverKind,
    /// Reuse a stored report with the same run id
    pub use_cache: bool,
    /// Store the report beside the model file
    pub save: bool,
    pub solver_version: String,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            solver: SolverKind::Linearizer,
            use_cache: false,
            save: false,
            solver_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SolveRequest<'a> {
    pub model_path: &'a Path,
    pub options: SolveOptions,
}

#[derive(Debug, Clone)]
pub struct SolveResponse {
    pub run_id: String,
    pub results: ModelResults,
    /// Present when the report was stored or loaded from the store
    pub manifest: Option<RunManifest>,
    pub loaded_from_cache: bool,
}

/// Solve a model in memory.
///
/// Closed models go straight to the chosen solver. With open chains present
/// the closed service times are first inflated for the open load, the closed
/// network is solved, then the open waits are computed against the closed
/// queues. A model of open chains only is solved by the open model alone.
pub fn solve_model(model: &ModelDef, solver: SolverKind) -> AppResult<ModelResults> {
    let built = build_model(model)?;
    if !built.has_closed_chains() {
        return solve_open(built);
    }

    let mut network = built.network.clone();
    if built.has_open_chains() {
        OpenModel::new(&mut network.stations).convert(&network.population)?;
    }

    let mut engine = solver.build(network, built.config.clone())?;
    let status = engine.solve()?;
    if status.is_diverged() {
        warn!(model = %built.name, %solver, %status, "solver did not converge");
    }
    if built.has_open_chains() {
        engine.mva_mut().solve_mixed()?;
    }

    info!(model = %built.name, %solver, %status, "solved");
    Ok(ModelResults::from_mva(&built, engine.mva(), solver, status))
}

fn solve_open(built: BuiltModel) -> AppResult<ModelResults> {
    let mut stations = built.network.stations.clone();
    OpenModel::new(&mut stations).solve()?;
    info!(model = %built.name, solver = OPEN_SOLVER, "solved");
    Ok(ModelResults::from_open(&built, &stations))
}

fn solver_name(model: &ModelDef, solver: SolverKind) -> &'static str {
    let closed = model.chains.iter().any(|c| c.kind.is_closed());
    if closed { solver.name() } else { OPEN_SOLVER }
}

/// Load, solve and optionally store the report for a model file.
pub fn ensure_run(request: &SolveRequest) -> AppResult<SolveResponse> {
    let model = model_service::load_model(request.model_path)?;
    let options = &request.options;
    let solver = solver_name(&model, options.solver);
    let run_id = compute_run_id(&model, solver, &options.solver_version);

    if options.use_cache || options.save {
        let store = ReportStore::for_model(request.model_path)?;
        if options.use_cache && store.has_run(&run_id) {
            info!(model = %model.name, %run_id, "loaded cached run");
            return Ok(SolveResponse {
                results: store.load_results(&run_id)?,
                manifest: Some(store.load_manifest(&run_id)?),
                run_id,
                loaded_from_cache: true,
            });
        }

        let results = solve_model(&model, options.solver)?;
        let manifest = if options.save {
            let mut manifest =
                RunManifest::new(&run_id, &model.name, solver, &options.solver_version);
            manifest.converged = results.status.converged;
            manifest.iterations = results.status.iterations;
            store.save_run(&manifest, &results)?;
            Some(manifest)
        } else {
            None
        };
        return Ok(SolveResponse {
            run_id,
            results,
            manifest,
            loaded_from_cache: false,
        });
    }

    Ok(SolveResponse {
        results: solve_model(&model, options.solver)?,
        run_id,
        manifest: None,
        loaded_from_cache: false,
    })
}

/// Runs kept in a store directory, most recent first.
pub fn list_runs(store_dir: &Path) -> AppResult<Vec<RunManifest>> {
    let store = ReportStore::new(store_dir.to_path_buf())?;
    Ok(store.list_runs(None)?)
}

pub fn load_run(store_dir: &Path, run_id: &str) -> AppResult<(RunManifest, ModelResults)> {
    let store = ReportStore::new(store_dir.to_path_buf())?;
    Ok((store.load_manifest(run_id)?, store.load_results(run_id)?))
}
