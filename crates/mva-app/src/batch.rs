//! Independent models solved in parallel.

use mva_model::ModelResults;
use mva_solver::SolverKind;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::AppResult;
use crate::model_service;
use crate::solve_service::solve_model;

/// Outcome for one model file. A failure never stops the rest of the batch.
#[derive(Debug)]
pub struct BatchItem {
    pub path: PathBuf,
    pub result: AppResult<ModelResults>,
}

impl BatchItem {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Solve every model with `solver`, one solver per model, results in input order.
pub fn solve_batch(paths: &[PathBuf], solver: SolverKind) -> Vec<BatchItem> {
    let items: Vec<BatchItem> = paths
        .par_iter()
        .map(|path| BatchItem {
            path: path.clone(),
            result: solve_file(path, solver),
        })
        .collect();
    debug!(
        models = items.len(),
        failed = items.iter().filter(|i| !i.is_ok()).count(),
        "batch finished"
    );
    items
}

fn solve_file(path: &Path, solver: SolverKind) -> AppResult<ModelResults> {
    let model = model_service::load_model(path)?;
    solve_model(&model, solver)
}
