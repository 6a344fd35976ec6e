//! Stored run metadata.

use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub model: String,
    /// RFC 3339, UTC
    pub timestamp: String,
    /// Solver name, or `open` for models without closed chains
    pub solver: String,
    pub converged: bool,
    pub iterations: usize,
    pub solver_version: String,
}

impl RunManifest {
    pub fn new(
        run_id: impl Into<RunId>,
        model: impl Into<String>,
        solver: impl Into<String>,
        solver_version: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            model: model.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            solver: solver.into(),
            converged: false,
            iterations: 0,
            solver_version: solver_version.into(),
        }
    }
}
