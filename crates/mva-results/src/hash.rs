//! Content-based hashing for run IDs.

use mva_model::ModelDef;
use sha2::{Digest, Sha256};

/// Same model, solver and version always hash to the same id.
pub fn compute_run_id(model: &ModelDef, solver: &str, solver_version: &str) -> String {
    let mut hasher = Sha256::new();

    let model_json = serde_json::to_string(model).unwrap_or_default();
    hasher.update(model_json.as_bytes());
    hasher.update(solver.as_bytes());
    hasher.update(solver_version.as_bytes());

    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(name: &str) -> ModelDef {
        ModelDef {
            name: name.to_string(),
            solver: Default::default(),
            chains: vec![],
            stations: vec![],
        }
    }

    #[test]
    fn hash_stability() {
        let a = compute_run_id(&model("m"), "exact", "v1");
        let b = compute_run_id(&model("m"), "exact", "v1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let base = compute_run_id(&model("m"), "exact", "v1");
        assert_ne!(base, compute_run_id(&model("n"), "exact", "v1"));
        assert_ne!(base, compute_run_id(&model("m"), "linearizer", "v1"));
        assert_ne!(base, compute_run_id(&model("m"), "exact", "v2"));
    }
}
