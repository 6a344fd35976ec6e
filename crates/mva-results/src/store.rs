//! Report storage API.
//!
//! Each run lives in `<root>/<run_id>/` as `manifest.json` plus `results.json`.

use crate::types::RunManifest;
use crate::{ResultsError, ResultsResult};
use mva_model::ModelResults;
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST: &str = "manifest.json";
const RESULTS: &str = "results.json";

#[derive(Clone, Debug)]
pub struct ReportStore {
    root_dir: PathBuf,
}

impl ReportStore {
    /// Opens (creating if needed) a store rooted at `root_dir`.
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        fs::create_dir_all(&root_dir)?;
        Ok(Self { root_dir })
    }

    /// Store kept in `.mva/runs` beside the model file.
    pub fn for_model(model_path: &Path) -> ResultsResult<Self> {
        let model_dir = model_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: "model path has no parent directory".to_string(),
            })?;
        Self::new(model_dir.join(".mva").join("runs"))
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join(MANIFEST).exists()
    }

    pub fn save_run(&self, manifest: &RunManifest, results: &ModelResults) -> ResultsResult<()> {
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        fs::write(run_dir.join(RESULTS), serde_json::to_string_pretty(results)?)?;
        // Manifest last: its presence marks a complete run.
        fs::write(run_dir.join(MANIFEST), serde_json::to_string_pretty(manifest)?)?;
        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let content = self.read(run_id, MANIFEST)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_results(&self, run_id: &str) -> ResultsResult<ModelResults> {
        let content = self.read(run_id, RESULTS)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn read(&self, run_id: &str, file: &str) -> ResultsResult<String> {
        let path = self.run_dir(run_id).join(file);
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        Ok(fs::read_to_string(path)?)
    }

    /// Manifests of every stored run, most recent first, optionally for one model.
    pub fn list_runs(&self, model: Option<&str>) -> ResultsResult<Vec<RunManifest>> {
        if !self.root_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.root_dir)? {
            let path = entry?.path();
            let Some(run_id) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            // Half-written runs have no manifest yet.
            match self.load_manifest(run_id) {
                Ok(manifest) if model.is_none_or(|m| manifest.model == m) => runs.push(manifest),
                _ => {}
            }
        }

        runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(runs)
    }

    /// Removing a run that does not exist is not an error.
    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        match fs::remove_dir_all(self.run_dir(run_id)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
