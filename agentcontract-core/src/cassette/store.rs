//! Scenario-keyed cassette directory

use std::path::{Path, PathBuf};

use super::codec::{load_run, save_run};
use crate::config::CassetteConfig;
use crate::error::{ContractError, Result};
use crate::trajectory::Run;

/// A directory of cassettes, one file per scenario
///
/// Scenario `refund-flow` lives at `<root>/refund-flow.agentrun.json`.
/// Scenario names may contain `/` to group cassettes in subdirectories.
#[derive(Debug, Clone)]
pub struct CassetteStore {
    root: PathBuf,
    extension: String,
    pretty: bool,
}

impl CassetteStore {
    /// Store rooted at `root` with the default extension
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::from_config(&CassetteConfig {
            scenarios_dir: root.into(),
            ..Default::default()
        })
    }

    /// Store built from configuration
    pub fn from_config(config: &CassetteConfig) -> Self {
        Self {
            root: config.scenarios_dir.clone(),
            extension: config.extension.trim_start_matches('.').to_string(),
            pretty: config.pretty,
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a scenario's cassette is stored under
    pub fn path_for(&self, scenario: &str) -> PathBuf {
        self.root.join(format!("{}.{}", scenario, self.extension))
    }

    /// Whether a cassette exists for the scenario
    pub fn exists(&self, scenario: &str) -> bool {
        self.path_for(scenario).is_file()
    }

    /// Save a run under its scenario name
    ///
    /// # Errors
    ///
    /// Fails if the run has no scenario name or the file cannot be written.
    pub fn save(&self, run: &Run) -> Result<PathBuf> {
        let scenario = run.metadata.scenario.as_str();
        if scenario.trim().is_empty() {
            return Err(ContractError::InvalidCassette(
                "cannot store a run without a scenario name".to_string(),
            ));
        }
        let path = self.path_for(scenario);
        self.save_to(&path, run)?;
        Ok(path)
    }

    /// Save a run to an explicit path using this store's formatting
    pub fn save_to(&self, path: impl AsRef<Path>, run: &Run) -> Result<()> {
        save_run(run, path, self.pretty)
    }

    /// Load the cassette for a scenario
    pub fn load(&self, scenario: &str) -> Result<Run> {
        self.load_from(self.path_for(scenario))
    }

    /// Load a cassette from an explicit path
    pub fn load_from(&self, path: impl AsRef<Path>) -> Result<Run> {
        load_run(path)
    }

    /// Scenario names with a cassette in this store, sorted
    ///
    /// A missing root directory yields an empty list.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut scenarios = Vec::new();
        if self.root.is_dir() {
            self.collect(&self.root, &mut scenarios)?;
        }
        scenarios.sort();
        Ok(scenarios)
    }

    fn collect(&self, dir: &Path, scenarios: &mut Vec<String>) -> Result<()> {
        let suffix = format!(".{}", self.extension);
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.collect(&path, scenarios)?;
                continue;
            }
            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if let Some(scenario) = relative.strip_suffix(&suffix) {
                scenarios.push(scenario.to_string());
            }
        }
        Ok(())
    }
}
