//! Configuration types for AgentContract

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ContractError, Result};
use crate::trajectory::DEFAULT_SDK;

/// Default config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "agentcontract.toml";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractConfig {
    /// Recorder settings
    #[serde(default)]
    pub recorder: RecorderConfig,

    /// Cassette storage settings
    #[serde(default)]
    pub cassettes: CassetteConfig,

    /// Replay settings
    #[serde(default)]
    pub replay: ReplayConfig,
}

/// Values stamped onto every new run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// SDK tag written to `source.sdk`
    #[serde(default = "default_sdk")]
    pub sdk: String,

    /// Recorder version written to `source.recorder_version`
    #[serde(default = "default_recorder_version")]
    pub recorder_version: String,
}

fn default_sdk() -> String {
    DEFAULT_SDK.to_string()
}

fn default_recorder_version() -> String {
    crate::VERSION.to_string()
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            sdk: default_sdk(),
            recorder_version: default_recorder_version(),
        }
    }
}

/// Where and how cassettes are persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CassetteConfig {
    /// Directory holding `<scenario>.<extension>` files
    #[serde(default = "default_scenarios_dir")]
    pub scenarios_dir: PathBuf,

    /// File extension, without the leading dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Write indented JSON
    #[serde(default = "default_true")]
    pub pretty: bool,
}

fn default_scenarios_dir() -> PathBuf {
    PathBuf::from("tests/scenarios")
}

fn default_extension() -> String {
    "agentrun.json".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for CassetteConfig {
    fn default() -> Self {
        Self {
            scenarios_dir: default_scenarios_dir(),
            extension: default_extension(),
            pretty: true,
        }
    }
}

/// Replay behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Check live arguments against the recorded ones before serving a result
    #[serde(default = "default_true")]
    pub strict_arguments: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            strict_arguments: true,
        }
    }
}

impl ContractConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. `agentcontract.toml` in the working directory
    /// 3. File named by `AGENTCONTRACT_CONFIG_PATH`
    /// 4. `AGENTCONTRACT_` environment variables (`__` separates sections,
    ///    e.g. `AGENTCONTRACT_CASSETTES__SCENARIOS_DIR`)
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is invalid.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(ContractConfig::default()))
            .merge(Toml::file(CONFIG_FILE_NAME));

        if let Ok(path) = std::env::var("AGENTCONTRACT_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let figment = figment.merge(
            Env::prefixed("AGENTCONTRACT_")
                .ignore(&["CONFIG_PATH"])
                .split("__"),
        );

        let config: ContractConfig = figment.extract().map_err(|e| {
            ContractError::Configuration(format!("Failed to load configuration: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let path = path.as_ref();
        if !path.exists() {
            return Err(ContractError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let config: ContractConfig = Figment::from(Serialized::defaults(ContractConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                ContractError::Configuration(format!("Failed to load configuration file: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let extension = self.cassettes.extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(ContractError::Configuration(
                "cassettes.extension must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
