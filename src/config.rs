//! Engine configuration. Loaded once at startup and passed down explicitly.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Model artifact and schema metadata
    pub model: ModelConfig,
    /// Feature synthesis options
    pub features: FeaturesConfig,
    /// Risk tier thresholds
    pub risk: RiskConfig,
    /// Customer database used for bulk scoring and at-risk listings
    pub data: DataConfig,
    /// Third-party LLM credentials (checked by diagnostics only)
    pub llm: LlmConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelBackend {
    /// JSON tree ensemble evaluated in-process
    Trees,
    /// ONNX Runtime session (requires the `onnx` feature)
    Onnx,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub backend: ModelBackend,
    pub model_path: PathBuf,
    /// JSON with a `feature_names` list; built-in schema is used when absent
    pub metadata_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Reject schema names that have no derivation rule instead of zero-filling
    pub strict_schema: bool,
    /// Minimum order count; smaller counts are raised to it. `None` makes zero an error
    pub frequency_floor: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Probability at or above this is high risk
    pub high_threshold: f64,
    /// Probability at or above this is medium risk
    pub medium_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub customer_db_path: PathBuf,
    pub id_column: String,
    pub at_risk_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Optional dotenv file loaded into the environment at startup
    pub dotenv_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::Trees,
            model_path: PathBuf::from("models/churn_trees.json"),
            metadata_path: PathBuf::from("models/model_metadata.json"),
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            strict_schema: false,
            frequency_floor: Some(1),
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            high_threshold: 0.7,
            medium_threshold: 0.4,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (m, h) = (self.medium_threshold, self.high_threshold);
        if !(m > 0.0 && m < h && h <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "risk thresholds must satisfy 0 < medium < high <= 1 (medium={m}, high={h})"
            )));
        }
        Ok(())
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            customer_db_path: PathBuf::from("models/customer_database.csv"),
            id_column: "Customer ID".to_string(),
            at_risk_limit: 20,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: "GROQ_API_KEY".to_string(),
            dotenv_path: PathBuf::from(".env"),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file if present; otherwise return defaults.
    /// A file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: EngineConfig =
            serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.risk.validate()?;
        Ok(config)
    }
}
