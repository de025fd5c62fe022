//! Error taxonomy for scoring, artifact loading, and configuration.

use thiserror::Error;

/// Failures of a single scoring call. None of these are transient; callers
/// surface them instead of retrying.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    /// A raw attribute is missing or out of domain (e.g. zero frequency).
    #[error("invalid customer profile: {0}")]
    InvalidProfile(String),

    /// The classifier or its schema failed to load.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Feature schema and model or synthesizer disagree.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The model returned something that is not a probability.
    #[error("model returned invalid probability {0}")]
    InvalidProbability(f64),
}

/// Failures while reading model artifacts or customer tables.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid json in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error(transparent)]
    Schema(#[from] ScoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl LoadError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn json(path: &std::path::Path, source: serde_json::Error) -> Self {
        LoadError::Json {
            path: path.display().to_string(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
