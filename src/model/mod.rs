//! Pre-trained churn classifiers and the artifacts that describe them.

mod trees;
#[cfg(feature = "onnx")]
mod onnx;

pub use trees::{Tree, TreeEnsemble, TreeNode};
#[cfg(feature = "onnx")]
pub use onnx::OnnxModel;

use crate::config::{ModelBackend, ModelConfig};
use crate::error::{LoadError, ScoreError};
use crate::features::FeatureSchema;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Opaque binary classifier over a fixed-width feature row.
pub trait ChurnModel: Send + Sync {
    fn name(&self) -> &str;

    /// Input width declared by the artifact, if any.
    fn n_features(&self) -> Option<usize>;

    /// Positive-class probability for one row.
    fn predict_probability(&self, features: &[f64]) -> Result<f64, ScoreError>;

    /// One probability per row, in row order.
    fn predict_batch(&self, rows: ArrayView2<'_, f64>) -> Result<Vec<f64>, ScoreError> {
        rows.rows()
            .into_iter()
            .map(|row| match row.as_slice() {
                Some(s) => self.predict_probability(s),
                None => self.predict_probability(&row.to_vec()),
            })
            .collect()
    }
}

/// Contents of `model_metadata.json` written by the training job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub feature_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<String>,
}

impl ModelMetadata {
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let data = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        serde_json::from_str(&data).map_err(|e| LoadError::json(path, e))
    }

    pub fn schema(&self) -> Result<FeatureSchema, ScoreError> {
        FeatureSchema::new(self.feature_names.iter().cloned())
    }
}

/// Feature schema from metadata, or the built-in list when the file is absent.
pub fn load_schema(path: &Path) -> Result<FeatureSchema, LoadError> {
    if !path.exists() {
        warn!(path = %path.display(), "model metadata not found; using built-in feature list");
        return Ok(FeatureSchema::builtin());
    }
    let schema = ModelMetadata::from_path(path)?.schema()?;
    info!(path = %path.display(), features = schema.len(), "loaded feature schema");
    Ok(schema)
}

/// Immutable model handle acquired once at startup. A failed load is kept
/// as the reason and reported on every scoring attempt.
#[derive(Clone)]
pub struct ModelHandle {
    inner: Result<Arc<dyn ChurnModel>, String>,
}

impl ModelHandle {
    pub fn loaded(model: Arc<dyn ChurnModel>) -> Self {
        Self { inner: Ok(model) }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            inner: Err(reason.into()),
        }
    }

    /// Load the configured backend. Never fails; see [`ModelHandle::get`].
    pub fn load(config: &ModelConfig, schema: &FeatureSchema) -> Self {
        match load_model(config, schema) {
            Ok(model) => {
                info!(
                    path = %config.model_path.display(),
                    model = model.name(),
                    "model loaded"
                );
                Self::loaded(model)
            }
            Err(e) => {
                warn!(path = %config.model_path.display(), error = %e, "model not loaded; scoring disabled");
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.is_ok()
    }

    pub fn get(&self) -> Result<&Arc<dyn ChurnModel>, ScoreError> {
        self.inner
            .as_ref()
            .map_err(|reason| ScoreError::ModelUnavailable(reason.clone()))
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Ok(m) => f.debug_tuple("ModelHandle::Loaded").field(&m.name()).finish(),
            Err(reason) => f.debug_tuple("ModelHandle::Unavailable").field(reason).finish(),
        }
    }
}

fn load_model(config: &ModelConfig, schema: &FeatureSchema) -> Result<Arc<dyn ChurnModel>, LoadError> {
    let path = config.model_path.as_path();
    if !path.exists() {
        return Err(LoadError::InvalidModel(format!(
            "model file {} not found",
            path.display()
        )));
    }
    let model: Arc<dyn ChurnModel> = match config.backend {
        ModelBackend::Trees => {
            let ensemble = TreeEnsemble::from_path(path)?;
            ensemble.check_width(schema.len())?;
            Arc::new(ensemble)
        }
        #[cfg(feature = "onnx")]
        ModelBackend::Onnx => Arc::new(OnnxModel::load(path, schema.len())?),
        #[cfg(not(feature = "onnx"))]
        ModelBackend::Onnx => {
            return Err(LoadError::InvalidModel(
                "onnx backend requested but this build lacks the `onnx` feature".into(),
            ))
        }
    };
    if let Some(n) = model.n_features() {
        if n != schema.len() {
            return Err(ScoreError::SchemaMismatch(format!(
                "model expects {n} features, schema lists {}",
                schema.len()
            ))
            .into());
        }
    }
    Ok(model)
}
