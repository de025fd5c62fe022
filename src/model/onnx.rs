//! ONNX Runtime inference for an exported classifier. Input: [N, feature_dim] f32.
//! Output: the last graph output, either per-class probabilities [N, 2]
//! (positive class in column 1) or a single probability per row.

use super::ChurnModel;
use crate::error::{LoadError, ScoreError};
use ndarray::{Array2, ArrayView2, CowArray};
use ort::{Environment, GraphOptimizationLevel, Session, SessionBuilder, Value};
use std::path::Path;
use std::sync::Arc;

pub struct OnnxModel {
    _env: Arc<Environment>,
    session: Session,
    feature_dim: usize,
}

impl OnnxModel {
    pub fn load(path: &Path, feature_dim: usize) -> Result<Self, LoadError> {
        let invalid = |e: ort::OrtError| LoadError::InvalidModel(e.to_string());
        let env = Environment::builder()
            .with_name("retain-engine")
            .build()
            .map_err(invalid)?
            .into_arc();
        let session = SessionBuilder::new(&env)
            .map_err(invalid)?
            .with_optimization_level(GraphOptimizationLevel::Level1)
            .map_err(invalid)?
            .with_model_from_file(path)
            .map_err(invalid)?;
        Ok(Self {
            _env: env,
            session,
            feature_dim,
        })
    }

    fn run(&self, rows: ArrayView2<'_, f64>) -> Result<Vec<f64>, ScoreError> {
        let unavailable = |e: ort::OrtError| ScoreError::ModelUnavailable(e.to_string());
        if rows.ncols() != self.feature_dim {
            return Err(ScoreError::SchemaMismatch(format!(
                "model expects {} features, got {}",
                self.feature_dim,
                rows.ncols()
            )));
        }
        let n = rows.nrows();
        if n == 0 {
            return Ok(Vec::new());
        }
        let input: Array2<f32> = rows.mapv(|v| v as f32);
        let input = CowArray::from(input.into_dyn());
        let value = Value::from_array(self.session.allocator(), &input).map_err(unavailable)?;
        let outputs = self.session.run(vec![value]).map_err(unavailable)?;
        let out = outputs
            .last()
            .ok_or_else(|| ScoreError::ModelUnavailable("model produced no outputs".into()))?;
        let tensor = out.try_extract::<f32>().map_err(unavailable)?;
        let view = tensor.view();

        let probs: Vec<f64> = match view.shape() {
            [rows_out, 2] if *rows_out == n => (0..n).map(|i| f64::from(view[[i, 1]])).collect(),
            [rows_out, 1] if *rows_out == n => (0..n).map(|i| f64::from(view[[i, 0]])).collect(),
            [rows_out] if *rows_out == n => view.iter().map(|v| f64::from(*v)).collect(),
            shape => {
                return Err(ScoreError::ModelUnavailable(format!(
                    "unexpected output shape {shape:?} for {n} rows"
                )))
            }
        };
        Ok(probs)
    }
}

impl ChurnModel for OnnxModel {
    fn name(&self) -> &str {
        "onnx"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.feature_dim)
    }

    fn predict_probability(&self, features: &[f64]) -> Result<f64, ScoreError> {
        let row = ArrayView2::from_shape((1, features.len()), features)
            .map_err(|e| ScoreError::SchemaMismatch(e.to_string()))?;
        self.run(row)?
            .first()
            .copied()
            .ok_or_else(|| ScoreError::ModelUnavailable("empty model output".into()))
    }

    fn predict_batch(&self, rows: ArrayView2<'_, f64>) -> Result<Vec<f64>, ScoreError> {
        self.run(rows)
    }
}
