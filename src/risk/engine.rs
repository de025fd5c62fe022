//! Turns model probabilities into immutable assessments using configured thresholds.

use crate::config::RiskConfig;
use crate::error::ScoreError;
use crate::features::{FeatureMatrix, FeatureVector};
use crate::model::ModelHandle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Outputs this close outside [0, 1] are treated as float noise and clamped.
const PROBABILITY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Half-open bands: `[0, medium)` low, `[medium, high)` medium, `[high, 1]` high.
    pub fn from_probability(probability: f64, config: &RiskConfig) -> Self {
        if probability >= config.high_threshold {
            RiskTier::High
        } else if probability >= config.medium_threshold {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "LOW",
            RiskTier::Medium => "MEDIUM",
            RiskTier::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(RiskTier::Low),
            "MEDIUM" => Ok(RiskTier::Medium),
            "HIGH" => Ok(RiskTier::High),
            other => Err(format!("unknown risk tier {other:?} (expected LOW, MEDIUM or HIGH)")),
        }
    }
}

/// Terminal scoring output. Fields are fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskAssessment {
    #[serde(rename = "churn_probability")]
    probability: f64,
    #[serde(rename = "risk_tier")]
    tier: RiskTier,
}

impl RiskAssessment {
    pub fn new(probability: f64, config: &RiskConfig) -> Result<Self, ScoreError> {
        let probability = normalize(probability)?;
        Ok(Self {
            probability,
            tier: RiskTier::from_probability(probability, config),
        })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn tier(&self) -> RiskTier {
        self.tier
    }
}

fn normalize(p: f64) -> Result<f64, ScoreError> {
    if p.is_nan() || p < -PROBABILITY_TOLERANCE || p > 1.0 + PROBABILITY_TOLERANCE {
        return Err(ScoreError::InvalidProbability(p));
    }
    Ok(p.clamp(0.0, 1.0))
}

/// Stateless per call; shares the immutable model handle.
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    model: ModelHandle,
    config: RiskConfig,
}

impl RiskClassifier {
    pub fn new(model: ModelHandle, config: RiskConfig) -> Self {
        Self { model, config }
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_loaded()
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn tier(&self, probability: f64) -> RiskTier {
        RiskTier::from_probability(probability, &self.config)
    }

    pub fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ScoreError> {
        let model = self.model.get()?;
        check_width(model.n_features(), features.len())?;
        normalize(model.predict_probability(features.as_slice())?)
    }

    pub fn assess(&self, features: &FeatureVector) -> Result<RiskAssessment, ScoreError> {
        let probability = self.predict_probability(features)?;
        let assessment = RiskAssessment::new(probability, &self.config)?;
        debug!(
            probability = assessment.probability(),
            tier = %assessment.tier(),
            "assessed feature vector"
        );
        Ok(assessment)
    }

    /// One probability per matrix row, in row order.
    pub fn predict_batch(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>, ScoreError> {
        let model = self.model.get()?;
        check_width(model.n_features(), matrix.ncols())?;
        let probs = model.predict_batch(matrix.view())?;
        if probs.len() != matrix.nrows() {
            return Err(ScoreError::SchemaMismatch(format!(
                "model returned {} probabilities for {} rows",
                probs.len(),
                matrix.nrows()
            )));
        }
        probs.into_iter().map(normalize).collect()
    }

    pub fn assess_batch(&self, matrix: &FeatureMatrix) -> Result<Vec<RiskAssessment>, ScoreError> {
        self.predict_batch(matrix)?
            .into_iter()
            .map(|p| RiskAssessment::new(p, &self.config))
            .collect()
    }
}

fn check_width(expected: Option<usize>, actual: usize) -> Result<(), ScoreError> {
    match expected {
        Some(n) if n != actual => Err(ScoreError::SchemaMismatch(format!(
            "model expects {n} features, vector has {actual}"
        ))),
        _ => Ok(()),
    }
}
