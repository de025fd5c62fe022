//! Request-scoped scoring over an immutable schema and model: profile → features → assessment.

use crate::config::EngineConfig;
use crate::error::{LoadError, ScoreError};
use crate::features::{CustomerProfile, FeatureSchema, FeatureSynthesizer, FeatureVector};
use crate::model::{self, ModelHandle};
use crate::risk::{RiskAssessment, RiskClassifier};
use crate::storage::{CustomerTable, ScoredTable};
use serde::Serialize;
use tracing::{debug, info};

/// Explicit scoring context; holds no mutable state.
#[derive(Debug, Clone)]
pub struct ScoringService {
    synthesizer: FeatureSynthesizer,
    classifier: RiskClassifier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub model_loaded: bool,
    pub database_loaded: bool,
    pub ai_configured: bool,
    pub feature_count: usize,
}

impl ScoringService {
    pub fn new(synthesizer: FeatureSynthesizer, classifier: RiskClassifier) -> Self {
        Self {
            synthesizer,
            classifier,
        }
    }

    /// Load schema and model as configured. A missing or broken model still
    /// yields a service; scoring calls then fail with `ModelUnavailable`.
    /// Invalid risk thresholds are rejected.
    pub fn from_config(config: &EngineConfig) -> Result<Self, LoadError> {
        config.risk.validate()?;
        let schema = model::load_schema(&config.model.metadata_path)?;
        let synthesizer = FeatureSynthesizer::with_config(schema.clone(), &config.features)?;
        let zero_filled: Vec<&str> = synthesizer.zero_filled().collect();
        if !zero_filled.is_empty() {
            info!(features = ?zero_filled, "schema features without a derivation rule are zero-filled");
        }
        let handle = ModelHandle::load(&config.model, &schema);
        let classifier = RiskClassifier::new(handle, config.risk.clone());
        Ok(Self::new(synthesizer, classifier))
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.synthesizer.schema()
    }

    pub fn classifier(&self) -> &RiskClassifier {
        &self.classifier
    }

    pub fn features(&self, profile: &CustomerProfile) -> Result<FeatureVector, ScoreError> {
        self.synthesizer.synthesize(profile)
    }

    pub fn score_profile(&self, profile: &CustomerProfile) -> Result<RiskAssessment, ScoreError> {
        let features = self.synthesizer.synthesize(profile)?;
        let assessment = self.classifier.assess(&features)?;
        debug!(
            recency = profile.recency,
            frequency = profile.frequency,
            monetary = profile.monetary,
            probability = assessment.probability(),
            tier = %assessment.tier(),
            "scored profile"
        );
        Ok(assessment)
    }

    /// Score every row of an already-featurised table in one batch call.
    pub fn score_table(&self, table: &CustomerTable) -> Result<ScoredTable, ScoreError> {
        let matrix = table.feature_matrix(self.schema())?;
        let assessments = self.classifier.assess_batch(&matrix)?;
        let scored = table.with_scores(assessments)?;
        info!(rows = table.len(), tiers = ?scored.tier_counts(), "scored customer table");
        Ok(scored)
    }

    pub fn health(&self, database_loaded: bool, ai_configured: bool) -> HealthStatus {
        HealthStatus {
            status: "healthy",
            model_loaded: self.classifier.is_ready(),
            database_loaded,
            ai_configured,
            feature_count: self.schema().len(),
        }
    }
}
