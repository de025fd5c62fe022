//! Seam for an external attribution engine (SHAP-style) and ranking of its output.

use crate::error::ScoreError;
use crate::features::FeatureVector;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureContribution {
    pub feature: String,
    pub value: f64,
    /// Signed push on the churn probability (positive raises risk)
    pub signed_impact: f64,
}

/// Implemented by the attribution engine. Receives vectors in exact schema order.
pub trait Explainer: Send + Sync {
    fn contributions(
        &self,
        features: &FeatureVector,
        probability: f64,
    ) -> Result<Vec<FeatureContribution>, ScoreError>;
}

/// Pair per-feature impacts (schema order) with names and values.
pub fn contributions_from_impacts(
    features: &FeatureVector,
    impacts: &[f64],
) -> Result<Vec<FeatureContribution>, ScoreError> {
    if impacts.len() != features.len() {
        return Err(ScoreError::SchemaMismatch(format!(
            "{} impacts for {} features",
            impacts.len(),
            features.len()
        )));
    }
    Ok(features
        .iter()
        .zip(impacts)
        .map(|((name, value), &signed_impact)| FeatureContribution {
            feature: name.to_string(),
            value,
            signed_impact,
        })
        .collect())
}

/// Largest absolute impact first; equal magnitudes keep their input order.
pub fn rank_contributions(mut contributions: Vec<FeatureContribution>) -> Vec<FeatureContribution> {
    contributions.sort_by(|a, b| b.signed_impact.abs().total_cmp(&a.signed_impact.abs()));
    contributions
}

/// Ask `explainer` for contributions and rank them, keeping at most `top`.
pub fn explain(
    explainer: &dyn Explainer,
    features: &FeatureVector,
    probability: f64,
    top: usize,
) -> Result<Vec<FeatureContribution>, ScoreError> {
    let mut ranked = rank_contributions(explainer.contributions(features, probability)?);
    ranked.truncate(top);
    Ok(ranked)
}
