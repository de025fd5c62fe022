//! Risk classification: tier bands, model contract checks, batch order.

use ndarray::ArrayView2;
use retain_engine::config::RiskConfig;
use retain_engine::features::{CustomerProfile, FeatureMatrix, FeatureSchema, FeatureSynthesizer};
use retain_engine::model::{ChurnModel, ModelHandle};
use retain_engine::risk::{RiskAssessment, RiskClassifier, RiskTier};
use retain_engine::ScoreError;
use std::sync::Arc;

/// Returns the same probability for every row.
struct Fixed(f64);

impl ChurnModel for Fixed {
    fn name(&self) -> &str {
        "fixed"
    }

    fn n_features(&self) -> Option<usize> {
        None
    }

    fn predict_probability(&self, _features: &[f64]) -> Result<f64, ScoreError> {
        Ok(self.0)
    }
}

/// Probability taken from the first column.
struct FirstColumn {
    width: usize,
}

impl ChurnModel for FirstColumn {
    fn name(&self) -> &str {
        "first_column"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.width)
    }

    fn predict_probability(&self, features: &[f64]) -> Result<f64, ScoreError> {
        Ok(features[0])
    }
}

/// Drops the last row of every batch.
struct Lossy;

impl ChurnModel for Lossy {
    fn name(&self) -> &str {
        "lossy"
    }

    fn n_features(&self) -> Option<usize> {
        None
    }

    fn predict_probability(&self, _features: &[f64]) -> Result<f64, ScoreError> {
        Ok(0.5)
    }

    fn predict_batch(&self, rows: ArrayView2<'_, f64>) -> Result<Vec<f64>, ScoreError> {
        Ok(vec![0.5; rows.nrows().saturating_sub(1)])
    }
}

fn classifier(model: impl ChurnModel + 'static) -> RiskClassifier {
    RiskClassifier::new(ModelHandle::loaded(Arc::new(model)), RiskConfig::default())
}

fn vector() -> retain_engine::FeatureVector {
    FeatureSynthesizer::new(FeatureSchema::builtin())
        .synthesize(&CustomerProfile::new(30, 5, 500.0))
        .unwrap()
}

#[test]
fn tier_boundaries_are_half_open() {
    let c = RiskConfig::default();
    assert_eq!(RiskTier::from_probability(0.0, &c), RiskTier::Low);
    assert_eq!(RiskTier::from_probability(0.399999, &c), RiskTier::Low);
    assert_eq!(RiskTier::from_probability(0.4, &c), RiskTier::Medium);
    assert_eq!(RiskTier::from_probability(0.65, &c), RiskTier::Medium);
    assert_eq!(RiskTier::from_probability(0.699999, &c), RiskTier::Medium);
    assert_eq!(RiskTier::from_probability(0.7, &c), RiskTier::High);
    assert_eq!(RiskTier::from_probability(1.0, &c), RiskTier::High);
}

#[test]
fn tier_parses_and_displays() {
    assert_eq!("high".parse::<RiskTier>(), Ok(RiskTier::High));
    assert_eq!(" Medium ".parse::<RiskTier>(), Ok(RiskTier::Medium));
    assert!("severe".parse::<RiskTier>().is_err());
    assert_eq!(RiskTier::Low.to_string(), "LOW");
    assert_eq!(serde_json::to_string(&RiskTier::High).unwrap(), r#""HIGH""#);
}

#[test]
fn assessment_serialises_api_shape() {
    let a = RiskAssessment::new(0.65, &RiskConfig::default()).unwrap();
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        r#"{"churn_probability":0.65,"risk_tier":"MEDIUM"}"#
    );
}

#[test]
fn assess_maps_model_output_to_tier() {
    let a = classifier(Fixed(0.65)).assess(&vector()).unwrap();
    assert_eq!(a.probability(), 0.65);
    assert_eq!(a.tier(), RiskTier::Medium);
}

#[test]
fn unloaded_model_never_yields_a_probability() {
    let c = RiskClassifier::new(ModelHandle::unavailable("no artifact"), RiskConfig::default());
    assert!(!c.is_ready());
    assert!(matches!(c.assess(&vector()), Err(ScoreError::ModelUnavailable(_))));
    assert!(matches!(
        c.predict_probability(&vector()),
        Err(ScoreError::ModelUnavailable(_))
    ));
}

#[test]
fn out_of_range_outputs_are_rejected() {
    for p in [f64::NAN, -0.1, 1.2] {
        let err = classifier(Fixed(p)).assess(&vector()).unwrap_err();
        assert!(matches!(err, ScoreError::InvalidProbability(_)), "{p}");
    }
    let a = classifier(Fixed(1.0 + 1e-12)).assess(&vector()).unwrap();
    assert_eq!(a.probability(), 1.0);
}

#[test]
fn width_mismatch_is_a_schema_error() {
    let err = classifier(FirstColumn { width: 3 })
        .assess(&vector())
        .unwrap_err();
    assert!(matches!(err, ScoreError::SchemaMismatch(_)));
}

#[test]
fn batch_preserves_row_order_and_count() {
    let schema = FeatureSchema::new(["p", "other"]).unwrap();
    let probs = [0.91, 0.05, 0.4, 0.7, 0.399999];
    let rows: Vec<f64> = probs.iter().flat_map(|&p| [p, 1.0]).collect();
    let matrix = FeatureMatrix::from_flat(&schema, probs.len(), rows).unwrap();

    let c = classifier(FirstColumn { width: 2 });
    assert_eq!(c.predict_batch(&matrix).unwrap(), probs);

    let tiers: Vec<RiskTier> = c
        .assess_batch(&matrix)
        .unwrap()
        .iter()
        .map(|a| a.tier())
        .collect();
    assert_eq!(
        tiers,
        [RiskTier::High, RiskTier::Low, RiskTier::Medium, RiskTier::High, RiskTier::Low]
    );
}

#[test]
fn empty_batch_scores_nothing() {
    let schema = FeatureSchema::builtin();
    let matrix = FeatureMatrix::from_vectors(&schema, &[]).unwrap();
    assert!(classifier(Fixed(0.2)).assess_batch(&matrix).unwrap().is_empty());
}

#[test]
fn batch_cardinality_is_enforced() {
    let schema = FeatureSchema::builtin();
    let v = vector();
    let matrix = FeatureMatrix::from_vectors(&schema, &[v.clone(), v]).unwrap();
    assert!(matches!(
        classifier(Lossy).predict_batch(&matrix),
        Err(ScoreError::SchemaMismatch(_))
    ));
}

#[test]
fn matrix_rejects_foreign_schema_rows() {
    let other = FeatureSchema::new(["Recency"]).unwrap();
    let err = FeatureMatrix::from_vectors(&other, &[vector()]).unwrap_err();
    assert!(matches!(err, ScoreError::SchemaMismatch(_)));
}
