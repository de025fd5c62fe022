//! Integration test: config load, model artifacts on disk, service scoring end to end.

use retain_engine::{
    config::{EngineConfig, ModelBackend, ModelConfig, RiskConfig},
    features::{CustomerProfile, FeatureSchema},
    model::{self, ChurnModel, ModelHandle, Tree, TreeEnsemble, TreeNode},
    risk::RiskTier,
    storage::CustomerTable,
    ConfigError, LoadError, ScoreError, ScoringService,
};
use std::path::Path;

/// Recency < 60 → margin -1 (LOW); otherwise margin 2 (HIGH).
fn recency_model() -> TreeEnsemble {
    TreeEnsemble::new(
        0.0,
        Some(18),
        vec![Tree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 60.0,
                    yes: 1,
                    no: 2,
                    missing: None,
                },
                TreeNode::Leaf { leaf: -1.0 },
                TreeNode::Leaf { leaf: 2.0 },
            ],
        }],
    )
    .unwrap()
}

fn write_artifacts(dir: &Path) -> EngineConfig {
    let model_path = dir.join("churn_trees.json");
    std::fs::write(&model_path, recency_model().to_json().unwrap()).unwrap();
    let mut config = EngineConfig::default();
    config.model = ModelConfig {
        backend: ModelBackend::Trees,
        model_path,
        metadata_path: dir.join("model_metadata.json"),
    };
    config
}

#[test]
fn config_load_default() {
    let c = EngineConfig::load(Path::new("nonexistent.json")).unwrap();
    assert_eq!(c.risk.medium_threshold, 0.4);
    assert_eq!(c.risk.high_threshold, 0.7);
    assert_eq!(c.data.at_risk_limit, 20);
    assert_eq!(c.features.frequency_floor, Some(1));
}

#[test]
fn config_partial_file_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"data": {"at_risk_limit": 5}, "log": {"json": true}}"#).unwrap();
    let c = EngineConfig::load(&path).unwrap();
    assert_eq!(c.data.at_risk_limit, 5);
    assert_eq!(c.data.id_column, "Customer ID");
    assert!(c.log.json);
    assert_eq!(c.model.backend, ModelBackend::Trees);
}

#[test]
fn config_rejects_inverted_thresholds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"risk": {"medium_threshold": 0.8, "high_threshold": 0.7}}"#).unwrap();
    assert!(EngineConfig::load(&path).is_err());
}

#[test]
fn service_rejects_inverted_thresholds_built_in_code() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_artifacts(dir.path());
    config.risk = RiskConfig {
        medium_threshold: 0.8,
        high_threshold: 0.3,
    };
    let err = ScoringService::from_config(&config).unwrap_err();
    assert!(matches!(err, LoadError::Config(ConfigError::Invalid(_))), "{err}");
}

#[test]
fn config_rejects_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{not json").unwrap();
    assert!(EngineConfig::load(&path).is_err());
}

#[test]
fn metadata_missing_uses_builtin_schema() {
    let schema = model::load_schema(Path::new("nonexistent_metadata.json")).unwrap();
    assert_eq!(schema, FeatureSchema::builtin());
    assert_eq!(schema.len(), 18);
}

#[test]
fn metadata_defines_schema_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model_metadata.json");
    std::fs::write(
        &path,
        r#"{"feature_names": ["Monetary", "Recency", "loyalty_score"], "model_name": "xgb"}"#,
    )
    .unwrap();
    let schema = model::load_schema(&path).unwrap();
    assert_eq!(schema.names(), ["Monetary", "Recency", "loyalty_score"]);
}

#[test]
fn metadata_with_duplicates_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model_metadata.json");
    std::fs::write(&path, r#"{"feature_names": ["Recency", "recency"]}"#).unwrap();
    assert!(model::load_schema(&path).is_err());
}

#[test]
fn service_scores_profile_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_artifacts(dir.path());
    let service = ScoringService::from_config(&config).unwrap();
    assert!(service.classifier().is_ready());

    let loyal = service.score_profile(&CustomerProfile::new(10, 8, 900.0)).unwrap();
    assert_eq!(loyal.tier(), RiskTier::Low);
    assert!((loyal.probability() - 1.0 / (1.0 + 1f64.exp())).abs() < 1e-12);

    let lapsed = service.score_profile(&CustomerProfile::new(200, 2, 80.0)).unwrap();
    assert_eq!(lapsed.tier(), RiskTier::High);
}

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

#[test]
fn nan_feature_follows_missing_branch() {
    let mut row = vec![0.0; 18];
    row[0] = f64::NAN;

    // no explicit missing child: NaN takes the `yes` branch
    let p = recency_model().predict_probability(&row).unwrap();
    assert!((p - sigmoid(-1.0)).abs() < 1e-12);

    let routed = TreeEnsemble::new(
        0.0,
        Some(18),
        vec![Tree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 60.0,
                    yes: 1,
                    no: 2,
                    missing: Some(2),
                },
                TreeNode::Leaf { leaf: -1.0 },
                TreeNode::Leaf { leaf: 2.0 },
            ],
        }],
    )
    .unwrap();
    let p = routed.predict_probability(&row).unwrap();
    assert!((p - sigmoid(2.0)).abs() < 1e-12);

    row[0] = 10.0;
    assert!((routed.predict_probability(&row).unwrap() - sigmoid(-1.0)).abs() < 1e-12);
}

#[test]
fn service_applies_frequency_floor_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_artifacts(dir.path());
    let service = ScoringService::from_config(&config).unwrap();
    let fv = service.features(&CustomerProfile::new(10, 0, 200.0)).unwrap();
    assert_eq!(fv.get("Frequency"), Some(1.0));
    assert_eq!(fv.get("avg_order_value"), Some(200.0));
}

#[test]
fn missing_model_reports_unavailable() {
    let mut config = EngineConfig::default();
    config.model.model_path = "nonexistent_model.json".into();
    config.model.metadata_path = "nonexistent_metadata.json".into();
    let service = ScoringService::from_config(&config).unwrap();
    assert!(!service.classifier().is_ready());

    let err = service
        .score_profile(&CustomerProfile::new(30, 5, 500.0))
        .unwrap_err();
    assert!(matches!(err, ScoreError::ModelUnavailable(_)));

    let table = CustomerTable::from_reader("Recency,Frequency\n1,2\n".as_bytes()).unwrap();
    assert!(matches!(
        service.score_table(&table),
        Err(ScoreError::ModelUnavailable(_))
    ));
}

#[test]
fn corrupt_model_reports_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, r#"{"trees": [{"nodes": [{"feature": 0, "threshold": 1.0, "yes": 0, "no": 0}]}]}"#)
        .unwrap();
    let config = ModelConfig {
        backend: ModelBackend::Trees,
        model_path: path,
        metadata_path: dir.path().join("none.json"),
    };
    let handle = ModelHandle::load(&config, &FeatureSchema::builtin());
    assert!(!handle.is_loaded());
    assert!(matches!(handle.get(), Err(ScoreError::ModelUnavailable(_))));
}

#[test]
fn model_wider_than_schema_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_artifacts(dir.path());
    std::fs::write(
        &config.model.metadata_path,
        r#"{"feature_names": ["Recency", "Frequency"]}"#,
    )
    .unwrap();
    // declared width 18 vs schema of 2
    let service = ScoringService::from_config(&config).unwrap();
    assert!(!service.classifier().is_ready());
}

#[cfg(not(feature = "onnx"))]
#[test]
fn onnx_backend_requires_feature() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_artifacts(dir.path());
    config.model.backend = ModelBackend::Onnx;
    let handle = ModelHandle::load(&config.model, &FeatureSchema::builtin());
    assert!(!handle.is_loaded());
}

#[test]
fn health_reflects_components() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_artifacts(dir.path());
    let service = ScoringService::from_config(&config).unwrap();
    let health = service.health(false, true);
    assert!(health.model_loaded);
    assert!(!health.database_loaded);
    assert!(health.ai_configured);
    assert_eq!(health.feature_count, 18);
}
