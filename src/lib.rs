//! Retain engine: churn risk scoring over a pre-trained boosted model.
//!
//! Modular structure:
//! - [`features`] - Customer profiles and deterministic feature synthesis
//! - [`model`] - Model artifacts, schema metadata, inference backends
//! - [`risk`] - Probability to risk tier classification
//! - [`scoring`] - Scoring context tying synthesis and classification together
//! - [`storage`] - CSV customer tables for bulk scoring
//! - [`explain`] - Attribution engine seam
//! - [`diagnostics`] - Local setup checks
//! - [`logging`] - Structured logging

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod explain;
pub mod features;
pub mod logging;
pub mod model;
pub mod risk;
pub mod scoring;
pub mod storage;

pub use config::EngineConfig;
pub use error::{ConfigError, LoadError, ScoreError};
pub use features::{
    CustomerProfile, FeatureMatrix, FeatureSchema, FeatureSynthesizer, FeatureVector,
};
pub use logging::StructuredLogger;
pub use model::{ChurnModel, ModelHandle, TreeEnsemble};
pub use risk::{RiskAssessment, RiskClassifier, RiskTier};
pub use scoring::ScoringService;
pub use storage::{CustomerTable, ScoredTable};
