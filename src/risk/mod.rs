//! Probability → risk tier classification over a loaded churn model.

mod engine;

pub use engine::{RiskAssessment, RiskClassifier, RiskTier};
