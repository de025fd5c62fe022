//! Raw behavioural attributes for one customer or simulated scenario.

use crate::error::ScoreError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    /// Days since last transaction
    pub recency: u32,
    /// Historical order count; must be at least 1 once a floor is applied
    pub frequency: u32,
    /// Cumulative spend
    pub monetary: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_order_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_age_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_diversity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orders_last_30d: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orders_last_90d: Option<u32>,
    /// Share of orders placed on weekends, 0..=1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_weekend_fraction: Option<f64>,
    /// Signed spend trend; positive means spending is increasing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spending_trend: Option<f64>,
}

impl CustomerProfile {
    pub fn new(recency: u32, frequency: u32, monetary: f64) -> Self {
        Self {
            recency,
            frequency,
            monetary,
            avg_order_value: None,
            customer_age_days: None,
            product_diversity: None,
            orders_last_30d: None,
            orders_last_90d: None,
            is_weekend_fraction: None,
            spending_trend: None,
        }
    }

    /// Raise `frequency` to at least `floor`.
    pub fn with_frequency_floor(mut self, floor: u32) -> Self {
        self.frequency = self.frequency.max(floor);
        self
    }

    pub fn validate(&self) -> Result<(), ScoreError> {
        if self.frequency == 0 {
            return Err(ScoreError::InvalidProfile(
                "frequency must be at least 1 (apply a floor before scoring)".into(),
            ));
        }
        non_negative("monetary", self.monetary)?;
        if let Some(v) = self.avg_order_value {
            non_negative("avg_order_value", v)?;
        }
        if let Some(v) = self.is_weekend_fraction {
            if !(0.0..=1.0).contains(&v) {
                return Err(ScoreError::InvalidProfile(format!(
                    "is_weekend_fraction must be within [0, 1], got {v}"
                )));
            }
        }
        if let Some(v) = self.spending_trend {
            if !v.is_finite() {
                return Err(ScoreError::InvalidProfile(
                    "spending_trend must be finite".into(),
                ));
            }
        }
        Ok(())
    }
}

fn non_negative(field: &str, v: f64) -> Result<(), ScoreError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(ScoreError::InvalidProfile(format!(
            "{field} must be a finite non-negative number, got {v}"
        )))
    }
}
