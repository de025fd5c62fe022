//! Feature synthesis: raw customer behaviour → fixed-schema model input.

mod profile;
mod synthesizer;

pub use profile::CustomerProfile;
pub use synthesizer::FeatureSynthesizer;

use crate::error::ScoreError;
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::sync::Arc;

/// Feature order used when no model metadata is shipped alongside the model.
pub const BUILTIN_FEATURE_NAMES: [&str; 18] = [
    "Recency",
    "Frequency",
    "Monetary",
    "customer_age_days",
    "days_between_purchases",
    "orders_last_30d",
    "orders_last_90d",
    "avg_order_value",
    "max_order_value",
    "min_order_value",
    "std_order_value",
    "product_diversity",
    "repeat_purchase_rate",
    "avg_basket_size",
    "total_items_bought",
    "is_weekend",
    "hour",
    "spending_increasing",
];

/// Ordered feature names the model was trained on. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Arc<[String]>,
}

impl FeatureSchema {
    /// Names must be non-empty and unique (ASCII case-insensitive).
    pub fn new<I, S>(names: I) -> Result<Self, ScoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(ScoreError::SchemaMismatch("feature list is empty".into()));
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if name.trim().is_empty() {
                return Err(ScoreError::SchemaMismatch("blank feature name".into()));
            }
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(ScoreError::SchemaMismatch(format!(
                    "duplicate feature name {name:?}"
                )));
            }
        }
        Ok(Self {
            names: names.into(),
        })
    }

    pub fn builtin() -> Self {
        Self {
            names: BUILTIN_FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Slot of `name`, matched ASCII case-insensitively.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n.eq_ignore_ascii_case(name))
    }
}

/// One row of model input: values in schema order, never missing.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: FeatureSchema,
    values: Vec<f64>,
}

impl FeatureVector {
    pub(crate) fn from_parts(schema: FeatureSchema, values: Vec<f64>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self { schema, values }
    }

    /// Build from an already-featurised record. Absent or non-finite cells are 0.
    pub fn from_lookup<F>(schema: &FeatureSchema, mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<f64>,
    {
        let values = schema
            .names()
            .iter()
            .map(|name| lookup(name).filter(|v| v.is_finite()).unwrap_or(0.0))
            .collect();
        Self::from_parts(schema.clone(), values)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema.position(name).map(|i| self.values[i])
    }

    /// (name, value) pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.schema
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// N feature vectors over one schema, row-major. The unit of bulk scoring.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    schema: FeatureSchema,
    data: Array2<f64>,
}

impl FeatureMatrix {
    pub fn from_vectors(
        schema: &FeatureSchema,
        vectors: &[FeatureVector],
    ) -> Result<Self, ScoreError> {
        let mut flat = Vec::with_capacity(vectors.len() * schema.len());
        for (row, v) in vectors.iter().enumerate() {
            if v.schema() != schema {
                return Err(ScoreError::SchemaMismatch(format!(
                    "row {row} was built against a different feature schema"
                )));
            }
            flat.extend_from_slice(v.as_slice());
        }
        Self::from_flat(schema, vectors.len(), flat)
    }

    /// `flat` holds `nrows * schema.len()` values, row after row.
    pub fn from_flat(schema: &FeatureSchema, nrows: usize, flat: Vec<f64>) -> Result<Self, ScoreError> {
        let data = Array2::from_shape_vec((nrows, schema.len()), flat)
            .map_err(|e| ScoreError::SchemaMismatch(e.to_string()))?;
        Ok(Self {
            schema: schema.clone(),
            data,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.row(i)
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }
}
