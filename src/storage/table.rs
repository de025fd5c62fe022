//! CSV-backed customer tables: bulk feature extraction, score columns, at-risk listings.

use crate::error::{LoadError, ScoreError};
use crate::features::{FeatureMatrix, FeatureSchema, FeatureVector};
use crate::risk::{RiskAssessment, RiskTier};
use csv::StringRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

pub const PROBABILITY_COLUMN: &str = "churn_probability";
pub const TIER_COLUMN: &str = "risk_tier";

/// Customer rows with arbitrary columns, all kept as text.
#[derive(Debug, Clone)]
pub struct CustomerTable {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl CustomerTable {
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|e| LoadError::io(path, e))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader.headers()?.clone();
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }

    /// Exact header match first, then ASCII case-insensitive.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .or_else(|| self.headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)
    }

    pub fn numeric(&self, row: usize, column: usize) -> Option<f64> {
        self.cell(row, column)?.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Feature vector for one row; absent, blank or non-numeric cells are 0.
    pub fn feature_vector(&self, row: usize, schema: &FeatureSchema) -> FeatureVector {
        FeatureVector::from_lookup(schema, |name| {
            self.column_index(name).and_then(|c| self.numeric(row, c))
        })
    }

    /// All rows over `schema`, in row order.
    pub fn feature_matrix(&self, schema: &FeatureSchema) -> Result<FeatureMatrix, ScoreError> {
        let columns: Vec<Option<usize>> = schema
            .names()
            .iter()
            .map(|name| self.column_index(name))
            .collect();
        let mut flat = Vec::with_capacity(self.rows.len() * columns.len());
        for row in 0..self.rows.len() {
            flat.extend(
                columns
                    .iter()
                    .map(|c| c.and_then(|c| self.numeric(row, c)).unwrap_or(0.0)),
            );
        }
        FeatureMatrix::from_flat(schema, self.rows.len(), flat)
    }

    /// Append `churn_probability` and `risk_tier`, replacing existing columns of those names.
    pub fn with_scores(&self, assessments: Vec<RiskAssessment>) -> Result<ScoredTable, ScoreError> {
        if assessments.len() != self.rows.len() {
            return Err(ScoreError::SchemaMismatch(format!(
                "{} assessments for {} rows",
                assessments.len(),
                self.rows.len()
            )));
        }
        let keep: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| {
                !h.eq_ignore_ascii_case(PROBABILITY_COLUMN) && !h.eq_ignore_ascii_case(TIER_COLUMN)
            })
            .map(|(i, _)| i)
            .collect();

        let mut headers: StringRecord = keep.iter().filter_map(|&i| self.headers.get(i)).collect();
        headers.push_field(PROBABILITY_COLUMN);
        headers.push_field(TIER_COLUMN);

        let rows = self
            .rows
            .iter()
            .zip(&assessments)
            .map(|(row, a)| {
                let mut out: StringRecord = keep.iter().map(|&i| row.get(i).unwrap_or("")).collect();
                out.push_field(&a.probability().to_string());
                out.push_field(a.tier().as_str());
                out
            })
            .collect();

        Ok(ScoredTable {
            table: CustomerTable { headers, rows },
            assessments,
        })
    }
}

/// Entry of an at-risk listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtRiskCustomer {
    pub customer_id: Option<String>,
    pub churn_probability: f64,
    pub recency: Option<f64>,
    pub monetary: Option<f64>,
}

/// A customer table with one assessment per row.
#[derive(Debug, Clone)]
pub struct ScoredTable {
    table: CustomerTable,
    assessments: Vec<RiskAssessment>,
}

impl ScoredTable {
    pub fn table(&self) -> &CustomerTable {
        &self.table
    }

    pub fn assessments(&self) -> &[RiskAssessment] {
        &self.assessments
    }

    pub fn tier_counts(&self) -> BTreeMap<RiskTier, usize> {
        let mut counts = BTreeMap::new();
        for a in &self.assessments {
            *counts.entry(a.tier()).or_insert(0) += 1;
        }
        counts
    }

    /// Rows in `tier`, highest probability first (ties keep row order), at most `limit`.
    pub fn at_risk(&self, tier: RiskTier, limit: usize, id_column: &str) -> Vec<AtRiskCustomer> {
        let t = &self.table;
        let id = t.column_index(id_column);
        let recency = t.column_index("Recency");
        let monetary = t.column_index("Monetary");

        let mut rows: Vec<(usize, f64)> = self
            .assessments
            .iter()
            .enumerate()
            .filter(|(_, a)| a.tier() == tier)
            .map(|(i, a)| (i, a.probability()))
            .collect();
        rows.sort_by(|a, b| b.1.total_cmp(&a.1));

        rows.into_iter()
            .take(limit)
            .map(|(row, p)| AtRiskCustomer {
                customer_id: id.and_then(|c| t.cell(row, c)).map(str::to_string),
                churn_probability: p,
                recency: recency.and_then(|c| t.numeric(row, c)),
                monetary: monetary.and_then(|c| t.numeric(row, c)),
            })
            .collect()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), LoadError> {
        let mut w = csv::Writer::from_writer(writer);
        w.write_record(&self.table.headers)?;
        for row in &self.table.rows {
            w.write_record(row)?;
        }
        w.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn write_path(&self, path: &Path) -> Result<(), LoadError> {
        let file = File::create(path).map_err(|e| LoadError::io(path, e))?;
        self.write_csv(file)
    }
}
