//! In-process evaluator for a boosted tree ensemble exported as JSON.
//!
//! Layout: `{"base_score": <margin>, "n_features": <opt>, "trees": [{"nodes": [...]}]}`.
//! Node 0 is the root. A split sends `x < threshold` to `yes`, otherwise `no`,
//! and NaN to `missing` (default `yes`). Child indices always point forward,
//! so traversal terminates. Probability is the logistic of
//! `base_score + sum(leaf)`.

use super::ChurnModel;
use crate::error::{LoadError, ScoreError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        yes: usize,
        no: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        missing: Option<usize>,
    },
    Leaf {
        leaf: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn leaf_value(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { leaf } => return *leaf,
                TreeNode::Split {
                    feature,
                    threshold,
                    yes,
                    no,
                    missing,
                } => {
                    let v = x[*feature];
                    idx = if v.is_nan() {
                        missing.unwrap_or(*yes)
                    } else if v < *threshold {
                        *yes
                    } else {
                        *no
                    };
                }
            }
        }
    }
}

/// On-disk form.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EnsembleFile {
    #[serde(default)]
    base_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    n_features: Option<usize>,
    trees: Vec<Tree>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeEnsemble {
    base_score: f64,
    n_features: Option<usize>,
    trees: Vec<Tree>,
    max_feature: Option<usize>,
}

impl TreeEnsemble {
    pub fn new(base_score: f64, n_features: Option<usize>, trees: Vec<Tree>) -> Result<Self, LoadError> {
        let mut ensemble = Self {
            base_score,
            n_features,
            trees,
            max_feature: None,
        };
        ensemble.validate()?;
        ensemble.max_feature = ensemble.max_feature_index();
        Ok(ensemble)
    }

    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let data = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        let file: EnsembleFile = serde_json::from_str(&data).map_err(|e| LoadError::json(path, e))?;
        Self::new(file.base_score, file.n_features, file.trees)
    }

    /// Write the on-disk form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&EnsembleFile {
            base_score: self.base_score,
            n_features: self.n_features,
            trees: self.trees.clone(),
        })
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Structural checks: non-empty trees, forward in-range children, finite numbers.
    fn validate(&self) -> Result<(), LoadError> {
        if !self.base_score.is_finite() {
            return Err(LoadError::InvalidModel("base_score is not finite".into()));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(LoadError::InvalidModel(format!("tree {t} has no nodes")));
            }
            let len = tree.nodes.len();
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    TreeNode::Leaf { leaf } if !leaf.is_finite() => {
                        return Err(LoadError::InvalidModel(format!(
                            "tree {t} node {i}: leaf value is not finite"
                        )));
                    }
                    TreeNode::Leaf { .. } => {}
                    TreeNode::Split {
                        feature,
                        threshold,
                        yes,
                        no,
                        missing,
                    } => {
                        if threshold.is_nan() {
                            return Err(LoadError::InvalidModel(format!(
                                "tree {t} node {i}: threshold is NaN"
                            )));
                        }
                        if let Some(n) = self.n_features {
                            if *feature >= n {
                                return Err(LoadError::InvalidModel(format!(
                                    "tree {t} node {i}: feature {feature} out of range for {n} features"
                                )));
                            }
                        }
                        for child in [Some(*yes), Some(*no), *missing].into_iter().flatten() {
                            if child <= i || child >= len {
                                return Err(LoadError::InvalidModel(format!(
                                    "tree {t} node {i}: child {child} must point forward within {len} nodes"
                                )));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Highest feature index referenced by any split.
    fn max_feature_index(&self) -> Option<usize> {
        self.trees
            .iter()
            .flat_map(|t| t.nodes.iter())
            .filter_map(|n| match n {
                TreeNode::Split { feature, .. } => Some(*feature),
                TreeNode::Leaf { .. } => None,
            })
            .max()
    }

    /// Every split must address a column of a `width`-wide row.
    pub fn check_width(&self, width: usize) -> Result<(), ScoreError> {
        match self.max_feature {
            Some(max) if max >= width => Err(ScoreError::SchemaMismatch(format!(
                "model splits on feature {max} but schema has {width} features"
            ))),
            _ => Ok(()),
        }
    }

    fn margin(&self, x: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.leaf_value(x)).sum::<f64>()
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl ChurnModel for TreeEnsemble {
    fn name(&self) -> &str {
        "tree_ensemble"
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn predict_probability(&self, features: &[f64]) -> Result<f64, ScoreError> {
        if let Some(max) = self.max_feature {
            if max >= features.len() {
                return Err(ScoreError::SchemaMismatch(format!(
                    "row has {} features, model reads feature {max}",
                    features.len()
                )));
            }
        }
        Ok(sigmoid(self.margin(features)))
    }
}
