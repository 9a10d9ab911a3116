//! Model artifact: the serialized tree ensemble written by the trainers and
//! loaded read-only by the services.
//!
//! The artifact records the ordered feature names it was trained on. A
//! service refuses to start when they differ from its own feature schema,
//! since a reordered or resized feature vector would still produce a
//! prediction, just a wrong one.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Current on-disk format version.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Error type for artifact loading and inference.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to read model artifact {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid model artifact format: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Unsupported artifact format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Corrupt model artifact: {0}")]
    Corrupt(String),

    #[error("Feature schema mismatch: model expects {expected:?}, service provides {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Model task mismatch: {0}")]
    TaskMismatch(String),

    #[error("Feature count mismatch: got {got}, expected {expected}")]
    FeatureCount { got: usize, expected: usize },

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// What the ensemble predicts and how leaf values combine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    /// Leaves hold per-class probabilities; trees are averaged.
    Classification { n_classes: usize },
    /// Leaves hold one additive value; trees are summed onto `base_score`.
    Regression { base_score: f64 },
}

impl Task {
    /// Width of every leaf value vector.
    #[must_use]
    pub fn leaf_width(&self) -> usize {
        match self {
            Self::Classification { n_classes } => *n_classes,
            Self::Regression { .. } => 1,
        }
    }
}

/// A node in a flattened decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// Go to `left` when `features[feature] < threshold`, else `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { value: Vec<f64> },
}

/// A decision tree stored as a flat node array; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Walk the tree and return the leaf value reached by `features`.
    ///
    /// Returns `None` if the walk leaves the node array, which only happens
    /// for trees that did not pass [`ModelArtifact::validate`].
    #[must_use]
    pub fn leaf(&self, features: &[f64]) -> Option<&[f64]> {
        let mut idx = 0;
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx)? {
                Node::Leaf { value } => return Some(value.as_slice()),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = *features.get(*feature)?;
                    idx = if x < *threshold { *left } else { *right };
                }
            }
        }
        None
    }

    /// Number of leaves.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

/// Provenance recorded by the trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    /// Algorithm name, e.g. `random_forest` or `gradient_boosting`.
    pub algorithm: String,

    /// When the fit finished.
    pub trained_at: chrono::DateTime<chrono::Utc>,

    /// Number of rows the ensemble was fitted on.
    pub n_samples: usize,

    /// Numeric hyperparameters (tree count, depth, learning rate, seed).
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

/// The complete serialized model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub task: Task,
    pub feature_names: Vec<String>,
    pub trees: Vec<Tree>,
    pub metadata: TrainingMetadata,
}

impl ModelArtifact {
    /// Number of input features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Check structural integrity.
    ///
    /// Child indices must point strictly forward in the node array, which
    /// rules out cycles and guarantees every walk terminates at a leaf.
    ///
    /// # Errors
    /// Returns `ModelError` describing the first violation found.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: self.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        if self.feature_names.is_empty() {
            return Err(ModelError::Corrupt("artifact lists no features".into()));
        }
        if self.trees.is_empty() {
            return Err(ModelError::Corrupt("artifact contains no trees".into()));
        }
        match self.task {
            Task::Classification { n_classes } if n_classes < 2 => {
                return Err(ModelError::Corrupt(format!(
                    "classification needs at least 2 classes, got {n_classes}"
                )));
            }
            Task::Regression { base_score } if !base_score.is_finite() => {
                return Err(ModelError::Corrupt("base_score is not finite".into()));
            }
            _ => {}
        }

        let width = self.task.leaf_width();
        let n_features = self.n_features();
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ModelError::Corrupt(format!("tree {t} is empty")));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    Node::Leaf { value } => {
                        if value.len() != width {
                            return Err(ModelError::Corrupt(format!(
                                "tree {t} node {i}: leaf has {} values, expected {width}",
                                value.len()
                            )));
                        }
                        if value.iter().any(|v| !v.is_finite()) {
                            return Err(ModelError::Corrupt(format!(
                                "tree {t} node {i}: non-finite leaf value"
                            )));
                        }
                    }
                    Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        if *feature >= n_features {
                            return Err(ModelError::Corrupt(format!(
                                "tree {t} node {i}: feature index {feature} out of range"
                            )));
                        }
                        if !threshold.is_finite() {
                            return Err(ModelError::Corrupt(format!(
                                "tree {t} node {i}: non-finite threshold"
                            )));
                        }
                        for child in [left, right] {
                            if *child <= i || *child >= tree.nodes.len() {
                                return Err(ModelError::Corrupt(format!(
                                    "tree {t} node {i}: child index {child} invalid"
                                )));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Reject the artifact unless it was trained on exactly `schema`.
    ///
    /// # Errors
    /// Returns `ModelError::SchemaMismatch` on any difference in names,
    /// order or count.
    pub fn ensure_schema(&self, schema: &[&str]) -> Result<(), ModelError> {
        check_feature_schema(&self.feature_names, schema)
    }

    fn check_input(&self, features: &[f64]) -> Result<(), ModelError> {
        if features.len() != self.n_features() {
            return Err(ModelError::FeatureCount {
                got: features.len(),
                expected: self.n_features(),
            });
        }
        Ok(())
    }

    fn leaf<'a>(&self, tree: &'a Tree, features: &[f64]) -> Result<&'a [f64], ModelError> {
        tree.leaf(features)
            .ok_or_else(|| ModelError::Inference("tree walk did not reach a leaf".into()))
    }

    /// Average per-class probabilities over all trees.
    ///
    /// # Errors
    /// Returns error if the artifact is not a classifier or the input has the
    /// wrong length.
    pub fn class_probabilities(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        let Task::Classification { n_classes } = self.task else {
            return Err(ModelError::TaskMismatch(
                "class probabilities requested from a regression model".into(),
            ));
        };
        self.check_input(features)?;

        let mut sums = vec![0.0; n_classes];
        for tree in &self.trees {
            let leaf = self.leaf(tree, features)?;
            for (acc, p) in sums.iter_mut().zip(leaf) {
                *acc += p;
            }
        }
        let n_trees = self.trees.len() as f64;
        Ok(sums.into_iter().map(|s| s / n_trees).collect())
    }

    /// Sum leaf values over all trees onto the base score.
    ///
    /// # Errors
    /// Returns error if the artifact is not a regressor or the input has the
    /// wrong length.
    pub fn regress(&self, features: &[f64]) -> Result<f64, ModelError> {
        let Task::Regression { base_score } = self.task else {
            return Err(ModelError::TaskMismatch(
                "regression requested from a classification model".into(),
            ));
        };
        self.check_input(features)?;

        let mut total = base_score;
        for tree in &self.trees {
            total += self.leaf(tree, features)?[0];
        }
        Ok(total)
    }
}

/// Compare a model's feature names against a service schema.
///
/// # Errors
/// Returns `ModelError::SchemaMismatch` unless both lists are identical.
pub fn check_feature_schema(model: &[String], schema: &[&str]) -> Result<(), ModelError> {
    let matches = model.len() == schema.len() && model.iter().zip(schema).all(|(a, b)| a == b);
    if matches {
        Ok(())
    } else {
        Err(ModelError::SchemaMismatch {
            expected: model.to_vec(),
            found: schema.iter().map(|s| (*s).to_string()).collect(),
        })
    }
}
