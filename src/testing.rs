//! Hand-built models shared by unit tests.
//!
//! Each model keys on a single feature with obvious thresholds so tests can
//! reason about the expected class without a training run.

use std::collections::BTreeMap;

use crate::adapters::ForestModel;
use crate::domain::{
    ModelArtifact, ModelError, Node, Task, TrainingMetadata, Tree, ARTIFACT_FORMAT_VERSION,
    BIOMETRIC_FEATURES, EVENT_FEATURES, NEXT_RELAPSE_FEATURES,
};
use crate::ports::{Classifier, Model};

fn artifact(task: Task, schema: &[&str], trees: Vec<Tree>) -> ModelArtifact {
    ModelArtifact {
        format_version: ARTIFACT_FORMAT_VERSION,
        task,
        feature_names: schema.iter().map(|s| (*s).to_string()).collect(),
        trees,
        metadata: TrainingMetadata {
            algorithm: "hand_built".into(),
            trained_at: chrono::Utc::now(),
            n_samples: 0,
            params: BTreeMap::new(),
        },
    }
}

/// Two thresholds on one feature, giving three leaves.
fn three_way(feature: usize, low: f64, high: f64, leaves: [Vec<f64>; 3]) -> Tree {
    let [a, b, c] = leaves;
    Tree {
        nodes: vec![
            Node::Split {
                feature,
                threshold: low,
                left: 1,
                right: 2,
            },
            Node::Leaf { value: a },
            Node::Split {
                feature,
                threshold: high,
                left: 3,
                right: 4,
            },
            Node::Leaf { value: b },
            Node::Leaf { value: c },
        ],
    }
}

/// Biometric classifier keyed on `stress`: <40 stable, <70 early signs,
/// otherwise high relapse risk.
pub fn biometric_classifier() -> ForestModel {
    let tree = three_way(
        6,
        40.0,
        70.0,
        [
            vec![0.9, 0.08, 0.02],
            vec![0.2, 0.7, 0.1],
            vec![0.05, 0.15, 0.8],
        ],
    );
    ForestModel::from_artifact(artifact(
        Task::Classification { n_classes: 3 },
        &BIOMETRIC_FEATURES,
        vec![tree],
    ))
    .expect("valid biometric artifact")
}

/// Event classifier keyed on `duration_hours`: <5 stable, <15 medium,
/// otherwise risky.
pub fn event_classifier() -> ForestModel {
    let tree = three_way(
        1,
        5.0,
        15.0,
        [
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ],
    );
    ForestModel::from_artifact(artifact(
        Task::Classification { n_classes: 3 },
        &EVENT_FEATURES,
        vec![tree],
    ))
    .expect("valid event artifact")
}

/// Regressor keyed on `days_since_prev_relapse`: 12.5 days below 30,
/// 45 days otherwise.
pub fn next_relapse_regressor() -> ForestModel {
    let tree = Tree {
        nodes: vec![
            Node::Split {
                feature: 4,
                threshold: 30.0,
                left: 1,
                right: 2,
            },
            Node::Leaf { value: vec![-17.5] },
            Node::Leaf { value: vec![15.0] },
        ],
    };
    ForestModel::from_artifact(artifact(
        Task::Regression { base_score: 30.0 },
        &NEXT_RELAPSE_FEATURES,
        vec![tree],
    ))
    .expect("valid regressor artifact")
}

/// Single-leaf classifier with a uniform distribution.
pub fn classifier_with(schema: &[&str], n_classes: usize) -> ForestModel {
    let tree = Tree {
        nodes: vec![Node::Leaf {
            value: vec![1.0 / n_classes as f64; n_classes],
        }],
    };
    ForestModel::from_artifact(artifact(
        Task::Classification { n_classes },
        schema,
        vec![tree],
    ))
    .expect("valid uniform artifact")
}

/// How a [`BrokenClassifier`] misbehaves.
#[derive(Debug, Clone, Copy)]
pub enum Breakage {
    Error,
    Panic,
}

/// Biometric-schema classifier whose inference always fails.
pub struct BrokenClassifier {
    names: Vec<String>,
    breakage: Breakage,
}

impl BrokenClassifier {
    pub fn new(breakage: Breakage) -> Self {
        Self {
            names: BIOMETRIC_FEATURES.iter().map(|s| (*s).to_string()).collect(),
            breakage,
        }
    }
}

impl Model for BrokenClassifier {
    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn fingerprint(&self) -> &str {
        "broken"
    }
}

impl Classifier for BrokenClassifier {
    fn n_classes(&self) -> usize {
        3
    }

    fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, ModelError> {
        match self.breakage {
            Breakage::Error => Err(ModelError::Inference("tree walk exploded".into())),
            Breakage::Panic => panic!("classifier panicked"),
        }
    }
}
