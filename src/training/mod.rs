//! Offline training: CSV in, validated model artifact out.
//!
//! - `dataset`: CSV loading and the in-memory feature matrix
//! - `pipeline`: per-model feature engineering, fit and evaluation
//! - `forest` / `boosting`: the two ensemble learners
//! - `tree`: single-tree growers shared by both learners
//! - `split`, `metrics`: hold-out sampling and evaluation
//! - `cli`: argument parsing for the trainer binaries

pub mod boosting;
pub mod cli;
pub mod dataset;
pub mod forest;
pub mod metrics;
pub mod pipeline;
pub mod split;
pub mod tree;

use std::path::PathBuf;

pub use boosting::{fit_gradient_boosting, GradientBoostingParams};
pub use cli::{Learner, TrainOptions};
pub use dataset::{CsvTable, Dataset};
pub use forest::{fit_random_forest, RandomForestParams};
pub use metrics::{accuracy, mean_absolute_error, ClassificationReport, ConfusionMatrix};
pub use split::{train_test_split, Split};

use crate::domain::ModelError;

/// Error type for reading training data.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Failed to read dataset {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset {0:?} has no header row")]
    MissingHeader(PathBuf),

    #[error("Dataset has no column '{0}'")]
    MissingColumn(String),

    #[error("Line {line}: expected {expected} fields, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: column '{column}' is not a number: '{value}'")]
    NotNumeric {
        line: usize,
        column: String,
        value: String,
    },

    #[error("Line {line}: column '{column}' is not a timestamp: {reason}")]
    InvalidTimestamp {
        line: usize,
        column: String,
        reason: String,
    },

    #[error("Line {line}: class label {value} is not one of 0..{n_classes}")]
    InvalidLabel {
        line: usize,
        value: f64,
        n_classes: usize,
    },

    #[error("Line {line}: relapse ends before it starts")]
    NegativeDuration { line: usize },
}

/// Error type for fitting and evaluating models.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Not enough data: {0}")]
    InsufficientData(String),

    #[error("Invalid training parameter: {0}")]
    InvalidParameter(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}
