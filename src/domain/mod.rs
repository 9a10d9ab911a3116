//! Domain layer: Core types and logic.
//!
//! This module contains pure Rust types with no I/O. Feature vectors,
//! predictions and the model artifact are all serializable, and every
//! request payload passes through the validation here before it reaches a
//! model.

mod artifact;
mod features;
mod prediction;
mod validation;

pub use artifact::{
    check_feature_schema, ModelArtifact, ModelError, Node, Task, TrainingMetadata, Tree,
    ARTIFACT_FORMAT_VERSION,
};
pub use features::{
    parse_timestamp, BiometricFeatures, EventFeatures, EventWindow, NextRelapseFeatures,
    BIOMETRIC_FEATURES, EVENT_FEATURES, NEXT_RELAPSE_FEATURES,
};
pub use prediction::{
    round2, ClassPrediction, LabelTable, NextRelapseEstimate, BIOMETRIC_LABELS, EVENT_LABELS,
};
pub use validation::ValidationError;
