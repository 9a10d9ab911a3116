//! Model port: Traits for a loaded, read-only statistical model.
//!
//! This trait abstracts the artifact format from the application logic.
//! Implementations must be immutable after construction so a single
//! instance can be shared across concurrent requests.

use crate::domain::{ClassPrediction, ModelError};

/// Anything loaded from a training artifact.
pub trait Model: Send + Sync {
    /// Ordered feature names the model was trained on.
    fn feature_names(&self) -> &[String];

    /// Stable identifier of the loaded artifact (hex digest).
    fn fingerprint(&self) -> &str;
}

/// A model producing a probability distribution over classes.
pub trait Classifier: Model {
    /// Number of classes in the output distribution.
    fn n_classes(&self) -> usize;

    /// Class probabilities for a single feature vector.
    ///
    /// # Errors
    /// Returns `ModelError` if the input has the wrong length or the model
    /// fails to evaluate.
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError>;

    /// Most probable class and the full distribution.
    ///
    /// # Errors
    /// Returns `ModelError` if `predict_proba` fails or yields an unusable
    /// distribution.
    fn predict(&self, features: &[f64]) -> Result<ClassPrediction, ModelError> {
        ClassPrediction::from_probabilities(self.predict_proba(features)?)
    }
}

/// A model producing one continuous value.
pub trait Regressor: Model {
    /// Predicted value for a single feature vector.
    ///
    /// # Errors
    /// Returns `ModelError` if the input has the wrong length or the model
    /// fails to evaluate.
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError>;
}
