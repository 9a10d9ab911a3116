//! Biometric relapse classifier: 7 wearable readings in, a 3-level relapse
//! label and its confidence out.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{BiometricFeatures, LabelTable, ModelError, BIOMETRIC_FEATURES, BIOMETRIC_LABELS};
use crate::ports::Classifier;

/// Labelled output of the biometric classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelapseAssessment {
    pub label: &'static str,

    /// Probability of `label`, as a percentage rounded to 2 decimals
    pub confidence: f64,
}

/// Service context for the biometric relapse classifier.
pub struct RelapseClassifierService<M: Classifier> {
    model: Arc<M>,
    labels: LabelTable,
}

impl<M: Classifier> RelapseClassifierService<M> {
    /// Bind a loaded classifier to the biometric label table.
    ///
    /// # Errors
    /// Returns error if the model was trained on a different feature schema
    /// or predicts a different number of classes.
    pub fn new(model: Arc<M>) -> Result<Self, ModelError> {
        crate::domain::check_feature_schema(model.feature_names(), &BIOMETRIC_FEATURES)?;
        super::ensure_label_coverage(model.as_ref(), &BIOMETRIC_LABELS)?;
        Ok(Self {
            model,
            labels: BIOMETRIC_LABELS,
        })
    }

    /// Classify one set of readings.
    ///
    /// # Errors
    /// Returns `ModelError` if inference fails or yields a class outside the
    /// label table.
    pub fn assess(&self, features: &BiometricFeatures) -> Result<RelapseAssessment, ModelError> {
        let prediction = self.model.predict(&features.to_vec())?;
        let label = self.labels.label(prediction.class_index).ok_or_else(|| {
            ModelError::Inference(format!("class index {} has no label", prediction.class_index))
        })?;

        let assessment = RelapseAssessment {
            label,
            confidence: prediction.confidence_percent(),
        };
        tracing::debug!(
            "Biometric prediction: class={}, probabilities={:?}",
            prediction.class_index,
            prediction.probabilities
        );
        Ok(assessment)
    }

    /// The loaded model.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }
}
