//! Relapse event classifier: a reported episode window in, a 3-level risk
//! class out.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{EventWindow, LabelTable, ModelError, EVENT_FEATURES, EVENT_LABELS};
use crate::ports::Classifier;

/// Output of the event classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventAssessment {
    /// Class index (0 = stable, 1 = medium, 2 = risky)
    pub prediction: usize,

    pub description: &'static str,
}

/// Service context for the relapse event classifier.
pub struct EventClassifierService<M: Classifier> {
    model: Arc<M>,
    labels: LabelTable,
}

impl<M: Classifier> EventClassifierService<M> {
    /// Bind a loaded classifier to the event label table.
    ///
    /// # Errors
    /// Returns error if the model was trained on a different feature schema
    /// or predicts a different number of classes.
    pub fn new(model: Arc<M>) -> Result<Self, ModelError> {
        crate::domain::check_feature_schema(model.feature_names(), &EVENT_FEATURES)?;
        super::ensure_label_coverage(model.as_ref(), &EVENT_LABELS)?;
        Ok(Self {
            model,
            labels: EVENT_LABELS,
        })
    }

    /// Classify one relapse episode.
    ///
    /// # Errors
    /// Returns `ModelError` if inference fails or yields a class outside the
    /// label table.
    pub fn assess(&self, window: &EventWindow) -> Result<EventAssessment, ModelError> {
        let features = window.features();
        let prediction = self.model.predict(&features.to_vec())?;
        let description = self.labels.label(prediction.class_index).ok_or_else(|| {
            ModelError::Inference(format!("class index {} has no label", prediction.class_index))
        })?;

        tracing::debug!(
            "Event prediction: duration_hours={:.2}, hour_of_day={}, day_of_week={}, class={}",
            features.duration_hours,
            features.hour_of_day,
            features.day_of_week,
            prediction.class_index
        );
        Ok(EventAssessment {
            prediction: prediction.class_index,
            description,
        })
    }

    /// The loaded model.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }
}
