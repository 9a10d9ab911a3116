//! Next-relapse regressor: engineered history features in, days until the
//! next relapse and the corresponding calendar date out.

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::domain::{ModelError, NextRelapseEstimate, NextRelapseFeatures, NEXT_RELAPSE_FEATURES};
use crate::ports::Regressor;

/// Service context for the next-relapse regressor.
pub struct NextRelapseService<R: Regressor> {
    model: Arc<R>,
}

impl<R: Regressor> NextRelapseService<R> {
    /// Bind a loaded regressor.
    ///
    /// # Errors
    /// Returns error if the model was trained on a different feature schema.
    pub fn new(model: Arc<R>) -> Result<Self, ModelError> {
        crate::domain::check_feature_schema(model.feature_names(), &NEXT_RELAPSE_FEATURES)?;
        Ok(Self { model })
    }

    /// Predict relative to the current local time.
    ///
    /// # Errors
    /// Returns `ModelError` if inference fails or the output cannot be
    /// mapped onto the calendar.
    pub fn estimate(&self, features: &NextRelapseFeatures) -> Result<NextRelapseEstimate, ModelError> {
        self.estimate_at(features, chrono::Local::now().naive_local())
    }

    /// Predict relative to `now`.
    ///
    /// # Errors
    /// Returns `ModelError` if inference fails or the output cannot be
    /// mapped onto the calendar.
    pub fn estimate_at(
        &self,
        features: &NextRelapseFeatures,
        now: NaiveDateTime,
    ) -> Result<NextRelapseEstimate, ModelError> {
        let days = self.model.predict(&features.to_vec())?;
        let estimate = NextRelapseEstimate::from_days(days, now)?;
        tracing::debug!("Regressor prediction: days={:.4}, date={}", days, estimate.date);
        Ok(estimate)
    }

    /// The loaded model.
    #[must_use]
    pub fn model(&self) -> &R {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use chrono::NaiveDate;

    #[test]
    fn test_estimate_at_fixed_time() {
        let service =
            NextRelapseService::new(Arc::new(testing::next_relapse_regressor())).expect("schema");
        let now = NaiveDate::from_ymd_opt(2024, 6, 1)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .expect("date");

        let mut features = NextRelapseFeatures {
            days_since_prev_relapse: 10.0,
            ..Default::default()
        };
        let soon = service.estimate_at(&features, now).expect("estimate");
        assert!((soon.days - 12.5).abs() < 1e-9);
        assert_eq!(soon.date_string(), "2024-06-13");

        features.days_since_prev_relapse = 60.0;
        let later = service.estimate_at(&features, now).expect("estimate");
        assert!((later.days - 45.0).abs() < 1e-9);
        assert_eq!(later.date_string(), "2024-07-16");
    }

    #[test]
    fn test_rejects_classifier_schema() {
        let result = NextRelapseService::new(Arc::new(testing::biometric_classifier()));
        assert!(matches!(result, Err(ModelError::SchemaMismatch { .. })));
    }
}
