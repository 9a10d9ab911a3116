//! Prediction result types.
//!
//! Represents the output of the relapse models after interpretation:
//! a class index mapped through a fixed label table, or a day count mapped
//! onto the calendar.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::ModelError;

/// Labels for the biometric relapse classifier.
pub const BIOMETRIC_LABELS: LabelTable = LabelTable::new(&[
    "Stable condition",
    "Possible early signs",
    "High chance of relapse",
]);

/// Descriptions for the relapse event classifier.
pub const EVENT_LABELS: LabelTable = LabelTable::new(&["Stable", "Medium Risk", "Risky"]);

/// Largest horizon a regressor output may be mapped onto the calendar.
const MAX_HORIZON_DAYS: f64 = 36_500.0;

/// Fixed class-index → label lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelTable {
    labels: &'static [&'static str],
}

impl LabelTable {
    #[must_use]
    pub const fn new(labels: &'static [&'static str]) -> Self {
        Self { labels }
    }

    /// Label for a class index.
    #[must_use]
    pub fn label(&self, class_index: usize) -> Option<&'static str> {
        self.labels.get(class_index).copied()
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(&label)
    }
}

/// Round to 2 decimal places.
#[must_use]
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Result of a classifier call (before labelling).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPrediction {
    /// Index of the most probable class
    pub class_index: usize,

    /// Per-class probabilities (0.0 to 1.0)
    pub probabilities: Vec<f64>,
}

impl ClassPrediction {
    /// Pick the most probable class; ties go to the lowest index.
    ///
    /// # Errors
    /// Returns `ModelError::Inference` for an empty or non-finite
    /// distribution.
    pub fn from_probabilities(probabilities: Vec<f64>) -> Result<Self, ModelError> {
        if probabilities.is_empty() {
            return Err(ModelError::Inference("model returned no probabilities".into()));
        }
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(ModelError::Inference(
                "model returned a non-finite probability".into(),
            ));
        }

        let mut class_index = 0;
        for (i, p) in probabilities.iter().enumerate() {
            if *p > probabilities[class_index] {
                class_index = i;
            }
        }

        Ok(Self {
            class_index,
            probabilities,
        })
    }

    /// Probability of the predicted class.
    #[must_use]
    pub fn probability(&self) -> f64 {
        self.probabilities[self.class_index]
    }

    /// Probability of the predicted class as a percentage in [0, 100],
    /// rounded to 2 decimals.
    #[must_use]
    pub fn confidence_percent(&self) -> f64 {
        round2((self.probability() * 100.0).clamp(0.0, 100.0))
    }
}

/// Regressor output mapped onto the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NextRelapseEstimate {
    /// Predicted days until the next relapse (unrounded)
    pub days: f64,

    /// `now + days`
    pub date: NaiveDate,
}

impl NextRelapseEstimate {
    /// Project `days` forward from `now`.
    ///
    /// # Errors
    /// Returns `ModelError::Inference` when `days` is not finite or lies
    /// beyond any plausible horizon.
    pub fn from_days(days: f64, now: NaiveDateTime) -> Result<Self, ModelError> {
        if !days.is_finite() || days.abs() > MAX_HORIZON_DAYS {
            return Err(ModelError::Inference(format!(
                "regressor returned an implausible day count: {days}"
            )));
        }

        let offset = Duration::milliseconds((days * 86_400_000.0).round() as i64);
        let date = now
            .checked_add_signed(offset)
            .ok_or_else(|| ModelError::Inference("predicted date out of range".into()))?
            .date();

        Ok(Self { days, date })
    }

    /// Day count rounded to 2 decimals.
    #[must_use]
    pub fn rounded_days(&self) -> f64 {
        round2(self.days)
    }

    /// Date formatted as `YYYY-MM-DD`.
    #[must_use]
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_tables() {
        assert_eq!(BIOMETRIC_LABELS.len(), 3);
        assert_eq!(BIOMETRIC_LABELS.label(0), Some("Stable condition"));
        assert_eq!(BIOMETRIC_LABELS.label(2), Some("High chance of relapse"));
        assert_eq!(BIOMETRIC_LABELS.label(3), None);
        assert_eq!(EVENT_LABELS.label(1), Some("Medium Risk"));
        assert!(EVENT_LABELS.contains("Risky"));
    }

    #[test]
    fn test_argmax_and_ties() {
        let p = ClassPrediction::from_probabilities(vec![0.2, 0.5, 0.3]).expect("valid");
        assert_eq!(p.class_index, 1);

        let tie = ClassPrediction::from_probabilities(vec![0.4, 0.4, 0.2]).expect("valid");
        assert_eq!(tie.class_index, 0);
    }

    #[test]
    fn test_confidence_rounding() {
        let p = ClassPrediction::from_probabilities(vec![0.123_456, 0.876_544]).expect("valid");
        assert!((p.confidence_percent() - 87.65).abs() < 1e-9);

        let sure = ClassPrediction::from_probabilities(vec![0.0, 1.000_000_1]).expect("valid");
        assert!((sure.confidence_percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_bad_distribution() {
        assert!(ClassPrediction::from_probabilities(vec![]).is_err());
        assert!(ClassPrediction::from_probabilities(vec![f64::NAN, 0.5]).is_err());
    }

    #[test]
    fn test_next_relapse_date() {
        let now = NaiveDate::from_ymd_opt(2024, 12, 30)
            .and_then(|d| d.and_hms_opt(18, 0, 0))
            .expect("valid date");

        let estimate = NextRelapseEstimate::from_days(3.256, now).expect("estimate");
        assert!((estimate.rounded_days() - 3.26).abs() < 1e-9);
        // 18:00 + 3.256 days crosses into Jan 3rd.
        assert_eq!(estimate.date_string(), "2025-01-03");

        let back = NextRelapseEstimate::from_days(-0.5, now).expect("estimate");
        assert_eq!(back.date_string(), "2024-12-30");
    }

    #[test]
    fn test_next_relapse_rejects_nonsense() {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date");
        assert!(NextRelapseEstimate::from_days(f64::INFINITY, now).is_err());
        assert!(NextRelapseEstimate::from_days(1e9, now).is_err());
    }
}
