//! Feature vectors for the three relapse models.
//!
//! Each struct's `to_vec` order is the order the corresponding model was
//! trained on, and the `*_FEATURES` constants name those positions. Trainers
//! and services both go through these types so the two sides cannot drift.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Biometric feature names, in model order.
pub const BIOMETRIC_FEATURES: [&str; 7] = [
    "heart_rate",
    "hrv",
    "sleep_score",
    "steps",
    "temperature",
    "spo2",
    "stress",
];

/// Relapse event feature names, in model order.
pub const EVENT_FEATURES: [&str; 4] = ["patient_id", "duration_hours", "hour_of_day", "day_of_week"];

/// Next-relapse regressor feature names, in model order.
pub const NEXT_RELAPSE_FEATURES: [&str; 7] = [
    "patient_id",
    "duration_hours",
    "hour_of_day",
    "day_of_week",
    "days_since_prev_relapse",
    "relapse_count",
    "relapse_level",
];

/// Wearable readings for the biometric relapse classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BiometricFeatures {
    /// Resting heart rate in bpm
    pub heart_rate: f64,

    /// Heart rate variability in ms
    pub hrv: f64,

    /// Sleep quality score (0-100)
    pub sleep_score: f64,

    /// Daily step count
    pub steps: f64,

    /// Body temperature in °C
    pub temperature: f64,

    /// Blood oxygen saturation in %
    pub spo2: f64,

    /// Stress score (0-100)
    pub stress: f64,
}

impl BiometricFeatures {
    /// Convert features to a vector for inference.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.heart_rate,
            self.hrv,
            self.sleep_score,
            self.steps,
            self.temperature,
            self.spo2,
            self.stress,
        ]
    }

    /// Create features from a vector in model order.
    ///
    /// # Errors
    /// Returns `ValidationError::FeatureCount` if the vector length is not 7.
    pub fn from_vec(v: &[f64]) -> Result<Self, ValidationError> {
        if v.len() != BIOMETRIC_FEATURES.len() {
            return Err(ValidationError::FeatureCount {
                expected: BIOMETRIC_FEATURES.len(),
                got: v.len(),
            });
        }

        Ok(Self {
            heart_rate: v[0],
            hrv: v[1],
            sleep_score: v[2],
            steps: v[3],
            temperature: v[4],
            spo2: v[5],
            stress: v[6],
        })
    }
}

/// A relapse episode as reported by a client: who, and when it started and
/// ended.
#[derive(Debug, Clone, PartialEq)]
pub struct EventWindow {
    pub patient_id: f64,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl EventWindow {
    /// Build a window, rejecting one that ends before it starts.
    ///
    /// # Errors
    /// Returns `ValidationError::NegativeWindow` if `end < start`.
    pub fn new(
        patient_id: f64,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::NegativeWindow);
        }
        Ok(Self {
            patient_id,
            start,
            end,
        })
    }

    /// Derive the engineered features.
    ///
    /// Hour of day and weekday (Monday = 0) are read in the start
    /// timestamp's own offset.
    #[must_use]
    pub fn features(&self) -> EventFeatures {
        let duration_ms = (self.end - self.start).num_milliseconds();
        EventFeatures {
            patient_id: self.patient_id,
            duration_hours: duration_ms as f64 / 3_600_000.0,
            hour_of_day: f64::from(self.start.hour()),
            day_of_week: f64::from(self.start.weekday().num_days_from_monday()),
        }
    }
}

/// Engineered features for the relapse event classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventFeatures {
    pub patient_id: f64,
    pub duration_hours: f64,
    pub hour_of_day: f64,
    pub day_of_week: f64,
}

impl EventFeatures {
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.patient_id,
            self.duration_hours,
            self.hour_of_day,
            self.day_of_week,
        ]
    }
}

/// Features for the next-relapse regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NextRelapseFeatures {
    pub patient_id: f64,
    pub duration_hours: f64,
    pub hour_of_day: f64,
    pub day_of_week: f64,
    pub days_since_prev_relapse: f64,
    pub relapse_count: f64,
    pub relapse_level: f64,
}

impl NextRelapseFeatures {
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.patient_id,
            self.duration_hours,
            self.hour_of_day,
            self.day_of_week,
            self.days_since_prev_relapse,
            self.relapse_count,
            self.relapse_level,
        ]
    }

    /// Create features from a vector in model order.
    ///
    /// # Errors
    /// Returns `ValidationError::FeatureCount` if the vector length is not 7.
    pub fn from_vec(v: &[f64]) -> Result<Self, ValidationError> {
        if v.len() != NEXT_RELAPSE_FEATURES.len() {
            return Err(ValidationError::FeatureCount {
                expected: NEXT_RELAPSE_FEATURES.len(),
                got: v.len(),
            });
        }

        Ok(Self {
            patient_id: v[0],
            duration_hours: v[1],
            hour_of_day: v[2],
            day_of_week: v[3],
            days_since_prev_relapse: v[4],
            relapse_count: v[5],
            relapse_level: v[6],
        })
    }
}

/// Parse a client or dataset timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS[.fff]]` (space or `T`
/// separated) and bare dates. Timestamps without an offset are taken as UTC.
///
/// # Errors
/// Returns a description of the rejected input.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts);
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc().into());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc().into());
        }
    }
    Err(format!("unrecognized timestamp '{raw}'"))
}
