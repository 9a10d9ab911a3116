//! Request payload validation.
//!
//! All three services accept loosely-typed JSON and share one contract:
//! every required value is present, the count is exact, and every feature is
//! a JSON number. Anything else is a client error and never reaches a model.

use serde_json::{Map, Value};

use super::features::{parse_timestamp, NEXT_RELAPSE_FEATURES};
use super::{BiometricFeatures, EventWindow, NextRelapseFeatures, BIOMETRIC_FEATURES};

/// A request that does not satisfy the feature contract.
///
/// The `Display` text is returned to the client verbatim.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Missing 'features' in request body")]
    MissingFeatures,

    #[error("'features' must be a list")]
    FeaturesNotList,

    #[error("Expected {expected} features, got {got}")]
    FeatureCount { expected: usize, got: usize },

    #[error("All features must be numeric")]
    NonNumericFeature,

    #[error("Missing field '{0}'")]
    MissingField(String),

    #[error("Field '{0}' must be numeric")]
    NonNumericField(String),

    #[error("Field '{0}' must be a string")]
    NonStringField(String),

    #[error("Unexpected field '{0}'")]
    UnexpectedField(String),

    #[error("Invalid timestamp for '{field}': {reason}")]
    InvalidTimestamp { field: String, reason: String },

    #[error("'end_time' must not precede 'start_time'")]
    NegativeWindow,
}

const EVENT_FIELDS: [&str; 3] = ["patient_id", "start_time", "end_time"];

fn as_object(body: &Value) -> Result<&Map<String, Value>, ValidationError> {
    body.as_object().ok_or(ValidationError::NotAnObject)
}

/// JSON numbers only; booleans and numeric strings are rejected.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|x| x.is_finite()),
        _ => None,
    }
}

fn required<'a>(obj: &'a Map<String, Value>, name: &str) -> Result<&'a Value, ValidationError> {
    obj.get(name)
        .ok_or_else(|| ValidationError::MissingField(name.to_string()))
}

fn numeric_field(obj: &Map<String, Value>, name: &str) -> Result<f64, ValidationError> {
    as_number(required(obj, name)?).ok_or_else(|| ValidationError::NonNumericField(name.to_string()))
}

fn timestamp_field(
    obj: &Map<String, Value>,
    name: &str,
) -> Result<chrono::DateTime<chrono::FixedOffset>, ValidationError> {
    let raw = required(obj, name)?
        .as_str()
        .ok_or_else(|| ValidationError::NonStringField(name.to_string()))?;
    parse_timestamp(raw).map_err(|reason| ValidationError::InvalidTimestamp {
        field: name.to_string(),
        reason,
    })
}

fn reject_unknown(obj: &Map<String, Value>, allowed: &[&str]) -> Result<(), ValidationError> {
    match obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(extra) => Err(ValidationError::UnexpectedField(extra.clone())),
        None => Ok(()),
    }
}

/// Extract a positional feature list of exactly `expected` numbers from
/// `body["features"]`.
///
/// # Errors
/// Returns the first contract violation: missing key, not a list, wrong
/// count, or a non-numeric element.
pub fn feature_list(body: &Value, expected: usize) -> Result<Vec<f64>, ValidationError> {
    let obj = as_object(body)?;
    let list = obj
        .get("features")
        .ok_or(ValidationError::MissingFeatures)?
        .as_array()
        .ok_or(ValidationError::FeaturesNotList)?;

    if list.len() != expected {
        return Err(ValidationError::FeatureCount {
            expected,
            got: list.len(),
        });
    }

    list.iter()
        .map(|v| as_number(v).ok_or(ValidationError::NonNumericFeature))
        .collect()
}

impl TryFrom<&Value> for BiometricFeatures {
    type Error = ValidationError;

    /// Parse `{"features": [f1..f7]}`.
    fn try_from(body: &Value) -> Result<Self, Self::Error> {
        let values = feature_list(body, BIOMETRIC_FEATURES.len())?;
        Self::from_vec(&values)
    }
}

impl TryFrom<&Value> for EventWindow {
    type Error = ValidationError;

    /// Parse `{"patient_id": n, "start_time": ts, "end_time": ts}`.
    fn try_from(body: &Value) -> Result<Self, Self::Error> {
        let obj = as_object(body)?;
        let patient_id = numeric_field(obj, "patient_id")?;
        let start = timestamp_field(obj, "start_time")?;
        let end = timestamp_field(obj, "end_time")?;
        reject_unknown(obj, &EVENT_FIELDS)?;
        Self::new(patient_id, start, end)
    }
}

impl TryFrom<&Value> for NextRelapseFeatures {
    type Error = ValidationError;

    /// Parse an object carrying the 7 named regressor features.
    fn try_from(body: &Value) -> Result<Self, Self::Error> {
        let obj = as_object(body)?;
        let values = NEXT_RELAPSE_FEATURES
            .iter()
            .map(|name| numeric_field(obj, name))
            .collect::<Result<Vec<_>, _>>()?;
        reject_unknown(obj, &NEXT_RELAPSE_FEATURES)?;
        Self::from_vec(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn next_relapse_body() -> Value {
        json!({
            "patient_id": 12,
            "duration_hours": 6.5,
            "hour_of_day": 14,
            "day_of_week": 3,
            "days_since_prev_relapse": 21.0,
            "relapse_count": 4,
            "relapse_level": 1
        })
    }

    #[test]
    fn test_biometric_valid() {
        let body = json!({"features": [85, 30, 50, 2000, 37.5, 94, 85]});
        let features = BiometricFeatures::try_from(&body).expect("valid");
        assert!((features.temperature - 37.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_biometric_error_messages() {
        let cases = [
            (json!({}), "Missing 'features' in request body"),
            (json!({"feature": [1, 2]}), "Missing 'features' in request body"),
            (json!([1, 2, 3]), "Request body must be a JSON object"),
            (json!({"features": "1,2,3"}), "'features' must be a list"),
            (json!({"features": [1, 2, 3, 4, 5, 6]}), "Expected 7 features, got 6"),
            (json!({"features": [1, 2, 3, 4, 5, 6, 7, 8]}), "Expected 7 features, got 8"),
            (json!({"features": [1, 2, 3, "4", 5, 6, 7]}), "All features must be numeric"),
            (json!({"features": [1, 2, 3, true, 5, 6, 7]}), "All features must be numeric"),
            (json!({"features": [1, 2, 3, null, 5, 6, 7]}), "All features must be numeric"),
        ];

        for (body, expected) in cases {
            let err = BiometricFeatures::try_from(&body).unwrap_err();
            assert_eq!(err.to_string(), expected, "body: {body}");
        }
    }

    #[test]
    fn test_event_window_valid() {
        let body = json!({
            "patient_id": 7,
            "start_time": "2024-02-10 09:00:00",
            "end_time": "2024-02-10T17:30:00"
        });
        let window = EventWindow::try_from(&body).expect("valid");
        let f = window.features();
        assert!((f.duration_hours - 8.5).abs() < 1e-9);
        assert!((f.hour_of_day - 9.0).abs() < f64::EPSILON);
        // Saturday
        assert!((f.day_of_week - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_event_window_errors() {
        let missing = json!({"patient_id": 7, "start_time": "2024-02-10 09:00:00"});
        assert_eq!(
            EventWindow::try_from(&missing).unwrap_err(),
            ValidationError::MissingField("end_time".into())
        );

        let bad_id = json!({"patient_id": "p-7", "start_time": "2024-02-10", "end_time": "2024-02-11"});
        assert_eq!(
            EventWindow::try_from(&bad_id).unwrap_err().to_string(),
            "Field 'patient_id' must be numeric"
        );

        let bad_ts = json!({"patient_id": 7, "start_time": "soon", "end_time": "2024-02-11"});
        assert!(matches!(
            EventWindow::try_from(&bad_ts).unwrap_err(),
            ValidationError::InvalidTimestamp { ref field, .. } if field == "start_time"
        ));

        let numeric_ts = json!({"patient_id": 7, "start_time": 1700000000, "end_time": "2024-02-11"});
        assert_eq!(
            EventWindow::try_from(&numeric_ts).unwrap_err(),
            ValidationError::NonStringField("start_time".into())
        );

        let reversed = json!({"patient_id": 7, "start_time": "2024-02-11", "end_time": "2024-02-10"});
        assert_eq!(
            EventWindow::try_from(&reversed).unwrap_err(),
            ValidationError::NegativeWindow
        );

        let extra = json!({
            "patient_id": 7,
            "start_time": "2024-02-10",
            "end_time": "2024-02-11",
            "severity": 3
        });
        assert_eq!(
            EventWindow::try_from(&extra).unwrap_err(),
            ValidationError::UnexpectedField("severity".into())
        );
    }

    #[test]
    fn test_next_relapse_valid() {
        let features = NextRelapseFeatures::try_from(&next_relapse_body()).expect("valid");
        assert!((features.days_since_prev_relapse - 21.0).abs() < f64::EPSILON);
        assert_eq!(features.to_vec().len(), 7);
    }

    #[test]
    fn test_next_relapse_errors() {
        for name in NEXT_RELAPSE_FEATURES {
            let mut body = next_relapse_body();
            body.as_object_mut().expect("object").remove(name);
            assert_eq!(
                NextRelapseFeatures::try_from(&body).unwrap_err().to_string(),
                format!("Missing field '{name}'")
            );
        }

        let mut body = next_relapse_body();
        body["relapse_level"] = json!("high");
        assert_eq!(
            NextRelapseFeatures::try_from(&body).unwrap_err(),
            ValidationError::NonNumericField("relapse_level".into())
        );

        let mut body = next_relapse_body();
        body["notes"] = json!("n/a");
        assert_eq!(
            NextRelapseFeatures::try_from(&body).unwrap_err(),
            ValidationError::UnexpectedField("notes".into())
        );
    }
}
