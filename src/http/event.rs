//! Routes for the relapse event classifier.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use super::ApiError;
use crate::application::{EventAssessment, EventClassifierService};
use crate::config::ServiceKind;
use crate::domain::EventWindow;
use crate::ports::{Classifier, Model};

/// `POST /predict` and `GET /health`.
pub fn router<M: Classifier + 'static>(service: Arc<EventClassifierService<M>>) -> Router {
    let health = super::health_router(
        ServiceKind::EventClassifier.name(),
        service.model().fingerprint(),
    );
    let routes = Router::new()
        .route("/predict", post(predict::<M>))
        .with_state(service);
    super::with_layers(routes.merge(health))
}

async fn predict<M: Classifier + 'static>(
    State(service): State<Arc<EventClassifierService<M>>>,
    body: Bytes,
) -> Result<Json<EventAssessment>, ApiError> {
    let body = super::parse_body(&body)?;
    let window = EventWindow::try_from(&body)?;
    Ok(Json(service.assess(&window)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_client::post;
    use crate::testing;
    use axum::http::StatusCode;
    use serde_json::json;

    fn app() -> Router {
        let service =
            EventClassifierService::new(Arc::new(testing::event_classifier())).expect("service");
        router(Arc::new(service))
    }

    #[tokio::test]
    async fn test_predict_window() {
        let (status, body) = post(
            app(),
            "/predict",
            r#"{"patient_id": 7, "start_time": "2024-03-04 22:00:00", "end_time": "2024-03-05 09:30:00"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"prediction": 1, "description": "Medium Risk"}));
    }

    #[tokio::test]
    async fn test_rfc3339_timestamps() {
        let (status, body) = post(
            app(),
            "/predict",
            r#"{"patient_id": 7, "start_time": "2024-03-04T08:00:00+01:00", "end_time": "2024-03-05T08:00:00+01:00"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["description"], "Risky");
    }

    #[tokio::test]
    async fn test_contract_violations() {
        let cases = [
            (
                r#"{"start_time": "2024-03-04 08:00:00", "end_time": "2024-03-04 09:00:00"}"#,
                "Missing field 'patient_id'",
            ),
            (
                r#"{"patient_id": "seven", "start_time": "2024-03-04 08:00:00", "end_time": "2024-03-04 09:00:00"}"#,
                "Field 'patient_id' must be numeric",
            ),
            (
                r#"{"patient_id": 7, "start_time": "2024-03-04 08:00:00", "end_time": "2024-03-04 07:00:00"}"#,
                "'end_time' must not precede 'start_time'",
            ),
            (
                r#"{"patient_id": 7, "start_time": "2024-03-04 08:00:00", "end_time": "2024-03-04 09:00:00", "note": "x"}"#,
                "Unexpected field 'note'",
            ),
        ];

        for (payload, message) in cases {
            let (status, body) = post(app(), "/predict", payload).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {payload}");
            assert_eq!(body, json!({ "error": message }));
        }
    }

    #[tokio::test]
    async fn test_invalid_timestamp() {
        let (status, body) = post(
            app(),
            "/predict",
            r#"{"patient_id": 7, "start_time": "yesterday", "end_time": "2024-03-04 09:00:00"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = body["error"].as_str().expect("error");
        assert!(message.starts_with("Invalid timestamp for 'start_time'"));
    }
}
