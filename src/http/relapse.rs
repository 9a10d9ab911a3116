//! Routes for the biometric relapse classifier.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use super::ApiError;
use crate::application::{RelapseAssessment, RelapseClassifierService};
use crate::config::ServiceKind;
use crate::domain::BiometricFeatures;
use crate::ports::{Classifier, Model};

/// `POST /predict` and `GET /health`.
pub fn router<M: Classifier + 'static>(service: Arc<RelapseClassifierService<M>>) -> Router {
    let health = super::health_router(
        ServiceKind::RelapseClassifier.name(),
        service.model().fingerprint(),
    );
    let routes = Router::new()
        .route("/predict", post(predict::<M>))
        .with_state(service);
    super::with_layers(routes.merge(health))
}

async fn predict<M: Classifier + 'static>(
    State(service): State<Arc<RelapseClassifierService<M>>>,
    body: Bytes,
) -> Result<Json<RelapseAssessment>, ApiError> {
    let body = super::parse_body(&body)?;
    let features = BiometricFeatures::try_from(&body)?;
    Ok(Json(service.assess(&features)?))
}
