//! Routes for the next-relapse regressor.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use super::ApiError;
use crate::application::NextRelapseService;
use crate::config::ServiceKind;
use crate::domain::{NextRelapseEstimate, NextRelapseFeatures};
use crate::ports::{Model, Regressor};

#[derive(Debug, Serialize)]
struct NextRelapseResponse {
    predicted_days_to_next_relapse: f64,
    predicted_next_relapse_date: String,
}

impl From<NextRelapseEstimate> for NextRelapseResponse {
    fn from(estimate: NextRelapseEstimate) -> Self {
        Self {
            predicted_days_to_next_relapse: estimate.rounded_days(),
            predicted_next_relapse_date: estimate.date_string(),
        }
    }
}

/// `POST /predict-next-relapse` and `GET /health`.
pub fn router<R: Regressor + 'static>(service: Arc<NextRelapseService<R>>) -> Router {
    let health = super::health_router(ServiceKind::NextRelapse.name(), service.model().fingerprint());
    let routes = Router::new()
        .route("/predict-next-relapse", post(predict::<R>))
        .with_state(service);
    super::with_layers(routes.merge(health))
}

async fn predict<R: Regressor + 'static>(
    State(service): State<Arc<NextRelapseService<R>>>,
    body: Bytes,
) -> Result<Json<NextRelapseResponse>, ApiError> {
    let body = super::parse_body(&body)?;
    let features = NextRelapseFeatures::try_from(&body)?;
    Ok(Json(service.estimate(&features)?.into()))
}
