//! Relapse event classifier service.
//!
//! Serves `POST /predict` (patient id and episode start/end in, risk class
//! out) and `GET /health`.

use std::sync::Arc;

use anyhow::{Context, Result};

use relapse_watch::adapters::ForestModel;
use relapse_watch::application::EventClassifierService;
use relapse_watch::config::{ServiceConfig, ServiceKind};
use relapse_watch::{http, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = logging::init().context("Failed to initialize logging")?;

    let config = ServiceConfig::from_env(ServiceKind::EventClassifier)?;
    tracing::info!("Starting {}...", config.kind.name());

    let service = ForestModel::load_classifier(&config.model_path)
        .and_then(|model| EventClassifierService::new(Arc::new(model)))
        .map_err(|e| {
            tracing::error!("Cannot serve model {:?}: {}", config.model_path, e);
            e
        })
        .with_context(|| format!("Failed to load model from {:?}", config.model_path))?;

    http::serve(http::event::router(Arc::new(service)), &config)
        .await
        .context("HTTP server failed")
}
