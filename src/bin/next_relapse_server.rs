//! Next-relapse regressor service.
//!
//! Serves `POST /predict-next-relapse` (7 history features in, days until
//! the next relapse and its date out) and `GET /health`.

use std::sync::Arc;

use anyhow::{Context, Result};

use relapse_watch::adapters::ForestModel;
use relapse_watch::application::NextRelapseService;
use relapse_watch::config::{ServiceConfig, ServiceKind};
use relapse_watch::{http, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = logging::init().context("Failed to initialize logging")?;

    let config = ServiceConfig::from_env(ServiceKind::NextRelapse)?;
    tracing::info!("Starting {}...", config.kind.name());

    let service = ForestModel::load_regressor(&config.model_path)
        .and_then(|model| NextRelapseService::new(Arc::new(model)))
        .map_err(|e| {
            tracing::error!("Cannot serve model {:?}: {}", config.model_path, e);
            e
        })
        .with_context(|| format!("Failed to load model from {:?}", config.model_path))?;

    http::serve(http::next_relapse::router(Arc::new(service)), &config)
        .await
        .context("HTTP server failed")
}
