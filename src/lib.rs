//! # relapse-watch
//!
//! Relapse risk prediction services and the offline trainers that produce
//! their model artifacts.
//!
//! This crate provides:
//! - Three HTTP inference services (biometric relapse classifier, relapse
//!   event classifier, next-relapse regressor)
//! - Training pipelines that fit tree ensembles from CSV datasets
//! - A single feature-validation-and-inference contract shared by all services
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Feature schemas, request validation, predictions, model artifact
//! - `ports`: Trait definitions for the loaded models
//! - `adapters`: Concrete implementations (JSON tree-ensemble artifact on disk)
//! - `application`: Per-service contexts orchestrating validation and inference
//! - `http`: axum routers, one per service
//! - `training`: Offline fitting and evaluation

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod http;
pub mod logging;
pub mod ports;
pub mod training;

#[cfg(test)]
mod testing;

pub use domain::{BiometricFeatures, EventWindow, ModelArtifact, NextRelapseFeatures};

/// Result type for relapse-watch operations
pub type Result<T> = std::result::Result<T, RelapseError>;

/// Main error type for relapse-watch
#[derive(Debug, thiserror::Error)]
pub enum RelapseError {
    #[error("Invalid request: {0}")]
    Validation(#[from] domain::ValidationError),

    #[error("Model error: {0}")]
    Model(#[from] domain::ModelError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Training failed: {0}")]
    Training(#[from] training::TrainingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
