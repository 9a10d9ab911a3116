//! Forest adapter: Implementation of the model ports over a JSON
//! tree-ensemble artifact.
//!
//! # Lifecycle
//!
//! An artifact is read once, checked for structural integrity, and then only
//! ever borrowed immutably. There is no reload path: a new artifact means a
//! new process.
//!
//! # Fingerprint
//!
//! The SHA-256 digest of the exact bytes read from disk identifies the
//! artifact in logs and on `/health`, so operators can tell which training
//! run a service is serving.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::domain::{ModelArtifact, ModelError, Task};
use crate::ports::{Classifier, Model, Regressor};

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Serialize an artifact to `path` (pretty JSON), creating parent
/// directories as needed.
///
/// Returns the fingerprint of the written bytes.
///
/// # Errors
/// Returns error if the artifact fails validation or cannot be written.
pub fn write_artifact(artifact: &ModelArtifact, path: &Path) -> Result<String, ModelError> {
    artifact.validate()?;

    let io_err = |source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let bytes = serde_json::to_vec_pretty(artifact)?;
    std::fs::write(path, &bytes).map_err(io_err)?;

    let fingerprint = sha256_hex(&bytes);
    tracing::info!(
        "Wrote model artifact to {:?} ({} trees, fingerprint={})",
        path,
        artifact.trees.len(),
        fingerprint
    );
    Ok(fingerprint)
}

/// A loaded tree ensemble.
#[derive(Debug, Clone)]
pub struct ForestModel {
    artifact: ModelArtifact,
    fingerprint: String,
    source: Option<PathBuf>,
}

impl ForestModel {
    /// Load and validate an artifact from disk.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, is not a valid artifact, or
    /// fails the integrity checks.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: ModelArtifact = serde_json::from_slice(&bytes)?;
        artifact.validate()?;

        let model = Self {
            artifact,
            fingerprint: sha256_hex(&bytes),
            source: Some(path.to_path_buf()),
        };

        tracing::info!(
            "Loaded model from {:?} (algorithm={}, task={:?}, n_features={}, n_trees={}, fingerprint={})",
            path,
            model.artifact.metadata.algorithm,
            model.artifact.task,
            model.artifact.n_features(),
            model.artifact.trees.len(),
            model.fingerprint
        );
        Ok(model)
    }

    /// Load an artifact that must be a classifier.
    ///
    /// # Errors
    /// Returns `ModelError::TaskMismatch` for a regression artifact, or any
    /// error from [`ForestModel::load`].
    pub fn load_classifier(path: &Path) -> Result<Self, ModelError> {
        let model = Self::load(path)?;
        match model.artifact.task {
            Task::Classification { .. } => Ok(model),
            Task::Regression { .. } => Err(ModelError::TaskMismatch(format!(
                "{path:?} holds a regression model, expected a classifier"
            ))),
        }
    }

    /// Load an artifact that must be a regressor.
    ///
    /// # Errors
    /// Returns `ModelError::TaskMismatch` for a classification artifact, or
    /// any error from [`ForestModel::load`].
    pub fn load_regressor(path: &Path) -> Result<Self, ModelError> {
        let model = Self::load(path)?;
        match model.artifact.task {
            Task::Regression { .. } => Ok(model),
            Task::Classification { .. } => Err(ModelError::TaskMismatch(format!(
                "{path:?} holds a classification model, expected a regressor"
            ))),
        }
    }

    /// Wrap an in-memory artifact (fresh from a trainer, or built in tests).
    ///
    /// # Errors
    /// Returns error if the artifact fails validation.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ModelError> {
        artifact.validate()?;
        let fingerprint = sha256_hex(&serde_json::to_vec_pretty(&artifact)?);
        Ok(Self {
            artifact,
            fingerprint,
            source: None,
        })
    }

    #[must_use]
    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Path the artifact was loaded from, if any.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

impl Model for ForestModel {
    fn feature_names(&self) -> &[String] {
        &self.artifact.feature_names
    }

    fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl Classifier for ForestModel {
    fn n_classes(&self) -> usize {
        match self.artifact.task {
            Task::Classification { n_classes } => n_classes,
            Task::Regression { .. } => 0,
        }
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        self.artifact.class_probabilities(features)
    }
}

impl Regressor for ForestModel {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        self.artifact.regress(features)
    }
}
