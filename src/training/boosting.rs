//! Gradient-boosted regression trees with squared-error loss.
//!
//! Each round fits a tree to the gradient `pred - y` (hessian 1) of the
//! current ensemble and adds it with shrinkage. The base score is the mean
//! target.

use std::collections::BTreeMap;

use super::tree::{grow_regression_tree, RegressionTreeParams};
use super::{Dataset, TrainingError};
use crate::domain::{ModelArtifact, Task, TrainingMetadata, ARTIFACT_FORMAT_VERSION};

/// Boosting hyperparameters.
#[derive(Debug, Clone)]
pub struct GradientBoostingParams {
    pub n_rounds: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub reg_lambda: f64,
    pub min_child_weight: f64,
    pub min_gain: f64,
}

impl Default for GradientBoostingParams {
    fn default() -> Self {
        Self {
            n_rounds: 200,
            max_depth: 5,
            learning_rate: 0.1,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            min_gain: 0.0,
        }
    }
}

impl GradientBoostingParams {
    fn validate(&self) -> Result<(), TrainingError> {
        let invalid = |msg: &str| Err(TrainingError::InvalidParameter(msg.to_string()));
        if self.n_rounds == 0 {
            return invalid("n_rounds must be at least 1");
        }
        if self.max_depth == 0 {
            return invalid("max_depth must be at least 1");
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return invalid("learning_rate must be a positive number");
        }
        if !(self.reg_lambda >= 0.0 && self.min_child_weight >= 0.0 && self.min_gain >= 0.0) {
            return invalid("reg_lambda, min_child_weight and min_gain must be non-negative");
        }
        Ok(())
    }

    fn tree_params(&self) -> RegressionTreeParams {
        RegressionTreeParams {
            max_depth: self.max_depth,
            reg_lambda: self.reg_lambda,
            min_child_weight: self.min_child_weight,
            min_gain: self.min_gain,
            learning_rate: self.learning_rate,
        }
    }

    fn metadata_params(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("n_rounds".to_string(), self.n_rounds as f64),
            ("max_depth".to_string(), self.max_depth as f64),
            ("learning_rate".to_string(), self.learning_rate),
            ("reg_lambda".to_string(), self.reg_lambda),
            ("min_child_weight".to_string(), self.min_child_weight),
            ("min_gain".to_string(), self.min_gain),
        ])
    }
}

/// Fit a boosted regression ensemble on `data.y`.
///
/// # Errors
/// Returns error if the data is empty or the parameters are unusable.
pub fn fit_gradient_boosting(
    data: &Dataset,
    params: &GradientBoostingParams,
) -> Result<ModelArtifact, TrainingError> {
    params.validate()?;
    if data.is_empty() {
        return Err(TrainingError::InsufficientData(
            "cannot fit boosting on zero rows".into(),
        ));
    }

    let n = data.len();
    let base_score = data.y.iter().sum::<f64>() / n as f64;
    let tree_params = params.tree_params();
    let mut predictions = vec![base_score; n];
    let hess = vec![1.0; n];
    let mut trees = Vec::with_capacity(params.n_rounds);

    tracing::info!(
        "Fitting gradient boosting: {} rounds, depth {}, learning rate {}, {} rows (base score {:.4})",
        params.n_rounds,
        params.max_depth,
        params.learning_rate,
        n,
        base_score
    );

    for round in 0..params.n_rounds {
        let grad: Vec<f64> = predictions.iter().zip(&data.y).map(|(p, y)| p - y).collect();
        let tree = grow_regression_tree(&data.x, &grad, &hess, (0..n).collect(), &tree_params);

        for (pred, row) in predictions.iter_mut().zip(&data.x) {
            *pred += tree.leaf(row).and_then(|v| v.first().copied()).unwrap_or(0.0);
        }
        if round % 50 == 0 || round + 1 == params.n_rounds {
            let mse = predictions
                .iter()
                .zip(&data.y)
                .map(|(p, y)| (p - y) * (p - y))
                .sum::<f64>()
                / n as f64;
            tracing::debug!("Round {}: train rmse={:.4}", round, mse.sqrt());
        }
        trees.push(tree);
    }

    let artifact = ModelArtifact {
        format_version: ARTIFACT_FORMAT_VERSION,
        task: Task::Regression { base_score },
        feature_names: data.feature_names.clone(),
        trees,
        metadata: TrainingMetadata {
            algorithm: "gradient_boosting".to_string(),
            trained_at: chrono::Utc::now(),
            n_samples: n,
            params: params.metadata_params(),
        },
    };
    artifact.validate()?;
    Ok(artifact)
}
