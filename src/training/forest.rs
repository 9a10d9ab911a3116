//! Random forest classifier.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::tree::{grow_classification_tree, ClassificationTreeParams, MaxFeatures};
use super::{Dataset, TrainingError};
use crate::domain::{ModelArtifact, Task, TrainingMetadata, ARTIFACT_FORMAT_VERSION};

/// Random forest hyperparameters.
#[derive(Debug, Clone)]
pub struct RandomForestParams {
    pub n_trees: usize,
    pub tree: ClassificationTreeParams,
    /// Draw each tree's rows with replacement
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            tree: ClassificationTreeParams::default(),
            bootstrap: true,
            seed: 42,
        }
    }
}

impl RandomForestParams {
    fn metadata_params(&self, n_features: usize) -> BTreeMap<String, f64> {
        let mut params = BTreeMap::new();
        params.insert("n_trees".to_string(), self.n_trees as f64);
        params.insert(
            "max_features".to_string(),
            self.tree.max_features.resolve(n_features) as f64,
        );
        params.insert("min_samples_split".to_string(), self.tree.min_samples_split as f64);
        params.insert("min_samples_leaf".to_string(), self.tree.min_samples_leaf as f64);
        params.insert("bootstrap".to_string(), if self.bootstrap { 1.0 } else { 0.0 });
        params.insert("seed".to_string(), self.seed as f64);
        if let Some(depth) = self.tree.max_depth {
            params.insert("max_depth".to_string(), depth as f64);
        }
        params
    }
}

/// Fit a random forest classifier with `n_classes` output classes.
///
/// Every tree sees a bootstrap sample of the rows and picks among
/// `max_features` random features at each split; probabilities are the
/// average of the per-tree leaf distributions.
///
/// # Errors
/// Returns error if the data is empty, a target is not a class in
/// `0..n_classes`, or the parameters are unusable.
pub fn fit_random_forest(
    data: &Dataset,
    n_classes: usize,
    params: &RandomForestParams,
) -> Result<ModelArtifact, TrainingError> {
    if data.is_empty() {
        return Err(TrainingError::InsufficientData(
            "cannot fit a forest on zero rows".into(),
        ));
    }
    if params.n_trees == 0 {
        return Err(TrainingError::InvalidParameter("n_trees must be at least 1".into()));
    }
    if n_classes < 2 {
        return Err(TrainingError::InvalidParameter(format!(
            "a classifier needs at least 2 classes, got {n_classes}"
        )));
    }
    if params.tree.max_features == MaxFeatures::Count(0) {
        return Err(TrainingError::InvalidParameter("max_features must be at least 1".into()));
    }
    let labels = data.class_labels(n_classes)?;

    tracing::info!(
        "Fitting random forest: {} trees, {} rows, {} features, {} classes (seed={})",
        params.n_trees,
        data.len(),
        data.n_features(),
        n_classes,
        params.seed
    );

    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let n = data.len();
    let trees = (0..params.n_trees)
        .map(|t| {
            let sample: Vec<usize> = if params.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };
            let tree = grow_classification_tree(&data.x, &labels, n_classes, sample, &params.tree, &mut rng);
            tracing::debug!("Tree {}: {} nodes, {} leaves", t, tree.nodes.len(), tree.n_leaves());
            tree
        })
        .collect();

    let artifact = ModelArtifact {
        format_version: ARTIFACT_FORMAT_VERSION,
        task: Task::Classification { n_classes },
        feature_names: data.feature_names.clone(),
        trees,
        metadata: TrainingMetadata {
            algorithm: "random_forest".to_string(),
            trained_at: chrono::Utc::now(),
            n_samples: n,
            params: params.metadata_params(data.n_features()),
        },
    };
    artifact.validate()?;
    Ok(artifact)
}
