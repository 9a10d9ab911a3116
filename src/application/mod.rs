//! Application layer: one service context per deployed endpoint.
//!
//! Each context owns its loaded model (shared read-only through `Arc`) and
//! its label table. It is built once at startup, after the model's feature
//! schema has been checked, and is then handed to the request handlers.

mod event;
mod next_relapse;
mod relapse;

pub use event::{EventAssessment, EventClassifierService};
pub use next_relapse::NextRelapseService;
pub use relapse::{RelapseAssessment, RelapseClassifierService};

use crate::domain::{LabelTable, ModelError};
use crate::ports::Classifier;

/// Confirm a classifier's output width matches the label table.
fn ensure_label_coverage<M: Classifier>(model: &M, labels: &LabelTable) -> Result<(), ModelError> {
    if model.n_classes() != labels.len() {
        return Err(ModelError::TaskMismatch(format!(
            "model predicts {} classes but the label table has {}",
            model.n_classes(),
            labels.len()
        )));
    }
    Ok(())
}
