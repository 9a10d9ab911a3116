//! Train the biometric relapse classifier.
//!
//! Reads a CSV of wearable readings labelled with `relapse_level`, fits a
//! random forest on 80% of the rows, prints hold-out accuracy, confusion
//! matrix and per-class scores, and writes the artifact.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin train_relapse_classifier -- synthetic_ms_relapse_dataset.csv
//! ```

use anyhow::{Context, Result};

use relapse_watch::adapters::forest::write_artifact;
use relapse_watch::config::ServiceKind;
use relapse_watch::logging;
use relapse_watch::training::{pipeline, CsvTable, Learner, TrainOptions};

fn main() -> Result<()> {
    let _guard = logging::init().context("Failed to initialize logging")?;

    let opts = TrainOptions::parse(
        std::env::args().skip(1),
        "train_relapse_classifier",
        Learner::RandomForest,
        ServiceKind::RelapseClassifier.artifact_file(),
    )
    .map_err(anyhow::Error::msg)?;

    let table = CsvTable::read(&opts.dataset)?;
    let data = pipeline::biometric_dataset(&table)?;
    let outcome = pipeline::train_relapse_classifier(&data, &opts.forest)?;
    println!("{outcome}");

    let fingerprint = write_artifact(&outcome.artifact, &opts.output)?;
    println!("Model saved to {:?} (sha256 {})", opts.output, fingerprint);
    Ok(())
}
