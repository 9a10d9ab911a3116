//! Train the relapse event classifier.
//!
//! Reads `patient_id, start_time_relapse, end_time_relapse, relapse_level`,
//! derives episode duration, hour of day and weekday, fits a random forest
//! on a stratified 80% split and writes the artifact.

use anyhow::{Context, Result};

use relapse_watch::adapters::forest::write_artifact;
use relapse_watch::config::ServiceKind;
use relapse_watch::logging;
use relapse_watch::training::{pipeline, CsvTable, Learner, TrainOptions};

fn main() -> Result<()> {
    let _guard = logging::init().context("Failed to initialize logging")?;

    let opts = TrainOptions::parse(
        std::env::args().skip(1),
        "train_event_classifier",
        Learner::RandomForest,
        ServiceKind::EventClassifier.artifact_file(),
    )
    .map_err(anyhow::Error::msg)?;

    let table = CsvTable::read(&opts.dataset)?;
    let data = pipeline::event_dataset(&table)?;
    let outcome = pipeline::train_event_classifier(&data, &opts.forest)?;
    println!("{outcome}");

    let fingerprint = write_artifact(&outcome.artifact, &opts.output)?;
    println!("Model saved to {:?} (sha256 {})", opts.output, fingerprint);
    Ok(())
}
