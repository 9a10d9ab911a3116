//! Train the next-relapse regressor.
//!
//! Builds per-patient relapse histories from the episode CSV, fits gradient
//! boosting on every row, writes the artifact, then reports in-sample MAE
//! and the MAE of a separate fit scored on a 20% hold-out.

use anyhow::{Context, Result};

use relapse_watch::adapters::forest::write_artifact;
use relapse_watch::config::ServiceKind;
use relapse_watch::logging;
use relapse_watch::training::{pipeline, CsvTable, Learner, TrainOptions};

fn main() -> Result<()> {
    let _guard = logging::init().context("Failed to initialize logging")?;

    let opts = TrainOptions::parse(
        std::env::args().skip(1),
        "train_next_relapse",
        Learner::GradientBoosting,
        ServiceKind::NextRelapse.artifact_file(),
    )
    .map_err(anyhow::Error::msg)?;

    let table = CsvTable::read(&opts.dataset)?;
    let data = pipeline::next_relapse_dataset(&table)?;
    let outcome = pipeline::train_next_relapse(&data, &opts.boosting, opts.seed)?;

    let fingerprint = write_artifact(&outcome.artifact, &opts.output)?;
    println!("Model saved to {:?} (sha256 {})", opts.output, fingerprint);
    println!("{outcome}");
    Ok(())
}
