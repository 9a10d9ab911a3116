//! The three training pipelines: feature engineering from raw CSV, fit,
//! hold-out evaluation.
//!
//! Feature derivation goes through the same domain types the services use
//! ([`EventWindow::features`], the `*_FEATURES` schemas), so a trained
//! artifact always matches what its service will send it.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::dataset::{Column, CsvTable, Record};
use super::{
    accuracy, fit_gradient_boosting, fit_random_forest, mean_absolute_error, train_test_split,
    ClassificationReport, ConfusionMatrix, Dataset, DatasetError, GradientBoostingParams,
    RandomForestParams, TrainingError,
};
use crate::domain::{
    ClassPrediction, EventWindow, ModelArtifact, BIOMETRIC_FEATURES, BIOMETRIC_LABELS,
    EVENT_FEATURES, EVENT_LABELS, NEXT_RELAPSE_FEATURES,
};

/// Share of rows held out for evaluation.
pub const TEST_FRACTION: f64 = 0.2;

const LABEL_COLUMN: &str = "relapse_level";
const PATIENT_COLUMN: &str = "patient_id";
const START_COLUMN: &str = "start_time_relapse";
const END_COLUMN: &str = "end_time_relapse";

/// Rows shown in the regressor's prediction sample.
const SAMPLE_ROWS: usize = 10;

/// Read an integer class label; an empty cell is `None`.
fn class_label(
    record: &Record,
    column: Column<'_>,
    n_classes: usize,
) -> Result<Option<f64>, DatasetError> {
    let Some(value) = record.optional_number(column)? else {
        return Ok(None);
    };
    if value.fract() != 0.0 || value < 0.0 || value >= n_classes as f64 {
        return Err(DatasetError::InvalidLabel {
            line: record.line,
            value,
            n_classes,
        });
    }
    Ok(Some(value))
}

fn event_window(
    record: &Record,
    patient: f64,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> Result<EventWindow, DatasetError> {
    EventWindow::new(patient, start, end)
        .map_err(|_| DatasetError::NegativeDuration { line: record.line })
}

/// Biometric readings plus `relapse_level`.
///
/// Rows without a level are dropped; other columns (such as a legacy binary
/// `relapse` flag) are ignored.
///
/// # Errors
/// Returns error if a column is missing or a cell does not parse.
pub fn biometric_dataset(table: &CsvTable) -> Result<Dataset, DatasetError> {
    let features = BIOMETRIC_FEATURES
        .iter()
        .map(|name| table.column(name))
        .collect::<Result<Vec<_>, _>>()?;
    let label = table.column(LABEL_COLUMN)?;

    let mut data = Dataset::new(&BIOMETRIC_FEATURES);
    let mut dropped = 0;
    for record in table.records() {
        let Some(level) = class_label(record, label, BIOMETRIC_LABELS.len())? else {
            dropped += 1;
            continue;
        };
        let row = features
            .iter()
            .map(|&col| record.number(col))
            .collect::<Result<Vec<_>, _>>()?;
        data.push(row, level);
    }

    if dropped > 0 {
        tracing::info!("Dropped {} rows without a {}", dropped, LABEL_COLUMN);
    }
    Ok(data)
}

/// One episode per row: patient, start/end timestamps, `relapse_level`.
///
/// # Errors
/// Returns error if a column is missing, a cell does not parse, or an
/// episode ends before it starts.
pub fn event_dataset(table: &CsvTable) -> Result<Dataset, DatasetError> {
    let patient = table.column(PATIENT_COLUMN)?;
    let start = table.column(START_COLUMN)?;
    let end = table.column(END_COLUMN)?;
    let label = table.column(LABEL_COLUMN)?;

    let mut data = Dataset::new(&EVENT_FEATURES);
    for record in table.records() {
        let Some(level) = class_label(record, label, EVENT_LABELS.len())? else {
            continue;
        };
        let window = event_window(
            record,
            record.number(patient)?,
            record.timestamp(start)?,
            record.timestamp(end)?,
        )?;
        data.push(window.features().to_vec(), level);
    }
    Ok(data)
}

#[derive(Debug)]
struct Episode {
    patient: f64,
    window: EventWindow,
    level: f64,
}

/// Per-patient relapse history with days to the next episode as target.
///
/// Episodes are ordered by patient then start time. Patient ids become dense
/// codes (rank among the distinct ids). Each patient's first and last
/// episodes are dropped since they lack a previous or next relapse.
///
/// # Errors
/// Returns error if a column is missing, a cell does not parse, or an
/// episode ends before it starts.
pub fn next_relapse_dataset(table: &CsvTable) -> Result<Dataset, DatasetError> {
    let patient = table.column(PATIENT_COLUMN)?;
    let start = table.column(START_COLUMN)?;
    let end = table.column(END_COLUMN)?;
    let label = table.column(LABEL_COLUMN)?;

    let mut episodes = Vec::with_capacity(table.len());
    for record in table.records() {
        let id = record.number(patient)?;
        let level = record.number(label)?;
        let window = event_window(record, id, record.timestamp(start)?, record.timestamp(end)?)?;
        episodes.push(Episode {
            patient: id,
            window,
            level: level.trunc(),
        });
    }
    episodes.sort_by(|a, b| {
        a.patient
            .total_cmp(&b.patient)
            .then(a.window.start.cmp(&b.window.start))
    });

    let mut ids: Vec<f64> = episodes.iter().map(|e| e.patient).collect();
    ids.dedup();
    let code = |id: f64| ids.binary_search_by(|probe| probe.total_cmp(&id)).unwrap_or(0) as f64;

    let mut data = Dataset::new(&NEXT_RELAPSE_FEATURES);
    for history in episodes.chunk_by(|a, b| a.patient == b.patient) {
        for (count, pair) in history.windows(3).enumerate() {
            let [prev, current, next] = pair else {
                continue;
            };
            let days_between = |a: &EventWindow, b: &EventWindow| {
                (b.start - a.start).num_milliseconds() as f64 / 86_400_000.0
            };

            let engineered = current.window.features();
            let row = vec![
                code(current.patient),
                engineered.duration_hours,
                engineered.hour_of_day,
                engineered.day_of_week,
                days_between(&prev.window, &current.window),
                (count + 1) as f64,
                current.level,
            ];
            data.push(row, days_between(&current.window, &next.window));
        }
    }

    tracing::info!(
        "Built {} regression rows from {} episodes across {} patients",
        data.len(),
        episodes.len(),
        ids.len()
    );
    Ok(data)
}

/// A fitted classifier and its hold-out scores.
#[derive(Debug, Clone)]
pub struct ClassifierOutcome {
    pub artifact: ModelArtifact,
    pub n_train: usize,
    pub n_test: usize,
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub report: ClassificationReport,
}

impl fmt::Display for ClassifierOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Trained on {} rows, evaluated on {}", self.n_train, self.n_test)?;
        writeln!(f, "Accuracy: {:.4}", self.accuracy)?;
        writeln!(f, "Confusion Matrix:")?;
        write!(f, "{}", self.confusion)?;
        writeln!(f, "Classification Report:")?;
        write!(f, "{}", self.report)
    }
}

fn predict_classes(artifact: &ModelArtifact, data: &Dataset) -> Result<Vec<usize>, TrainingError> {
    data.x
        .iter()
        .map(|row| -> Result<usize, TrainingError> {
            let probabilities = artifact.class_probabilities(row)?;
            Ok(ClassPrediction::from_probabilities(probabilities)?.class_index)
        })
        .collect()
}

fn train_classifier(
    data: &Dataset,
    n_classes: usize,
    params: &RandomForestParams,
    stratify: bool,
) -> Result<ClassifierOutcome, TrainingError> {
    let labels = data.class_labels(n_classes)?;
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let split = train_test_split(
        data.len(),
        TEST_FRACTION,
        stratify.then_some(labels.as_slice()),
        &mut rng,
    )?;

    let train = data.subset(&split.train);
    let test = data.subset(&split.test);
    let artifact = fit_random_forest(&train, n_classes, params)?;

    let y_true: Vec<usize> = split.test.iter().map(|&i| labels[i]).collect();
    let y_pred = predict_classes(&artifact, &test)?;
    let confusion = ConfusionMatrix::new(&y_true, &y_pred, n_classes);

    Ok(ClassifierOutcome {
        artifact,
        n_train: train.len(),
        n_test: test.len(),
        accuracy: accuracy(&y_true, &y_pred),
        report: ClassificationReport::from_confusion(&confusion),
        confusion,
    })
}

/// Fit the biometric classifier on a random 80% and score the rest.
///
/// # Errors
/// Returns error if the data cannot be split or fitted.
pub fn train_relapse_classifier(
    data: &Dataset,
    params: &RandomForestParams,
) -> Result<ClassifierOutcome, TrainingError> {
    train_classifier(data, BIOMETRIC_LABELS.len(), params, false)
}

/// Fit the event classifier on a stratified 80% and score the rest.
///
/// # Errors
/// Returns error if the data cannot be split or fitted.
pub fn train_event_classifier(
    data: &Dataset,
    params: &RandomForestParams,
) -> Result<ClassifierOutcome, TrainingError> {
    train_classifier(data, EVENT_LABELS.len(), params, true)
}

/// A fitted regressor with in-sample and hold-out error.
#[derive(Debug, Clone)]
pub struct RegressorOutcome {
    /// Fitted on every row
    pub artifact: ModelArtifact,
    /// First rows as `(actual, predicted)` days
    pub sample: Vec<(f64, f64)>,
    pub in_sample_mae: f64,
    /// MAE of a separate fit on 80% of rows, scored on the other 20%
    pub holdout_mae: f64,
    pub n_holdout: usize,
}

impl fmt::Display for RegressorOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sample Predictions:")?;
        writeln!(
            f,
            "{:>12} {:>15} {:>10} {:>15}",
            "Actual_Days", "Predicted_Days", "Error", "Absolute_Error"
        )?;
        for (actual, predicted) in &self.sample {
            let error = actual - predicted;
            writeln!(
                f,
                "{:>12.4} {:>15.4} {:>10.4} {:>15.4}",
                actual,
                predicted,
                error,
                error.abs()
            )?;
        }
        writeln!(f, "MAE: {:.2} days", self.in_sample_mae)?;
        writeln!(
            f,
            "MAE on test set ({} rows): {:.2} days",
            self.n_holdout, self.holdout_mae
        )
    }
}

fn regress_all(artifact: &ModelArtifact, data: &Dataset) -> Result<Vec<f64>, TrainingError> {
    data.x
        .iter()
        .map(|row| artifact.regress(row).map_err(TrainingError::from))
        .collect()
}

/// Fit the next-relapse regressor on all rows, then estimate generalization
/// with a separate fit on a seeded 80/20 split.
///
/// # Errors
/// Returns error if the data cannot be split or fitted.
pub fn train_next_relapse(
    data: &Dataset,
    params: &GradientBoostingParams,
    seed: u64,
) -> Result<RegressorOutcome, TrainingError> {
    let artifact = fit_gradient_boosting(data, params)?;
    let fitted = regress_all(&artifact, data)?;
    let in_sample_mae = mean_absolute_error(&data.y, &fitted);
    let sample = data
        .y
        .iter()
        .copied()
        .zip(fitted.iter().copied())
        .take(SAMPLE_ROWS)
        .collect();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let split = train_test_split(data.len(), TEST_FRACTION, None, &mut rng)?;
    let test = data.subset(&split.test);
    let holdout_model = fit_gradient_boosting(&data.subset(&split.train), params)?;
    let holdout_mae = mean_absolute_error(&test.y, &regress_all(&holdout_model, &test)?);

    Ok(RegressorOutcome {
        artifact,
        sample,
        in_sample_mae,
        holdout_mae,
        n_holdout: test.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Task;
    use std::io::Cursor;
    use std::path::Path;

    fn table(text: &str) -> CsvTable {
        CsvTable::from_reader(Cursor::new(text.to_string()), Path::new("fixture.csv")).expect("csv")
    }

    /// Stress and HRV drive the class; the other readings are filler.
    fn biometric_csv(rows: usize) -> String {
        let mut csv =
            String::from("heart_rate,hrv,sleep_score,steps,temperature,spo2,stress,relapse,relapse_level\n");
        for i in 0..rows {
            let level = i % 3;
            let stress = 15 + level * 30 + i % 10;
            let hrv = 80 - level * 20 - i % 5;
            csv.push_str(&format!(
                "{},{},{},{},36.{},{},{},{},{}\n",
                60 + i % 25,
                hrv,
                50 + i % 40,
                1000 + (i * 37) % 9000,
                i % 9,
                94 + i % 5,
                stress,
                u8::from(level > 0),
                level
            ));
        }
        csv
    }

    /// Duration drives the class, as in the generated relapse datasets.
    fn event_csv(patients: usize, per_patient: usize) -> String {
        let mut csv = String::from("patient_id,start_time_relapse,end_time_relapse,relapse_level\n");
        for p in 0..patients {
            for k in 0..per_patient {
                let level = (p + k) % 3;
                let hours = [2, 8, 30][level] + (p * k) % 2;
                let day = 1 + k * 4 + p % 3;
                let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                    .and_then(|d| d.and_hms_opt(((p * 5 + k) % 24) as u32, 0, 0))
                    .expect("date")
                    + chrono::Duration::days(day as i64);
                let end = start + chrono::Duration::hours(hours as i64);
                csv.push_str(&format!(
                    "{},{},{},{}\n",
                    100 + p * 7,
                    start.format("%Y-%m-%d %H:%M:%S"),
                    end.format("%Y-%m-%d %H:%M:%S"),
                    level
                ));
            }
        }
        csv
    }

    #[test]
    fn test_biometric_dataset_drops_unlabelled_rows() {
        let csv = "heart_rate,hrv,sleep_score,steps,temperature,spo2,stress,relapse,relapse_level\n\
                   70,60,80,5000,36.6,98,20,0,0\n\
                   90,30,40,1500,37.4,94,85,1,\n\
                   85,35,45,2000,37.5,95,80,1,2\n";
        let data = biometric_dataset(&table(csv)).expect("dataset");
        assert_eq!(data.len(), 2);
        assert_eq!(data.feature_names, BIOMETRIC_FEATURES);
        assert_eq!(data.x[1], vec![85.0, 35.0, 45.0, 2000.0, 37.5, 95.0, 80.0]);
        assert_eq!(data.y, vec![0.0, 2.0]);
    }

    #[test]
    fn test_biometric_dataset_errors() {
        let missing = "heart_rate,hrv\n1,2\n";
        assert!(matches!(
            biometric_dataset(&table(missing)),
            Err(DatasetError::MissingColumn(_))
        ));

        let bad_label = "heart_rate,hrv,sleep_score,steps,temperature,spo2,stress,relapse_level\n\
                         70,60,80,5000,36.6,98,20,5\n";
        assert!(matches!(
            biometric_dataset(&table(bad_label)),
            Err(DatasetError::InvalidLabel { line: 2, .. })
        ));
    }

    #[test]
    fn test_event_dataset_features() {
        let csv = "patient_id,start_time_relapse,end_time_relapse,relapse_level\n\
                   12,2024-03-04 22:00:00,2024-03-05 04:30:00,1\n";
        let data = event_dataset(&table(csv)).expect("dataset");
        // 2024-03-04 is a Monday.
        assert_eq!(data.x, vec![vec![12.0, 6.5, 22.0, 0.0]]);
        assert_eq!(data.y, vec![1.0]);

        let backwards = "patient_id,start_time_relapse,end_time_relapse,relapse_level\n\
                         12,2024-03-05 04:30:00,2024-03-04 22:00:00,1\n";
        assert!(matches!(
            event_dataset(&table(backwards)),
            Err(DatasetError::NegativeDuration { line: 2 })
        ));
    }

    #[test]
    fn test_next_relapse_history_features() {
        // Patient 50 appears first in the file but sorts after patient 7.
        let csv = "patient_id,start_time_relapse,end_time_relapse,relapse_level\n\
                   50,2024-01-10 08:00:00,2024-01-10 10:00:00,0\n\
                   7,2024-02-11 12:00:00,2024-02-11 18:00:00,2\n\
                   7,2024-02-01 12:00:00,2024-02-01 13:00:00,1\n\
                   7,2024-02-21 00:00:00,2024-02-21 01:00:00,0\n\
                   50,2024-01-01 08:00:00,2024-01-01 09:00:00,1\n";
        let data = next_relapse_dataset(&table(csv)).expect("dataset");

        // Only patient 7's middle episode has both neighbours.
        assert_eq!(data.len(), 1);
        assert_eq!(data.feature_names, NEXT_RELAPSE_FEATURES);
        // 2024-02-11 is a Sunday.
        assert_eq!(data.x[0], vec![0.0, 6.0, 12.0, 6.0, 10.0, 1.0, 2.0]);
        assert_eq!(data.y, vec![9.5]);
    }

    #[test]
    fn test_train_relapse_classifier_on_separable_data() {
        let data = biometric_dataset(&table(&biometric_csv(300))).expect("dataset");
        let params = RandomForestParams {
            n_trees: 20,
            ..Default::default()
        };
        let outcome = train_relapse_classifier(&data, &params).expect("train");

        assert_eq!(outcome.n_test, 60);
        assert_eq!(outcome.n_train, 240);
        assert!(outcome.accuracy > 0.9, "accuracy {}", outcome.accuracy);
        assert_eq!(outcome.artifact.task, Task::Classification { n_classes: 3 });
        assert_eq!(outcome.artifact.feature_names, BIOMETRIC_FEATURES);
        assert!(outcome.to_string().contains("Confusion Matrix:"));
    }

    #[test]
    fn test_train_event_classifier_stratified() {
        let data = event_dataset(&table(&event_csv(30, 10))).expect("dataset");
        let params = RandomForestParams {
            n_trees: 20,
            ..Default::default()
        };
        let outcome = train_event_classifier(&data, &params).expect("train");

        assert_eq!(outcome.n_test, 60);
        let support: Vec<usize> = outcome.report.classes.iter().map(|c| c.support).collect();
        assert_eq!(support, vec![20, 20, 20]);
        assert!(outcome.accuracy > 0.9, "accuracy {}", outcome.accuracy);
    }

    #[test]
    fn test_train_next_relapse_reports_errors() {
        let data = next_relapse_dataset(&table(&event_csv(20, 12))).expect("dataset");
        assert_eq!(data.len(), 20 * 10);

        let params = GradientBoostingParams {
            n_rounds: 40,
            max_depth: 3,
            ..Default::default()
        };
        let outcome = train_next_relapse(&data, &params, 42).expect("train");

        let mean = data.y.iter().sum::<f64>() / data.len() as f64;
        let baseline = mean_absolute_error(&data.y, &vec![mean; data.len()]);
        assert!(outcome.in_sample_mae < baseline);
        assert!(outcome.holdout_mae.is_finite());
        assert_eq!(outcome.sample.len(), 10);
        assert_eq!(outcome.n_holdout, 40);
        assert!(outcome.to_string().contains("MAE:"));
        assert_eq!(outcome.artifact.metadata.n_samples, 200);
    }
}
