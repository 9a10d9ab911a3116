//! Train/test row splits.

use rand::seq::SliceRandom;
use rand::Rng;

use super::TrainingError;

/// Row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `n` rows and hold out `test_fraction` of them.
///
/// The test set gets `ceil(test_fraction * n)` rows. With `stratify`, each
/// class is split on its own (rounding per class) so both sides keep the
/// class proportions.
///
/// # Errors
/// Returns error if the fraction is outside `(0, 1)` or either side would
/// be empty.
pub fn train_test_split<R: Rng + ?Sized>(
    n: usize,
    test_fraction: f64,
    stratify: Option<&[usize]>,
    rng: &mut R,
) -> Result<Split, TrainingError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrainingError::InvalidParameter(format!(
            "test fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let split = match stratify {
        None => {
            let mut rows: Vec<usize> = (0..n).collect();
            rows.shuffle(rng);
            let n_test = (test_fraction * n as f64).ceil() as usize;
            let train = rows.split_off(n_test.min(n));
            Split { train, test: rows }
        }
        Some(labels) => {
            if labels.len() != n {
                return Err(TrainingError::InvalidParameter(format!(
                    "{} stratification labels for {} rows",
                    labels.len(),
                    n
                )));
            }
            let n_classes = labels.iter().max().map_or(0, |m| m + 1);
            let mut split = Split {
                train: Vec::new(),
                test: Vec::new(),
            };
            for class in 0..n_classes {
                let mut rows: Vec<usize> = (0..n).filter(|&i| labels[i] == class).collect();
                rows.shuffle(rng);
                let n_test = (test_fraction * rows.len() as f64).round() as usize;
                let train = rows.split_off(n_test.min(rows.len()));
                split.test.extend(rows);
                split.train.extend(train);
            }
            split.train.shuffle(rng);
            split.test.shuffle(rng);
            split
        }
    };

    if split.train.is_empty() || split.test.is_empty() {
        return Err(TrainingError::InsufficientData(format!(
            "{n} rows cannot be split into non-empty train and test sets"
        )));
    }
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_random_split_sizes() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let split = train_test_split(101, 0.2, None, &mut rng).expect("split");
        assert_eq!(split.test.len(), 21);
        assert_eq!(split.train.len(), 80);

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..101).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_seeded() {
        let a = train_test_split(50, 0.2, None, &mut ChaCha8Rng::seed_from_u64(1)).expect("split");
        let b = train_test_split(50, 0.2, None, &mut ChaCha8Rng::seed_from_u64(1)).expect("split");
        assert_eq!(a, b);
    }

    #[test]
    fn test_stratified_keeps_proportions() {
        let labels: Vec<usize> = (0..100).map(|i| if i < 70 { 0 } else if i < 95 { 1 } else { 2 }).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let split = train_test_split(100, 0.2, Some(&labels), &mut rng).expect("split");

        let count = |rows: &[usize], class| rows.iter().filter(|&&i| labels[i] == class).count();
        assert_eq!(count(&split.test, 0), 14);
        assert_eq!(count(&split.test, 1), 5);
        assert_eq!(count(&split.test, 2), 1);
        assert_eq!(split.train.len() + split.test.len(), 100);
    }

    #[test]
    fn test_split_errors() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(train_test_split(10, 0.0, None, &mut rng).is_err());
        assert!(train_test_split(10, 1.0, None, &mut rng).is_err());
        assert!(matches!(
            train_test_split(1, 0.2, None, &mut rng),
            Err(TrainingError::InsufficientData(_))
        ));
        assert!(train_test_split(3, 0.2, Some(&[0, 1]), &mut rng).is_err());
    }
}
