//! Command-line options shared by the trainer binaries.
//!
//! ```text
//! train_relapse_classifier <csv> [-o|--output <path>] [--seed <u64>] [--trees <n>]
//! train_next_relapse <csv> [-o|--output <path>] [--seed <u64>] [--rounds <n>]
//!                    [--max-depth <n>] [--learning-rate <f64>]
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use super::{GradientBoostingParams, RandomForestParams};

/// Which learner a trainer binary drives; decides the accepted flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Learner {
    RandomForest,
    GradientBoosting,
}

/// Parsed trainer arguments.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub dataset: PathBuf,
    pub output: PathBuf,
    /// Seed for the split and, for forests, the bootstrap draws
    pub seed: u64,
    pub forest: RandomForestParams,
    pub boosting: GradientBoostingParams,
}

fn usage(program: &str, learner: Learner) -> String {
    let learner_flags = match learner {
        Learner::RandomForest => "[--trees <n>]",
        Learner::GradientBoosting => "[--rounds <n>] [--max-depth <n>] [--learning-rate <f64>]",
    };
    format!("Usage: {program} <csv> [-o|--output <path>] [--seed <u64>] {learner_flags}")
}

fn parse_value<T: FromStr>(flag: &str, value: Option<String>, usage: &str) -> Result<T, String> {
    let value = value.ok_or_else(|| usage.to_string())?;
    value
        .trim()
        .parse::<T>()
        .map_err(|_| format!("{flag} got an invalid value '{value}'"))
}

impl TrainOptions {
    /// Parse arguments (without the program name).
    ///
    /// # Errors
    /// Returns the usage text, or a description of the invalid flag value.
    pub fn parse<I>(
        args: I,
        program: &str,
        learner: Learner,
        default_output: &str,
    ) -> Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let usage = usage(program, learner);
        let mut args = args.into_iter();
        let mut dataset: Option<PathBuf> = None;
        let mut output: Option<PathBuf> = None;
        let mut seed: u64 = 42;
        let mut forest = RandomForestParams::default();
        let mut boosting = GradientBoostingParams::default();

        while let Some(arg) = args.next() {
            match (arg.as_str(), learner) {
                ("-o" | "--output", _) => {
                    output = Some(PathBuf::from(args.next().ok_or_else(|| usage.clone())?));
                }
                ("--seed", _) => seed = parse_value("--seed", args.next(), &usage)?,
                ("--trees", Learner::RandomForest) => {
                    forest.n_trees = parse_value("--trees", args.next(), &usage)?;
                }
                ("--rounds", Learner::GradientBoosting) => {
                    boosting.n_rounds = parse_value("--rounds", args.next(), &usage)?;
                }
                ("--max-depth", Learner::GradientBoosting) => {
                    boosting.max_depth = parse_value("--max-depth", args.next(), &usage)?;
                }
                ("--learning-rate", Learner::GradientBoosting) => {
                    boosting.learning_rate = parse_value("--learning-rate", args.next(), &usage)?;
                }
                ("-h" | "--help", _) => return Err(usage),
                (flag, _) if flag.starts_with('-') => {
                    return Err(format!("Unknown option '{flag}'\n{usage}"));
                }
                _ => {
                    if dataset.is_none() {
                        dataset = Some(PathBuf::from(&arg));
                    } else {
                        return Err(usage);
                    }
                }
            }
        }

        forest.seed = seed;
        Ok(Self {
            dataset: dataset.ok_or_else(|| usage.clone())?,
            output: output.unwrap_or_else(|| PathBuf::from(default_output)),
            seed,
            forest,
            boosting,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str], learner: Learner) -> Result<TrainOptions, String> {
        TrainOptions::parse(
            args.iter().map(|s| (*s).to_string()),
            "train",
            learner,
            "model.json",
        )
    }

    #[test]
    fn test_defaults() {
        let opts = parse(&["data.csv"], Learner::RandomForest).expect("parse");
        assert_eq!(opts.dataset, PathBuf::from("data.csv"));
        assert_eq!(opts.output, PathBuf::from("model.json"));
        assert_eq!(opts.seed, 42);
        assert_eq!(opts.forest.n_trees, 100);
        assert_eq!(opts.forest.seed, 42);
        assert_eq!(opts.boosting.n_rounds, 200);
    }

    #[test]
    fn test_forest_flags() {
        let opts = parse(
            &["--trees", "25", "data.csv", "-o", "out/forest.json", "--seed", "7"],
            Learner::RandomForest,
        )
        .expect("parse");
        assert_eq!(opts.forest.n_trees, 25);
        assert_eq!(opts.forest.seed, 7);
        assert_eq!(opts.output, PathBuf::from("out/forest.json"));
    }

    #[test]
    fn test_boosting_flags() {
        let opts = parse(
            &["data.csv", "--rounds", "50", "--max-depth", "3", "--learning-rate", "0.3"],
            Learner::GradientBoosting,
        )
        .expect("parse");
        assert_eq!(opts.boosting.n_rounds, 50);
        assert_eq!(opts.boosting.max_depth, 3);
        assert!((opts.boosting.learning_rate - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejections() {
        assert!(parse(&[], Learner::RandomForest).unwrap_err().starts_with("Usage:"));
        assert!(parse(&["a.csv", "b.csv"], Learner::RandomForest).is_err());
        assert!(parse(&["a.csv", "--trees"], Learner::RandomForest).is_err());
        assert_eq!(
            parse(&["a.csv", "--trees", "many"], Learner::RandomForest).unwrap_err(),
            "--trees got an invalid value 'many'"
        );
        // Boosting flags are unknown to forest trainers and vice versa.
        assert!(parse(&["a.csv", "--rounds", "5"], Learner::RandomForest)
            .unwrap_err()
            .starts_with("Unknown option '--rounds'"));
        assert!(parse(&["a.csv", "--trees", "5"], Learner::GradientBoosting).is_err());
        assert!(parse(&["--help"], Learner::GradientBoosting).is_err());
    }
}
