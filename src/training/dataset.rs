//! CSV loading and the in-memory training matrix.
//!
//! The reader handles the subset of CSV the relapse datasets use: one record
//! per line, a header row, optional double-quoted fields with `""` escapes.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};

use super::{DatasetError, TrainingError};
use crate::domain::parse_timestamp;

/// A named column resolved against a table header.
#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    pub index: usize,
    pub name: &'a str,
}

/// One data row, remembering where it came from.
#[derive(Debug, Clone)]
pub struct Record {
    /// 1-based line number in the source file
    pub line: usize,
    pub fields: Vec<String>,
}

impl Record {
    /// Raw trimmed text of a column.
    #[must_use]
    pub fn text(&self, column: Column<'_>) -> &str {
        self.fields
            .get(column.index)
            .map_or("", |f| f.trim())
    }

    /// Parse a numeric column; an empty cell is `None`.
    ///
    /// # Errors
    /// Returns `DatasetError::NotNumeric` for non-empty, non-numeric text.
    pub fn optional_number(&self, column: Column<'_>) -> Result<Option<f64>, DatasetError> {
        let raw = self.text(column);
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| DatasetError::NotNumeric {
                line: self.line,
                column: column.name.to_string(),
                value: raw.to_string(),
            })
    }

    /// Parse a required numeric column.
    ///
    /// # Errors
    /// Returns `DatasetError::NotNumeric` for empty or non-numeric text.
    pub fn number(&self, column: Column<'_>) -> Result<f64, DatasetError> {
        self.optional_number(column)?
            .ok_or_else(|| DatasetError::NotNumeric {
                line: self.line,
                column: column.name.to_string(),
                value: String::new(),
            })
    }

    /// Parse a timestamp column.
    ///
    /// # Errors
    /// Returns `DatasetError::InvalidTimestamp` if the text is not a
    /// supported timestamp.
    pub fn timestamp(&self, column: Column<'_>) -> Result<DateTime<FixedOffset>, DatasetError> {
        parse_timestamp(self.text(column)).map_err(|reason| DatasetError::InvalidTimestamp {
            line: self.line,
            column: column.name.to_string(),
            reason,
        })
    }
}

/// A parsed CSV file.
#[derive(Debug, Clone)]
pub struct CsvTable {
    headers: Vec<String>,
    records: Vec<Record>,
}

impl CsvTable {
    /// Read a CSV file from disk.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is malformed.
    pub fn read(path: &Path) -> Result<Self, DatasetError> {
        let file = File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(BufReader::new(file), path)?;
        tracing::info!(
            "Read {} rows x {} columns from {:?}",
            table.records.len(),
            table.headers.len(),
            path
        );
        Ok(table)
    }

    /// Parse CSV text from any buffered reader. `source` is used in errors.
    ///
    /// # Errors
    /// Returns error if reading fails, the header is missing, or a row has
    /// the wrong number of fields.
    pub fn from_reader<R: BufRead>(reader: R, source: &Path) -> Result<Self, DatasetError> {
        let io_err = |source_err| DatasetError::Io {
            path: PathBuf::from(source),
            source: source_err,
        };

        let mut headers: Option<Vec<String>> = None;
        let mut records = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(io_err)?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let line_no = idx + 1;

            match &headers {
                None => {
                    let fields = split_record(line.trim_start_matches('\u{feff}'));
                    headers = Some(fields.into_iter().map(|h| h.trim().to_string()).collect());
                }
                Some(h) => {
                    let fields = split_record(line);
                    if fields.len() != h.len() {
                        return Err(DatasetError::RaggedRow {
                            line: line_no,
                            expected: h.len(),
                            found: fields.len(),
                        });
                    }
                    records.push(Record {
                        line: line_no,
                        fields,
                    });
                }
            }
        }

        let headers = headers.ok_or_else(|| DatasetError::MissingHeader(PathBuf::from(source)))?;
        Ok(Self { headers, records })
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Resolve a column by header name.
    ///
    /// # Errors
    /// Returns `DatasetError::MissingColumn` if no header matches.
    pub fn column<'a>(&self, name: &'a str) -> Result<Column<'a>, DatasetError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .map(|index| Column { index, name })
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
    }
}

/// Split one CSV line into fields, honouring double quotes.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Row-major feature matrix with one target per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
}

impl Dataset {
    /// Empty dataset over the given schema.
    #[must_use]
    pub fn new(schema: &[&str]) -> Self {
        Self {
            feature_names: schema.iter().map(|s| (*s).to_string()).collect(),
            x: Vec::new(),
            y: Vec::new(),
        }
    }

    /// Append one row. The row must have one value per feature name.
    pub fn push(&mut self, row: Vec<f64>, target: f64) {
        debug_assert_eq!(row.len(), self.feature_names.len());
        self.x.push(row);
        self.y.push(target);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Copy of the rows at `indices`, in that order.
    #[must_use]
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            x: indices.iter().map(|&i| self.x[i].clone()).collect(),
            y: indices.iter().map(|&i| self.y[i]).collect(),
        }
    }

    /// Targets as class indices.
    ///
    /// # Errors
    /// Returns error if any target is not an integer in `0..n_classes`.
    pub fn class_labels(&self, n_classes: usize) -> Result<Vec<usize>, TrainingError> {
        self.y
            .iter()
            .map(|&t| {
                if t.fract() == 0.0 && t >= 0.0 && t < n_classes as f64 {
                    Ok(t as usize)
                } else {
                    Err(TrainingError::InvalidParameter(format!(
                        "target {t} is not a class in 0..{n_classes}"
                    )))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn table(text: &str) -> Result<CsvTable, DatasetError> {
        CsvTable::from_reader(Cursor::new(text), Path::new("test.csv"))
    }

    #[test]
    fn test_split_record_quotes() {
        assert_eq!(split_record("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(split_record(r#""x, y",2"#), vec!["x, y", "2"]);
        assert_eq!(split_record(r#""say ""hi""",3"#), vec![r#"say "hi""#, "3"]);
        assert_eq!(split_record("a,,c"), vec!["a", "", "c"]);
        assert_eq!(split_record(""), vec![""]);
    }

    #[test]
    fn test_read_table() {
        let t = table("\u{feff}id,value,when\r\n1,2.5,2024-01-02 03:04:05\r\n\r\n2,,2024-01-03\n")
            .expect("table");
        assert_eq!(t.headers(), ["id", "value", "when"]);
        assert_eq!(t.len(), 2);

        let value = t.column("value").expect("column");
        let when = t.column("when").expect("column");
        let rows = t.records();
        assert_eq!(rows[0].number(value).expect("number"), 2.5);
        assert_eq!(rows[1].line, 4);
        assert_eq!(rows[1].optional_number(value).expect("empty"), None);
        assert!(rows[1].number(value).is_err());
        assert!(rows[1].timestamp(when).is_ok());
    }

    #[test]
    fn test_table_errors() {
        assert!(matches!(table(""), Err(DatasetError::MissingHeader(_))));
        assert!(matches!(
            table("a,b\n1,2,3\n"),
            Err(DatasetError::RaggedRow { line: 2, expected: 2, found: 3 })
        ));

        let t = table("a\nabc\n").expect("table");
        let a = t.column("a").expect("column");
        let err = t.records()[0].number(a).unwrap_err();
        assert_eq!(err.to_string(), "Line 2: column 'a' is not a number: 'abc'");
        assert!(matches!(t.column("b"), Err(DatasetError::MissingColumn(_))));
    }

    #[test]
    fn test_dataset_subset_and_labels() {
        let mut data = Dataset::new(&["f"]);
        data.push(vec![1.0], 0.0);
        data.push(vec![2.0], 2.0);
        data.push(vec![3.0], 1.0);

        let sub = data.subset(&[2, 0]);
        assert_eq!(sub.x, vec![vec![3.0], vec![1.0]]);
        assert_eq!(sub.y, vec![1.0, 0.0]);

        assert_eq!(data.class_labels(3).expect("labels"), vec![0, 2, 1]);
        assert!(data.class_labels(2).is_err());
    }
}
