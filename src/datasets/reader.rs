//! Delimited-text readers and the ordered parse strategies built on them

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use polars::prelude::*;

use crate::RockhoundError;

/// How forgiving a read should be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Lazy reader with a wide schema inference window, bad rows ignored
    Permissive,
    /// Eager reader, any malformed row is an error
    Strict,
}

/// Why a read did not produce a table
#[derive(Debug)]
pub enum ReadFailure {
    /// The read cannot be performed with this input; the next strategy may
    /// still succeed
    Unsupported(String),
    /// A real parse error, reported to the caller
    Failed(RockhoundError),
}

impl From<PolarsError> for ReadFailure {
    fn from(err: PolarsError) -> Self {
        match err {
            PolarsError::InvalidOperation(msg) => ReadFailure::Unsupported(msg.to_string()),
            other => ReadFailure::Failed(RockhoundError::Parse(other)),
        }
    }
}

/// Reads a CSV file into a table
pub trait TableReader {
    fn read_csv(&self, path: &Path, mode: ReadMode) -> Result<DataFrame, ReadFailure>;
}

/// [`TableReader`] backed by polars
#[derive(Debug, Clone, Copy, Default)]
pub struct PolarsReader;

impl TableReader for PolarsReader {
    fn read_csv(&self, path: &Path, mode: ReadMode) -> Result<DataFrame, ReadFailure> {
        if !path.is_file() {
            return Err(ReadFailure::Unsupported(format!(
                "{} does not exist",
                path.display()
            )));
        }

        let mut df = match mode {
            ReadMode::Permissive => LazyCsvReader::new(path)
                .with_has_header(true)
                .with_infer_schema_length(Some(10000))
                .with_ignore_errors(true)
                .finish()?
                .collect()?,
            ReadMode::Strict => CsvReadOptions::default()
                .with_has_header(true)
                .try_into_reader_with_file_path(Some(path.to_path_buf()))?
                .finish()?,
        };

        let header = read_header_line(path)
            .map_err(|e| ReadFailure::Failed(RockhoundError::IoError(e)))?;
        name_unnamed_columns(&mut df, &header)?;
        Ok(df)
    }
}

fn read_header_line(path: &Path) -> std::io::Result<String> {
    let mut line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut line)?;
    Ok(line)
}

/// Split a CSV header line into its cells, honouring double quotes
fn header_cells(header: &str) -> Vec<String> {
    let header = header.trim_end_matches(['\r', '\n']);
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;

    let mut chars = header.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => cells.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }
    cells.push(cell);
    cells
}

/// Give header cells left blank the `Unnamed: <position>` name
///
/// A leading blank header is how a written-out row index shows up in the
/// file. Only positions whose cell in the raw `header` line is blank are
/// renamed; columns polars named itself are otherwise indistinguishable
/// from real headers.
pub fn name_unnamed_columns(df: &mut DataFrame, header: &str) -> PolarsResult<()> {
    let cells = header_cells(header);
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    if cells.len() != names.len() {
        return Ok(());
    }

    for (i, (cell, name)) in cells.iter().zip(names.iter()).enumerate() {
        if cell.trim().is_empty() {
            df.rename(name, format!("Unnamed: {}", i).into())?;
        }
    }
    Ok(())
}

/// Where to look for the CSV payload, in the order the loader tries them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseStrategy {
    /// A fixed path relative to the extraction directory, read permissively
    ExtractedMember(&'static str),
    /// The first path the fetch returned, read strictly
    FirstFetchedPath,
}

impl ParseStrategy {
    fn candidate(&self, extract_dir: &Path, fetched: &[PathBuf]) -> Option<PathBuf> {
        match self {
            ParseStrategy::ExtractedMember(relative) => Some(extract_dir.join(relative)),
            ParseStrategy::FirstFetchedPath => fetched.first().cloned(),
        }
    }

    fn mode(&self) -> ReadMode {
        match self {
            ParseStrategy::ExtractedMember(_) => ReadMode::Permissive,
            ParseStrategy::FirstFetchedPath => ReadMode::Strict,
        }
    }
}

impl fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseStrategy::ExtractedMember(relative) => write!(f, "extracted member {}", relative),
            ParseStrategy::FirstFetchedPath => write!(f, "first fetched path"),
        }
    }
}

/// Result of running the strategies
#[derive(Debug)]
pub enum StrategyOutcome {
    Loaded(DataFrame),
    /// Every strategy was unsupported; one reason per strategy
    Exhausted(Vec<String>),
}

/// Try each strategy in order and stop at the first table
///
/// Unsupported reads fall through to the next strategy. Any other failure
/// is returned immediately.
pub fn run_strategies(
    reader: &dyn TableReader,
    strategies: &[ParseStrategy],
    extract_dir: &Path,
    fetched: &[PathBuf],
) -> crate::Result<StrategyOutcome> {
    let mut reasons = Vec::with_capacity(strategies.len());

    for strategy in strategies {
        let Some(path) = strategy.candidate(extract_dir, fetched) else {
            reasons.push(format!("{}: nothing was fetched", strategy));
            continue;
        };

        match reader.read_csv(&path, strategy.mode()) {
            Ok(df) => {
                log::debug!("Loaded {} via {}", path.display(), strategy);
                return Ok(StrategyOutcome::Loaded(df));
            }
            Err(ReadFailure::Unsupported(reason)) => {
                log::debug!("{} unsupported: {}", strategy, reason);
                reasons.push(format!("{}: {}", strategy, reason));
            }
            Err(ReadFailure::Failed(err)) => return Err(err),
        }
    }

    Ok(StrategyOutcome::Exhausted(reasons))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const STRATEGIES: [ParseStrategy; 2] = [
        ParseStrategy::ExtractedMember("set/data.csv"),
        ParseStrategy::FirstFetchedPath,
    ];

    #[test]
    fn test_polars_reader_names_index_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, ",GR,UWI\n0,45.2,AA\n1,60.1,AB\n").unwrap();

        for mode in [ReadMode::Permissive, ReadMode::Strict] {
            let df = PolarsReader.read_csv(&path, mode).unwrap();
            let names: Vec<String> = df
                .get_column_names()
                .iter()
                .map(|s| s.to_string())
                .collect();
            assert_eq!(names, vec!["Unnamed: 0", "GR", "UWI"]);
            assert_eq!(df.height(), 2);
        }
    }

    #[test]
    fn test_polars_reader_keeps_real_generated_looking_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "GR,column_2\n1.0,2.0\n").unwrap();

        for mode in [ReadMode::Permissive, ReadMode::Strict] {
            let df = PolarsReader.read_csv(&path, mode).unwrap();
            let names: Vec<String> = df
                .get_column_names()
                .iter()
                .map(|s| s.to_string())
                .collect();
            assert_eq!(names, vec!["GR", "column_2"]);
        }
    }

    #[test]
    fn test_name_unnamed_columns_uses_header_cells() {
        let mut df = df!(
            "column_1" => [0i64, 1],
            "column_2" => [45.2, 60.1],
            "lithName" => ["Sand", "Shale"]
        )
        .unwrap();

        name_unnamed_columns(&mut df, ",column_2,\"lithName\"\r\n").unwrap();

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["Unnamed: 0", "column_2", "lithName"]);
    }

    #[test]
    fn test_header_cells_honours_quotes() {
        assert_eq!(
            header_cells("\"a,b\",,\"say \"\"hi\"\"\"\n"),
            vec!["a,b", "", "say \"hi\""]
        );
    }

    #[test]
    fn test_polars_reader_missing_file_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let result = PolarsReader.read_csv(&dir.path().join("nope.csv"), ReadMode::Strict);
        assert!(matches!(result, Err(ReadFailure::Unsupported(_))));
    }

    #[test]
    fn test_strategies_fall_back_to_first_fetched_path() {
        let dir = tempfile::tempdir().unwrap();
        let fetched = dir.path().join("fetched.csv");
        fs::write(&fetched, "GR\n1.5\n").unwrap();

        let outcome =
            run_strategies(&PolarsReader, &STRATEGIES, dir.path(), &[fetched]).unwrap();
        match outcome {
            StrategyOutcome::Loaded(df) => assert_eq!(df.height(), 1),
            StrategyOutcome::Exhausted(reasons) => panic!("not loaded: {:?}", reasons),
        }
    }

    #[test]
    fn test_strategies_exhausted_collects_reasons() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_strategies(&PolarsReader, &STRATEGIES, dir.path(), &[]).unwrap();
        match outcome {
            StrategyOutcome::Exhausted(reasons) => {
                assert_eq!(reasons.len(), 2);
                assert!(reasons[0].starts_with("extracted member set/data.csv"));
                assert!(reasons[1].contains("nothing was fetched"));
            }
            StrategyOutcome::Loaded(_) => panic!("nothing should load"),
        }
    }

    struct FailingReader;

    impl TableReader for FailingReader {
        fn read_csv(&self, path: &Path, _mode: ReadMode) -> Result<DataFrame, ReadFailure> {
            Err(ReadFailure::Failed(RockhoundError::Parse(PolarsError::ComputeError(
                format!("bad row in {}", path.display()).into(),
            ))))
        }
    }

    #[test]
    fn test_strategies_propagate_real_failures() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_strategies(&FailingReader, &STRATEGIES, dir.path(), &[]);
        assert!(matches!(result, Err(RockhoundError::Parse(_))));
    }
}
