//! Dataset loaders
//!
//! Each loader fetches its files through a [`Registry`](crate::data::Registry)
//! and hands back a [`Dataset`]: the parsed table, the fetched paths, or a
//! load error message when no parse strategy could read the payload.

use std::path::PathBuf;

use polars::prelude::*;

pub mod mcmurray;
pub mod reader;

pub use mcmurray::{
    fetch_mcmurray_facies, McMurrayLoader, ABBREVIATED_COLUMNS, MCMURRAY_CSV_MEMBER,
    SPELLED_OUT_COLUMNS,
};
pub use reader::{
    run_strategies, ParseStrategy, PolarsReader, ReadFailure, ReadMode, StrategyOutcome,
    TableReader,
};

/// What a dataset loader returns
#[derive(Debug, Clone)]
pub enum Dataset {
    /// The loaded table
    Table(DataFrame),
    /// A single fetched file
    Path(PathBuf),
    /// Every file unpacked from a fetched archive
    PathList(Vec<PathBuf>),
    /// No strategy could read the payload; the message lists why
    LoadError(String),
}

impl Dataset {
    /// Borrow the table, if this is one
    pub fn as_table(&self) -> Option<&DataFrame> {
        match self {
            Dataset::Table(df) => Some(df),
            _ => None,
        }
    }

    /// Take the table, if this is one
    pub fn into_table(self) -> Option<DataFrame> {
        match self {
            Dataset::Table(df) => Some(df),
            _ => None,
        }
    }

    /// Fetched paths for the `Path` and `PathList` variants
    pub fn paths(&self) -> Option<Vec<PathBuf>> {
        match self {
            Dataset::Path(path) => Some(vec![path.clone()]),
            Dataset::PathList(paths) => Some(paths.clone()),
            _ => None,
        }
    }

    pub fn is_load_error(&self) -> bool {
        matches!(self, Dataset::LoadError(_))
    }
}

/// Rename columns by positional correspondence of two name lists
///
/// `from[i]` becomes `to[i]`. Columns missing from the table are skipped and
/// columns not listed keep their names. Returns how many columns were renamed.
pub fn rename_columns(df: &mut DataFrame, from: &[&str], to: &[&str]) -> PolarsResult<usize> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut renamed = 0;
    for (old, new) in from.iter().zip(to.iter()) {
        if old == new || !present.iter().any(|name| name == old) {
            continue;
        }
        df.rename(old, (*new).into())?;
        renamed += 1;
    }
    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df!(
            "GR" => [45.2, 60.1],
            "UWI" => ["AA", "AB"],
            "extra" => [1i64, 2]
        )
        .unwrap()
    }

    fn names(df: &DataFrame) -> Vec<String> {
        df.get_column_names().iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rename_columns_positional() {
        let mut df = sample();
        let renamed = rename_columns(
            &mut df,
            &["GR", "lat", "UWI"],
            &["GR=Gamma Ray", "lat=latitude", "UWI=Unique Well Identifier"],
        )
        .unwrap();

        assert_eq!(renamed, 2);
        assert_eq!(
            names(&df),
            vec!["GR=Gamma Ray", "UWI=Unique Well Identifier", "extra"]
        );
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn test_rename_identity_is_noop() {
        let mut df = sample();
        let renamed = rename_columns(&mut df, &["GR", "UWI"], &["GR", "UWI"]).unwrap();
        assert_eq!(renamed, 0);
        assert_eq!(names(&df), vec!["GR", "UWI", "extra"]);
    }

    #[test]
    fn test_dataset_accessors() {
        let table = Dataset::Table(sample());
        assert!(table.as_table().is_some());
        assert!(table.paths().is_none());

        let list = Dataset::PathList(vec![PathBuf::from("a.csv"), PathBuf::from("b.csv")]);
        assert_eq!(list.paths().unwrap().len(), 2);
        assert!(list.into_table().is_none());

        assert_eq!(
            Dataset::Path(PathBuf::from("a.csv")).paths(),
            Some(vec![PathBuf::from("a.csv")])
        );
        assert!(Dataset::LoadError("oops".to_string()).is_load_error());
    }
}
