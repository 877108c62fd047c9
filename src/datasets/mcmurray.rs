//! McMurray/Wabiskaw well-log facies dataset
//!
//! Preprocessed well logs from the Alberta Geological Survey's McMurray
//! Formation and Wabiskaw Member mapping project (Athabasca Oil Sands Area),
//! with well coordinates added from the UWI conversion tool. Original data:
//! Wynne, D.A. et al. (1995), ARC/AGS Special Report 6.
//!
//! The archive `mcmurray_facies_v1.tar.gz` holds a single CSV with a leading
//! row-index column followed by 28 log, location, and lithology columns.

use std::io::{self, Write};
use std::path::PathBuf;

use super::reader::{run_strategies, ParseStrategy, PolarsReader, StrategyOutcome, TableReader};
use super::{rename_columns, Dataset};
use crate::data::{Fetched, Processor, Registry, MCMURRAY_FACIES_ARCHIVE};
use crate::Result;

/// Location of the CSV payload inside the extraction directory
pub const MCMURRAY_CSV_MEMBER: &str = "mcmurray_facies_v1/mcmurray_facies_v1.csv";

/// Column names as they appear in the CSV header
pub const ABBREVIATED_COLUMNS: [&str; 29] = [
    "Unnamed: 0",
    "CALI",
    "COND",
    "DELT",
    "DEPT",
    "DPHI",
    "DT",
    "GR",
    "ILD",
    "ILM",
    "NPHI",
    "PHID",
    "RHOB",
    "SFL",
    "SFLU",
    "SN",
    "SP",
    "UWI",
    "SitID",
    "lat",
    "lng",
    "Depth",
    "LithID",
    "W_Tar",
    "SW",
    "VSH",
    "PHI",
    "RW",
    "lithName",
];

/// Column names with their meaning spelled out, position for position
pub const SPELLED_OUT_COLUMNS: [&str; 29] = [
    "Unnamed: 0",
    "CALI=Caliper",
    "COND=Fluid Conductivity",
    "DELT=Travel Time Interval between Successive Shots",
    "DEPT=Depth",
    "DPHI=Density Porosity",
    "DT=Delta-T also called Slowness or Interval Transit Time",
    "GR=Gamma Ray",
    "ILD=Induction Deep Resistivity",
    "ILM=Induction Medium Resistivity",
    "NPHI=Thermal Neutron Porosity (original Ratio Method) in Selected Lithology",
    "PHID=Porosity-LDT NGT Tools",
    "RHOB=Bulk Density",
    "SFL=Spherically Focused Log Resitivity",
    "SFLU=SFL Resistivity Unaveraged",
    "SN=Short Normal Resistivity (16 inch spacing)",
    "SP=Spontaneous Potential",
    "UWI=Unique Well Identifier",
    "SitID=Site Identification Number",
    "lat=latitude",
    "lng=longitude",
    "Depth=Depth",
    "LithID=Lithology Identity Number",
    "W_Tar=Weight Percent Tar",
    "SW=Water Saturation",
    "VSH=Volume of Shale",
    "PHI=Porosity",
    "RW=Connate Water Resistivity",
    "lithName=Lithology Name",
];

const STRATEGIES: [ParseStrategy; 2] = [
    ParseStrategy::ExtractedMember(MCMURRAY_CSV_MEMBER),
    ParseStrategy::FirstFetchedPath,
];

/// Loader for the McMurray facies table
///
/// Defaults to abbreviated column names and loading the table.
pub struct McMurrayLoader {
    abbreviations_only: bool,
    load: bool,
    reader: Box<dyn TableReader>,
}

impl McMurrayLoader {
    pub fn new() -> Self {
        Self {
            abbreviations_only: true,
            load: true,
            reader: Box::new(PolarsReader),
        }
    }

    /// Keep the abbreviated column codes (`true`) or spell them out
    pub fn abbreviations_only(mut self, abbreviations_only: bool) -> Self {
        self.abbreviations_only = abbreviations_only;
        self
    }

    /// Parse the table (`true`) or only return the fetched paths
    pub fn load(mut self, load: bool) -> Self {
        self.load = load;
        self
    }

    /// Replace the CSV reader
    pub fn with_reader(mut self, reader: Box<dyn TableReader>) -> Self {
        self.reader = reader;
        self
    }

    /// Fetch the archive through `registry` and load it
    ///
    /// Fetch errors and real parse errors are returned as `Err`. When no
    /// strategy can read the CSV the result is [`Dataset::LoadError`].
    pub fn fetch(&self, registry: &Registry) -> Result<Dataset> {
        let fetched = registry.fetch(MCMURRAY_FACIES_ARCHIVE, Processor::Untar)?;

        if !self.load {
            return Ok(match fetched {
                Fetched::File(path) => Dataset::Path(path),
                Fetched::Members(members) => Dataset::PathList(members),
            });
        }

        let members = fetched.paths();
        let extract_dir = registry.extract_dir_for(MCMURRAY_FACIES_ARCHIVE);
        let outcome = run_strategies(self.reader.as_ref(), &STRATEGIES, &extract_dir, &members)?;
        let mut df = match outcome {
            StrategyOutcome::Loaded(df) => df,
            StrategyOutcome::Exhausted(reasons) => {
                let message = load_error_message(&reasons);
                report_load_error(&mut io::stdout().lock(), &message)?;
                return Ok(Dataset::LoadError(message));
            }
        };

        let target = if self.abbreviations_only {
            &ABBREVIATED_COLUMNS
        } else {
            &SPELLED_OUT_COLUMNS
        };
        let renamed = rename_columns(&mut df, &ABBREVIATED_COLUMNS, target)?;
        log::debug!(
            "Loaded McMurray facies table: {} rows, {} columns ({} renamed)",
            df.height(),
            df.width(),
            renamed
        );

        Ok(Dataset::Table(df))
    }
}

impl Default for McMurrayLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch the McMurray facies dataset with the default CSV reader
///
/// With `load` false the extracted archive members are returned as
/// [`Dataset::PathList`] without reading the CSV.
pub fn fetch_mcmurray_facies(
    registry: &Registry,
    abbreviations_only: bool,
    load: bool,
) -> Result<Dataset> {
    McMurrayLoader::new()
        .abbreviations_only(abbreviations_only)
        .load(load)
        .fetch(registry)
}

fn load_error_message(reasons: &[String]) -> String {
    format!(
        "could not read {} from the fetched archive: {}",
        file_name(MCMURRAY_CSV_MEMBER),
        reasons.join("; ")
    )
}

/// Write the degraded-path diagnostic as one line to `out` and log it
fn report_load_error<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    log::warn!("{}", message);
    writeln!(out, "{}", message)
}

fn file_name(relative: &str) -> String {
    PathBuf::from(relative)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| relative.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_lists_correspond() {
        assert_eq!(ABBREVIATED_COLUMNS.len(), SPELLED_OUT_COLUMNS.len());
        assert_eq!(ABBREVIATED_COLUMNS[0], SPELLED_OUT_COLUMNS[0]);

        let pairs = ABBREVIATED_COLUMNS.iter().zip(SPELLED_OUT_COLUMNS.iter());
        for (abbrev, spelled) in pairs.skip(1) {
            assert!(
                spelled.starts_with(&format!("{}=", abbrev)),
                "{} does not spell out {}",
                spelled,
                abbrev
            );
        }
    }

    #[test]
    fn test_column_lists_have_28_named_columns() {
        let named = ABBREVIATED_COLUMNS
            .iter()
            .filter(|c| !c.starts_with("Unnamed"))
            .count();
        assert_eq!(named, 28);
    }

    #[test]
    fn test_load_error_message_lists_reasons() {
        let message = load_error_message(&["first: a".to_string(), "second: b".to_string()]);
        assert!(message.starts_with("could not read mcmurray_facies_v1.csv"));
        assert!(message.contains("first: a; second: b"));
    }

    #[test]
    fn test_report_load_error_writes_one_line() {
        let message = load_error_message(&["extracted member x: missing".to_string()]);
        let mut out = Vec::new();
        report_load_error(&mut out, &message).unwrap();

        let written = String::from_utf8(out).unwrap();
        assert_eq!(written, format!("{}\n", message));
        assert_eq!(written.lines().count(), 1);
    }
}
