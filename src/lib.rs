//! Rockhound: download, cache, and load geoscience datasets
//!
//! Dataset files are described by a [`data::Registry`] (cache directory, base
//! URL, and expected digests), fetched on first use, verified, unpacked, and
//! loaded into polars tables by the loaders in [`datasets`].
//!
//! ```no_run
//! use rockhound::data::Registry;
//! use rockhound::datasets::{fetch_mcmurray_facies, Dataset};
//!
//! let registry = Registry::rockhound();
//! match fetch_mcmurray_facies(&registry, false, true)? {
//!     Dataset::Table(df) => println!("{}", df.head(Some(5))),
//!     Dataset::LoadError(msg) => eprintln!("{}", msg),
//!     other => println!("{:?}", other.paths()),
//! }
//! # Ok::<(), rockhound::RockhoundError>(())
//! ```

use thiserror::Error;

pub mod data;
pub mod datasets;

// Re-export commonly used types
pub use data::{Fetched, KnownHash, Processor, Registry};
pub use datasets::{fetch_mcmurray_facies, Dataset, McMurrayLoader};

/// Main error type for the rockhound library
#[derive(Debug, Error)]
pub enum RockhoundError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Dataset not in registry: {0}")]
    UnknownDataset(String),

    #[error("Checksum mismatch for {name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid known hash: {0}")]
    InvalidHash(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Parse error: {0}")]
    Parse(#[from] polars::prelude::PolarsError),
}

/// Result type for rockhound operations
pub type Result<T> = std::result::Result<T, RockhoundError>;
