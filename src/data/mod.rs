//! Data module for downloading and managing dataset files
//!
//! This module provides the registry of remote files, the download transport,
//! checksum verification, and archive extraction used by the loaders.

mod checksum;
mod downloader;
mod registry;
mod untar;

pub use checksum::{file_hash, verify_file, HashAlgorithm, KnownHash};
pub use downloader::{default_cache_dir, ensure_dir, Downloader, HttpDownloader, DATA_DIR_ENV};
pub use registry::{
    Fetched, Processor, Registry, RegistryEntry, DEFAULT_BASE_URL, MCMURRAY_FACIES_ARCHIVE,
};
pub use untar::{list_files, untar};
