//! Downloader module for retrieving dataset files
//!
//! This module handles the cache directory layout and the transport used to
//! pull registry files over the network.

use std::env;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::Result;
use crate::RockhoundError;

/// Environment variable overriding the default cache directory
pub const DATA_DIR_ENV: &str = "ROCKHOUND_DATA_DIR";

const PROGRESS_STEP: u64 = 5 * 1024 * 1024;

/// Get the default cache directory path
///
/// `$ROCKHOUND_DATA_DIR` when set, otherwise `$HOME/.cache/rockhound`.
pub fn default_cache_dir() -> PathBuf {
    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".cache").join("rockhound")
}

/// Ensure that a directory exists
pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> io::Result<PathBuf> {
    fs::create_dir_all(&dir)?;
    Ok(dir.as_ref().to_path_buf())
}

/// Check if a file exists and is not empty
pub(crate) fn file_exists_and_not_empty<P: AsRef<Path>>(path: P) -> bool {
    match fs::metadata(path) {
        Ok(metadata) => metadata.is_file() && metadata.len() > 0,
        Err(_) => false,
    }
}

/// Transport used by the registry to retrieve remote files
pub trait Downloader {
    /// Download `url` and write its body to `path`
    fn download(&self, url: &str, path: &Path) -> Result<()>;
}

/// Blocking HTTP downloader
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    timeout: Duration,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, path: &Path) -> Result<()> {
        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| RockhoundError::Http(format!("Failed to create HTTP client: {}", e)))?;

        log::info!("Downloading: {}", url);

        let mut response = client
            .get(url)
            .send()
            .map_err(|e| RockhoundError::Http(format!("Failed to download {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(RockhoundError::Http(format!(
                "Failed to download {}, status: {}",
                url,
                response.status()
            )));
        }

        let total_size = response.content_length().unwrap_or(0);
        let mut file = BufWriter::new(File::create(path)?);
        let mut downloaded: u64 = 0;
        let mut next_report = PROGRESS_STEP;
        let start_time = Instant::now();

        let mut buffer = [0; 8192];
        loop {
            let n = response
                .read(&mut buffer)
                .map_err(|e| RockhoundError::Http(format!("Error downloading file: {}", e)))?;
            if n == 0 {
                break;
            }
            file.write_all(&buffer[..n])?;
            downloaded += n as u64;

            if downloaded >= next_report {
                next_report += PROGRESS_STEP;
                if total_size > 0 {
                    log::info!(
                        "Downloaded: {:.1}% ({:.1}MB/{:.1}MB)",
                        downloaded as f64 / total_size as f64 * 100.0,
                        downloaded as f64 / 1024.0 / 1024.0,
                        total_size as f64 / 1024.0 / 1024.0
                    );
                } else {
                    log::info!("Downloaded: {:.1}MB", downloaded as f64 / 1024.0 / 1024.0);
                }
            }
        }

        file.flush()?;

        let elapsed = start_time.elapsed().as_secs_f64();
        let speed = if elapsed > 0.0 {
            downloaded as f64 / elapsed / 1024.0 / 1024.0
        } else {
            0.0
        };
        log::info!(
            "Download complete: {:.1}MB at {:.1} MB/s in {:.1}s",
            downloaded as f64 / 1024.0 / 1024.0,
            speed,
            elapsed
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_dir() {
        let cache_dir = default_cache_dir();
        match env::var(DATA_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => assert_eq!(cache_dir, PathBuf::from(dir)),
            _ => assert!(cache_dir.to_str().unwrap().contains(".cache/rockhound")),
        }
    }

    #[test]
    fn test_file_exists_and_not_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        assert!(!file_exists_and_not_empty(&path));

        fs::write(&path, b"").unwrap();
        assert!(!file_exists_and_not_empty(&path));

        fs::write(&path, b"GR\n1.0\n").unwrap();
        assert!(file_exists_and_not_empty(&path));
        assert!(!file_exists_and_not_empty(dir.path()));
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let created = ensure_dir(&nested).unwrap();
        assert_eq!(created, nested);
        assert!(nested.is_dir());
    }
}
