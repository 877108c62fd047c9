//! Registry of remote dataset files
//!
//! A [`Registry`] maps logical file names to a download URL and an expected
//! digest, and owns the cache directory those files land in. It is an
//! ordinary value: build one, register entries, and pass it to the loaders.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::checksum::{file_hash, verify_file, KnownHash};
use super::downloader::{
    default_cache_dir, ensure_dir, file_exists_and_not_empty, Downloader, HttpDownloader,
};
use super::untar::{list_files, untar};
use crate::Result;
use crate::RockhoundError;

/// Default location of the rockhound data files
pub const DEFAULT_BASE_URL: &str = "https://github.com/fatiando/rockhound/raw/master/data/";

/// Registry file name of the McMurray facies archive
pub const MCMURRAY_FACIES_ARCHIVE: &str = "mcmurray_facies_v1.tar.gz";

/// Suffix of the directory an archive is unpacked into
const UNTAR_SUFFIX: &str = ".untar";

/// A single file known to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// File name, also the name of the cached copy
    pub name: String,
    /// Expected digest; `None` skips verification
    pub hash: Option<KnownHash>,
    /// Explicit URL overriding `base_url + name`
    pub url: Option<String>,
}

/// Post-processing applied to a fetched file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processor {
    /// Hand back the cached file as is
    None,
    /// Unpack the tar archive next to the cached file
    Untar,
}

/// Outcome of a registry fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// The cached file itself
    File(PathBuf),
    /// Every regular file unpacked from the archive, sorted by path
    Members(Vec<PathBuf>),
}

impl Fetched {
    /// All paths in the fetch result
    pub fn paths(&self) -> Vec<PathBuf> {
        match self {
            Fetched::File(path) => vec![path.clone()],
            Fetched::Members(paths) => paths.clone(),
        }
    }
}

/// What a fetch has to do with the cached copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Download,
    Update,
    Fetch,
}

/// Cache directory plus the files that may be fetched into it
pub struct Registry {
    cache_dir: PathBuf,
    base_url: String,
    entries: HashMap<String, RegistryEntry>,
    downloader: Box<dyn Downloader>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("cache_dir", &self.cache_dir)
            .field("base_url", &self.base_url)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Create an empty registry using the HTTP downloader
    pub fn new<P: AsRef<Path>>(cache_dir: P, base_url: &str) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            base_url,
            entries: HashMap::new(),
            downloader: Box::new(HttpDownloader::new()),
        }
    }

    /// The default rockhound registry with the McMurray facies archive registered
    ///
    /// No digest is pinned for the archive; use [`Registry::load_registry_file`]
    /// or [`Registry::register`] to add one.
    pub fn rockhound() -> Self {
        let mut registry = Self::new(default_cache_dir(), DEFAULT_BASE_URL);
        registry.register(MCMURRAY_FACIES_ARCHIVE, None);
        registry
    }

    /// Replace the transport used for downloads
    pub fn with_downloader(mut self, downloader: Box<dyn Downloader>) -> Self {
        self.downloader = downloader;
        self
    }

    /// Register (or replace) a file fetched from the base URL
    pub fn register(&mut self, name: &str, hash: Option<KnownHash>) -> &mut Self {
        self.insert(RegistryEntry {
            name: name.to_string(),
            hash,
            url: None,
        })
    }

    /// Register (or replace) a file fetched from an explicit URL
    pub fn register_url(&mut self, name: &str, hash: Option<KnownHash>, url: &str) -> &mut Self {
        self.insert(RegistryEntry {
            name: name.to_string(),
            hash,
            url: Some(url.to_string()),
        })
    }

    fn insert(&mut self, entry: RegistryEntry) -> &mut Self {
        self.entries.insert(entry.name.clone(), entry);
        self
    }

    /// Load entries from a registry file
    pub fn load_registry_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let text = fs::read_to_string(&path)?;
        self.load_registry_str(&text)
    }

    /// Load entries from registry text
    ///
    /// One entry per line: `<name> <hash> [<url>]`. Blank lines and lines
    /// starting with `#` are skipped. Returns the number of entries loaded.
    pub fn load_registry_str(&mut self, text: &str) -> Result<usize> {
        let mut loaded = 0;
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 2 {
                return Err(RockhoundError::Registry(format!(
                    "line {}: expected '<name> <hash> [<url>]', got '{}'",
                    i + 1,
                    line
                )));
            }

            let hash = KnownHash::parse(parts[1])?;
            match parts.get(2) {
                Some(url) => self.register_url(parts[0], Some(hash), url),
                None => self.register(parts[0], Some(hash)),
            };
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Look up a registry entry
    pub fn entry(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(name)
    }

    /// Download URL of a registered file
    pub fn url_for(&self, name: &str) -> Result<String> {
        let entry = self.lookup(name)?;
        Ok(match &entry.url {
            Some(url) => url.clone(),
            None => format!("{}{}", self.base_url, entry.name),
        })
    }

    /// Location of the cached copy of a file
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.cache_dir.join(name)
    }

    /// Directory an archive is unpacked into
    pub fn extract_dir_for(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}{}", name, UNTAR_SUFFIX))
    }

    fn lookup(&self, name: &str) -> Result<&RegistryEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| RockhoundError::UnknownDataset(name.to_string()))
    }

    /// Fetch a registered file into the cache, then post-process it
    ///
    /// The file is downloaded when missing or when the cached copy no longer
    /// matches its digest. Archives processed with [`Processor::Untar`] are
    /// unpacked again whenever a new copy was downloaded.
    pub fn fetch(&self, name: &str, processor: Processor) -> Result<Fetched> {
        let entry = self.lookup(name)?;
        ensure_dir(&self.cache_dir)?;

        let path = self.path_for(name);
        let action = self.action_for(entry, &path)?;

        match action {
            Action::Fetch => log::debug!("Using cached {} from {}", name, path.display()),
            Action::Download | Action::Update => {
                let url = self.url_for(name)?;
                log::info!(
                    "{} '{}' from '{}' to '{}'",
                    if action == Action::Download {
                        "Downloading file"
                    } else {
                        "Updating file"
                    },
                    name,
                    url,
                    self.cache_dir.display()
                );
                self.download_verified(entry, &url, &path)?;
            }
        }

        match processor {
            Processor::None => Ok(Fetched::File(path)),
            Processor::Untar => {
                let dest = self.extract_dir_for(name);
                let members = if action != Action::Fetch || !has_files(&dest) {
                    if dest.exists() {
                        fs::remove_dir_all(&dest)?;
                    }
                    untar(&path, &dest)?
                } else {
                    list_files(&dest)?
                };
                Ok(Fetched::Members(members))
            }
        }
    }

    fn action_for(&self, entry: &RegistryEntry, path: &Path) -> Result<Action> {
        if !file_exists_and_not_empty(path) {
            return Ok(Action::Download);
        }
        match &entry.hash {
            Some(hash) if !verify_file(path, hash)? => Ok(Action::Update),
            Some(_) => Ok(Action::Fetch),
            None => {
                log::warn!(
                    "No checksum registered for {}; skipping verification",
                    entry.name
                );
                Ok(Action::Fetch)
            }
        }
    }

    /// Download to a temporary file, verify, then move into place
    fn download_verified(&self, entry: &RegistryEntry, url: &str, path: &Path) -> Result<()> {
        let temp_path = temp_path_for(path);
        if let Err(e) = self.downloader.download(url, &temp_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        match &entry.hash {
            Some(hash) => {
                let actual = file_hash(&temp_path, hash.algorithm)?;
                if actual != hash.hex {
                    let _ = fs::remove_file(&temp_path);
                    return Err(RockhoundError::ChecksumMismatch {
                        name: entry.name.clone(),
                        expected: hash.hex.clone(),
                        actual,
                    });
                }
            }
            None => log::warn!("No checksum registered for {}; skipping verification", entry.name),
        }

        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn has_files(dir: &Path) -> bool {
    matches!(list_files(dir), Ok(files) if !files.is_empty())
}
