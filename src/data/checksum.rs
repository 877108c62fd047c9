//! Known-hash parsing and file digest verification

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::Result;
use crate::RockhoundError;

lazy_static! {
    static ref KNOWN_HASH: Regex =
        Regex::new(r"^(?:(?P<alg>[A-Za-z0-9]+):)?(?P<hex>[0-9A-Fa-f]+)$").expect("valid regex");
}

/// Digest algorithms understood by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha256,
}

impl HashAlgorithm {
    /// Number of hex characters in a digest of this algorithm
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Md5 => 32,
            HashAlgorithm::Sha256 => 64,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha256 => "sha256",
        }
    }
}

/// Expected digest of a registry file
///
/// Written as `md5:<hex>`, `sha256:<hex>` or a bare `<hex>`, which is taken
/// to be SHA-256.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownHash {
    pub algorithm: HashAlgorithm,
    /// Lowercase hex digest
    pub hex: String,
}

impl KnownHash {
    /// Parse a known-hash string
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let caps = KNOWN_HASH
            .captures(text)
            .ok_or_else(|| RockhoundError::InvalidHash(text.to_string()))?;

        let algorithm = match caps.name("alg").map(|m| m.as_str().to_ascii_lowercase()) {
            None => HashAlgorithm::Sha256,
            Some(alg) if alg == "sha256" => HashAlgorithm::Sha256,
            Some(alg) if alg == "md5" => HashAlgorithm::Md5,
            Some(_) => return Err(RockhoundError::InvalidHash(text.to_string())),
        };

        let hex = caps["hex"].to_ascii_lowercase();
        if hex.len() != algorithm.hex_len() {
            return Err(RockhoundError::InvalidHash(format!(
                "{} (expected {} hex digits for {})",
                text,
                algorithm.hex_len(),
                algorithm.prefix()
            )));
        }

        Ok(Self { algorithm, hex })
    }

    /// Digest of an in-memory buffer, mostly useful for building registries
    pub fn of_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        let hex = match algorithm {
            HashAlgorithm::Md5 => format!("{:x}", md5::compute(bytes)),
            HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(bytes)),
        };
        Self { algorithm, hex }
    }
}

impl fmt::Display for KnownHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.prefix(), self.hex)
    }
}

/// Calculate the hex digest of a file
pub fn file_hash<P: AsRef<Path>>(path: P, algorithm: HashAlgorithm) -> Result<String> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; 1024 * 1024]; // 1MB buffer

    match algorithm {
        HashAlgorithm::Md5 => {
            let mut context = md5::Context::new();
            loop {
                match file.read(&mut buffer)? {
                    0 => break,
                    n => context.consume(&buffer[..n]),
                }
            }
            Ok(format!("{:x}", context.compute()))
        }
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            loop {
                match file.read(&mut buffer)? {
                    0 => break,
                    n => hasher.update(&buffer[..n]),
                }
            }
            Ok(format!("{:x}", hasher.finalize()))
        }
    }
}

/// Verify a file against its known hash
pub fn verify_file<P: AsRef<Path>>(path: P, expected: &KnownHash) -> Result<bool> {
    let actual = file_hash(&path, expected.algorithm)?;

    let valid = actual == expected.hex;
    if valid {
        log::debug!("Checksum verified for {}", path.as_ref().display());
    } else {
        log::warn!("Checksum mismatch for {}", path.as_ref().display());
        log::warn!("  Expected: {}", expected.hex);
        log::warn!("  Actual:   {}", actual);
    }

    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[rstest]
    #[case("md5:D41D8CD98F00B204E9800998ECF8427E", HashAlgorithm::Md5)]
    #[case(
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        HashAlgorithm::Sha256
    )]
    #[case(
        "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        HashAlgorithm::Sha256
    )]
    fn test_parse_known_hash(#[case] text: &str, #[case] algorithm: HashAlgorithm) {
        let hash = KnownHash::parse(text).unwrap();
        assert_eq!(hash.algorithm, algorithm);
        assert_eq!(hash.hex, hash.hex.to_ascii_lowercase());
        assert_eq!(hash.hex.len(), algorithm.hex_len());
    }

    #[rstest]
    #[case("")]
    #[case("sha1:da39a3ee5e6b4b0d3255bfef95601890afd80709")]
    #[case("md5:abc")]
    #[case("not-a-hash")]
    fn test_parse_rejects_bad_hashes(#[case] text: &str) {
        assert!(matches!(
            KnownHash::parse(text),
            Err(RockhoundError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_display_round_trips() {
        let hash = KnownHash::of_bytes(HashAlgorithm::Md5, b"facies");
        assert_eq!(KnownHash::parse(&hash.to_string()).unwrap(), hash);
    }

    #[test]
    fn test_verify_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"").unwrap();

        let empty_sha = KnownHash::parse(
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        )
        .unwrap();
        assert!(verify_file(file.path(), &empty_sha).unwrap());

        let empty_md5 = KnownHash::parse("md5:d41d8cd98f00b204e9800998ecf8427e").unwrap();
        assert!(verify_file(file.path(), &empty_md5).unwrap());

        file.write_all(b"GR,UWI\n").unwrap();
        file.flush().unwrap();
        assert!(!verify_file(file.path(), &empty_sha).unwrap());
    }
}
