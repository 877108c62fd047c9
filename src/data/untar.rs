//! Tar archive extraction for registry downloads

use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::Result;
use crate::RockhoundError;

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Unpack a `.tar.gz` (or plain `.tar`) archive into `dest`
///
/// Returns the sorted list of regular files found under `dest` afterwards.
/// A partially extracted directory is removed on failure.
pub fn untar<P: AsRef<Path>, Q: AsRef<Path>>(archive: P, dest: Q) -> Result<Vec<PathBuf>> {
    let archive = archive.as_ref();
    let dest = dest.as_ref();

    let mut file = File::open(archive)?;
    let mut header = [0u8; 2];
    let gzipped = file.read_exact(&mut header).is_ok() && header == GZIP_MAGIC;
    file.seek(SeekFrom::Start(0))?;

    log::info!(
        "Extracting {} to {}",
        archive.display(),
        dest.display()
    );
    fs::create_dir_all(dest)?;

    let reader = BufReader::new(file);
    let unpacked = if gzipped {
        tar::Archive::new(flate2::read::GzDecoder::new(reader)).unpack(dest)
    } else {
        tar::Archive::new(reader).unpack(dest)
    };

    if let Err(e) = unpacked {
        let _ = fs::remove_dir_all(dest);
        return Err(RockhoundError::Archive(format!(
            "Failed to extract {}: {}",
            archive.display(),
            e
        )));
    }

    let members = list_files(dest)?;
    log::debug!("Extracted {} files", members.len());
    Ok(members)
}

/// Recursively list regular files under `dir`, sorted by path
pub fn list_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(dir.as_ref(), &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}
