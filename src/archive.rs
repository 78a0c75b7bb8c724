//! Archive extraction for uploaded ZIP, TAR, and gzip-compressed TAR files.
//!
//! The decoder is chosen from the archive's filename suffix. Extraction never fails from the
//! caller's point of view: unsupported formats and decode errors are logged and reported as
//! zero extracted entries.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use thiserror::Error;

/// Errors raised while walking an archive. Internal to the dispatcher.
#[derive(Debug, Error)]
enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("ZIP decoding failed: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Archive container formats recognized by suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.zip`
    Zip,
    /// `.tar`
    Tar,
    /// `.tar.gz` or `.tgz`
    TarGz,
}

impl ArchiveFormat {
    /// Select a format from the path's suffix, ignoring ASCII case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

/// Stateless dispatcher selecting the decoder for an archive on disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct ArchiveDispatcher;

impl ArchiveDispatcher {
    /// Create a dispatcher.
    pub const fn new() -> Self {
        Self
    }

    /// Extract every regular entry of `archive` under `dest`, returning the entry count.
    ///
    /// Relative entry paths are preserved, parent directories are created, and existing files
    /// are overwritten. Entries that would escape `dest` are skipped. Returns `0` for
    /// unrecognized suffixes or when decoding fails.
    pub fn extract(&self, archive: &Path, dest: &Path) -> usize {
        let Some(format) = ArchiveFormat::from_path(archive) else {
            tracing::warn!(archive = %archive.display(), "Unsupported archive format");
            return 0;
        };

        let outcome = match format {
            ArchiveFormat::Zip => extract_zip(archive, dest),
            ArchiveFormat::Tar => extract_tar(archive, dest, false),
            ArchiveFormat::TarGz => extract_tar(archive, dest, true),
        };

        match outcome {
            Ok(count) => {
                tracing::info!(
                    archive = %archive.display(),
                    format = ?format,
                    entries = count,
                    "Archive extracted"
                );
                count
            }
            Err(error) => {
                tracing::error!(archive = %archive.display(), %error, "Error extracting archive");
                0
            }
        }
    }
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<usize, ArchiveError> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    let mut count = 0;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(entry = entry.name(), "Skipping ZIP entry outside destination");
            continue;
        };
        write_entry(&mut entry, &dest.join(&relative))?;
        tracing::debug!(entry = %relative.display(), "Extracted");
        count += 1;
    }
    Ok(count)
}

fn extract_tar(archive: &Path, dest: &Path, gzipped: bool) -> Result<usize, ArchiveError> {
    let file = File::open(archive)?;
    let reader: Box<dyn Read> = if gzipped {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut tar = tar::Archive::new(reader);
    let mut count = 0;
    for entry in tar.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path()?.into_owned();
        let Some(relative) = enclosed_path(&path) else {
            tracing::warn!(entry = %path.display(), "Skipping TAR entry outside destination");
            continue;
        };
        write_entry(&mut entry, &dest.join(&relative))?;
        tracing::debug!(entry = %relative.display(), "Extracted");
        count += 1;
    }
    Ok(count)
}

fn write_entry(reader: &mut impl Read, target: &Path) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(target)?;
    io::copy(reader, &mut file)?;
    Ok(())
}

/// Keep only normal components; reject absolute paths and parent traversal.
fn enclosed_path(path: &Path) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!relative.as_os_str().is_empty()).then_some(relative)
}
