/*!
 * Packing local files into gzipped tarballs for upload
 */

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::trace;

use crate::error::{EnclaveError, Result};

/// Produces the archive bytes a files artifact is uploaded as
pub trait Archiver: Send + Sync + fmt::Debug {
    /// Archive a file or directory tree
    fn archive(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Reads the local filesystem and produces a `.tgz`
///
/// A directory is archived by its contents (entries are relative to it); a
/// single file is archived under its file name.
#[derive(Debug, Clone, Copy)]
pub struct FsTgzArchiver {
    compression: Compression,
}

impl Default for FsTgzArchiver {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
        }
    }
}

impl FsTgzArchiver {
    /// gzip level 0-9
    pub fn with_level(level: u32) -> Self {
        Self {
            compression: Compression::new(level.min(9)),
        }
    }
}

fn archive_err(path: &Path, e: impl fmt::Display) -> EnclaveError {
    EnclaveError::Archive(format!("Failed to archive {}: {}", path.display(), e))
}

impl Archiver for FsTgzArchiver {
    fn archive(&self, path: &Path) -> Result<Vec<u8>> {
        let metadata = fs::metadata(path).map_err(|e| archive_err(path, e))?;

        let encoder = GzEncoder::new(Vec::new(), self.compression);
        let mut builder = tar::Builder::new(encoder);

        if metadata.is_dir() {
            trace!("Archiving directory {}", path.display());
            builder
                .append_dir_all(".", path)
                .map_err(|e| archive_err(path, e))?;
        } else {
            let name = path
                .file_name()
                .ok_or_else(|| archive_err(path, "path has no file name"))?;
            trace!("Archiving file {}", path.display());
            builder
                .append_path_with_name(path, name)
                .map_err(|e| archive_err(path, e))?;
        }

        let encoder = builder.into_inner().map_err(|e| archive_err(path, e))?;
        let bytes = encoder.finish().map_err(|e| archive_err(path, e))?;

        trace!("Archived {} into {} bytes", path.display(), bytes.len());
        Ok(bytes)
    }
}

/// For hosts without filesystem access
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedArchiver;

impl Archiver for UnsupportedArchiver {
    fn archive(&self, path: &Path) -> Result<Vec<u8>> {
        Err(EnclaveError::Unsupported(format!(
            "cannot archive {} without filesystem access; upload pre-built archive bytes instead",
            path.display()
        )))
    }
}
