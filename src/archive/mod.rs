//! Release archives: container sniffing, layout classification, extraction
//! and the scoped workspace they are extracted into.

pub mod classify;
pub mod extract;
pub mod workspace;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::common::errors::InputError;

pub use classify::{classify, ArchiveKind};
pub use extract::{extract, ExtractionError};
pub use workspace::Workspace;

/// Container format, decided from the leading bytes rather than the file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Zip,
    Tar,
    TarGz,
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const TAR_MAGIC: &[u8] = b"ustar";
const TAR_MAGIC_OFFSET: usize = 257;

/// Sniff the container format of a file
pub fn detect_format(path: &Path) -> Result<ContainerFormat, InputError> {
    if !path.exists() {
        return Err(InputError::ArchiveNotFound {
            path: path.to_path_buf(),
        });
    }
    if !path.is_file() {
        return Err(InputError::NotContainer {
            path: path.to_path_buf(),
        });
    }

    let mut header = Vec::with_capacity(512);
    File::open(path)
        .and_then(|f| f.take(512).read_to_end(&mut header))
        .map_err(|e| InputError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if header.is_empty() {
        return Err(InputError::EmptyArchive {
            path: path.to_path_buf(),
        });
    }
    if header.starts_with(ZIP_MAGIC) || header.starts_with(ZIP_EMPTY_MAGIC) {
        return Ok(ContainerFormat::Zip);
    }
    if header.starts_with(GZIP_MAGIC) {
        return Ok(ContainerFormat::TarGz);
    }
    if header.len() >= TAR_MAGIC_OFFSET + TAR_MAGIC.len()
        && &header[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len()] == TAR_MAGIC
    {
        return Ok(ContainerFormat::Tar);
    }

    Err(InputError::NotContainer {
        path: path.to_path_buf(),
    })
}

/// Turn the archive argument into a local path.
///
/// URLs (`https://`, `s3://`, `file://` ...) are rejected: fetching the
/// archive is the caller's job. Single-letter schemes are Windows drives.
pub fn local_archive_path(location: &str) -> Result<PathBuf, InputError> {
    if let Ok(url) = url::Url::parse(location) {
        if url.scheme().len() > 1 {
            return Err(InputError::RemoteArchive {
                url: location.to_string(),
            });
        }
    }
    Ok(PathBuf::from(location))
}
