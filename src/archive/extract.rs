//! Archive extraction into a workspace.
//!
//! Zip and tar entries are validated before anything is written so an
//! entry can never land outside the destination directory.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use super::{detect_format, ContainerFormat};
use crate::common::errors::{InputError, RollbackError};

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip container could not be decoded.
    #[error("corrupt zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The file is not a supported container.
    #[error(transparent)]
    Input(#[from] InputError),
}

impl From<ExtractionError> for RollbackError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::PathTraversal { path } => {
                RollbackError::Input(InputError::UnsafeEntry { entry: path })
            }
            ExtractionError::Input(e) => RollbackError::Input(e),
            other => RollbackError::Unexpected {
                message: other.to_string(),
            },
        }
    }
}

/// Extract the archive at `archive_path` into `dest_dir`.
///
/// Returns the extracted file paths (directories excluded), relative to
/// `dest_dir`, in archive order.
pub fn extract(archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let format = detect_format(archive_path)?;
    let file = File::open(archive_path)?;
    std::fs::create_dir_all(dest_dir)?;

    match format {
        ContainerFormat::Zip => extract_zip(BufReader::new(file), dest_dir),
        ContainerFormat::Tar => extract_tar(BufReader::new(file), dest_dir),
        ContainerFormat::TarGz => {
            extract_tar(flate2::read::GzDecoder::new(BufReader::new(file)), dest_dir)
        }
    }
}

fn extract_zip(reader: BufReader<File>, dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut archive = zip::ZipArchive::new(reader)?;
    let mut extracted = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let entry_path = PathBuf::from(entry.name());
        validate_entry_path(&entry_path)?;

        let dest_path = dest_dir.join(&entry_path);
        if entry.is_dir() {
            std::fs::create_dir_all(&dest_path)?;
            continue;
        }
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&dest_path)?;
        std::io::copy(&mut entry, &mut out)?;
        extracted.push(entry_path);
    }

    Ok(extracted)
}

fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut archive = tar::Archive::new(reader);
    let mut extracted = Vec::new();

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        let entry_path = entry.path()?.into_owned();
        validate_entry_path(&entry_path)?;

        let entry_type = entry.header().entry_type();
        let dest_path = dest_dir.join(&entry_path);
        if entry_type.is_dir() {
            std::fs::create_dir_all(&dest_path)?;
            continue;
        }
        if !entry_type.is_file() {
            // Links and special files have no place in a release archive
            tracing::debug!("Skipping non-regular entry {}", entry_path.display());
            continue;
        }
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        entry.unpack(&dest_path)?;
        extracted.push(entry_path);
    }

    Ok(extracted)
}

/// Validate that an entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    if path.is_absolute() {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    for component in path.components() {
        if matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        ) {
            return Err(ExtractionError::PathTraversal {
                path: path.display().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_parent_dir() {
        for bad in ["../escape.txt", "foo/../../escape.txt"] {
            let result = validate_entry_path(Path::new(bad));
            assert!(
                matches!(result, Err(ExtractionError::PathTraversal { .. })),
                "expected PathTraversal for {bad}"
            );
        }
    }

    #[test]
    fn test_rejects_absolute_path() {
        let result = validate_entry_path(Path::new("/etc/passwd"));
        assert!(matches!(result, Err(ExtractionError::PathTraversal { .. })));
    }

    #[test]
    fn test_accepts_normal_paths() {
        assert!(validate_entry_path(Path::new("maven-repository/org/foo/1.0/foo.jar")).is_ok());
        assert!(validate_entry_path(Path::new("./package/package.json")).is_ok());
    }

    #[test]
    fn test_traversal_maps_to_input_error() {
        let err: RollbackError = ExtractionError::PathTraversal {
            path: "../x".into(),
        }
        .into();
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_extract_tar_gz() {
        let dir = tempfile::TempDir::new().unwrap();
        let archive_path = dir.path().join("pkg.tgz");

        let file = File::create(&archive_path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let body = br#"{"name":"demo","version":"1.0.0"}"#;
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "package/package.json", &body[..])
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let out = dir.path().join("out");
        let files = extract(&archive_path, &out).unwrap();
        assert_eq!(files, vec![PathBuf::from("package/package.json")]);
        assert!(out.join("package/package.json").is_file());
    }
}
