use md5::Md5;
use rayon::prelude::*;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::common::errors::ChecksumError;

/// Read buffer size; memory use stays flat regardless of artifact size
const CHUNK_SIZE: usize = 64 * 1024;

/// Extensions of hash sidecar files. These are always digested directly.
pub const HASH_FILE_EXTENSIONS: &[&str] = &["md5", "sha1", "sha256"];

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashType {
    Md5,
    Sha1,
    Sha256,
}

impl HashType {
    /// Sidecar file extension for this algorithm
    pub fn extension(self) -> &'static str {
        match self {
            HashType::Md5 => "md5",
            HashType::Sha1 => "sha1",
            HashType::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for HashType {
    type Err = ChecksumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(HashType::Md5),
            "sha1" => Ok(HashType::Sha1),
            "sha256" => Ok(HashType::Sha256),
            _ => Err(ChecksumError::UnsupportedAlgorithm {
                name: s.to_string(),
            }),
        }
    }
}

/// Compute the hex digest of a file, streaming it in fixed-size chunks
pub fn digest(path: &Path, algorithm: HashType) -> Result<String, ChecksumError> {
    match algorithm {
        HashType::Md5 => stream_digest::<Md5>(path),
        HashType::Sha1 => stream_digest::<Sha1>(path),
        HashType::Sha256 => stream_digest::<Sha256>(path),
    }
}

/// Digest with the algorithm given by name (`md5`, `sha1`, `sha256`)
pub fn digest_named(path: &Path, algorithm: &str) -> Result<String, ChecksumError> {
    let algorithm: HashType = algorithm.parse()?;
    digest(path, algorithm)
}

fn stream_digest<D: Digest>(path: &Path) -> Result<String, ChecksumError> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);
    let mut hasher = D::new();

    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = reader.read(&mut buffer).map_err(|e| io_error(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex_string(&hasher.finalize()))
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn io_error(path: &Path, source: std::io::Error) -> ChecksumError {
    if source.kind() == ErrorKind::NotFound {
        ChecksumError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else {
        ChecksumError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// True if the file is itself a hash sidecar (`.md5`, `.sha1`, `.sha256`)
pub fn is_hash_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| HASH_FILE_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// SHA-1 of a file, taken from its `{path}.sha1` sidecar when one exists.
///
/// Repositories publish sidecars next to artifacts, so trusting them avoids
/// re-hashing large binaries. The sidecar content is returned trimmed and is
/// not checked against the file. Hash files never consult a sidecar of their
/// own.
pub fn resolve_sha1(path: &Path) -> Result<String, ChecksumError> {
    if !path.is_file() {
        return Err(ChecksumError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    if !is_hash_file(path) {
        let sidecar = sidecar_path(path, HashType::Sha1);
        if sidecar.is_file() {
            match std::fs::read_to_string(&sidecar) {
                Ok(content) => return Ok(content.trim().to_string()),
                Err(e) => {
                    tracing::debug!(
                        "Unreadable sidecar {}, digesting instead: {}",
                        sidecar.display(),
                        e
                    );
                }
            }
        }
    }

    digest(path, HashType::Sha1)
}

/// Resolve SHA-1 for many files in parallel; results keep input order
pub fn resolve_sha1_all(paths: &[PathBuf]) -> Vec<Result<String, ChecksumError>> {
    paths.par_iter().map(|p| resolve_sha1(p)).collect()
}

/// `{path}.{ext}` next to the file
pub fn sidecar_path(path: &Path, algorithm: HashType) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(algorithm.extension());
    PathBuf::from(name)
}
