use std::path::PathBuf;

use thiserror::Error;

// Error types for rollback operations.
// We use `anyhow` at the top level for CLI error handling,
// but these typed errors let each stage say exactly what went wrong.

/// Bad input, reported before any remote state is touched
#[derive(Debug, Error)]
pub enum InputError {
    /// Archive path does not exist
    #[error("archive not found: '{}'", path.display())]
    ArchiveNotFound { path: PathBuf },

    /// Archive exists but could not be read as a container
    #[error("unreadable archive '{}': {message}", path.display())]
    Unreadable { path: PathBuf, message: String },

    /// Neither zip nor tar
    #[error("'{}' is not a zip or tar archive", path.display())]
    NotContainer { path: PathBuf },

    /// Container with no entries
    #[error("archive '{}' contains no entries", path.display())]
    EmptyArchive { path: PathBuf },

    /// Archive entry escapes the extraction directory
    #[error("archive entry escapes the workspace: {entry}")]
    UnsafeEntry { entry: String },

    /// Product or version missing or malformed
    #[error("invalid release identity: {message}")]
    InvalidIdentity { message: String },

    /// Ignore pattern is not a valid regular expression
    #[error("invalid ignore pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A resolved storage key would reach outside the target prefix
    #[error("refusing to delete key '{key}': {reason}")]
    UnsafeKey { key: String, reason: String },

    /// Target name has no configuration
    #[error("target '{name}' is not configured")]
    UnknownTarget { name: String },

    /// Nothing to fan out over
    #[error("at least one target is required")]
    NoTargets,

    /// Remote archives are fetched by the caller, never here
    #[error("'{url}' is a remote location; download the archive and pass its local path")]
    RemoteArchive { url: String },
}

/// Hashing failure; aborts that file only
#[derive(Debug, Error)]
pub enum ChecksumError {
    #[error("file not found: '{}'", path.display())]
    FileNotFound { path: PathBuf },

    #[error("unsupported hash algorithm '{name}' (expected md5, sha1 or sha256)")]
    UnsupportedAlgorithm { name: String },

    #[error("I/O error hashing '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Object storage failure; recorded against a single target
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage error on bucket '{bucket}': {message}")]
    Backend { bucket: String, message: String },

    #[error("storage configuration error: {message}")]
    Config { message: String },
}

/// CDN invalidation failure; never affects the outcome
#[derive(Debug, Error)]
pub enum CdnError {
    #[error("invalidation for distribution '{distribution_id}' failed: {message}")]
    Request {
        distribution_id: String,
        message: String,
    },
}

/// Anything that stops a rollback run as a whole
#[derive(Debug, Error)]
pub enum RollbackError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("I/O error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected error: {message}")]
    Unexpected { message: String },
}

impl RollbackError {
    /// Fatal errors are the ones the caller did not cause.
    /// The CLI maps them to a distinct exit status.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RollbackError::Input(_))
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RollbackError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_not_fatal() {
        let err = RollbackError::from(InputError::NoTargets);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_io_errors_are_fatal() {
        let err = RollbackError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        );
        assert!(err.is_fatal());
        assert!(err.to_string().contains("/tmp/x"));
    }

    #[test]
    fn test_unsupported_algorithm_message() {
        let err = ChecksumError::UnsupportedAlgorithm {
            name: "crc32".into(),
        };
        assert!(err.to_string().contains("crc32"));
    }
}
