use std::path::{Path, PathBuf};

/// Prefix of every workspace directory name
const WORKSPACE_PREFIX: &str = "unpublish-";

/// Temporary extraction directory owned by exactly one rollback run.
///
/// The directory is removed when the guard drops, on every exit path,
/// unless retention was requested.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    retain: bool,
}

impl Workspace {
    /// Create a fresh directory under `parent`, or the system temp dir
    pub fn create(parent: Option<&Path>, retain: bool) -> std::io::Result<Self> {
        let parent = match parent {
            Some(p) => p.to_path_buf(),
            None => std::env::temp_dir(),
        };
        std::fs::create_dir_all(&parent)?;

        let path = parent.join(format!("{}{}", WORKSPACE_PREFIX, uuid::Uuid::new_v4()));
        std::fs::create_dir(&path)?;
        tracing::debug!("Created workspace {}", path.display());

        Ok(Self { path, retain })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_retained(&self) -> bool {
        self.retain
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.retain {
            tracing::info!("Keeping workspace {}", self.path.display());
            return;
        }
        if !self.path.exists() {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::debug!("Removed workspace {}", self.path.display()),
            Err(e) => tracing::warn!(
                "Failed to remove workspace {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
