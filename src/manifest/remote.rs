use std::path::Path;

use super::record::{manifest_name, parse_manifest};
use crate::common::errors::StorageError;
use crate::storage::{ObjectStorage, RetryPolicy};

/// Release manifests mirrored in the manifest bucket.
///
/// One object per (target, release): `{target}/{product}-{version}.txt`.
/// Reads and writes are plain read-modify-write with no locking; runs for
/// the same release must not overlap.
pub struct RemoteManifests<'a> {
    storage: &'a dyn ObjectStorage,
    bucket: &'a str,
    retry: RetryPolicy,
}

impl<'a> RemoteManifests<'a> {
    pub fn new(storage: &'a dyn ObjectStorage, bucket: &'a str, retry: RetryPolicy) -> Self {
        Self {
            storage,
            bucket,
            retry,
        }
    }

    pub fn bucket(&self) -> &str {
        self.bucket
    }

    /// Object key of a release manifest for one target
    pub fn key(target: &str, product_key: &str) -> String {
        format!("{}/{}", target, manifest_name(product_key))
    }

    /// Paths recorded for the release at `target`, if a record exists
    pub fn fetch(
        &self,
        target: &str,
        product_key: &str,
    ) -> Result<Option<Vec<String>>, StorageError> {
        let key = Self::key(target, product_key);
        let body = self.retry.run(&format!("get {}", key), || {
            self.storage.get_object(self.bucket, &key)
        })?;
        Ok(body.map(|bytes| parse_manifest(&String::from_utf8_lossy(&bytes))))
    }

    /// Upload a manifest file written locally, replacing the remote record
    pub fn publish(
        &self,
        target: &str,
        product_key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError> {
        let key = Self::key(target, product_key);
        let body = std::fs::read(local_path).map_err(|e| StorageError::Backend {
            bucket: self.bucket.to_string(),
            message: format!("cannot read local manifest {}: {}", local_path.display(), e),
        })?;
        self.retry.run(&format!("put {}", key), || {
            self.storage.put_object(self.bucket, &key, &body)
        })?;
        tracing::info!("Updated manifest {}/{}", self.bucket, key);
        Ok(())
    }

    /// Drop the remote record for the release at `target`
    pub fn remove(&self, target: &str, product_key: &str) -> Result<(), StorageError> {
        let key = Self::key(target, product_key);
        let keys = [key.clone()];
        let failures = self.retry.run(&format!("delete {}", key), || {
            self.storage.delete_objects(self.bucket, &keys)
        })?;
        if let Some(failure) = failures.into_iter().next() {
            return Err(StorageError::Backend {
                bucket: self.bucket.to_string(),
                message: format!("cannot delete {}: {}", failure.key, failure.message),
            });
        }
        tracing::info!("Removed manifest {}/{}", self.bucket, key);
        Ok(())
    }
}
