//! Object storage and CDN collaborators.
//!
//! Every call is blocking. The rollback engine only ever talks to these
//! traits, so tests run against [`MemoryStorage`] and the binary against
//! [`ObjectStoreGateway`].

pub mod cdn;
pub mod gateway;
pub mod memory;
pub mod retry;

use serde::Serialize;

use crate::common::errors::StorageError;

pub use cdn::{
    invalidate_batched, CdnInvalidator, HttpInvalidator, LogInvalidator, INVALIDATION_BATCH_SIZE,
};
pub use gateway::ObjectStoreGateway;
pub use memory::{MemoryStorage, StorageCall};
pub use retry::RetryPolicy;

/// A key that could not be deleted, with the backend's reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    pub key: String,
    pub message: String,
}

/// Blocking access to named buckets
pub trait ObjectStorage {
    /// Keys under `prefix`, in backend order
    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Delete keys; absent keys count as deleted.
    ///
    /// `Ok` carries the keys that individually failed. `Err` means the
    /// request as a whole did not go through.
    fn delete_objects(&self, bucket: &str, keys: &[String])
        -> Result<Vec<DeleteFailure>, StorageError>;

    /// Create or fully replace an object
    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError>;

    /// Object content, or `None` when the key does not exist
    fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
}
