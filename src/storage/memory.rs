use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use super::{DeleteFailure, ObjectStorage};
use crate::common::errors::StorageError;

/// One recorded call against [`MemoryStorage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    List { bucket: String, prefix: String },
    Delete { bucket: String, keys: Vec<String> },
    Put { bucket: String, key: String },
    Get { bucket: String, key: String },
}

impl StorageCall {
    /// Deletes and puts change remote state; lists and gets don't
    pub fn is_mutating(&self) -> bool {
        matches!(self, StorageCall::Delete { .. } | StorageCall::Put { .. })
    }
}

#[derive(Debug, Default)]
struct State {
    buckets: HashMap<String, BTreeMap<String, Vec<u8>>>,
    failing_buckets: HashSet<String>,
    failing_keys: HashSet<String>,
    calls: Vec<StorageCall>,
}

/// In-process object storage.
///
/// Backs `memory://` profiles and doubles as a test fixture: every call is
/// journaled, and buckets or single keys can be made to fail.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<State>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without journaling the call
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        let mut state = self.lock();
        state
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body.into());
    }

    /// Does the object exist (not journaled)
    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.lock()
            .buckets
            .get(bucket)
            .map(|b| b.contains_key(key))
            .unwrap_or(false)
    }

    /// Object content (not journaled)
    pub fn read(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock()
            .buckets
            .get(bucket)
            .and_then(|b| b.get(key).cloned())
    }

    /// All keys of a bucket, sorted (not journaled)
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .buckets
            .get(bucket)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Make every call against `bucket` fail
    pub fn fail_bucket(&self, bucket: &str) {
        self.lock().failing_buckets.insert(bucket.to_string());
    }

    /// Make deletion of a single key fail
    pub fn fail_key(&self, key: &str) {
        self.lock().failing_keys.insert(key.to_string());
    }

    pub fn calls(&self) -> Vec<StorageCall> {
        self.lock().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<StorageCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_mutating())
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panic while holding the lock leaves plain data behind; keep going
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_bucket(state: &State, bucket: &str) -> Result<(), StorageError> {
        if state.failing_buckets.contains(bucket) {
            return Err(StorageError::Backend {
                bucket: bucket.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

impl ObjectStorage for MemoryStorage {
    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut state = self.lock();
        state.calls.push(StorageCall::List {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        });
        Self::check_bucket(&state, bucket)?;
        Ok(state
            .buckets
            .get(bucket)
            .map(|b| {
                b.keys()
                    .filter(|k| k.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<Vec<DeleteFailure>, StorageError> {
        let mut state = self.lock();
        state.calls.push(StorageCall::Delete {
            bucket: bucket.to_string(),
            keys: keys.to_vec(),
        });
        Self::check_bucket(&state, bucket)?;

        let mut failures = Vec::new();
        for key in keys {
            if state.failing_keys.contains(key) {
                failures.push(DeleteFailure {
                    key: key.clone(),
                    message: "injected failure".to_string(),
                });
                continue;
            }
            if let Some(b) = state.buckets.get_mut(bucket) {
                b.remove(key);
            }
        }
        Ok(failures)
    }

    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError> {
        let mut state = self.lock();
        state.calls.push(StorageCall::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        Self::check_bucket(&state, bucket)?;
        state
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body.to_vec());
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let mut state = self.lock();
        state.calls.push(StorageCall::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        Self::check_bucket(&state, bucket)?;
        Ok(state.buckets.get(bucket).and_then(|b| b.get(key).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let storage = MemoryStorage::new();
        storage.put_object("b", "k", b"v").unwrap();
        assert_eq!(storage.get_object("b", "k").unwrap(), Some(b"v".to_vec()));

        let failures = storage.delete_objects("b", &["k".to_string()]).unwrap();
        assert!(failures.is_empty());
        assert_eq!(storage.get_object("b", "k").unwrap(), None);
    }

    #[test]
    fn test_deleting_missing_key_succeeds() {
        let storage = MemoryStorage::new();
        let failures = storage.delete_objects("b", &["nope".to_string()]).unwrap();
        assert!(failures.is_empty());
    }

    #[test]
    fn test_list_by_prefix() {
        let storage = MemoryStorage::new();
        storage.insert("b", "ga/a", "1");
        storage.insert("b", "ga/b", "2");
        storage.insert("b", "ea/c", "3");
        assert_eq!(storage.list_objects("b", "ga/").unwrap(), vec!["ga/a", "ga/b"]);
    }

    #[test]
    fn test_failing_bucket_and_key() {
        let storage = MemoryStorage::new();
        storage.fail_bucket("bad");
        assert!(storage.put_object("bad", "k", b"v").is_err());

        storage.insert("good", "a", "1");
        storage.insert("good", "b", "2");
        storage.fail_key("b");
        let failures = storage
            .delete_objects("good", &["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].key, "b");
        assert!(storage.contains("good", "b"));
    }

    #[test]
    fn test_journal_separates_mutations() {
        let storage = MemoryStorage::new();
        storage.get_object("b", "k").unwrap();
        storage.list_objects("b", "").unwrap();
        assert!(storage.mutating_calls().is_empty());
        storage.put_object("b", "k", b"v").unwrap();
        assert_eq!(storage.mutating_calls().len(), 1);
        assert_eq!(storage.calls().len(), 3);
    }
}
