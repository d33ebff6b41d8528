use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore, PutPayload};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use url::Url;

use super::{DeleteFailure, ObjectStorage};
use crate::common::errors::StorageError;

/// Where buckets live, parsed from a storage DSN
#[derive(Debug, Clone, PartialEq, Eq)]
enum Backend {
    /// One in-memory store per bucket, alive as long as the gateway
    Memory,
    /// Each bucket is a subdirectory of this root
    Local(PathBuf),
    /// S3 or an S3-compatible endpoint; credentials and region come from the environment
    S3 { endpoint: Option<String> },
}

/// [`ObjectStorage`] on top of the `object_store` crate.
///
/// Owns a current-thread tokio runtime and blocks on each call.
pub struct ObjectStoreGateway {
    runtime: tokio::runtime::Runtime,
    backend: Backend,
    stores: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl std::fmt::Debug for ObjectStoreGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreGateway")
            .field("backend", &self.backend)
            .finish()
    }
}

impl ObjectStoreGateway {
    /// Build a gateway from a DSN.
    ///
    /// Supported: `memory://`, `file:///path/to/root`,
    /// `s3://s3.amazonaws.com` and `s3://host[:port]` for S3-compatible
    /// services.
    pub fn from_dsn(dsn: &str) -> Result<Self, StorageError> {
        let backend = parse_dsn(dsn)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StorageError::Config {
                message: format!("failed to start storage runtime: {}", e),
            })?;
        Ok(Self {
            runtime,
            backend,
            stores: Mutex::new(HashMap::new()),
        })
    }

    fn store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, StorageError> {
        let mut stores = self.stores.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(store) = stores.get(bucket) {
            return Ok(Arc::clone(store));
        }

        let backend_error = |message: String| StorageError::Backend {
            bucket: bucket.to_string(),
            message,
        };
        let store: Arc<dyn ObjectStore> = match &self.backend {
            Backend::Memory => Arc::new(InMemory::new()),
            Backend::Local(root) => {
                let dir = root.join(bucket);
                std::fs::create_dir_all(&dir).map_err(|e| backend_error(e.to_string()))?;
                Arc::new(
                    LocalFileSystem::new_with_prefix(&dir)
                        .map_err(|e| backend_error(e.to_string()))?,
                )
            }
            Backend::S3 { endpoint } => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                if let Some(endpoint) = endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"))
                        .with_virtual_hosted_style_request(false);
                }
                Arc::new(builder.build().map_err(|e| backend_error(e.to_string()))?)
            }
        };

        stores.insert(bucket.to_string(), Arc::clone(&store));
        Ok(store)
    }
}

fn parse_dsn(dsn: &str) -> Result<Backend, StorageError> {
    let config_error = |message: String| StorageError::Config { message };
    let url = Url::parse(dsn).map_err(|e| config_error(format!("invalid DSN '{}': {}", dsn, e)))?;

    match url.scheme() {
        "memory" => Ok(Backend::Memory),
        "file" => {
            let path = url.path();
            if path.is_empty() || path == "/" {
                return Err(config_error(
                    "file DSN must name a directory: file:///path/to/storage".to_string(),
                ));
            }
            Ok(Backend::Local(PathBuf::from(path)))
        }
        "s3" => {
            let host = url
                .host_str()
                .ok_or_else(|| config_error(format!("missing host in DSN '{}'", dsn)))?;
            if host.ends_with("amazonaws.com") {
                return Ok(Backend::S3 { endpoint: None });
            }
            let scheme = if url.port() == Some(443) { "https" } else { "http" };
            let endpoint = match url.port() {
                Some(p) => format!("{}://{}:{}", scheme, host, p),
                None => format!("{}://{}", scheme, host),
            };
            Ok(Backend::S3 {
                endpoint: Some(endpoint),
            })
        }
        other => Err(config_error(format!(
            "unsupported storage scheme '{}' (expected memory, file or s3)",
            other
        ))),
    }
}

fn object_path(bucket: &str, key: &str) -> Result<ObjectPath, StorageError> {
    ObjectPath::parse(key).map_err(|e| StorageError::Backend {
        bucket: bucket.to_string(),
        message: format!("invalid key '{}': {}", key, e),
    })
}

fn backend_error(bucket: &str, err: object_store::Error) -> StorageError {
    StorageError::Backend {
        bucket: bucket.to_string(),
        message: err.to_string(),
    }
}

impl ObjectStorage for ObjectStoreGateway {
    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let store = self.store(bucket)?;
        let trimmed = prefix.trim_end_matches('/');
        let list_prefix = if trimmed.is_empty() {
            None
        } else {
            Some(object_path(bucket, trimmed)?)
        };

        let metas: Vec<ObjectMeta> = self
            .runtime
            .block_on(async { store.list(list_prefix.as_ref()).try_collect().await })
            .map_err(|e| backend_error(bucket, e))?;

        Ok(metas
            .into_iter()
            .map(|m| m.location.to_string())
            .filter(|k| k.starts_with(prefix))
            .collect())
    }

    fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<Vec<DeleteFailure>, StorageError> {
        let store = self.store(bucket)?;
        let mut failures = Vec::new();

        for key in keys {
            let location = match object_path(bucket, key) {
                Ok(p) => p,
                Err(e) => {
                    failures.push(DeleteFailure {
                        key: key.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            match self.runtime.block_on(store.delete(&location)) {
                Ok(()) | Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => failures.push(DeleteFailure {
                    key: key.clone(),
                    message: e.to_string(),
                }),
            }
        }

        Ok(failures)
    }

    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError> {
        let store = self.store(bucket)?;
        let location = object_path(bucket, key)?;
        let payload = PutPayload::from(body.to_vec());
        self.runtime
            .block_on(store.put(&location, payload))
            .map(|_| ())
            .map_err(|e| backend_error(bucket, e))
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let store = self.store(bucket)?;
        let location = object_path(bucket, key)?;
        self.runtime.block_on(async {
            match store.get(&location).await {
                Ok(result) => result
                    .bytes()
                    .await
                    .map(|b| Some(b.to_vec()))
                    .map_err(|e| backend_error(bucket, e)),
                Err(object_store::Error::NotFound { .. }) => Ok(None),
                Err(e) => Err(backend_error(bucket, e)),
            }
        })
    }
}
