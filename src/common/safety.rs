use super::errors::InputError;

/// Maximum number of keys deleted from one target in a single run.
/// A safety limit against a runaway candidate set (e.g. a wrong root prefix
/// that pulls in an entire repository).
pub const MAX_KEYS_PER_TARGET: usize = 100_000;

/// Join a target prefix and a repository-relative path into a storage key
pub fn join_key(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let path = path.trim_start_matches('/');
    if prefix.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", prefix, path)
    }
}

/// Check that a key is safe to hand to a delete call
pub fn validate_key(key: &str) -> Result<(), InputError> {
    let reject = |reason: &str| {
        Err(InputError::UnsafeKey {
            key: key.to_string(),
            reason: reason.to_string(),
        })
    };

    if key.trim().is_empty() {
        return reject("empty key");
    }
    if key.starts_with('/') {
        return reject("absolute key");
    }
    if key.ends_with('/') {
        return reject("key names a directory");
    }
    if key.split('/').any(|segment| segment == ".." || segment == ".") {
        return reject("relative path segment");
    }
    if key.split('/').any(|segment| segment.is_empty()) {
        return reject("empty path segment");
    }

    Ok(())
}

/// Validate every key of a per-target deletion before any call is made
pub fn validate_deletion(keys: &[String]) -> Result<(), InputError> {
    if keys.len() > MAX_KEYS_PER_TARGET {
        return Err(InputError::UnsafeKey {
            key: format!("<{} keys>", keys.len()),
            reason: format!("more than {} keys for one target", MAX_KEYS_PER_TARGET),
        });
    }
    keys.iter().try_for_each(|k| validate_key(k))
}
