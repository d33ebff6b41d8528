use serde::Serialize;
use std::fmt;

use crate::common::errors::InputError;

/// Release identity, `{product}-{version}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProductKey(String);

impl ProductKey {
    pub fn new(product: &str, version: &str) -> Result<Self, InputError> {
        check_part("product", product)?;
        check_part("version", version)?;
        Ok(Self(format!("{}-{}", product.trim(), version.trim())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn check_part(what: &str, value: &str) -> Result<(), InputError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InputError::InvalidIdentity {
            message: format!("{} must not be empty", what),
        });
    }
    if value.contains('/') || value.contains('\\') || value.chars().any(char::is_whitespace) {
        return Err(InputError::InvalidIdentity {
            message: format!("{} '{}' contains a separator or whitespace", what, value),
        });
    }
    Ok(())
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProductKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A named destination: bucket, key prefix and optional CDN distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub name: String,
    pub bucket: String,
    /// Key prefix without leading or trailing `/`; empty means bucket root
    pub prefix: String,
    pub distribution_id: Option<String>,
}

impl Target {
    pub fn new(name: &str, bucket: &str, prefix: &str, distribution_id: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
            distribution_id: distribution_id.filter(|d| !d.trim().is_empty()),
        }
    }
}
