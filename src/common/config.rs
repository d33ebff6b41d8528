use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::errors::InputError;
use crate::rollback::target::Target;

/// Environment variable naming an alternative config file
pub const CONFIG_ENV: &str = "UNPUBLISH_CONFIG";

/// Environment variable that overrides the configured storage profile
pub const PROFILE_ENV: &str = "AWS_PROFILE";

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bucket holding per-target release manifests
    #[serde(default)]
    pub manifest_bucket: Option<String>,

    /// Ignore patterns used when none are given on the command line
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Storage profile used when `AWS_PROFILE` is unset
    #[serde(default = "default_profile")]
    pub aws_profile: String,

    /// Invalidate CDN paths after deletion
    #[serde(default)]
    pub cdn_enabled: bool,

    /// Compare local sha1 with the remote sidecar before deleting
    #[serde(default)]
    pub verify_checksums: bool,

    /// Named deletion targets
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,

    /// Storage profiles, keyed by profile name
    #[serde(default)]
    pub profiles: BTreeMap<String, StorageProfile>,

    #[serde(default)]
    pub cdn: CdnConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetConfig {
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub distribution_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageProfile {
    /// `s3://host`, `file:///path` or `memory://`
    pub dsn: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CdnConfig {
    /// Invalidation endpoint; invalidations are only logged when unset
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_profile() -> String {
    "default".to_string()
}
fn default_max_attempts() -> u32 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest_bucket: None,
            ignore_patterns: Vec::new(),
            aws_profile: default_profile(),
            cdn_enabled: false,
            verify_checksums: false,
            targets: BTreeMap::new(),
            profiles: BTreeMap::new(),
            cdn: CdnConfig::default(),
        }
    }
}

impl Config {
    /// Get the data directory (~/.unpublish)
    pub fn data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".unpublish")
    }

    /// Get the config file path, honouring `UNPUBLISH_CONFIG`
    pub fn config_path() -> PathBuf {
        match std::env::var_os(CONFIG_ENV) {
            Some(p) if !p.is_empty() => PathBuf::from(p),
            _ => Self::data_dir().join("config.toml"),
        }
    }

    /// Get the logs directory
    pub fn logs_dir() -> PathBuf {
        Self::data_dir().join("logs")
    }

    /// Load config from the default location, or defaults if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from an explicit path, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config dir: {}", dir.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// A starter config written by `config init`
    pub fn example() -> Self {
        let mut config = Config {
            manifest_bucket: Some("release-manifests".into()),
            ignore_patterns: vec![r".*\.index$".into(), r".*/maven-metadata\.xml.*".into()],
            ..Config::default()
        };
        config.targets.insert(
            "ga".into(),
            TargetConfig {
                bucket: "repository-prod".into(),
                prefix: "ga".into(),
                distribution_id: None,
            },
        );
        config.profiles.insert(
            default_profile(),
            StorageProfile {
                dsn: "s3://s3.amazonaws.com".into(),
                max_attempts: default_max_attempts(),
            },
        );
        config
    }

    /// Profile selected for this run: `AWS_PROFILE` wins over the config file
    pub fn effective_profile(&self) -> String {
        std::env::var(PROFILE_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| self.aws_profile.clone())
    }

    /// Look up the storage settings for a profile
    pub fn storage_profile(&self, name: &str) -> Result<&StorageProfile> {
        self.profiles.get(name).with_context(|| {
            format!(
                "Storage profile '{}' is not configured in {}",
                name,
                Self::config_path().display()
            )
        })
    }

    /// Resolve target names into fully-specified targets, keeping the given order
    pub fn resolve_targets(&self, names: &[String]) -> Result<Vec<Target>, InputError> {
        if names.is_empty() {
            return Err(InputError::NoTargets);
        }
        names
            .iter()
            .map(|name| {
                let t = self
                    .targets
                    .get(name)
                    .ok_or_else(|| InputError::UnknownTarget { name: name.clone() })?;
                Ok(Target::new(
                    name,
                    &t.bucket,
                    &t.prefix,
                    t.distribution_id.clone(),
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
manifest_bucket = "manifests"
ignore_patterns = [".*\\.index$"]
cdn_enabled = true

[targets.ga]
bucket = "prod-ga"
prefix = "/ga/"
distribution_id = "E123"

[targets.ea]
bucket = "prod-ea"

[profiles.default]
dsn = "memory://"
"#;

    #[test]
    fn test_parse_sample() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.manifest_bucket.as_deref(), Some("manifests"));
        assert!(config.cdn_enabled);
        assert!(!config.verify_checksums);
        assert_eq!(config.aws_profile, "default");
        assert_eq!(config.profiles["default"].max_attempts, 3);
    }

    #[test]
    fn test_resolve_targets_in_order() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let targets = config
            .resolve_targets(&["ea".to_string(), "ga".to_string()])
            .unwrap();
        assert_eq!(targets[0].name, "ea");
        assert_eq!(targets[0].prefix, "");
        assert_eq!(targets[1].prefix, "ga");
        assert_eq!(targets[1].distribution_id.as_deref(), Some("E123"));
    }

    #[test]
    fn test_unknown_target() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let err = config.resolve_targets(&["nope".to_string()]).unwrap_err();
        assert!(matches!(err, InputError::UnknownTarget { .. }));
    }

    #[test]
    fn test_no_targets() {
        let config = Config::default();
        assert!(matches!(
            config.resolve_targets(&[]),
            Err(InputError::NoTargets)
        ));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/unpublish.toml")).unwrap();
        assert!(config.targets.is_empty());
        assert!(config.manifest_bucket.is_none());
    }

    #[test]
    fn test_example_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::example()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.targets, Config::example().targets);
    }
}
