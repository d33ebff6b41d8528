use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::archive::classify::{ArchiveKind, NPM_PACKAGE_MANIFEST};
use crate::checksum;
use crate::common::errors::{InputError, RollbackError};

/// Ordered exclusion patterns for maven candidates
#[derive(Debug, Clone, Default)]
pub struct IgnorePatternSet {
    patterns: Vec<Regex>,
}

impl IgnorePatternSet {
    /// Compile patterns, failing on the first invalid one
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, InputError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| InputError::InvalidPattern {
                    pattern: p.as_ref().to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// True if any pattern matches somewhere in `path`
    pub fn is_ignored(&self, path: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(path))
    }
}

/// One repository path a release would remove
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedFile {
    /// Repository-relative path, `/`-separated
    pub path: String,
    /// Local copy of the file, when the archive holds one
    #[serde(skip)]
    pub local: Option<PathBuf>,
    /// SHA-1 of the local copy, filled in by the checksum gate
    pub sha1: Option<String>,
}

impl PlannedFile {
    fn new(path: String, local: Option<PathBuf>) -> Self {
        Self {
            path,
            local,
            sha1: None,
        }
    }
}

/// A candidate dropped because it could not be hashed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumFailure {
    pub path: String,
    pub message: String,
}

/// How candidates are derived; one variant per recognized layout
#[derive(Debug, Clone)]
pub enum PlanStrategy {
    Maven {
        root_prefix: String,
        ignore: IgnorePatternSet,
    },
    Npm,
}

impl PlanStrategy {
    /// Pick the strategy for an archive layout; `None` for unrecognized archives
    pub fn select(kind: ArchiveKind, root_prefix: &str, ignore: IgnorePatternSet) -> Option<Self> {
        match kind {
            ArchiveKind::MavenLayout => Some(PlanStrategy::Maven {
                root_prefix: root_prefix.trim_matches('/').to_string(),
                ignore,
            }),
            ArchiveKind::NpmPackage => Some(PlanStrategy::Npm),
            ArchiveKind::NotArchive => None,
        }
    }

    /// Candidate paths from an extracted archive
    pub fn candidates(
        &self,
        extracted: &Path,
        archive_path: &Path,
    ) -> Result<Vec<PlannedFile>, RollbackError> {
        match self {
            PlanStrategy::Maven {
                root_prefix,
                ignore,
            } => maven_candidates(extracted, root_prefix, ignore),
            PlanStrategy::Npm => npm_candidates(extracted, archive_path),
        }
    }
}

/// Locate `root_prefix` in the extracted tree, looking one level down when
/// the archive wraps everything in a single directory
pub fn find_root(extracted: &Path, root_prefix: &str) -> Option<PathBuf> {
    let direct = extracted.join(root_prefix);
    if direct.is_dir() {
        return Some(direct);
    }

    let subdirs: Vec<PathBuf> = std::fs::read_dir(extracted)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    if subdirs.len() == 1 {
        let nested = subdirs[0].join(root_prefix);
        if nested.is_dir() {
            return Some(nested);
        }
    }
    None
}

fn maven_candidates(
    extracted: &Path,
    root_prefix: &str,
    ignore: &IgnorePatternSet,
) -> Result<Vec<PlannedFile>, RollbackError> {
    let Some(root) = find_root(extracted, root_prefix) else {
        tracing::warn!(
            "Root path '{}' not found in archive; no candidates derived",
            root_prefix
        );
        return Ok(Vec::new());
    };
    tracing::debug!("Maven root is {}", root.display());

    let mut candidates = Vec::new();
    let mut ignored = 0usize;
    for entry in WalkDir::new(&root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| RollbackError::Unexpected {
            message: format!("walking {}: {}", root.display(), e),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(&root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if ignore.is_ignored(&relative) {
            tracing::debug!("Ignored by pattern: {}", relative);
            ignored += 1;
            continue;
        }
        candidates.push(PlannedFile::new(relative, Some(entry.path().to_path_buf())));
    }

    tracing::info!(
        "Maven plan: {} candidates, {} ignored",
        candidates.len(),
        ignored
    );
    Ok(candidates)
}

#[derive(Debug, Deserialize)]
struct NpmPackageJson {
    name: String,
    version: String,
}

/// Locate the package's own `package.json`
fn find_package_json(extracted: &Path) -> Option<PathBuf> {
    let direct = extracted.join(NPM_PACKAGE_MANIFEST);
    if direct.is_file() {
        return Some(direct);
    }
    let subdirs: Vec<PathBuf> = std::fs::read_dir(extracted)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    match subdirs.as_slice() {
        [only] if only.join(NPM_PACKAGE_MANIFEST).is_file() => {
            Some(only.join(NPM_PACKAGE_MANIFEST))
        }
        _ => None,
    }
}

/// Package-level metadata shared by every version; never deleted
pub fn npm_shared_metadata(name: &str) -> String {
    format!("{}/{}", name, NPM_PACKAGE_MANIFEST)
}

/// Registry tarball path: `{name}/-/{base}-{version}.tgz`, base without scope
pub fn npm_tarball_path(name: &str, version: &str) -> String {
    let base = name.rsplit('/').next().unwrap_or(name);
    format!("{}/-/{}-{}.tgz", name, base, version)
}

/// Version-level metadata path: `{name}/{version}/package.json`
pub fn npm_version_metadata_path(name: &str, version: &str) -> String {
    format!("{}/{}/{}", name, version, NPM_PACKAGE_MANIFEST)
}

fn npm_candidates(extracted: &Path, archive_path: &Path) -> Result<Vec<PlannedFile>, RollbackError> {
    let package_json = find_package_json(extracted).ok_or_else(|| InputError::Unreadable {
        path: archive_path.to_path_buf(),
        message: "package.json missing after extraction".to_string(),
    })?;
    let text = std::fs::read_to_string(&package_json)
        .map_err(|e| RollbackError::io(&package_json, e))?;
    let package: NpmPackageJson =
        serde_json::from_str(&text).map_err(|e| InputError::Unreadable {
            path: package_json.clone(),
            message: format!("invalid package.json: {}", e),
        })?;
    if package.name.trim().is_empty() || package.version.trim().is_empty() {
        return Err(InputError::InvalidIdentity {
            message: "package.json lacks a name or version".to_string(),
        }
        .into());
    }

    let shared = npm_shared_metadata(&package.name);
    let candidates: Vec<PlannedFile> = [
        PlannedFile::new(
            npm_tarball_path(&package.name, &package.version),
            Some(archive_path.to_path_buf()),
        ),
        PlannedFile::new(
            npm_version_metadata_path(&package.name, &package.version),
            None,
        ),
    ]
    .into_iter()
    .filter(|c| c.path != shared)
    .collect();

    tracing::info!(
        "npm plan for {}@{}: {} candidates",
        package.name,
        package.version,
        candidates.len()
    );
    Ok(candidates)
}

/// Hash every candidate that has a local copy. Candidates that fail are
/// dropped and reported; the rest carry their SHA-1.
pub fn gate_checksums(candidates: Vec<PlannedFile>) -> (Vec<PlannedFile>, Vec<ChecksumFailure>) {
    let locals: Vec<PathBuf> = candidates.iter().filter_map(|c| c.local.clone()).collect();
    let mut digests = checksum::resolve_sha1_all(&locals).into_iter();

    let mut kept = Vec::with_capacity(candidates.len());
    let mut failures = Vec::new();
    for mut candidate in candidates {
        if candidate.local.is_none() {
            kept.push(candidate);
            continue;
        }
        match digests.next() {
            Some(Ok(hex)) => {
                candidate.sha1 = Some(hex);
                kept.push(candidate);
            }
            Some(Err(e)) => {
                tracing::warn!("Skipping {}: {}", candidate.path, e);
                failures.push(ChecksumFailure {
                    path: candidate.path,
                    message: e.to_string(),
                });
            }
            None => kept.push(candidate),
        }
    }
    (kept, failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignore_patterns_search_semantics() {
        let set = IgnorePatternSet::compile(&[r"\.index$", "^org/skip/"]).unwrap();
        assert!(set.is_ignored("org/foo/1.0/foo.index"));
        assert!(set.is_ignored("org/skip/1.0/a.jar"));
        assert!(!set.is_ignored("org/foo/1.0/foo.jar"));
    }

    #[test]
    fn test_invalid_pattern_is_input_error() {
        let err = IgnorePatternSet::compile(&["("]).unwrap_err();
        assert!(matches!(err, InputError::InvalidPattern { .. }));
    }

    #[test]
    fn test_npm_paths() {
        assert_eq!(npm_tarball_path("left-pad", "1.3.0"), "left-pad/-/left-pad-1.3.0.tgz");
        assert_eq!(
            npm_tarball_path("@scope/pkg", "2.0.0"),
            "@scope/pkg/-/pkg-2.0.0.tgz"
        );
        assert_eq!(
            npm_version_metadata_path("@scope/pkg", "2.0.0"),
            "@scope/pkg/2.0.0/package.json"
        );
    }

    #[test]
    fn test_select_strategy() {
        assert!(PlanStrategy::select(ArchiveKind::NotArchive, "r", IgnorePatternSet::default())
            .is_none());
        assert!(matches!(
            PlanStrategy::select(ArchiveKind::NpmPackage, "r", IgnorePatternSet::default()),
            Some(PlanStrategy::Npm)
        ));
    }

    #[test]
    fn test_maven_candidates_sorted_and_filtered() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().join("maven-repository/org/foo/1.0");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("foo-1.0.pom"), "pom").unwrap();
        std::fs::write(root.join("foo-1.0.jar"), "jar").unwrap();
        std::fs::write(root.join("foo-1.0.jar.index"), "idx").unwrap();

        let strategy = PlanStrategy::select(
            ArchiveKind::MavenLayout,
            "maven-repository",
            IgnorePatternSet::compile(&[r"\.index$"]).unwrap(),
        )
        .unwrap();
        let candidates = strategy.candidates(dir.path(), Path::new("unused.zip")).unwrap();
        let paths: Vec<&str> = candidates.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["org/foo/1.0/foo-1.0.jar", "org/foo/1.0/foo-1.0.pom"]);
    }

    #[test]
    fn test_gate_drops_vanished_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let present = dir.path().join("a.jar");
        std::fs::write(&present, "a").unwrap();
        let candidates = vec![
            PlannedFile::new("a.jar".into(), Some(present)),
            PlannedFile::new("gone.jar".into(), Some(dir.path().join("gone.jar"))),
            PlannedFile::new("meta".into(), None),
        ];

        let (kept, failures) = gate_checksums(candidates);
        assert_eq!(kept.len(), 2);
        assert!(kept[0].sha1.is_some());
        assert!(kept[1].sha1.is_none());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path, "gone.jar");
    }
}
