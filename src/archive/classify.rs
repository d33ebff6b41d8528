use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::{detect_format, ContainerFormat};
use crate::common::errors::InputError;

/// Name of the npm package manifest
pub const NPM_PACKAGE_MANIFEST: &str = "package.json";

/// Minimum number of directories above a file in a maven tree:
/// root prefix, group, artifact, version
const MIN_MAVEN_DIR_DEPTH: usize = 4;

/// Release layout found inside an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveKind {
    /// A readable container with neither an npm manifest nor a maven tree
    NotArchive,
    /// An npm package (`package.json` at the root)
    NpmPackage,
    /// A maven repository tree
    MavenLayout,
}

impl std::fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveKind::NotArchive => write!(f, "unrecognized"),
            ArchiveKind::NpmPackage => write!(f, "npm"),
            ArchiveKind::MavenLayout => write!(f, "maven"),
        }
    }
}

/// One entry name as listed by the container, without its content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryName {
    pub path: String,
    pub is_dir: bool,
}

/// Classify an archive by listing its entries
pub fn classify(path: &Path) -> Result<ArchiveKind, InputError> {
    let format = detect_format(path)?;
    let entries = list_entries(path, format)?;
    if entries.is_empty() {
        return Err(InputError::EmptyArchive {
            path: path.to_path_buf(),
        });
    }
    Ok(classify_entries(&entries))
}

/// Decide the layout from entry names alone
pub fn classify_entries(entries: &[EntryName]) -> ArchiveKind {
    let top_level: BTreeSet<&str> = entries
        .iter()
        .filter_map(|e| e.path.split('/').next())
        .filter(|s| !s.is_empty())
        .collect();
    let wrapper = match top_level.len() {
        1 => top_level.iter().next().copied(),
        _ => None,
    };

    let has_npm_manifest = entries.iter().filter(|e| !e.is_dir).any(|e| {
        e.path == NPM_PACKAGE_MANIFEST
            || wrapper
                .map(|w| e.path == format!("{}/{}", w, NPM_PACKAGE_MANIFEST))
                .unwrap_or(false)
    });
    if has_npm_manifest {
        return ArchiveKind::NpmPackage;
    }

    let has_gav_tree = entries
        .iter()
        .filter(|e| !e.is_dir)
        .any(|e| directory_depth(&e.path) >= MIN_MAVEN_DIR_DEPTH);
    if has_gav_tree {
        return ArchiveKind::MavenLayout;
    }

    ArchiveKind::NotArchive
}

/// Number of directories above a file entry
fn directory_depth(path: &str) -> usize {
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .count()
        .saturating_sub(1)
}

/// List entry names of a zip or tar container
pub fn list_entries(path: &Path, format: ContainerFormat) -> Result<Vec<EntryName>, InputError> {
    let unreadable = |message: String| InputError::Unreadable {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path).map_err(|e| unreadable(e.to_string()))?;
    let mut entries = Vec::new();

    match format {
        ContainerFormat::Zip => {
            let archive =
                zip::ZipArchive::new(BufReader::new(file)).map_err(|e| unreadable(e.to_string()))?;
            for name in archive.file_names() {
                entries.push(entry_name(name, name.ends_with('/')));
            }
        }
        ContainerFormat::Tar => {
            list_tar(BufReader::new(file), &mut entries).map_err(|e| unreadable(e.to_string()))?;
        }
        ContainerFormat::TarGz => {
            let decoder = flate2::read::GzDecoder::new(BufReader::new(file));
            list_tar(decoder, &mut entries).map_err(|e| unreadable(e.to_string()))?;
        }
    }

    Ok(entries)
}

fn list_tar<R: Read>(reader: R, entries: &mut Vec<EntryName>) -> std::io::Result<()> {
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        let entry = entry?;
        let is_dir = entry.header().entry_type().is_dir();
        let name = entry.path()?.to_string_lossy().into_owned();
        entries.push(entry_name(&name, is_dir));
    }
    Ok(())
}

fn entry_name(raw: &str, is_dir: bool) -> EntryName {
    let trimmed = raw.trim_start_matches("./").trim_end_matches('/');
    EntryName {
        path: trimmed.to_string(),
        is_dir,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> EntryName {
        EntryName {
            path: path.to_string(),
            is_dir: false,
        }
    }

    fn dir(path: &str) -> EntryName {
        EntryName {
            path: path.to_string(),
            is_dir: true,
        }
    }

    #[test]
    fn test_npm_manifest_at_root() {
        let entries = vec![file("package.json"), file("index.js")];
        assert_eq!(classify_entries(&entries), ArchiveKind::NpmPackage);
    }

    #[test]
    fn test_npm_manifest_in_wrapper_dir() {
        let entries = vec![dir("package"), file("package/package.json"), file("package/lib/a.js")];
        assert_eq!(classify_entries(&entries), ArchiveKind::NpmPackage);
    }

    #[test]
    fn test_nested_package_json_is_not_npm_root() {
        let entries = vec![
            file("maven-repository/org/foo/1.0/foo-1.0.jar"),
            file("maven-repository/org/foo/1.0/package.json"),
        ];
        assert_eq!(classify_entries(&entries), ArchiveKind::MavenLayout);
    }

    #[test]
    fn test_maven_tree() {
        let entries = vec![
            dir("maven-repository"),
            file("maven-repository/org/apache/foo/1.0/foo-1.0.pom"),
        ];
        assert_eq!(classify_entries(&entries), ArchiveKind::MavenLayout);
    }

    #[test]
    fn test_flat_archive_is_unrecognized() {
        let entries = vec![file("README.md"), file("docs/guide.txt")];
        assert_eq!(classify_entries(&entries), ArchiveKind::NotArchive);
    }

    #[test]
    fn test_three_directory_levels_is_unrecognized() {
        let entries = vec![file("docs/a/b/readme.txt")];
        assert_eq!(classify_entries(&entries), ArchiveKind::NotArchive);
        assert_eq!(
            classify_entries(&[file("docs/a/b/c/readme.txt")]),
            ArchiveKind::MavenLayout
        );
    }

    #[test]
    fn test_entry_name_normalized() {
        assert_eq!(entry_name("./package/", true).path, "package");
    }
}
