mod common;

use tempfile::TempDir;

use unpublish::archive::{self, ArchiveKind, Workspace};
use unpublish::common::errors::InputError;

#[test]
fn test_npm_tarball_with_package_dir() {
    let dir = TempDir::new().unwrap();
    let path = common::npm_tarball(dir.path(), "left-pad", "1.3.0");
    assert_eq!(archive::classify(&path).unwrap(), ArchiveKind::NpmPackage);
}

#[test]
fn test_npm_zip_with_root_manifest() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pkg.zip");
    common::write_zip(
        &path,
        &[
            ("package.json", br#"{"name":"x","version":"1.0.0"}"#.as_slice()),
            ("lib/index.js", b"".as_slice()),
        ],
    );
    assert_eq!(archive::classify(&path).unwrap(), ArchiveKind::NpmPackage);
}

#[test]
fn test_nested_package_json_is_not_npm() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("site.zip");
    common::write_zip(
        &path,
        &[
            ("a/package.json", b"{}".as_slice()),
            ("b/readme.txt", b"".as_slice()),
        ],
    );
    assert_eq!(archive::classify(&path).unwrap(), ArchiveKind::NotArchive);
}

#[test]
fn test_maven_zip() {
    let dir = TempDir::new().unwrap();
    let path = common::widget_zip(dir.path());
    assert_eq!(archive::classify(&path).unwrap(), ArchiveKind::MavenLayout);
}

#[test]
fn test_maven_plain_tar() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("repo.tar");
    common::write_tar(
        &path,
        &[("maven-repository/org/acme/widget/1.0/widget-1.0.jar", b"jar".as_slice())],
    );
    assert_eq!(archive::classify(&path).unwrap(), ArchiveKind::MavenLayout);
}

#[test]
fn test_shallow_zip_is_not_archive() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("docs.zip");
    common::write_zip(&path, &[("docs/readme.txt", b"hello".as_slice())]);
    assert_eq!(archive::classify(&path).unwrap(), ArchiveKind::NotArchive);
}

#[test]
fn test_three_level_tree_is_not_archive() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("docs.zip");
    common::write_zip(&path, &[("docs/a/b/readme.txt", b"hello".as_slice())]);
    assert_eq!(archive::classify(&path).unwrap(), ArchiveKind::NotArchive);
}

#[test]
fn test_empty_zip_is_input_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.zip");
    common::write_zip(&path, &[]);
    assert!(matches!(
        archive::classify(&path),
        Err(InputError::EmptyArchive { .. })
    ));
}

#[test]
fn test_non_container_is_input_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.zip");
    std::fs::write(&path, "just some text, not an archive").unwrap();
    assert!(matches!(
        archive::classify(&path),
        Err(InputError::NotContainer { .. })
    ));
}

#[test]
fn test_missing_archive_is_input_error() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        archive::classify(&dir.path().join("absent.zip")),
        Err(InputError::ArchiveNotFound { .. })
    ));
}

#[test]
fn test_extract_into_workspace_then_cleanup() {
    let dir = TempDir::new().unwrap();
    let path = common::widget_zip(dir.path());

    let workspace_path = {
        let workspace = Workspace::create(Some(dir.path()), false).unwrap();
        let files = archive::extract(&path, workspace.path()).unwrap();
        assert_eq!(files.len(), 3);
        assert!(workspace
            .path()
            .join("maven-repository/org/acme/widget/1.0/widget-1.0.pom")
            .is_file());
        workspace.path().to_path_buf()
    };
    assert!(!workspace_path.exists());
}
