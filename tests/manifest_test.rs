use tempfile::TempDir;

use unpublish::manifest::{self, RemoteManifests};
use unpublish::storage::{MemoryStorage, RetryPolicy};

#[test]
fn test_write_read_round_trip() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let root_str = root.to_string_lossy().to_string();
    let paths = vec![
        format!("{}/org/acme/widget/1.0/widget-1.0.jar", root_str),
        "/org/acme/widget/1.0/widget-1.0.pom".to_string(),
        "org/acme/widget/1.0/widget-1.0.jar.sha1".to_string(),
    ];

    let (name, path) = manifest::write_manifest(&paths, root, "widget-1.0").unwrap();
    assert_eq!(name, "widget-1.0.txt");
    assert_eq!(path, root.join("widget-1.0.txt"));

    assert_eq!(
        manifest::read_manifest(&path).unwrap(),
        vec![
            "org/acme/widget/1.0/widget-1.0.jar",
            "org/acme/widget/1.0/widget-1.0.pom",
            "org/acme/widget/1.0/widget-1.0.jar.sha1",
        ]
    );
}

#[test]
fn test_write_replaces_previous_record() {
    let dir = TempDir::new().unwrap();
    manifest::write_manifest(&["a.jar", "b.jar", "c.jar"], dir.path(), "widget-1.0").unwrap();
    let (_, path) = manifest::write_manifest(&["b.jar"], dir.path(), "widget-1.0").unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "b.jar\n");
}

#[test]
fn test_writer_keeps_duplicates_and_order() {
    let dir = TempDir::new().unwrap();
    let (_, path) =
        manifest::write_manifest(&["z.jar", "a.jar", "z.jar"], dir.path(), "widget-1.0").unwrap();
    assert_eq!(
        manifest::read_manifest(&path).unwrap(),
        vec!["z.jar", "a.jar", "z.jar"]
    );
}

#[test]
fn test_empty_record() {
    let dir = TempDir::new().unwrap();
    let (_, path) = manifest::write_manifest::<&str>(&[], dir.path(), "widget-1.0").unwrap();
    assert!(manifest::read_manifest(&path).unwrap().is_empty());
}

#[test]
fn test_remote_records_are_per_target() {
    let dir = TempDir::new().unwrap();
    let (_, local) = manifest::write_manifest(&["a.jar"], dir.path(), "widget-1.0").unwrap();

    let storage = MemoryStorage::new();
    let remote = RemoteManifests::new(&storage, "manifests", RetryPolicy::none());
    remote.publish("ga", "widget-1.0", &local).unwrap();

    assert_eq!(
        remote.fetch("ga", "widget-1.0").unwrap(),
        Some(vec!["a.jar".to_string()])
    );
    assert_eq!(remote.fetch("ea", "widget-1.0").unwrap(), None);
    assert!(storage.contains("manifests", "ga/widget-1.0.txt"));
}

#[test]
fn test_remote_fetch_surfaces_backend_failure() {
    let storage = MemoryStorage::new();
    storage.fail_bucket("manifests");
    let remote = RemoteManifests::new(&storage, "manifests", RetryPolicy::none());
    assert!(remote.fetch("ga", "widget-1.0").is_err());
}
