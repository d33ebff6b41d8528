use std::path::PathBuf;
use tempfile::TempDir;

use unpublish::checksum::{self, HashType};
use unpublish::common::errors::ChecksumError;

const ABC_MD5: &str = "900150983cd24fb0d6963f7d28e17f72";
const ABC_SHA1: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";
const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

fn abc_file(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"abc").unwrap();
    path
}

// ─── digest ──────────────────────────────────────────────────────────────────

#[test]
fn test_digest_known_vectors() {
    let dir = TempDir::new().unwrap();
    let path = abc_file(&dir, "abc.bin");

    assert_eq!(checksum::digest(&path, HashType::Md5).unwrap(), ABC_MD5);
    assert_eq!(checksum::digest(&path, HashType::Sha1).unwrap(), ABC_SHA1);
    assert_eq!(checksum::digest(&path, HashType::Sha256).unwrap(), ABC_SHA256);
}

#[test]
fn test_digest_is_deterministic_across_chunks() {
    let dir = TempDir::new().unwrap();
    // Larger than one read chunk
    let content: Vec<u8> = (0..200_000).map(|i| (i % 251) as u8).collect();
    let a = dir.path().join("a.bin");
    let b = dir.path().join("b.bin");
    std::fs::write(&a, &content).unwrap();
    std::fs::write(&b, &content).unwrap();

    let first = checksum::digest(&a, HashType::Sha256).unwrap();
    assert_eq!(first, checksum::digest(&a, HashType::Sha256).unwrap());
    assert_eq!(first, checksum::digest(&b, HashType::Sha256).unwrap());
}

#[test]
fn test_single_byte_change_changes_every_digest() {
    let dir = TempDir::new().unwrap();
    let mut content: Vec<u8> = (0..200_000).map(|i| (i % 251) as u8).collect();
    let original = dir.path().join("original.bin");
    std::fs::write(&original, &content).unwrap();
    // Past the first read chunk
    content[150_000] ^= 0x01;
    let flipped = dir.path().join("flipped.bin");
    std::fs::write(&flipped, &content).unwrap();

    for algorithm in [HashType::Md5, HashType::Sha1, HashType::Sha256] {
        assert_ne!(
            checksum::digest(&original, algorithm).unwrap(),
            checksum::digest(&flipped, algorithm).unwrap()
        );
    }
}

#[test]
fn test_digest_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = checksum::digest(&dir.path().join("nope.jar"), HashType::Sha1).unwrap_err();
    assert!(matches!(err, ChecksumError::FileNotFound { .. }));
}

#[test]
fn test_digest_named_parses_case_insensitively() {
    let dir = TempDir::new().unwrap();
    let path = abc_file(&dir, "abc.bin");
    assert_eq!(checksum::digest_named(&path, "SHA1").unwrap(), ABC_SHA1);

    let err = checksum::digest_named(&path, "crc32").unwrap_err();
    assert!(matches!(err, ChecksumError::UnsupportedAlgorithm { .. }));
}

// ─── resolve_sha1 ────────────────────────────────────────────────────────────

#[test]
fn test_resolve_sha1_trusts_sidecar() {
    let dir = TempDir::new().unwrap();
    let jar = abc_file(&dir, "widget-1.0.jar");
    std::fs::write(dir.path().join("widget-1.0.jar.sha1"), "  deadbeef\n").unwrap();

    assert_eq!(checksum::resolve_sha1(&jar).unwrap(), "deadbeef");
}

#[test]
fn test_resolve_sha1_computes_without_sidecar() {
    let dir = TempDir::new().unwrap();
    let jar = abc_file(&dir, "widget-1.0.jar");
    assert_eq!(checksum::resolve_sha1(&jar).unwrap(), ABC_SHA1);
}

#[test]
fn test_hash_file_never_uses_its_own_sidecar() {
    let dir = TempDir::new().unwrap();
    let sha1_file = abc_file(&dir, "widget-1.0.jar.sha1");
    std::fs::write(dir.path().join("widget-1.0.jar.sha1.sha1"), "bogus").unwrap();

    assert_eq!(checksum::resolve_sha1(&sha1_file).unwrap(), ABC_SHA1);
}

#[test]
fn test_resolve_sha1_missing_file_even_with_sidecar() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("gone.jar.sha1"), "deadbeef").unwrap();
    let err = checksum::resolve_sha1(&dir.path().join("gone.jar")).unwrap_err();
    assert!(matches!(err, ChecksumError::FileNotFound { .. }));
}

#[test]
fn test_resolve_sha1_all_keeps_input_order() {
    let dir = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for i in 0..20 {
        let path = dir.path().join(format!("f{}.bin", i));
        std::fs::write(&path, format!("content {}", i)).unwrap();
        paths.push(path);
    }
    paths.insert(5, dir.path().join("missing.bin"));

    let results = checksum::resolve_sha1_all(&paths);
    assert_eq!(results.len(), paths.len());
    assert!(results[5].is_err());
    for (path, result) in paths.iter().zip(&results) {
        if path.exists() {
            assert_eq!(
                result.as_ref().unwrap(),
                &checksum::digest(path, HashType::Sha1).unwrap()
            );
        }
    }
}
