//! # unpublish
//!
//! Rolls a published release back out of an artifact repository hosted on
//! object storage.
//!
//! Given the release archive (a maven repository zip or an npm package
//! tarball) and the release identity, unpublish works out which objects the
//! release owns and deletes them at every requested target:
//!
//! - **Archive classification**: npm package or maven layout, from entry names alone
//! - **Checksums**: streamed MD5/SHA-1/SHA-256, trusting `.sha1` sidecars
//! - **Release manifests**: the recorded path set wins over the archive
//! - **Multi-target deletion**: dry run, per-target partial failure, CDN invalidation
//! - **Scoped workspace**: extraction state is removed on every exit path

pub mod archive;
pub mod checksum;
pub mod cli;
pub mod common;
pub mod manifest;
pub mod rollback;
pub mod storage;
