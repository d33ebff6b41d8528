pub mod hasher;

pub use hasher::{
    digest, digest_named, is_hash_file, resolve_sha1, resolve_sha1_all, sidecar_path, HashType,
};
