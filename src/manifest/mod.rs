pub mod record;
pub mod remote;

pub use record::{
    manifest_name, normalize_path, parse_manifest, read_manifest, write_manifest, MANIFEST_SUFFIX,
};
pub use remote::RemoteManifests;
