pub mod config;
pub mod errors;
pub mod format;
pub mod logging;
pub mod safety;

pub use errors::{CdnError, ChecksumError, InputError, RollbackError, StorageError};
