//! Deletion orchestrator: from a release archive to removed objects at
//! every target, with the manifest bucket kept in step.

pub mod engine;
pub mod plan;
pub mod report;
pub mod target;

pub use engine::{delete_release, DeleteRequest, DEFAULT_ROOT_PREFIX, DELETE_BATCH_SIZE};
pub use plan::{ChecksumFailure, IgnorePatternSet, PlanStrategy, PlannedFile};
pub use report::{ManifestAction, PlanSource, RollbackReport, RollbackStatus, TargetOutcome};
pub use target::{ProductKey, Target};
