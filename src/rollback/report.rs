use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use super::plan::ChecksumFailure;
use super::target::{ProductKey, Target};
use crate::archive::ArchiveKind;
use crate::storage::DeleteFailure;

/// Overall result of a rollback run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackStatus {
    /// Every target succeeded
    Success,
    /// At least one target failed; see the per-target outcomes
    PartialFailure,
    /// Nothing was attempted: unrecognized archive or empty deletion set
    Failed,
}

impl std::fmt::Display for RollbackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollbackStatus::Success => write!(f, "success"),
            RollbackStatus::PartialFailure => write!(f, "partial failure"),
            RollbackStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Where a target's deletion set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    /// The release's record in the manifest bucket
    Manifest,
    /// Candidates derived from the archive
    Archive,
}

/// What happened to a target's manifest record after deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestAction {
    /// Dry run, no manifest bucket, or nothing to record
    Untouched,
    /// Rewritten with the paths that are still present
    Rewritten { remaining: usize },
    /// Every path is gone; the record was deleted
    Removed,
    /// The update itself failed
    Failed { message: String },
}

/// Per-target outcome
#[derive(Debug, Clone, Serialize)]
pub struct TargetOutcome {
    pub name: String,
    pub bucket: String,
    pub prefix: String,
    pub source: PlanSource,
    /// Repository-relative paths selected for deletion
    pub planned: Vec<String>,
    /// Paths actually deleted (empty on a dry run)
    pub deleted: Vec<String>,
    pub failed: Vec<DeleteFailure>,
    /// Paths left alone because the remote copy has a different checksum
    pub skipped: Vec<String>,
    /// Error that stopped this target as a whole
    pub error: Option<String>,
    pub manifest: ManifestAction,
    /// CDN job ids submitted for this target
    pub invalidations: Vec<String>,
}

impl TargetOutcome {
    pub fn new(target: &Target, source: PlanSource, planned: Vec<String>) -> Self {
        Self {
            name: target.name.clone(),
            bucket: target.bucket.clone(),
            prefix: target.prefix.clone(),
            source,
            planned,
            deleted: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            error: None,
            manifest: ManifestAction::Untouched,
            invalidations: Vec::new(),
        }
    }

    /// Target that could not even be planned
    pub fn aborted(target: &Target, error: String) -> Self {
        let mut outcome = Self::new(target, PlanSource::Archive, Vec::new());
        outcome.error = Some(error);
        outcome
    }

    /// Planned paths that were not skipped by checksum verification
    pub fn pending(&self) -> Vec<&str> {
        self.planned
            .iter()
            .filter(|p| !self.skipped.contains(p))
            .map(String::as_str)
            .collect()
    }

    pub fn ok(&self) -> bool {
        self.error.is_none()
            && self.failed.is_empty()
            && !matches!(self.manifest, ManifestAction::Failed { .. })
    }
}

/// Report returned by a rollback run
#[derive(Debug, Clone, Serialize)]
pub struct RollbackReport {
    pub product_key: ProductKey,
    pub kind: ArchiveKind,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub status: RollbackStatus,
    pub success: bool,
    /// Extraction directory; gone by the time the report is read unless retained
    pub workspace: Option<PathBuf>,
    pub workspace_retained: bool,
    pub targets: Vec<TargetOutcome>,
    pub checksum_failures: Vec<ChecksumFailure>,
    pub warnings: Vec<String>,
    pub duration_secs: f64,
}

impl RollbackReport {
    pub fn new(product_key: ProductKey, kind: ArchiveKind, dry_run: bool) -> Self {
        Self {
            product_key,
            kind,
            dry_run,
            started_at: Utc::now(),
            status: RollbackStatus::Failed,
            success: false,
            workspace: None,
            workspace_retained: false,
            targets: Vec::new(),
            checksum_failures: Vec::new(),
            warnings: Vec::new(),
            duration_secs: 0.0,
        }
    }

    /// Set status and success from the per-target outcomes
    pub fn settle(&mut self) {
        self.status = if self.targets.is_empty() {
            RollbackStatus::Failed
        } else if self.targets.iter().all(TargetOutcome::ok) {
            RollbackStatus::Success
        } else {
            RollbackStatus::PartialFailure
        };
        self.success = self.status == RollbackStatus::Success;
    }

    /// Mark the run as failed without touching any target
    pub fn fail(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
        self.status = RollbackStatus::Failed;
        self.success = false;
    }

    pub fn total_deleted(&self) -> usize {
        self.targets.iter().map(|t| t.deleted.len()).sum()
    }

    pub fn total_planned(&self) -> usize {
        self.targets.iter().map(|t| t.planned.len()).sum()
    }

    pub fn failed_targets(&self) -> Vec<&str> {
        self.targets
            .iter()
            .filter(|t| !t.ok())
            .map(|t| t.name.as_str())
            .collect()
    }
}
