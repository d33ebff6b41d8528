use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::plan::{gate_checksums, IgnorePatternSet, PlanStrategy, PlannedFile};
use super::report::{ManifestAction, PlanSource, RollbackReport, TargetOutcome};
use super::target::{ProductKey, Target};
use crate::archive::{self, Workspace};
use crate::common::errors::{InputError, RollbackError};
use crate::common::format;
use crate::common::safety;
use crate::manifest::{self, RemoteManifests};
use crate::storage::{
    invalidate_batched, CdnInvalidator, DeleteFailure, ObjectStorage, RetryPolicy,
};

/// Keys per delete request
pub const DELETE_BATCH_SIZE: usize = 1000;

/// Default directory holding the repository tree inside a maven archive
pub const DEFAULT_ROOT_PREFIX: &str = "maven-repository";

const EXTRACT_DIR: &str = "extracted";
const MANIFEST_DIR: &str = "manifests";

/// Everything one rollback run needs
#[derive(Debug, Clone)]
pub struct DeleteRequest {
    /// Local release archive (zip, tar or tar.gz)
    pub archive_path: PathBuf,
    pub product_key: ProductKey,
    /// Maven only; npm plans ignore them
    pub ignore_patterns: Vec<String>,
    pub root_prefix: String,
    pub targets: Vec<Target>,
    /// Storage profile name, for logging
    pub profile: String,
    /// Parent of the workspace; system temp dir when unset
    pub work_dir: Option<PathBuf>,
    pub cdn_enabled: bool,
    pub dry_run: bool,
    pub manifest_bucket: Option<String>,
    pub retain_workspace: bool,
    pub verify_checksums: bool,
    pub retry: RetryPolicy,
    pub show_progress: bool,
}

impl DeleteRequest {
    pub fn new(archive_path: impl Into<PathBuf>, product_key: ProductKey, targets: Vec<Target>) -> Self {
        Self {
            archive_path: archive_path.into(),
            product_key,
            ignore_patterns: Vec::new(),
            root_prefix: DEFAULT_ROOT_PREFIX.to_string(),
            targets,
            profile: "default".to_string(),
            work_dir: None,
            cdn_enabled: false,
            dry_run: false,
            manifest_bucket: None,
            retain_workspace: false,
            verify_checksums: false,
            retry: RetryPolicy::default(),
            show_progress: false,
        }
    }
}

/// A target with its resolved deletion set
struct TargetPlan {
    target: Target,
    outcome: TargetOutcome,
    /// (repository-relative path, storage key), in plan order
    keys: Vec<(String, String)>,
}

/// Roll back one release across every requested target.
///
/// Input problems come back as `Err` before any storage mutation. Storage
/// failures and unusable stored manifests are recorded per target and never stop the remaining targets.
/// The workspace is released when this returns, whatever the outcome.
pub fn delete_release(
    request: &DeleteRequest,
    storage: &dyn ObjectStorage,
    cdn: &dyn CdnInvalidator,
) -> Result<RollbackReport, RollbackError> {
    let started = Instant::now();

    if request.targets.is_empty() {
        return Err(InputError::NoTargets.into());
    }
    let ignore = IgnorePatternSet::compile(&request.ignore_patterns)?;

    tracing::info!(
        "Rolling back {} from {} ({}, profile '{}')",
        request.product_key,
        request.archive_path.display(),
        format::format_count(request.targets.len(), "target"),
        request.profile
    );

    // Classify
    let kind = archive::classify(&request.archive_path)?;
    let mut report = RollbackReport::new(request.product_key.clone(), kind, request.dry_run);
    tracing::info!("Archive layout: {}", kind);

    let Some(strategy) = PlanStrategy::select(kind, &request.root_prefix, ignore) else {
        report.fail(format!(
            "{} is neither an npm package nor a maven repository",
            request.archive_path.display()
        ));
        report.duration_secs = started.elapsed().as_secs_f64();
        return Ok(report);
    };

    // Extract
    let workspace = Workspace::create(request.work_dir.as_deref(), request.retain_workspace)
        .map_err(|e| {
            RollbackError::io(
                request.work_dir.clone().unwrap_or_else(std::env::temp_dir),
                e,
            )
        })?;
    report.workspace = Some(workspace.path().to_path_buf());
    report.workspace_retained = workspace.is_retained();

    let extract_dir = workspace.path().join(EXTRACT_DIR);
    let extracted = archive::extract(&request.archive_path, &extract_dir)?;
    tracing::info!("Extracted {}", format::format_count(extracted.len(), "file"));

    // Plan and checksum gate
    let candidates = strategy.candidates(&extract_dir, &request.archive_path)?;
    let (candidates, checksum_failures) = gate_checksums(candidates);
    report.checksum_failures = checksum_failures;
    let sha1_by_path: HashMap<&str, &str> = candidates
        .iter()
        .filter_map(|c| c.sha1.as_deref().map(|s| (c.path.as_str(), s)))
        .collect();

    // Reconcile against stored manifests (reads only)
    let remote = request
        .manifest_bucket
        .as_deref()
        .map(|bucket| RemoteManifests::new(storage, bucket, request.retry));
    let mut plans = reconcile(request, remote.as_ref(), &candidates);

    // Every archive-derived key is checked before the first mutating call;
    // stored records were already checked per target
    for plan in plans.iter().filter(|p| p.outcome.source == PlanSource::Archive) {
        let keys: Vec<String> = plan.keys.iter().map(|(_, key)| key.clone()).collect();
        safety::validate_deletion(&keys)?;
    }

    if plans.iter().all(|p| p.keys.is_empty()) {
        report.targets = plans.into_iter().map(|p| p.outcome).collect();
        report.fail(format!(
            "nothing to delete for {} at any target",
            request.product_key
        ));
        report.duration_secs = started.elapsed().as_secs_f64();
        return Ok(report);
    }

    if request.verify_checksums {
        for plan in plans.iter_mut() {
            verify_remote_checksums(plan, storage, &sha1_by_path, request.retry);
        }
    }

    // Delete
    let total: usize = plans.iter().map(|p| p.keys.len()).sum();
    let pb = progress_bar(request.show_progress && !request.dry_run, total);
    for plan in plans.iter_mut() {
        if plan.outcome.error.is_some() {
            continue;
        }
        if request.dry_run {
            preview_target(plan);
        } else {
            delete_target(plan, storage, request.retry, pb.as_ref());
        }
    }
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if !request.dry_run {
        if let Some(remote) = remote.as_ref() {
            for plan in plans.iter_mut() {
                update_manifest(plan, remote, &request.product_key, workspace.path());
            }
        }
        if request.cdn_enabled {
            for plan in plans.iter_mut() {
                invalidate_target(plan, cdn, &mut report.warnings);
            }
        }
    }

    report.targets = plans.into_iter().map(|p| p.outcome).collect();
    report.settle();
    report.duration_secs = started.elapsed().as_secs_f64();

    for outcome in report.targets.iter().filter(|t| !t.ok()) {
        tracing::warn!(
            "Target '{}' did not complete: {} failed{}",
            outcome.name,
            format::format_count(outcome.failed.len(), "key"),
            outcome
                .error
                .as_deref()
                .map(|e| format!(", {}", e))
                .unwrap_or_default()
        );
    }
    tracing::info!(
        "Rollback of {} finished: {} ({} of {} planned paths deleted) in {}",
        report.product_key,
        report.status,
        report.total_deleted(),
        report.total_planned(),
        format::format_duration(report.duration_secs)
    );

    drop(workspace);
    Ok(report)
}

/// Resolve each target's deletion set: the stored record when one exists,
/// the derived candidates otherwise. A stored record with an unsafe key
/// aborts only its own target.
fn reconcile(
    request: &DeleteRequest,
    remote: Option<&RemoteManifests<'_>>,
    candidates: &[PlannedFile],
) -> Vec<TargetPlan> {
    let derived: Vec<String> = candidates.iter().map(|c| c.path.clone()).collect();

    request
        .targets
        .iter()
        .map(|target| {
            let stored = match remote {
                Some(remote) => remote.fetch(&target.name, request.product_key.as_str()),
                None => Ok(None),
            };
            let (source, paths) = match stored {
                Ok(Some(paths)) => {
                    tracing::info!(
                        "Target '{}': using stored manifest ({})",
                        target.name,
                        format::format_count(paths.len(), "path")
                    );
                    (PlanSource::Manifest, paths)
                }
                Ok(None) => (PlanSource::Archive, derived.clone()),
                Err(e) => {
                    tracing::warn!("Target '{}': cannot read manifest: {}", target.name, e);
                    return TargetPlan {
                        target: target.clone(),
                        outcome: TargetOutcome::aborted(target, e.to_string()),
                        keys: Vec::new(),
                    };
                }
            };

            let keys: Vec<(String, String)> = paths
                .iter()
                .map(|p| (p.clone(), safety::join_key(&target.prefix, p)))
                .collect();
            if source == PlanSource::Manifest {
                let stored_keys: Vec<String> = keys.iter().map(|(_, k)| k.clone()).collect();
                if let Err(e) = safety::validate_deletion(&stored_keys) {
                    tracing::warn!("Target '{}': stored manifest rejected: {}", target.name, e);
                    let mut outcome = TargetOutcome::aborted(target, e.to_string());
                    outcome.source = PlanSource::Manifest;
                    return TargetPlan {
                        target: target.clone(),
                        outcome,
                        keys: Vec::new(),
                    };
                }
            }
            TargetPlan {
                target: target.clone(),
                outcome: TargetOutcome::new(target, source, paths),
                keys,
            }
        })
        .collect()
}

/// Drop keys whose remote `.sha1` sidecar disagrees with the local digest
fn verify_remote_checksums(
    plan: &mut TargetPlan,
    storage: &dyn ObjectStorage,
    sha1_by_path: &HashMap<&str, &str>,
    retry: RetryPolicy,
) {
    if plan.outcome.error.is_some() {
        return;
    }
    let bucket = plan.target.bucket.clone();
    let mut kept = Vec::with_capacity(plan.keys.len());

    for (path, key) in std::mem::take(&mut plan.keys) {
        let Some(local) = sha1_by_path.get(path.as_str()) else {
            kept.push((path, key));
            continue;
        };
        let sidecar = format!("{}.sha1", key);
        match retry.run(&format!("get {}", sidecar), || storage.get_object(&bucket, &sidecar)) {
            Ok(Some(body)) => {
                let remote = String::from_utf8_lossy(&body);
                if remote.trim().eq_ignore_ascii_case(local) {
                    kept.push((path, key));
                } else {
                    tracing::warn!(
                        "Skipping {}: remote checksum differs, published by another release",
                        key
                    );
                    plan.outcome.skipped.push(path);
                }
            }
            Ok(None) => kept.push((path, key)),
            Err(e) => {
                tracing::warn!("Target '{}': checksum lookup failed: {}", plan.target.name, e);
                plan.outcome.error = Some(e.to_string());
                return;
            }
        }
    }
    plan.keys = kept;
}

fn preview_target(plan: &TargetPlan) {
    for (_, key) in &plan.keys {
        tracing::debug!("[dry run] would delete {}/{}", plan.target.bucket, key);
    }
    tracing::info!(
        "[dry run] Target '{}': would delete {} from {}",
        plan.target.name,
        format::format_count(plan.keys.len(), "key"),
        plan.target.bucket
    );
}

fn delete_target(
    plan: &mut TargetPlan,
    storage: &dyn ObjectStorage,
    retry: RetryPolicy,
    pb: Option<&ProgressBar>,
) {
    let bucket = plan.target.bucket.clone();
    let path_by_key: HashMap<&str, &str> = plan
        .keys
        .iter()
        .map(|(path, key)| (key.as_str(), path.as_str()))
        .collect();
    let keys: Vec<String> = plan.keys.iter().map(|(_, key)| key.clone()).collect();

    let mut failed: Vec<DeleteFailure> = Vec::new();
    for chunk in keys.chunks(DELETE_BATCH_SIZE) {
        if let Some(pb) = pb {
            pb.set_message(format!("{} {}", plan.target.name, format::truncate_left(&chunk[0], 40)));
        }
        for key in chunk {
            tracing::debug!("Deleting {}/{}", bucket, key);
        }
        match retry.run(&format!("delete from {}", bucket), || {
            storage.delete_objects(&bucket, chunk)
        }) {
            Ok(failures) => failed.extend(failures),
            Err(e) => {
                tracing::warn!("Target '{}': delete request failed: {}", plan.target.name, e);
                failed.extend(chunk.iter().map(|key| DeleteFailure {
                    key: key.clone(),
                    message: e.to_string(),
                }));
            }
        }
        if let Some(pb) = pb {
            pb.inc(chunk.len() as u64);
        }
    }

    let failed_keys: HashSet<&str> = failed.iter().map(|f| f.key.as_str()).collect();
    plan.outcome.deleted = keys
        .iter()
        .filter(|key| !failed_keys.contains(key.as_str()))
        .filter_map(|key| path_by_key.get(key.as_str()).map(|p| p.to_string()))
        .collect();
    for failure in &failed {
        tracing::warn!("Failed to delete {}/{}: {}", bucket, failure.key, failure.message);
    }
    tracing::info!(
        "Target '{}': deleted {}, {} failed",
        plan.target.name,
        format::format_count(plan.outcome.deleted.len(), "key"),
        failed.len()
    );
    plan.outcome.failed = failed;
}

/// Rewrite or remove the stored record so it lists exactly what is left
fn update_manifest(
    plan: &mut TargetPlan,
    remote: &RemoteManifests<'_>,
    product_key: &ProductKey,
    workspace: &Path,
) {
    if plan.outcome.error.is_some() {
        return;
    }
    let failed_keys: HashSet<&str> = plan.outcome.failed.iter().map(|f| f.key.as_str()).collect();
    let remaining: Vec<&str> = plan
        .keys
        .iter()
        .filter(|(_, key)| failed_keys.contains(key.as_str()))
        .map(|(path, _)| path.as_str())
        .collect();

    let name = plan.target.name.clone();
    let result = if remaining.is_empty() {
        match plan.outcome.source {
            PlanSource::Manifest => remote
                .remove(&name, product_key.as_str())
                .map(|_| ManifestAction::Removed)
                .map_err(|e| e.to_string()),
            PlanSource::Archive => Ok(ManifestAction::Untouched),
        }
    } else {
        let dir = workspace.join(MANIFEST_DIR).join(&name);
        std::fs::create_dir_all(&dir)
            .and_then(|_| manifest::write_manifest(&remaining, &dir, product_key.as_str()))
            .map_err(|e| format!("cannot write local manifest: {}", e))
            .and_then(|(_, local)| {
                remote
                    .publish(&name, product_key.as_str(), &local)
                    .map_err(|e| e.to_string())
            })
            .map(|_| ManifestAction::Rewritten {
                remaining: remaining.len(),
            })
    };

    plan.outcome.manifest = match result {
        Ok(action) => action,
        Err(message) => {
            tracing::warn!("Target '{}': manifest update failed: {}", name, message);
            ManifestAction::Failed { message }
        }
    };
}

fn invalidate_target(plan: &mut TargetPlan, cdn: &dyn CdnInvalidator, warnings: &mut Vec<String>) {
    let Some(distribution_id) = plan.target.distribution_id.as_deref() else {
        return;
    };
    if plan.outcome.deleted.is_empty() {
        return;
    }
    let paths: Vec<String> = plan
        .outcome
        .deleted
        .iter()
        .map(|p| format!("/{}", p.trim_start_matches('/')))
        .collect();

    for result in invalidate_batched(cdn, distribution_id, &paths) {
        match result {
            Ok(job) => {
                tracing::info!(
                    "Target '{}': invalidation {} submitted to {}",
                    plan.target.name,
                    job,
                    distribution_id
                );
                plan.outcome.invalidations.push(job);
            }
            Err(e) => {
                tracing::warn!("Target '{}': {}", plan.target.name, e);
                warnings.push(e.to_string());
            }
        }
    }
}

fn progress_bar(enabled: bool, total: usize) -> Option<ProgressBar> {
    if !enabled || total == 0 {
        return None;
    }
    let pb = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.red} [{bar:40.red/blue}] {pos}/{len} Deleting... {msg}")
        .map(|s| s.progress_chars("━━░"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    Some(pb)
}

