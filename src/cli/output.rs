use colored::*;
use std::path::Path;

use crate::common::config::Config;
use crate::common::format::{self, format_count, format_outcome, print_kv};
use crate::rollback::{ManifestAction, PlanSource, RollbackReport, RollbackStatus, TargetOutcome};

/// Maximum failures listed per target in human output
const MAX_LISTED_FAILURES: usize = 10;

/// Print a rollback report in human-readable format
pub fn print_report(report: &RollbackReport) {
    println!();
    let (icon, label) = match (report.status, report.dry_run) {
        (RollbackStatus::Success, true) => ("ℹ️", "Dry run".bold()),
        (RollbackStatus::Success, false) => ("✓", "Rolled back".green().bold()),
        (RollbackStatus::PartialFailure, _) => ("⚠", "Partial failure".yellow().bold()),
        (RollbackStatus::Failed, _) => ("✗", "Nothing rolled back".red().bold()),
    };
    println!(
        "  {} {} {} ({} archive) in {}",
        icon,
        label,
        report.product_key.to_string().cyan(),
        report.kind,
        format::format_duration(report.duration_secs).cyan()
    );
    println!(
        "  {}",
        format!("started {}", report.started_at.format("%Y-%m-%d %H:%M:%S UTC")).dimmed()
    );
    println!("{}", "─".repeat(60).dimmed());

    for outcome in &report.targets {
        print_target(outcome, report.dry_run);
    }

    if !report.checksum_failures.is_empty() {
        println!();
        println!(
            "  {} {} could not be hashed and were left out:",
            "⚠".yellow(),
            format_count(report.checksum_failures.len(), "file")
        );
        for failure in &report.checksum_failures {
            println!("    {} {}", failure.path, failure.message.dimmed());
        }
    }

    if !report.warnings.is_empty() {
        println!();
        for warning in &report.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if let Some(ref workspace) = report.workspace {
        if report.workspace_retained {
            println!();
            println!("  {} Workspace kept at {}", "💾", workspace.display().to_string().cyan());
        }
    }
    println!();
}

fn print_target(outcome: &TargetOutcome, dry_run: bool) {
    let source = match outcome.source {
        PlanSource::Manifest => "stored manifest",
        PlanSource::Archive => "archive",
    };
    println!();
    println!(
        "  {} {} {}",
        format_outcome(outcome.ok()),
        outcome.name.bold(),
        format!("({}/{}, from {})", outcome.bucket, outcome.prefix, source).dimmed()
    );

    if let Some(ref error) = outcome.error {
        println!("    {}", error.red());
        return;
    }

    if dry_run {
        let pending = outcome.pending();
        println!("    would delete {}", format_count(pending.len(), "path"));
        for path in pending {
            println!("      {}", path.dimmed());
        }
    } else {
        println!("    deleted {}", format_count(outcome.deleted.len(), "path"));
    }

    if !outcome.skipped.is_empty() {
        println!(
            "    skipped {} published by another release",
            format_count(outcome.skipped.len(), "path")
        );
    }

    if !outcome.failed.is_empty() {
        println!("    {} {}", "failed".red(), format_count(outcome.failed.len(), "key"));
        for failure in outcome.failed.iter().take(MAX_LISTED_FAILURES) {
            println!(
                "      {} {}",
                format::truncate_left(&failure.key, 60),
                failure.message.dimmed()
            );
        }
        if outcome.failed.len() > MAX_LISTED_FAILURES {
            println!(
                "      ... and {} more",
                (outcome.failed.len() - MAX_LISTED_FAILURES).to_string().dimmed()
            );
        }
    }

    match &outcome.manifest {
        ManifestAction::Untouched => {}
        ManifestAction::Rewritten { remaining } => {
            println!("    manifest rewritten, {} left", format_count(*remaining, "path"))
        }
        ManifestAction::Removed => println!("    manifest removed"),
        ManifestAction::Failed { message } => {
            println!("    {} {}", "manifest update failed:".red(), message)
        }
    }

    for job in &outcome.invalidations {
        println!("    CDN invalidation {}", job.cyan());
    }
}

/// Print a rollback report as JSON
pub fn print_report_json(report: &RollbackReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing report: {}", e),
    }
}

/// One line: status, deleted count, failed target names
pub fn print_report_quiet(report: &RollbackReport) {
    println!(
        "{}  {}  {}",
        report.status,
        report.total_deleted(),
        report.failed_targets().join(",")
    );
}

/// Print a stored manifest
pub fn print_manifest(target: &str, product_key: &str, paths: Option<&[String]>) {
    match paths {
        Some(paths) => {
            println!();
            println!(
                "  {} {} at {} ({})",
                "📄",
                product_key.cyan(),
                target.bold(),
                format_count(paths.len(), "path")
            );
            println!("{}", "─".repeat(60).dimmed());
            for path in paths {
                println!("  {}", path);
            }
            println!();
        }
        None => println!(
            "  No manifest stored for {} at {}",
            product_key.cyan(),
            target.bold()
        ),
    }
}

/// Print a summary of the loaded configuration
pub fn print_config_summary(config: &Config, path: &Path) {
    println!();
    print_kv("Config file", &path.display().to_string());
    print_kv(
        "Manifest bucket",
        config.manifest_bucket.as_deref().unwrap_or("(none)"),
    );
    print_kv("Profile", &config.effective_profile());
    print_kv("CDN", if config.cdn_enabled { "enabled" } else { "disabled" });
    print_kv(
        "Targets",
        &config.targets.keys().cloned().collect::<Vec<_>>().join(", "),
    );
    println!();
}
