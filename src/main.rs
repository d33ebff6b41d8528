use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;

use unpublish::archive;
use unpublish::cli::args::{
    Cli, Commands, CompletionShell, ConfigAction, DeleteArgs, ManifestAction, OutputFormat,
};
use unpublish::cli::output;
use unpublish::common::config::Config;
use unpublish::common::errors::RollbackError;
use unpublish::common::logging::{self, Verbosity};
use unpublish::manifest::RemoteManifests;
use unpublish::rollback::{self, DeleteRequest, ProductKey};
use unpublish::storage::{
    CdnInvalidator, HttpInvalidator, LogInvalidator, ObjectStoreGateway, RetryPolicy,
};

/// Input errors, partial failures and empty runs
const EXIT_FAILURE: u8 = 1;
/// Anything the caller did not cause
const EXIT_FATAL: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let quiet = cli.quiet || cli.format != OutputFormat::Human;
    let _log_guard = logging::init(Verbosity::from_flags(cli.debug, quiet));

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            let fatal = e
                .downcast_ref::<RollbackError>()
                .map(RollbackError::is_fatal)
                .unwrap_or(false);
            if fatal {
                tracing::error!("{:#}", e);
            }
            eprintln!("  {} {:#}", "✗".red(), e);
            ExitCode::from(if fatal { EXIT_FATAL } else { EXIT_FAILURE })
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);

    match cli.command {
        Commands::Delete(ref args) => {
            let config = Config::load_from(&config_path)?;
            cmd_delete(cli, args, &config)
        }

        Commands::Manifest { ref action } => {
            let config = Config::load_from(&config_path)?;
            cmd_manifest(cli, action, &config)
        }

        Commands::Config { ref action } => cmd_config(cli, action, &config_path),

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            let shell = match shell {
                CompletionShell::Bash => clap_complete::Shell::Bash,
                CompletionShell::Zsh => clap_complete::Shell::Zsh,
                CompletionShell::Fish => clap_complete::Shell::Fish,
            };
            clap_complete::generate(shell, &mut cmd, "unpublish", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ─── Delete ───────────────────────────────────────────────────────────────────

fn cmd_delete(cli: &Cli, args: &DeleteArgs, config: &Config) -> Result<ExitCode> {
    let archive_path = archive::local_archive_path(&args.repo).map_err(RollbackError::from)?;
    let product_key =
        ProductKey::new(&args.product, &args.version).map_err(RollbackError::from)?;
    let targets = config
        .resolve_targets(&args.targets)
        .map_err(RollbackError::from)?;

    let profile_name = config.effective_profile();
    let profile = config.storage_profile(&profile_name)?;
    let storage = ObjectStoreGateway::from_dsn(&profile.dsn)
        .with_context(|| format!("Cannot open storage for profile '{}'", profile_name))?;

    let cdn: Box<dyn CdnInvalidator> = match config.cdn.endpoint {
        Some(ref endpoint) => Box::new(HttpInvalidator::new(endpoint.clone())),
        None => Box::new(LogInvalidator::new()),
    };

    // Patterns on the command line replace the configured defaults
    let ignore_patterns = if args.ignore_patterns.is_empty() {
        config.ignore_patterns.clone()
    } else {
        args.ignore_patterns.clone()
    };

    let show_progress =
        !cli.quiet && cli.format == OutputFormat::Human && std::io::stderr().is_terminal();

    let request = DeleteRequest {
        ignore_patterns,
        root_prefix: args.root_path.clone(),
        profile: profile_name.clone(),
        work_dir: args.work_dir.clone(),
        cdn_enabled: config.cdn_enabled && !args.no_cdn,
        dry_run: args.dry_run,
        manifest_bucket: config.manifest_bucket.clone(),
        retain_workspace: args.keep_workspace,
        verify_checksums: config.verify_checksums,
        retry: RetryPolicy::with_attempts(profile.max_attempts),
        show_progress,
        ..DeleteRequest::new(archive_path, product_key, targets)
    };

    let report = rollback::delete_release(&request, &storage, cdn.as_ref())?;

    match cli.format {
        OutputFormat::Human => output::print_report(&report),
        OutputFormat::Json => output::print_report_json(&report),
        OutputFormat::Quiet => output::print_report_quiet(&report),
    }

    Ok(if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILURE)
    })
}

// ─── Manifest ─────────────────────────────────────────────────────────────────

fn cmd_manifest(cli: &Cli, action: &ManifestAction, config: &Config) -> Result<ExitCode> {
    match action {
        ManifestAction::Show {
            product,
            version,
            target,
        } => {
            let product_key = ProductKey::new(product, version).map_err(RollbackError::from)?;
            config
                .resolve_targets(std::slice::from_ref(target))
                .map_err(RollbackError::from)?;
            let bucket = config
                .manifest_bucket
                .as_deref()
                .context("No manifest_bucket configured")?;

            let profile_name = config.effective_profile();
            let profile = config.storage_profile(&profile_name)?;
            let storage = ObjectStoreGateway::from_dsn(&profile.dsn)
                .with_context(|| format!("Cannot open storage for profile '{}'", profile_name))?;
            let remote = RemoteManifests::new(
                &storage,
                bucket,
                RetryPolicy::with_attempts(profile.max_attempts),
            );
            let paths = remote.fetch(target, product_key.as_str())?;

            match cli.format {
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "target": target,
                        "product_key": product_key,
                        "paths": paths,
                    });
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
                OutputFormat::Quiet => {
                    for path in paths.iter().flatten() {
                        println!("{}", path);
                    }
                }
                OutputFormat::Human => {
                    output::print_manifest(target, product_key.as_str(), paths.as_deref())
                }
            }

            Ok(if paths.is_some() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_FAILURE)
            })
        }
    }
}

// ─── Config ───────────────────────────────────────────────────────────────────

fn cmd_config(cli: &Cli, action: &ConfigAction, config_path: &Path) -> Result<ExitCode> {
    match action {
        ConfigAction::Show => {
            let config = Config::load_from(config_path)?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
                OutputFormat::Quiet => println!("{}", toml::to_string_pretty(&config)?),
                OutputFormat::Human => {
                    output::print_config_summary(&config, config_path);
                    println!("{}", toml::to_string_pretty(&config)?);
                }
            }
        }
        ConfigAction::Path => println!("{}", config_path.display()),
        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at {} (use --force to overwrite)",
                    config_path.display()
                );
            }
            Config::example().save_to(config_path)?;
            init_dirs()?;
            println!(
                "  {} Wrote starter config to {}",
                "✓".green(),
                config_path.display()
            );
            println!("  Edit [targets] and [profiles] before the first rollback.");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn init_dirs() -> Result<()> {
    let logs = Config::logs_dir();
    std::fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create {}", logs.display()))
}
