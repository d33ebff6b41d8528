use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// unpublish: roll a published release back out of an artifact repository
#[derive(Parser, Debug)]
#[command(
    name = "unpublish",
    version,
    about = "Roll a published release back out of an artifact repository",
    long_about = "unpublish removes every artifact of one product release from the\n\
                   configured repository targets, using the release archive and the\n\
                   stored release manifests to decide what to delete.",
    after_help = "EXAMPLES:\n  \
        unpublish delete eap-7.4.zip -p eap -v 7.4.0 -t ga -n     Preview a rollback\n  \
        unpublish delete eap-7.4.zip -p eap -v 7.4.0 -t ga -t ea  Roll back at two targets\n  \
        unpublish delete pkg.tgz -p left-pad -v 1.3.0 -t npm      Roll back an npm release\n  \
        unpublish manifest show -p eap -v 7.4.0 -t ga             Print a stored manifest\n  \
        unpublish config init                                     Write a starter config"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    /// Config file to use instead of ~/.unpublish/config.toml
    #[arg(long, global = true, value_name = "PATH", env = "UNPUBLISH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Debug logging
    #[arg(long, short = 'D', global = true)]
    pub debug: bool,

    /// Quiet mode: warnings and errors only
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Delete a release's artifacts from one or more targets
    Delete(DeleteArgs),

    /// Inspect stored release manifests
    Manifest {
        #[command(subcommand)]
        action: ManifestAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: CompletionShell,
    },
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Local release archive (zip, tar or tar.gz)
    #[arg(value_name = "REPO")]
    pub repo: String,

    /// Product name
    #[arg(long, short)]
    pub product: String,

    /// Product version
    #[arg(long, short)]
    pub version: String,

    /// Target to delete from (repeatable)
    #[arg(long = "target", short = 't', value_name = "NAME", required = true)]
    pub targets: Vec<String>,

    /// Directory holding the repository tree inside a maven archive
    #[arg(long, short = 'r', default_value = "maven-repository")]
    pub root_path: String,

    /// Regex of maven paths to leave alone (repeatable, replaces the configured patterns)
    #[arg(long = "ignore", short = 'i', value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Parent directory for the extraction workspace
    #[arg(long, short = 'w', value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Show what would be deleted without deleting anything
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Keep the extraction workspace after the run
    #[arg(long)]
    pub keep_workspace: bool,

    /// Skip CDN invalidation even when enabled in config
    #[arg(long)]
    pub no_cdn: bool,
}

#[derive(Subcommand, Debug)]
pub enum ManifestAction {
    /// Print the paths recorded for a release at a target
    Show {
        /// Product name
        #[arg(long, short)]
        product: String,

        /// Product version
        #[arg(long, short)]
        version: String,

        /// Target name
        #[arg(long, short)]
        target: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the config file location
    Path,

    /// Write a starter config if none exists
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Quiet,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
