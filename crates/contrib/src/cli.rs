//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use contrib_core::types::ContributionType;

/// Contrib - manage libraries, modes, tools and examples of the host application
#[derive(Parser, Debug)]
#[command(name = "contrib")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding configuration, listing and journal (default: ~/.contrib)
    #[arg(long, global = true, env = "CONTRIB_CONFIG_DIR")]
    pub config_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List known contributions
    List(ListArgs),

    /// Show the status of one contribution
    Status(TargetArgs),

    /// Install a contribution
    Install(TargetArgs),

    /// Update an installed contribution to the latest version
    Update(TargetArgs),

    /// Remove an installed contribution
    Remove(TargetArgs),

    /// Withdraw a removal or update waiting for restart
    Undo(TargetArgs),

    /// Apply removals and updates deferred to restart
    ResolvePending(ResolvePendingArgs),

    /// Show the lifecycle event log
    Log(LogArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show contributions of this type
    #[arg(short, long)]
    pub kind: Option<ContributionType>,

    /// Only show installed contributions
    #[arg(long)]
    pub installed: bool,

    /// Only show contributions with an update
    #[arg(long, conflicts_with = "installed")]
    pub updates: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// A single contribution, by name and optionally type
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Contribution name, or `type:name`
    pub name: String,

    /// Contribution type, when the name alone is ambiguous
    #[arg(short, long)]
    pub kind: Option<ContributionType>,
}

#[derive(Args, Debug)]
pub struct ResolvePendingArgs {
    /// Only show what would be done
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Only show events of this contribution (name or `type:name`)
    pub name: Option<String>,

    /// Contribution type, when the name alone is ambiguous
    #[arg(short, long)]
    pub kind: Option<ContributionType>,

    /// Number of most recent events to show
    #[arg(short = 'n', long, default_value_t = contrib_lifecycle::journal::DEFAULT_HISTORY_LIMIT)]
    pub lines: usize,

    /// Output as JSON lines
    #[arg(long)]
    pub json: bool,
}
