//! Contrib CLI - install, update and remove host application contributions
//!
//! This is the main entry point for the contrib command-line interface.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Must happen before the first TLS connection
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let global = commands::GlobalOptions {
        config_dir: cli.config_dir,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::List(args) => commands::list::run(args, &global),
        Commands::Status(args) => commands::status::run(args, &global),
        Commands::Install(args) => commands::install::run(args, &global).await,
        Commands::Update(args) => commands::update::run(args, &global).await,
        Commands::Remove(args) => commands::remove::run(args, &global).await,
        Commands::Undo(args) => commands::undo::run(args, &global),
        Commands::ResolvePending(args) => commands::resolve_pending::run(args, &global).await,
        Commands::Log(args) => commands::log::run(args, &global),
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            // Progress bars carry the normal output; -v shows lifecycle logs
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
