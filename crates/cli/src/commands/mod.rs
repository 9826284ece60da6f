//! CLI command definitions and execution
//!
//! This module contains all CLI commands and their implementations.
//! Each command parses its arguments, resolves an alias and reports through
//! the shared [`Formatter`].

use clap::{Parser, Subcommand};
use tf_core::{Alias, AliasManager, ConfigManager};
use tf_tus::TusClient;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod alias;
mod cat;
mod completions;
mod get;
mod info;
mod put;

/// tf - resumable upload client
///
/// A command-line interface for tus-compatible upload services.
/// Interrupted uploads resume from the offset the server acknowledged.
#[derive(Parser, Debug)]
#[command(name = "tf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage upload endpoint aliases
    #[command(subcommand)]
    Alias(alias::AliasCommands),

    /// Upload a local file with automatic resume
    Put(put::PutArgs),

    /// Stream a stored file to stdout
    Cat(cat::CatArgs),

    /// Download a stored file to a local path
    Get(get::GetArgs),

    /// Show the capabilities advertised by a server
    Info(info::InfoArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    // Flags win over the configured defaults
    let defaults = ConfigManager::new()
        .and_then(|manager| manager.load())
        .map(|config| config.defaults)
        .unwrap_or_default();
    let output_config = OutputConfig {
        json: cli.json || defaults.output == "json",
        no_color: cli.no_color || defaults.color == "never",
        no_progress: cli.no_progress || !defaults.progress,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Alias(cmd) => alias::execute(cmd, output_config).await,
        Commands::Put(args) => put::execute(args, output_config).await,
        Commands::Cat(args) => cat::execute(args, output_config).await,
        Commands::Get(args) => get::execute(args, output_config).await,
        Commands::Info(args) => info::execute(args, output_config).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Resolve an alias and build a client for it
pub(crate) fn connect(alias_name: &str, formatter: &Formatter) -> Result<(Alias, TusClient), ExitCode> {
    let alias = AliasManager::new()
        .and_then(|manager| manager.get(alias_name))
        .map_err(|e| formatter.fail("Failed to load alias", &e))?;

    let client = TusClient::new(&alias).map_err(|e| formatter.fail("Invalid alias", &e))?;
    Ok((alias, client))
}
