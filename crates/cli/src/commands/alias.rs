//! Alias management commands
//!
//! Aliases are named references to tus upload endpoints,
//! including extra headers and retry settings.

use std::collections::BTreeMap;

use clap::{Subcommand, ValueEnum};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};
use tf_core::{Alias, AliasManager, BackoffKind, RetryConfig, UploadConfig};

/// Alias subcommands for managing upload endpoints
#[derive(Subcommand, Debug)]
pub enum AliasCommands {
    /// Add or update an alias
    Set(SetArgs),

    /// List all configured aliases
    List(ListArgs),

    /// Remove an alias
    Remove(RemoveArgs),
}

/// Backoff strategy accepted on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffArg {
    Fixed,
    Exponential,
}

impl From<BackoffArg> for BackoffKind {
    fn from(arg: BackoffArg) -> Self {
        match arg {
            BackoffArg::Fixed => BackoffKind::Fixed,
            BackoffArg::Exponential => BackoffKind::Exponential,
        }
    }
}

/// Arguments for the `alias set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Alias name (e.g., "local", "prod")
    pub name: String,

    /// Upload URL without a trailing slash (e.g., "http://localhost:1080/files")
    pub endpoint: String,

    /// Extra request header as NAME:VALUE (repeatable)
    #[arg(long = "header", value_name = "NAME:VALUE")]
    pub headers: Vec<String>,

    /// Maximum upload attempts
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Backoff strategy between attempts
    #[arg(long, value_enum)]
    pub backoff: Option<BackoffArg>,

    /// Delay before a retry in milliseconds
    #[arg(long)]
    pub backoff_ms: Option<u64>,

    /// Bytes sent per PATCH request
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Do not send Upload-Checksum headers
    #[arg(long, default_value = "false")]
    pub no_checksum: bool,
}

/// Arguments for the `alias list` command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show full details including retry settings
    #[arg(short, long)]
    pub long: bool,
}

/// Arguments for the `alias remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the alias to remove
    pub name: String,
}

/// JSON output for alias list
#[derive(Serialize)]
struct AliasListOutput {
    aliases: Vec<AliasInfo>,
}

/// Alias information for JSON output (header values omitted)
#[derive(Serialize)]
struct AliasInfo {
    name: String,
    endpoint: String,
    headers: Vec<String>,
    max_attempts: u32,
    backoff: BackoffKind,
    backoff_ms: u64,
    chunk_size: usize,
    checksum: bool,
}

impl From<&Alias> for AliasInfo {
    fn from(alias: &Alias) -> Self {
        let retry = alias.retry_config();
        let upload = alias.upload_config();
        Self {
            name: alias.name.clone(),
            endpoint: alias.endpoint.clone(),
            headers: alias.headers.keys().cloned().collect(),
            max_attempts: retry.max_attempts,
            backoff: retry.backoff,
            backoff_ms: retry.backoff_ms,
            chunk_size: upload.chunk_size,
            checksum: upload.checksum,
        }
    }
}

/// JSON output for alias set/remove operations
#[derive(Serialize)]
struct AliasOperationOutput {
    success: bool,
    alias: String,
    message: String,
}

/// Execute an alias subcommand
pub async fn execute(cmd: AliasCommands, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let alias_manager = match AliasManager::new() {
        Ok(am) => am,
        Err(e) => return formatter.fail("Failed to load configuration", &e),
    };

    match cmd {
        AliasCommands::Set(args) => execute_set(args, &alias_manager, &formatter),
        AliasCommands::List(args) => execute_list(args, &alias_manager, &formatter),
        AliasCommands::Remove(args) => execute_remove(args, &alias_manager, &formatter),
    }
}

/// Parse repeated `NAME:VALUE` header arguments
fn parse_headers(raw: &[String]) -> Result<BTreeMap<String, String>, String> {
    raw.iter()
        .map(|h| match h.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(format!("Invalid header '{h}'. Expected NAME:VALUE")),
        })
        .collect()
}

fn build_alias(args: &SetArgs) -> Result<Alias, String> {
    let mut alias = Alias::new(&args.name, &args.endpoint);
    alias.headers = parse_headers(&args.headers)?;

    if args.max_attempts.is_some() || args.backoff.is_some() || args.backoff_ms.is_some() {
        let mut retry = RetryConfig::default();
        if let Some(attempts) = args.max_attempts {
            if attempts == 0 {
                return Err("--max-attempts must be at least 1".to_string());
            }
            retry.max_attempts = attempts;
        }
        if let Some(backoff) = args.backoff {
            retry.backoff = backoff.into();
        }
        if let Some(ms) = args.backoff_ms {
            retry.backoff_ms = ms;
        }
        alias.retry = Some(retry);
    }

    if args.chunk_size.is_some() || args.no_checksum {
        let mut upload = UploadConfig::default();
        if let Some(size) = args.chunk_size {
            if size == 0 {
                return Err("--chunk-size must be greater than zero".to_string());
            }
            upload.chunk_size = size;
        }
        upload.checksum = !args.no_checksum;
        alias.upload = Some(upload);
    }

    Ok(alias)
}

fn execute_set(args: SetArgs, manager: &AliasManager, formatter: &Formatter) -> ExitCode {
    let alias = match build_alias(&args) {
        Ok(alias) => alias,
        Err(msg) => {
            formatter.error(&msg);
            return ExitCode::UsageError;
        }
    };

    match manager.set(alias) {
        Ok(()) => {
            let message = format!("Alias '{}' configured successfully", args.name);
            if formatter.is_json() {
                formatter.json(&AliasOperationOutput {
                    success: true,
                    alias: args.name,
                    message,
                });
            } else {
                formatter.success(&message);
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail("Failed to save alias", &e),
    }
}

fn execute_list(args: ListArgs, manager: &AliasManager, formatter: &Formatter) -> ExitCode {
    let aliases = match manager.list() {
        Ok(aliases) => aliases,
        Err(e) => return formatter.fail("Failed to list aliases", &e),
    };

    if formatter.is_json() {
        formatter.json(&AliasListOutput {
            aliases: aliases.iter().map(AliasInfo::from).collect(),
        });
    } else if aliases.is_empty() {
        formatter.println("No aliases configured.");
    } else if args.long {
        let mut table = formatter.table(&["Name", "Endpoint", "Attempts", "Backoff", "Chunk", "Checksum"]);
        for alias in &aliases {
            let info = AliasInfo::from(alias);
            let backoff = match info.backoff {
                BackoffKind::Fixed => format!("fixed {}ms", info.backoff_ms),
                BackoffKind::Exponential => format!("exponential {}ms", info.backoff_ms),
            };
            table.add_row(vec![
                info.name,
                info.endpoint,
                info.max_attempts.to_string(),
                backoff,
                humansize::format_size(info.chunk_size, humansize::BINARY),
                if info.checksum { "sha256" } else { "off" }.to_string(),
            ]);
        }
        formatter.println(&table.to_string());
    } else {
        for alias in &aliases {
            formatter.println(&format!("{:<12} {}", alias.name, alias.endpoint));
        }
    }
    ExitCode::Success
}

fn execute_remove(args: RemoveArgs, manager: &AliasManager, formatter: &Formatter) -> ExitCode {
    match manager.remove(&args.name) {
        Ok(()) => {
            let message = format!("Alias '{}' removed successfully", args.name);
            if formatter.is_json() {
                formatter.json(&AliasOperationOutput {
                    success: true,
                    alias: args.name,
                    message,
                });
            } else {
                formatter.success(&message);
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail("Failed to remove alias", &e),
    }
}
