//! put command - Resumable upload of a local file
//!
//! Creates an upload on the server and streams the file in chunks. Dropped
//! connections and checksum mismatches are retried from the offset the
//! server reports.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use tf_core::{
    Error, FixedBackoff, RemotePath, TransferReport, UploadMetadata, Uploader, parse_remote_path,
};
use tf_tus::{TusClient, check_upload_size, detect_capabilities, require_capability};
use tracing::debug;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, ProgressBar};

/// Upload a local file
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local file to upload
    pub source: String,

    /// Destination (alias/path); a trailing slash keeps the file name
    pub target: String,

    /// Maximum upload attempts (overrides the alias setting)
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Fixed delay between attempts in milliseconds (overrides the alias setting)
    #[arg(long)]
    pub backoff_ms: Option<u64>,

    /// Extra upload metadata as KEY=VALUE (repeatable)
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    pub meta: Vec<String>,

    /// Content type stored with the upload (guessed from the file name otherwise)
    #[arg(long)]
    pub content_type: Option<String>,

    /// Query server capabilities before uploading
    #[arg(long, default_value = "false")]
    pub probe: bool,
}

/// Execute the put command
pub async fn execute(args: PutArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config.clone());

    if args.source.is_empty() {
        formatter.error("Source path cannot be empty");
        return ExitCode::UsageError;
    }
    let source = PathBuf::from(&args.source);

    let target = match resolve_target(&args.target, &source) {
        Ok(target) => target,
        Err(e) => return formatter.fail("Invalid target path", &e),
    };

    let metadata = match build_metadata(&source, args.content_type.as_deref(), &args.meta) {
        Ok(metadata) => metadata,
        Err(msg) => {
            formatter.error(&msg);
            return ExitCode::UsageError;
        }
    };

    let (alias, mut client) = match super::connect(&target.alias, &formatter) {
        Ok(connected) => connected,
        Err(code) => return code,
    };

    let mut file = match tokio::fs::File::open(&source).await {
        Ok(file) => file,
        Err(e) => return formatter.fail(&format!("Failed to open {}", source.display()), &Error::from(e)),
    };
    let size = match file.metadata().await {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => {
            formatter.error(&format!("{} is not a regular file", source.display()));
            return ExitCode::UsageError;
        }
        Err(e) => return formatter.fail(&format!("Failed to stat {}", source.display()), &Error::from(e)),
    };

    if args.probe {
        client = match probe(client, size, &formatter).await {
            Ok(client) => client,
            Err(code) => return code,
        };
    }

    let retry = alias.retry_config();
    let upload = alias.upload_config();
    let mut uploader = Uploader::new(&client)
        .max_attempts(args.attempts.unwrap_or(retry.max_attempts))
        .chunk_size(upload.chunk_size);
    uploader = match args.backoff_ms {
        Some(ms) => uploader.backoff(FixedBackoff::new(Duration::from_millis(ms))),
        None => uploader.backoff(retry.backoff_policy()),
    };

    let progress = ProgressBar::new(output_config, size);
    let bar = progress.clone();
    uploader = uploader.on_progress(move |offset| bar.set_position(offset));

    debug!(source = %source.display(), target = %target, size, "Starting upload");
    let result = tokio::select! {
        result = uploader.transfer(&target.key, &mut file, size, metadata) => result,
        _ = tokio::signal::ctrl_c() => {
            progress.finish_and_clear();
            formatter.error("Upload interrupted");
            return ExitCode::Interrupted;
        }
    };
    progress.finish_and_clear();

    match result {
        Ok(report) => {
            print_report(&formatter, &source, &target, &report);
            ExitCode::Success
        }
        Err(e) => formatter.fail(&format!("Failed to upload {}", source.display()), &e),
    }
}

/// Destination path, appending the source file name for `alias/dir/`
fn resolve_target(raw: &str, source: &Path) -> tf_core::Result<RemotePath> {
    let target = parse_remote_path(raw)?;
    if raw.ends_with('/') {
        if let Some(name) = source.file_name() {
            return Ok(target.join(&name.to_string_lossy()));
        }
    }
    Ok(target)
}

fn build_metadata(
    source: &Path,
    content_type: Option<&str>,
    extra: &[String],
) -> Result<UploadMetadata, String> {
    let mut metadata = UploadMetadata::new();
    if let Some(name) = source.file_name() {
        metadata.insert(UploadMetadata::FILENAME_KEY, name.to_string_lossy());
    }

    let filetype = content_type.map(str::to_string).or_else(|| {
        mime_guess::from_path(source)
            .first()
            .map(|m| m.essence_str().to_string())
    });
    if let Some(filetype) = filetype {
        metadata.insert(UploadMetadata::FILETYPE_KEY, filetype);
    }

    for pair in extra {
        match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                metadata.insert(key, value);
            }
            _ => return Err(format!("Invalid metadata '{pair}'. Expected KEY=VALUE")),
        }
    }
    Ok(metadata)
}

/// Check size limits and turn off checksums the server cannot verify
async fn probe(client: TusClient, size: u64, formatter: &Formatter) -> Result<TusClient, ExitCode> {
    let caps = detect_capabilities(&client)
        .await
        .map_err(|e| formatter.fail("Failed to query server capabilities", &e))?;

    require_capability(&caps, "creation").map_err(|e| formatter.fail("Cannot upload", &e))?;
    check_upload_size(&caps, size).map_err(|e| formatter.fail("Cannot upload", &e))?;

    if client.checksum_enabled() && require_capability(&caps, "checksum").is_err() {
        formatter.warning("Server does not accept sha256 checksums; sending chunks without them");
        return Ok(client.with_checksum(false));
    }
    Ok(client)
}

fn print_report(formatter: &Formatter, source: &Path, target: &RemotePath, report: &TransferReport) {
    if formatter.is_json() {
        formatter.json(report);
        return;
    }

    let retries = match report.attempts {
        1 => String::new(),
        n => format!(" after {n} attempts"),
    };
    formatter.success(&format!(
        "{} -> {} ({}){retries}",
        source.display(),
        target,
        report.size_human
    ));
}
