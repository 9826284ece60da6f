//! get command - Download a stored file
//!
//! Streams the download endpoint into a local file. Downloads are not
//! resumed; a failed download removes the partial file.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use tf_core::{Error, RemotePath, parse_remote_path};
use tokio::fs::OpenOptions;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, ProgressBar};

/// Download a stored file
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Stored path (alias/path)
    pub source: String,

    /// Local destination; an existing directory keeps the remote file name
    pub target: String,

    /// Replace the destination if it exists
    #[arg(long, default_value = "false")]
    pub overwrite: bool,
}

#[derive(Debug, Serialize)]
struct GetOutput {
    status: &'static str,
    source: String,
    target: String,
    size_bytes: u64,
    size_human: String,
}

/// Execute the get command
pub async fn execute(args: GetArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config.clone());

    let source = match parse_remote_path(&args.source) {
        Ok(p) => p,
        Err(e) => return formatter.fail("Invalid source path", &e),
    };

    let target = match local_target(Path::new(&args.target), &source) {
        Ok(t) => t,
        Err(e) => return formatter.fail("Invalid target path", &e),
    };

    let (_, client) = match super::connect(&source.alias, &formatter) {
        Ok(connected) => connected,
        Err(code) => return code,
    };

    let mut options = OpenOptions::new();
    options.write(true);
    if args.overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let download = match client.open_download(&source.key).await {
        Ok(d) => d,
        Err(e) => return formatter.fail(&format!("Failed to download {source}"), &e),
    };

    let mut file = match options.open(&target).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            formatter.error(&format!(
                "{} already exists. Use --overwrite to replace it.",
                target.display()
            ));
            return ExitCode::Conflict;
        }
        Err(e) => {
            return formatter.fail(
                &format!("Failed to create {}", target.display()),
                &Error::from(e),
            );
        }
    };

    let progress = match download.content_length() {
        Some(len) => ProgressBar::new(output_config, len),
        None => ProgressBar::spinner(output_config, "downloading"),
    };
    let result = copy_with_progress(download, &mut file, &progress).await;
    progress.finish_and_clear();

    match result {
        Ok(size) => {
            let output = GetOutput {
                status: "success",
                source: source.to_string(),
                target: target.display().to_string(),
                size_bytes: size,
                size_human: humansize::format_size(size, humansize::BINARY),
            };
            if formatter.is_json() {
                formatter.json(&output);
            } else {
                formatter.success(&format!(
                    "{} -> {} ({})",
                    output.source, output.target, output.size_human
                ));
            }
            ExitCode::Success
        }
        Err(e) => {
            drop(file);
            let _ = tokio::fs::remove_file(&target).await;
            formatter.fail(&format!("Failed to download {source}"), &e)
        }
    }
}

fn local_target(target: &Path, source: &RemotePath) -> tf_core::Result<PathBuf> {
    if target.as_os_str().is_empty() {
        return Err(Error::InvalidPath("Target path cannot be empty".into()));
    }
    if target.is_dir() {
        let name = source.file_name().ok_or_else(|| {
            Error::InvalidPath(format!("Cannot derive a file name from '{source}'"))
        })?;
        return Ok(target.join(name));
    }
    Ok(target.to_path_buf())
}

async fn copy_with_progress(
    mut download: tf_tus::Download,
    file: &mut tokio::fs::File,
    progress: &ProgressBar,
) -> tf_core::Result<u64> {
    use tokio::io::AsyncWriteExt;

    let mut copied = 0u64;
    while let Some(chunk) = download.chunk().await? {
        file.write_all(&chunk).await?;
        copied += chunk.len() as u64;
        progress.set_position(copied);
    }
    file.flush().await?;
    Ok(copied)
}
