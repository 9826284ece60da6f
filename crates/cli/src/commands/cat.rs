//! cat command - Display stored file contents
//!
//! Streams a stored file from the download endpoint to stdout.

use clap::Args;
use tf_core::parse_remote_path;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Display stored file contents
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Stored path (alias/path)
    pub path: String,
}

/// Execute the cat command
pub async fn execute(args: CatArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let path = match parse_remote_path(&args.path) {
        Ok(p) => p,
        Err(e) => return formatter.fail("Invalid path", &e),
    };

    let (_, client) = match super::connect(&path.alias, &formatter) {
        Ok(connected) => connected,
        Err(code) => return code,
    };

    let download = match client.open_download(&path.key).await {
        Ok(d) => d,
        Err(e) => return formatter.fail(&format!("Failed to read {path}"), &e),
    };

    // Raw bytes bypass the formatter
    let mut stdout = tokio::io::stdout();
    match download.copy_to(&mut stdout).await {
        Ok(_) => ExitCode::Success,
        Err(e) => formatter.fail(&format!("Failed to read {path}"), &e),
    }
}
