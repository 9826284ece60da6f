//! info command - Server capabilities
//!
//! Sends OPTIONS to the upload endpoint and shows the advertised protocol
//! versions, extensions, size limit and checksum algorithms.

use clap::Args;
use serde::Serialize;
use tf_core::Capabilities;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Show server capabilities
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Alias name of the server
    pub alias: String,
}

/// JSON output for server capabilities
#[derive(Serialize)]
struct InfoOutput {
    alias: String,
    endpoint: String,
    download: String,
    #[serde(flatten)]
    capabilities: Capabilities,
}

/// Execute the info command
pub async fn execute(args: InfoArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let (alias, client) = match super::connect(&args.alias, &formatter) {
        Ok(connected) => connected,
        Err(code) => return code,
    };

    let capabilities = match tf_tus::detect_capabilities(&client).await {
        Ok(caps) => caps,
        Err(e) => return formatter.fail("Failed to query server capabilities", &e),
    };

    let output = InfoOutput {
        alias: alias.name,
        endpoint: client.endpoint().to_string(),
        download: client.endpoint().download_base().to_string(),
        capabilities,
    };

    if formatter.is_json() {
        formatter.json(&output);
    } else {
        formatter.println(&render(&formatter, &output));
    }
    ExitCode::Success
}

fn render(formatter: &Formatter, output: &InfoOutput) -> String {
    let caps = &output.capabilities;
    let join = |values: &[String]| {
        if values.is_empty() {
            "-".to_string()
        } else {
            values.join(", ")
        }
    };

    let mut table = formatter.table(&["Property", "Value"]);
    table.add_row(vec!["Alias".to_string(), output.alias.clone()]);
    table.add_row(vec!["Upload URL".to_string(), output.endpoint.clone()]);
    table.add_row(vec!["Download URL".to_string(), output.download.clone()]);
    table.add_row(vec!["Versions".to_string(), join(&caps.versions)]);
    table.add_row(vec!["Extensions".to_string(), join(&caps.extensions)]);
    table.add_row(vec![
        "Max size".to_string(),
        caps.max_size
            .map(|max| humansize::format_size(max, humansize::BINARY))
            .unwrap_or_else(|| "unlimited".to_string()),
    ]);
    table.add_row(vec!["Checksums".to_string(), join(&caps.checksum_algorithms)]);
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_capabilities() {
        let output = InfoOutput {
            alias: "local".into(),
            endpoint: "http://localhost:1080/files".into(),
            download: "http://localhost:1080/download".into(),
            capabilities: Capabilities {
                versions: vec!["1.0.0".into()],
                extensions: vec!["creation".into(), "checksum".into()],
                max_size: None,
                checksum_algorithms: Vec::new(),
            },
        };

        let rendered = render(&Formatter::default(), &output);
        assert!(rendered.contains("creation, checksum"));
        assert!(rendered.contains("unlimited"));
        assert!(rendered.contains("http://localhost:1080/download"));
    }

    #[test]
    fn test_json_output_is_flat() {
        let output = InfoOutput {
            alias: "local".into(),
            endpoint: "e".into(),
            download: "d".into(),
            capabilities: Capabilities {
                max_size: Some(10),
                ..Default::default()
            },
        };
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["max_size"], 10);
        assert_eq!(value["alias"], "local");
    }
}
