//! Capability detection for tus servers
//!
//! Servers advertise their protocol versions and extensions in response to
//! OPTIONS. Optional behavior (checksums, size limits) is decided from that.

use reqwest::Method;
use tracing::debug;

use tf_core::{Capabilities, Error, Result};

use crate::client::{TusClient, check_status, transport_error};

const TUS_VERSION_HEADER: &str = "Tus-Version";
const TUS_EXTENSION_HEADER: &str = "Tus-Extension";
const TUS_MAX_SIZE_HEADER: &str = "Tus-Max-Size";
const TUS_CHECKSUM_ALGORITHM_HEADER: &str = "Tus-Checksum-Algorithm";

/// Probe the server with an OPTIONS request
pub async fn detect_capabilities(client: &TusClient) -> Result<Capabilities> {
    let url = client.endpoint().files_url().clone();
    let response = client
        .http()
        .request(Method::OPTIONS, url)
        .send()
        .await
        .map_err(transport_error)?;
    let response = check_status(response, "query capabilities").await?;

    let headers = response.headers();
    let list = |name: &str| -> Vec<String> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(split_list)
            .unwrap_or_default()
    };

    let max_size = match headers.get(TUS_MAX_SIZE_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .ok_or_else(|| {
                    Error::InvalidResponse(format!("{TUS_MAX_SIZE_HEADER} header is not a number"))
                })?,
        ),
        None => None,
    };

    let caps = Capabilities {
        versions: list(TUS_VERSION_HEADER),
        extensions: list(TUS_EXTENSION_HEADER),
        max_size,
        checksum_algorithms: list(TUS_CHECKSUM_ALGORITHM_HEADER),
    };
    debug!(?caps, "Detected server capabilities");
    Ok(caps)
}

/// Check if a feature is supported, returning an appropriate error
pub fn require_capability(caps: &Capabilities, feature: &str) -> Result<()> {
    let supported = match feature {
        "checksum" => caps.supports_checksum(crate::client::CHECKSUM_ALGORITHM),
        other => caps.supports_extension(other),
    };

    if supported {
        Ok(())
    } else {
        Err(Error::UnsupportedFeature(format!(
            "The server does not support '{feature}'"
        )))
    }
}

/// Reject uploads larger than the advertised maximum
pub fn check_upload_size(caps: &Capabilities, size: u64) -> Result<()> {
    match caps.max_size {
        Some(max) if size > max => Err(Error::Validation(format!(
            "Upload of {size} bytes exceeds server maximum of {max} bytes"
        ))),
        _ => Ok(()),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
