//! tus client implementation
//!
//! Speaks tus 1.0.0 (core, creation and checksum extensions) over reqwest
//! and implements the TusTransport trait from tf-core.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Response, StatusCode};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use url::Url;

use tf_core::{Alias, Endpoint, Error, Result, TusTransport, UploadMetadata};

use crate::download::Download;
use crate::metadata::encode_metadata;

/// Protocol version sent with every request
pub const TUS_VERSION: &str = "1.0.0";

/// Checksum algorithm used for Upload-Checksum
pub const CHECKSUM_ALGORITHM: &str = "sha256";

pub(crate) const TUS_RESUMABLE: &str = "Tus-Resumable";
const UPLOAD_OFFSET: &str = "Upload-Offset";
const UPLOAD_LENGTH: &str = "Upload-Length";
const UPLOAD_METADATA: &str = "Upload-Metadata";
const UPLOAD_CHECKSUM: &str = "Upload-Checksum";
const OFFSET_CONTENT_TYPE: &str = "application/offset+octet-stream";

/// Status used by the checksum extension when the digest does not match
const CHECKSUM_MISMATCH: u16 = 460;

/// tus client for one alias
#[derive(Debug, Clone)]
pub struct TusClient {
    http: reqwest::Client,
    endpoint: Endpoint,
    checksum: bool,
}

impl TusClient {
    /// Create a new client from an alias configuration
    pub fn new(alias: &Alias) -> Result<Self> {
        let endpoint = alias.validate()?;
        let timeout = alias.timeout_config();

        let mut headers = HeaderMap::new();
        headers.insert(TUS_RESUMABLE, HeaderValue::from_static(TUS_VERSION));
        for (name, value) in &alias.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Validation(format!("Invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Validation(format!("Invalid value for header '{name}': {e}")))?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("tf/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .connect_timeout(Duration::from_millis(timeout.connect_ms))
            .read_timeout(Duration::from_millis(timeout.read_ms))
            .build()
            .map_err(|e| Error::General(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint,
            checksum: alias.upload_config().checksum,
        })
    }

    /// Enable or disable Upload-Checksum on PATCH requests
    pub fn with_checksum(mut self, enabled: bool) -> Self {
        self.checksum = enabled;
        self
    }

    pub fn checksum_enabled(&self) -> bool {
        self.checksum
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Open a plain GET download of a logical storage path
    ///
    /// No retry and no offset tracking; dropping the returned handle closes
    /// the connection.
    #[instrument(skip(self))]
    pub async fn open_download(&self, path: &str) -> Result<Download> {
        let url = self.endpoint.download_url(path);
        debug!(%url, "Opening download");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, &format!("GET {url}")).await?;
        Ok(Download::new(response))
    }

    fn upload_url(&self, upload_id: &str) -> Result<Url> {
        Ok(self.endpoint.files_url().join(upload_id)?)
    }
}

#[async_trait]
impl TusTransport for TusClient {
    #[instrument(skip(self, metadata))]
    async fn create_upload(&self, size: u64, metadata: &UploadMetadata) -> Result<String> {
        let mut request = self
            .http
            .post(self.endpoint.files_url().clone())
            .header(UPLOAD_LENGTH, size);
        if !metadata.is_empty() {
            request = request.header(UPLOAD_METADATA, encode_metadata(metadata)?);
        }

        let response = request.send().await.map_err(transport_error)?;
        let response = check_status(response, "create upload").await?;

        let location = header_str(&response, reqwest::header::LOCATION.as_str())?;
        let url = self.endpoint.files_url().join(location)?;
        debug!(%url, "Upload created");
        Ok(url.to_string())
    }

    #[instrument(skip(self))]
    async fn upload_offset(&self, upload_id: &str) -> Result<u64> {
        let url = self.upload_url(upload_id)?;
        let response = self.http.head(url).send().await.map_err(transport_error)?;
        let response = check_status(response, "query offset").await?;
        header_u64(&response, UPLOAD_OFFSET)
    }

    #[instrument(skip(self, data), fields(len = data.len()))]
    async fn patch(&self, upload_id: &str, offset: u64, data: Bytes) -> Result<u64> {
        let url = self.upload_url(upload_id)?;
        let mut request = self
            .http
            .patch(url)
            .header(reqwest::header::CONTENT_TYPE, OFFSET_CONTENT_TYPE)
            .header(UPLOAD_OFFSET, offset);
        if self.checksum {
            request = request.header(UPLOAD_CHECKSUM, checksum_header(&data));
        }

        let response = request.body(data).send().await.map_err(transport_error)?;
        let response = check_status(response, "patch upload").await?;
        header_u64(&response, UPLOAD_OFFSET)
    }
}

/// `sha256 <base64 digest>` for the Upload-Checksum header
pub fn checksum_header(data: &[u8]) -> String {
    format!(
        "{CHECKSUM_ALGORITHM} {}",
        STANDARD.encode(Sha256::digest(data))
    )
}

/// Classify a reqwest failure
///
/// Anything that happened on the wire is transient; a request that couldn't
/// be built never will be.
pub(crate) fn transport_error(err: reqwest::Error) -> Error {
    if err.is_builder() || err.is_redirect() {
        Error::General(err.to_string())
    } else {
        Error::Network(err.to_string())
    }
}

/// Map a non-success status to the error taxonomy
pub(crate) fn status_error(status: StatusCode, context: &str, body: &str) -> Error {
    let message = if body.is_empty() {
        context.to_string()
    } else {
        format!("{context}: {body}")
    };

    match status.as_u16() {
        CHECKSUM_MISMATCH => Error::ChecksumMismatch(message),
        401 | 403 => Error::Auth(message),
        404 | 410 => Error::NotFound(message),
        409 => Error::Conflict(message),
        code => Error::Rejected {
            status: code,
            message,
        },
    }
}

pub(crate) async fn check_status(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, context, body.trim()))
}

pub(crate) fn header_str<'r>(response: &'r Response, name: &str) -> Result<&'r str> {
    response
        .headers()
        .get(name)
        .ok_or_else(|| Error::InvalidResponse(format!("missing {name} header")))?
        .to_str()
        .map_err(|e| Error::InvalidResponse(format!("{name} header: {e}")))
}

fn header_u64(response: &Response, name: &str) -> Result<u64> {
    header_str(response, name)?
        .trim()
        .parse()
        .map_err(|e| Error::InvalidResponse(format!("{name} header: {e}")))
}
