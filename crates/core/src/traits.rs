//! TusTransport trait definition
//!
//! This trait defines the narrow interface the uploader needs from a
//! resumable-upload protocol client. It allows the upload logic to be
//! decoupled from the HTTP implementation.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::UploadMetadata;

/// Protocol features advertised by a server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Supported protocol versions, preferred first
    pub versions: Vec<String>,

    /// Supported protocol extensions (e.g. "creation", "checksum")
    pub extensions: Vec<String>,

    /// Maximum upload size accepted by the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,

    /// Checksum algorithms accepted with PATCH requests
    pub checksum_algorithms: Vec<String>,
}

impl Capabilities {
    /// Whether the server advertises an extension
    pub fn supports_extension(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(extension))
    }

    /// Whether the server accepts a checksum algorithm
    pub fn supports_checksum(&self, algorithm: &str) -> bool {
        self.supports_extension("checksum")
            && self
                .checksum_algorithms
                .iter()
                .any(|a| a.eq_ignore_ascii_case(algorithm))
    }
}

/// Trait for resumable-upload protocol operations
///
/// Implementations must report transport-level failures as
/// [`Error::Network`](crate::Error::Network) and integrity disagreements as
/// [`Error::ChecksumMismatch`](crate::Error::ChecksumMismatch); the uploader
/// retries only those two.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TusTransport: Send + Sync {
    /// Create an upload of `size` bytes and return its server-assigned id
    async fn create_upload(&self, size: u64, metadata: &UploadMetadata) -> Result<String>;

    /// Number of bytes the server has durably stored for an upload
    async fn upload_offset(&self, upload_id: &str) -> Result<u64>;

    /// Send `data` starting at `offset`; returns the server's new offset
    async fn patch(&self, upload_id: &str, offset: u64, data: Bytes) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_extensions() {
        let caps = Capabilities {
            versions: vec!["1.0.0".into()],
            extensions: vec!["creation".into(), "Checksum".into()],
            max_size: Some(1024),
            checksum_algorithms: vec!["sha1".into(), "sha256".into()],
        };
        assert!(caps.supports_extension("creation"));
        assert!(caps.supports_extension("checksum"));
        assert!(!caps.supports_extension("termination"));
        assert!(caps.supports_checksum("SHA256"));
        assert!(!caps.supports_checksum("md5"));
    }

    #[test]
    fn test_checksum_requires_extension() {
        let caps = Capabilities {
            checksum_algorithms: vec!["sha256".into()],
            ..Default::default()
        };
        assert!(!caps.supports_checksum("sha256"));
    }
}
