//! tf-core: Core library for the tf resumable upload client
//!
//! This crate provides the core functionality for tf, including:
//! - Configuration and alias management
//! - Endpoint validation and path parsing
//! - The TusTransport trait for resumable-upload protocol operations
//! - Upload sessions, the resumable write stream and the retrying uploader
//!
//! This crate is designed to be independent of any specific HTTP client,
//! allowing the upload logic to be tested against in-memory transports.

pub mod alias;
pub mod backoff;
pub mod config;
pub mod error;
pub mod path;
pub mod session;
pub mod stream;
pub mod traits;
pub mod upload;

pub use alias::{Alias, AliasManager, BackoffKind, RetryConfig, TimeoutConfig, UploadConfig};
pub use backoff::{Backoff, ExponentialBackoff, FixedBackoff};
pub use config::{Config, ConfigManager};
pub use error::{Error, Result};
pub use path::{Endpoint, ParsedPath, RemotePath, clean_path, parse_path, parse_remote_path};
pub use session::{UploadMetadata, UploadSession};
pub use stream::UploadStream;
pub use traits::{Capabilities, TusTransport};
pub use upload::{TransferReport, UploadState, Uploader};
