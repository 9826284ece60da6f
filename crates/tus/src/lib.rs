//! tf-tus: tus protocol adapter for the tf CLI
//!
//! This crate implements the TusTransport trait from tf-core over HTTP
//! using reqwest. It is the only crate that speaks the wire protocol.

pub mod capability;
pub mod client;
pub mod download;
pub mod metadata;

pub use capability::{check_upload_size, detect_capabilities, require_capability};
pub use client::{TUS_VERSION, TusClient, checksum_header};
pub use download::Download;
pub use metadata::encode_metadata;
