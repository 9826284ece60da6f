//! Upload sessions
//!
//! A session is the server-side handle for one upload: its identity, the
//! size declared at creation and the metadata stored alongside it.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::TusTransport;

/// Key/value metadata attached to an upload at creation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadMetadata {
    entries: BTreeMap<String, String>,
}

impl UploadMetadata {
    /// Metadata key holding the logical storage path
    pub const PATH_KEY: &'static str = "Path";

    /// Metadata key holding the original file name
    pub const FILENAME_KEY: &'static str = "filename";

    /// Metadata key holding the content type
    pub const FILETYPE_KEY: &'static str = "filetype";

    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata carrying only the logical storage path
    pub fn for_path(path: impl Into<String>) -> Self {
        let mut metadata = Self::new();
        metadata.insert(Self::PATH_KEY, path);
        metadata
    }

    /// Add or replace an entry
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// The logical storage path, if set
    pub fn path(&self) -> Option<&str> {
        self.get(Self::PATH_KEY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for UploadMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Server-side handle for one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    id: String,
    declared_size: u64,
    metadata: UploadMetadata,
}

impl UploadSession {
    /// Create a new upload on the server
    ///
    /// The logical `path` is always stored in the metadata, overriding any
    /// entry under [`UploadMetadata::PATH_KEY`]. Creation is never retried.
    pub async fn create<T>(
        transport: &T,
        path: &str,
        size: u64,
        mut metadata: UploadMetadata,
    ) -> Result<Self>
    where
        T: TusTransport + ?Sized,
    {
        if size == 0 {
            return Err(Error::Validation(
                "Declared upload size must be greater than zero".into(),
            ));
        }
        if path.is_empty() {
            return Err(Error::Validation("Upload path cannot be empty".into()));
        }

        metadata.insert(UploadMetadata::PATH_KEY, path);
        let id = transport.create_upload(size, &metadata).await?;
        debug!(upload_id = %id, size, path, "Created upload session");

        Ok(Self {
            id,
            declared_size: size,
            metadata,
        })
    }

    /// Server-assigned identity
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Size declared at creation
    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    pub fn metadata(&self) -> &UploadMetadata {
        &self.metadata
    }
}
