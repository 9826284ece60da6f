//! Endpoint and path handling
//!
//! An [`Endpoint`] is the base URL uploads are created under. Remote paths
//! have the format `alias/path/to/object`; local paths are passed through as-is.

use url::Url;

use crate::error::{Error, Result};

/// Path segment of the upload endpoint that is swapped to reach downloads
const FILES_SEGMENT: &str = "files";

/// Path segment serving plain GET downloads
const DOWNLOAD_SEGMENT: &str = "download";

/// A validated upload endpoint and the download endpoint derived from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    raw: String,
    files: Url,
    download: String,
}

impl Endpoint {
    /// Parse a base endpoint URL
    ///
    /// The URL must not end with `/`; paths are appended to it verbatim.
    pub fn parse(base: &str) -> Result<Self> {
        if base.is_empty() {
            return Err(Error::Validation("Endpoint URL cannot be empty".into()));
        }
        if base.ends_with('/') {
            return Err(Error::Validation(format!(
                "Endpoint URL must not end with '/': {base}"
            )));
        }

        let files = Url::parse(base)?;
        if files.cannot_be_a_base() {
            return Err(Error::Validation(format!(
                "Endpoint URL is not a hierarchical URL: {base}"
            )));
        }

        Ok(Self {
            raw: base.to_string(),
            download: derive_download(&files, base),
            files,
        })
    }

    /// The upload (creation) URL
    pub fn files_url(&self) -> &Url {
        &self.files
    }

    /// The base URL as configured
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Base of the download endpoint
    pub fn download_base(&self) -> &str {
        &self.download
    }

    /// Full download URL for a logical storage path
    pub fn download_url(&self, path: &str) -> String {
        format!("{}{}", self.download, clean_path(path))
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Swap the first `files` path segment for `download`
///
/// Without such a segment the configured base is used unchanged.
fn derive_download(files: &Url, raw: &str) -> String {
    let Some(segments) = files.path_segments() else {
        return raw.to_string();
    };
    let mut segments: Vec<&str> = segments.collect();
    let Some(pos) = segments.iter().position(|s| *s == FILES_SEGMENT) else {
        return raw.to_string();
    };
    segments[pos] = DOWNLOAD_SEGMENT;

    let mut download = files.clone();
    download.set_path(&format!("/{}", segments.join("/")));
    download.set_query(None);
    download.set_fragment(None);
    download.to_string()
}

/// Normalize a logical path to an absolute, slash-separated form
///
/// Empty and `.` segments are dropped and `..` never climbs above the root.
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

/// A parsed remote path: an alias plus the logical storage path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    /// Alias name
    pub alias: String,
    /// Logical storage path, without a leading slash
    pub key: String,
}

impl RemotePath {
    /// Create a new RemotePath
    pub fn new(alias: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            key: key.into().trim_start_matches('/').to_string(),
        }
    }

    /// Get the full path as a string (alias/key)
    pub fn to_full_path(&self) -> String {
        format!("{}/{}", self.alias, self.key)
    }

    /// Last path component, if any
    pub fn file_name(&self) -> Option<&str> {
        self.key.rsplit('/').next().filter(|s| !s.is_empty())
    }

    /// Join a child path component
    pub fn join(&self, child: &str) -> Self {
        let base = self.key.trim_end_matches('/');
        let key = if base.is_empty() {
            child.to_string()
        } else {
            format!("{base}/{child}")
        };
        Self::new(self.alias.clone(), key)
    }
}

impl std::fmt::Display for RemotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_full_path())
    }
}

/// Parsed path that can be either local or remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedPath {
    /// Local filesystem path
    Local(std::path::PathBuf),
    /// Remote path behind an alias
    Remote(RemotePath),
}

impl ParsedPath {
    /// Check if this is a remote path
    pub fn is_remote(&self) -> bool {
        matches!(self, ParsedPath::Remote(_))
    }

    /// Check if this is a local path
    pub fn is_local(&self) -> bool {
        matches!(self, ParsedPath::Local(_))
    }

    /// Get the remote path if this is a remote path
    pub fn as_remote(&self) -> Option<&RemotePath> {
        match self {
            ParsedPath::Remote(p) => Some(p),
            ParsedPath::Local(_) => None,
        }
    }

    /// Get the local path if this is a local path
    pub fn as_local(&self) -> Option<&std::path::PathBuf> {
        match self {
            ParsedPath::Local(p) => Some(p),
            ParsedPath::Remote(_) => None,
        }
    }
}

/// Parse a path string into a ParsedPath
///
/// Remote paths have the format: alias/path[/more]
/// Local paths are anything that:
/// - Starts with / (absolute path)
/// - Starts with ./ or ../ (relative path)
/// - Has a first component that can't be an alias name
pub fn parse_path(path: &str) -> Result<ParsedPath> {
    if path.is_empty() {
        return Err(Error::InvalidPath("Path cannot be empty".into()));
    }

    if path.starts_with('/') {
        return Ok(ParsedPath::Local(std::path::PathBuf::from(path)));
    }

    if path.starts_with("./") || path.starts_with("../") {
        return Ok(ParsedPath::Local(std::path::PathBuf::from(path)));
    }

    #[cfg(windows)]
    if path.len() >= 2 && path.chars().nth(1) == Some(':') {
        return Ok(ParsedPath::Local(std::path::PathBuf::from(path)));
    }

    match path.split_once('/') {
        None => {
            if path.contains('.') || path.contains('\\') {
                Ok(ParsedPath::Local(std::path::PathBuf::from(path)))
            } else {
                Err(Error::InvalidPath(format!(
                    "Path '{path}' is incomplete. Use format: alias/path"
                )))
            }
        }
        Some((alias, key)) => {
            if !is_valid_alias_name(alias) {
                return Ok(ParsedPath::Local(std::path::PathBuf::from(path)));
            }

            let key = key.trim_matches('/');
            if key.is_empty() {
                return Err(Error::InvalidPath(format!(
                    "Path '{path}' has no object path after the alias"
                )));
            }

            Ok(ParsedPath::Remote(RemotePath::new(alias, key)))
        }
    }
}

/// Parse a path that must be remote
pub fn parse_remote_path(path: &str) -> Result<RemotePath> {
    match parse_path(path)? {
        ParsedPath::Remote(remote) => Ok(remote),
        ParsedPath::Local(_) => Err(Error::InvalidPath(format!(
            "Expected a remote path (alias/path), got '{path}'"
        ))),
    }
}

/// Check if a string is a valid alias name
pub fn is_valid_alias_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_derives_download_url() {
        let endpoint = Endpoint::parse("https://host/files").unwrap();
        assert_eq!(endpoint.download_base(), "https://host/download");
        assert_eq!(endpoint.files_url().as_str(), "https://host/files");
    }

    #[test]
    fn test_endpoint_rejects_trailing_slash() {
        let err = Endpoint::parse("https://host/files/").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_endpoint_rejects_empty_and_garbage() {
        assert!(matches!(
            Endpoint::parse("").unwrap_err(),
            Error::Validation(_)
        ));
        assert!(matches!(
            Endpoint::parse("not a url").unwrap_err(),
            Error::InvalidUrl(_)
        ));
        assert!(matches!(
            Endpoint::parse("mailto:someone").unwrap_err(),
            Error::Validation(_)
        ));
    }

    #[test]
    fn test_endpoint_replaces_only_first_segment() {
        let endpoint = Endpoint::parse("http://localhost:1080/files/v1/files").unwrap();
        assert_eq!(
            endpoint.download_base(),
            "http://localhost:1080/download/v1/files"
        );
    }

    #[test]
    fn test_endpoint_leaves_host_alone() {
        let endpoint = Endpoint::parse("https://files.example.com/files").unwrap();
        assert_eq!(
            endpoint.download_base(),
            "https://files.example.com/download"
        );

        let endpoint = Endpoint::parse("https://files.example.com/api").unwrap();
        assert_eq!(endpoint.download_base(), "https://files.example.com/api");
    }

    #[test]
    fn test_endpoint_matches_whole_segments_only() {
        let endpoint = Endpoint::parse("https://host/filestore").unwrap();
        assert_eq!(endpoint.download_base(), "https://host/filestore");

        let endpoint = Endpoint::parse("https://host/filestore/files").unwrap();
        assert_eq!(endpoint.download_base(), "https://host/filestore/download");
        assert_eq!(
            endpoint.download_url("a.txt"),
            "https://host/filestore/download/a.txt"
        );
    }

    #[test]
    fn test_endpoint_without_files_segment() {
        let endpoint = Endpoint::parse("http://localhost:1080/uploads").unwrap();
        assert_eq!(endpoint.download_base(), "http://localhost:1080/uploads");
    }

    #[test]
    fn test_download_url_joins_clean_path() {
        let endpoint = Endpoint::parse("https://host/files").unwrap();
        assert_eq!(
            endpoint.download_url("docs/report.pdf"),
            "https://host/download/docs/report.pdf"
        );
        assert_eq!(
            endpoint.download_url("/docs//../report.pdf"),
            "https://host/download/report.pdf"
        );
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(""), "/");
        assert_eq!(clean_path("a/b"), "/a/b");
        assert_eq!(clean_path("/a/./b/"), "/a/b");
        assert_eq!(clean_path("../../a"), "/a");
        assert_eq!(clean_path("a/b/../c"), "/a/c");
    }

    #[test]
    fn test_parse_remote_path() {
        let path = parse_path("local/dir/file.txt").unwrap();
        assert!(path.is_remote());

        let remote = path.as_remote().unwrap();
        assert_eq!(remote.alias, "local");
        assert_eq!(remote.key, "dir/file.txt");
        assert_eq!(remote.file_name(), Some("file.txt"));
    }

    #[test]
    fn test_parse_remote_path_without_key() {
        assert!(parse_path("local/").is_err());
    }

    #[test]
    fn test_parse_local_absolute_path() {
        let path = parse_path("/home/user/file.txt").unwrap();
        assert!(path.is_local());
        assert_eq!(
            path.as_local().unwrap().to_str().unwrap(),
            "/home/user/file.txt"
        );
    }

    #[test]
    fn test_parse_local_relative_path() {
        assert!(parse_path("./file.txt").unwrap().is_local());
        assert!(parse_path("../file.txt").unwrap().is_local());
    }

    #[test]
    fn test_parse_empty_path() {
        assert!(parse_path("").is_err());
    }

    #[test]
    fn test_parse_alias_only() {
        assert!(parse_path("local").is_err());
    }

    #[test]
    fn test_local_path_with_dots() {
        let path = parse_path("some.file.txt");
        assert!(path.unwrap().is_local());
    }

    #[test]
    fn test_parse_remote_path_rejects_local() {
        let err = parse_remote_path("./file.txt").unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
    }

    #[test]
    fn test_remote_path_join_and_display() {
        let path = RemotePath::new("local", "backups/");
        let child = path.join("db.tar");
        assert_eq!(child.key, "backups/db.tar");
        assert_eq!(child.to_string(), "local/backups/db.tar");
    }
}
