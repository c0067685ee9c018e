use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_core::Stream;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::time::Duration;

use crate::{FilerError, FilerResult};

/// Stream of bytes for blob content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Time-to-live for a blob, in whole seconds
///
/// Zero means "no expiry"; the store keeps the blob until it is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ttl(u64);

impl Ttl {
    /// No expiry
    pub const INFINITE: Ttl = Ttl(0);

    pub fn seconds(secs: u64) -> Self {
        Self(secs)
    }

    pub fn minutes(mins: u64) -> Self {
        Self(mins.saturating_mul(60))
    }

    pub fn hours(hours: u64) -> Self {
        Self(hours.saturating_mul(3600))
    }

    pub fn days(days: u64) -> Self {
        Self(days.saturating_mul(86400))
    }

    /// TTL in whole seconds; zero for infinite
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn is_infinite(&self) -> bool {
        self.0 == 0
    }

    /// Expiry as a duration; `None` when the blob never expires
    pub fn to_duration(&self) -> Option<Duration> {
        if self.is_infinite() {
            None
        } else {
            Some(Duration::from_secs(self.0))
        }
    }
}

impl std::fmt::Display for Ttl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_infinite() {
            write!(f, "infinite")
        } else {
            write!(f, "{}s", self.0)
        }
    }
}

/// Caller-defined multi-valued metadata attached to a blob
///
/// Key comparison is case-sensitive; value order within a key is preserved,
/// key insertion order is not significant for equality.
pub type ExtendedHeaders = BTreeMap<String, Vec<String>>;

/// Identity and attributes of a blob within a catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMetadata {
    /// Name relative to the catalog prefix; the remote path is `prefix + "/" + name`
    pub name: String,
    /// Size in bytes; authoritative only after a successful list/get/push round trip
    pub file_size: u64,
    /// Set by the remote store on first successful push
    pub created_at: Option<DateTime<Utc>>,
    pub ttl: Ttl,
    pub extended: ExtendedHeaders,
}

impl BlobMetadata {
    /// Create metadata for a new blob, validating the name
    pub fn new<S: Into<String>>(name: S) -> FilerResult<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            file_size: 0,
            created_at: None,
            ttl: Ttl::INFINITE,
            extended: ExtendedHeaders::new(),
        })
    }

    /// Advisory size of the upload source, used for progress computation
    pub fn with_size_hint(mut self, size: u64) -> Self {
        self.file_size = size;
        self
    }

    pub fn with_ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = ttl;
        self
    }

    /// Append one value under an extended header key
    ///
    /// Keys must be lowercase HTTP header-name tokens so they survive the
    /// wire unchanged; see [`validate_extended_key`].
    pub fn with_header<K: Into<String>, V: Into<String>>(
        mut self,
        key: K,
        value: V,
    ) -> FilerResult<Self> {
        let key = key.into();
        validate_extended_key(&key)?;
        self.extended.entry(key).or_default().push(value.into());
        Ok(self)
    }
}

/// Per-push options overriding blob metadata defaults
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Overrides the metadata TTL when set
    pub ttl: Option<Ttl>,
    /// Content type hint forwarded to the store
    pub content_type: Option<String>,
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Validate a blob name relative to a catalog prefix
///
/// Names must be non-empty, relative (no leading slash) and free of empty
/// or `..` segments.
pub fn validate_name(name: &str) -> FilerResult<()> {
    if name.is_empty() {
        return Err(FilerError::invalid("blob name must not be empty"));
    }
    if name.starts_with('/') {
        return Err(FilerError::invalid(format!(
            "blob name must be relative: {name:?}"
        )));
    }
    validate_segments(name, "blob name")
}

/// Validate a catalog prefix
///
/// Prefixes must start with `/` and contain no empty or `..` segments.
/// Trailing slashes are tolerated and normalized away by the store.
pub fn validate_prefix(prefix: &str) -> FilerResult<()> {
    if !prefix.starts_with('/') {
        return Err(FilerError::invalid(format!(
            "catalog prefix must start with '/': {prefix:?}"
        )));
    }
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        // bare root "/" is allowed
        return Ok(());
    }
    validate_segments(&trimmed[1..], "catalog prefix")
}

/// Validate an extended header key
///
/// HTTP canonicalizes header names to lowercase, so mixed-case keys would
/// be silently renamed in transit; they are rejected up front instead.
pub fn validate_extended_key(key: &str) -> FilerResult<()> {
    if key.is_empty() {
        return Err(FilerError::invalid("extended header key must not be empty"));
    }
    let valid = key
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
    if !valid {
        return Err(FilerError::invalid(format!(
            "extended header key must be a lowercase HTTP token: {key:?}"
        )));
    }
    Ok(())
}

fn validate_segments(path: &str, what: &str) -> FilerResult<()> {
    for segment in path.split('/') {
        if segment.is_empty() {
            return Err(FilerError::invalid(format!(
                "{what} contains an empty path segment: {path:?}"
            )));
        }
        if segment == ".." {
            return Err(FilerError::invalid(format!(
                "{what} contains a path traversal segment: {path:?}"
            )));
        }
    }
    Ok(())
}
