//! Wire-level mapping between the filer HTTP API and domain entities
//!
//! Listing responses are JSON with PascalCase fields; per-blob metadata on
//! upload/download travels in HTTP headers. TTL is a seconds-denominated
//! header; each extended header value is one `seaweed-ext-{key}` field
//! occurrence.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, CONTENT_LENGTH, LAST_MODIFIED};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::{BlobMetadata, ExtendedHeaders, FilerError, Ttl};

/// Seconds-denominated TTL header, absent when the blob never expires
pub(crate) const TTL_HEADER: &str = "seaweed-ttl";

/// Prefix distinguishing caller-defined extended headers from transport headers
pub(crate) const EXTENDED_HEADER_PREFIX: &str = "seaweed-ext-";

/// Directory listing payload returned by `GET {prefix}/`
#[derive(Debug, Deserialize)]
pub(crate) struct ListingResponse {
    #[serde(rename = "Path", default)]
    pub path: String,
    /// The filer serializes an empty directory as `null`
    #[serde(rename = "Entries", default)]
    pub entries: Option<Vec<ListingEntry>>,
}

/// One entry of a directory listing
#[derive(Debug, Deserialize)]
pub(crate) struct ListingEntry {
    #[serde(rename = "FullPath")]
    pub full_path: String,
    #[serde(rename = "FileSize", default)]
    pub file_size: u64,
    #[serde(rename = "Crtime", default)]
    pub crtime: Option<DateTime<Utc>>,
    #[serde(rename = "TtlSec", default)]
    pub ttl_sec: u64,
    #[serde(rename = "Extended", default)]
    pub extended: Option<BTreeMap<String, Vec<String>>>,
}

impl ListingEntry {
    /// Adapt a listing entry into blob metadata relative to `prefix`
    pub(crate) fn into_metadata(self, prefix: &str) -> BlobMetadata {
        let name = self
            .full_path
            .strip_prefix(prefix)
            .map(|rest| rest.trim_start_matches('/'))
            .filter(|rest| !rest.is_empty())
            .unwrap_or_else(|| basename(&self.full_path))
            .to_string();
        let mut extended = ExtendedHeaders::new();
        for (key, values) in self.extended.unwrap_or_default() {
            if let Some(stripped) = strip_extended_prefix(&key) {
                extended.entry(stripped.to_string()).or_default().extend(values);
            }
        }
        BlobMetadata {
            name,
            file_size: self.file_size,
            created_at: self.crtime,
            ttl: Ttl::seconds(self.ttl_sec),
            extended,
        }
    }
}

/// Confirmation payload returned by the store after an upload
#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Build blob metadata from the headers of a download response
pub(crate) fn metadata_from_headers(name: &str, headers: &HeaderMap) -> BlobMetadata {
    let file_size = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let created_at = headers
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
        .map(|dt| dt.with_timezone(&Utc));
    let ttl = headers
        .get(TTL_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .map(Ttl::seconds)
        .unwrap_or(Ttl::INFINITE);

    let mut extended = ExtendedHeaders::new();
    for (header_name, value) in headers {
        if let Some(key) = strip_extended_prefix(header_name.as_str()) {
            if let Ok(value) = value.to_str() {
                extended
                    .entry(key.to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }
    }

    BlobMetadata {
        name: name.to_string(),
        file_size,
        created_at,
        ttl,
        extended,
    }
}

/// Map a non-success response status to the error taxonomy
///
/// 404 only means "not found" where the caller says so; list and delete
/// treat it as an empty directory / already gone instead.
pub(crate) fn reject(status: StatusCode, body: &str, not_found: Option<&str>) -> FilerError {
    if status == StatusCode::NOT_FOUND {
        if let Some(name) = not_found {
            return FilerError::not_found(name);
        }
    }
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    } else {
        body.trim().to_string()
    };
    FilerError::server_rejected(status.as_u16(), message)
}

fn strip_extended_prefix(key: &str) -> Option<&str> {
    let head = key.get(..EXTENDED_HEADER_PREFIX.len())?;
    if !head.eq_ignore_ascii_case(EXTENDED_HEADER_PREFIX) {
        return None;
    }
    let rest = &key[EXTENDED_HEADER_PREFIX.len()..];
    (!rest.is_empty()).then_some(rest)
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
