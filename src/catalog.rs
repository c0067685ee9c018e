use async_stream::try_stream;
use futures_util::StreamExt;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED};
use reqwest::{Body, StatusCode, Url};
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};

use crate::progress::ProgressMeter;
use crate::store::Transport;
use crate::types::{validate_extended_key, validate_name};
use crate::wire::{self, ListingResponse, UploadResponse, EXTENDED_HEADER_PREFIX, TTL_HEADER};
use crate::{Blob, BlobMetadata, FilerError, FilerResult, TransferProgress, UploadOptions};

/// Client-side handle bound to one remote path prefix
///
/// A catalog translates logical blob operations into HTTP requests against
/// the filer and adapts the wire responses into domain entities. It holds no
/// mutable state; concurrent operations against the same catalog are safe,
/// though two writers pushing the same name race with last-writer-wins
/// decided by the store.
#[derive(Clone)]
pub struct Catalog {
    transport: Arc<Transport>,
    prefix: String,
}

impl Catalog {
    pub(crate) fn new(transport: Arc<Transport>, prefix: String) -> Self {
        Self { transport, prefix }
    }

    /// The path prefix this catalog is bound to
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// List the blobs under this catalog's prefix
    ///
    /// A prefix that does not exist on the store is an empty directory, not
    /// an error; order is whatever the store returns.
    #[instrument(skip(self), fields(prefix = %self.prefix))]
    pub async fn list(&self) -> FilerResult<Vec<BlobMetadata>> {
        let url = self.listing_url();
        let response = self
            .transport
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(FilerError::transport)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(wire::reject(status, &body, None));
        }

        let listing: ListingResponse = response.json().await.map_err(FilerError::transport)?;
        let strip = self.prefix.trim_end_matches('/').to_string();
        let entries: Vec<BlobMetadata> = listing
            .entries
            .unwrap_or_default()
            .into_iter()
            .map(|entry| entry.into_metadata(&strip))
            .collect();
        debug!(path = %listing.path, count = entries.len(), "listed catalog");
        Ok(entries)
    }

    /// Stream a blob to the store
    ///
    /// The source stream is consumed in the chunks it yields; cumulative
    /// progress is reported against the metadata size hint, capped at 99%
    /// until the store confirms the upload. A source-stream failure aborts
    /// the request as a single unit and surfaces as
    /// [`FilerError::WriteAborted`]; the store never finalizes the entry.
    /// On success the returned metadata carries the store-confirmed size.
    #[instrument(
        skip(self, blob, progress, options),
        fields(prefix = %self.prefix, name = %blob.metadata().name)
    )]
    pub async fn push(
        &self,
        blob: Blob,
        progress: Option<TransferProgress>,
        options: UploadOptions,
    ) -> FilerResult<BlobMetadata> {
        let (metadata, content) = blob.into_parts();
        validate_name(&metadata.name)?;
        for key in metadata.extended.keys() {
            validate_extended_key(key)?;
        }

        let ttl = options.ttl.unwrap_or(metadata.ttl);
        let url = self.url_for(&metadata.name);
        let total = metadata.file_size;

        // Records why the source stream failed, so a body abort can be told
        // apart from a transport failure after the fact.
        let aborted: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let aborted_slot = Arc::clone(&aborted);
        // a size hint of zero means "unknown" on the upload side
        let mut meter = ProgressMeter::new(progress.clone(), (total > 0).then_some(total));
        let counted = content.map(move |chunk| match chunk {
            Ok(bytes) => {
                meter.record(bytes.len() as u64);
                Ok(bytes)
            }
            Err(err) => {
                if let Ok(mut slot) = aborted_slot.lock() {
                    *slot = Some(err.to_string());
                }
                Err(err)
            }
        });

        let mut request = self.transport.client.put(url);
        if !ttl.is_infinite() {
            request = request.header(TTL_HEADER, ttl.as_secs().to_string());
        }
        if let Some(content_type) = &options.content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        for (key, values) in &metadata.extended {
            let header = extended_header_name(key)?;
            for value in values {
                let value = HeaderValue::try_from(value.as_str()).map_err(|_| {
                    FilerError::invalid(format!("extended header value for {key:?} is not valid"))
                })?;
                request = request.header(header.clone(), value);
            }
        }

        let response = match request.body(Body::wrap_stream(counted)).send().await {
            Ok(response) => response,
            Err(err) => {
                if let Some(reason) = aborted.lock().ok().and_then(|mut slot| slot.take()) {
                    return Err(FilerError::write_aborted(reason));
                }
                return Err(FilerError::transport(err));
            }
        };

        let status = response.status();
        if !status.is_success() {
            // A source-stream failure may race the store's error response;
            // the abort is the primary cause either way.
            if let Some(reason) = aborted.lock().ok().and_then(|mut slot| slot.take()) {
                return Err(FilerError::write_aborted(reason));
            }
            let body = response.text().await.unwrap_or_default();
            return Err(wire::reject(status, &body, None));
        }

        let created_at = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| chrono::DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(chrono::Utc::now);

        let confirmation: UploadResponse =
            response.json().await.map_err(FilerError::transport)?;
        if let Some(error) = confirmation.error {
            return Err(FilerError::server_rejected(status.as_u16(), error));
        }
        debug!(size = ?confirmation.size, "push confirmed");

        // The store has finalized the blob; the single 100% goes out now.
        if let Some(progress) = &progress {
            progress.report(100);
        }

        Ok(BlobMetadata {
            name: confirmation.name.unwrap_or(metadata.name),
            file_size: confirmation.size.unwrap_or(total),
            created_at: Some(created_at),
            ttl,
            extended: metadata.extended,
        })
    }

    /// Fetch a blob as a stream positioned at offset zero
    ///
    /// Metadata comes from the response headers. Download progress is
    /// reported as the caller drains the stream, computed against
    /// `Content-Length`; with no declared length, reporting is skipped.
    /// Dropping the blob releases the connection at any point.
    #[instrument(skip(self, progress), fields(prefix = %self.prefix, name = %name))]
    pub async fn get(&self, name: &str, progress: Option<TransferProgress>) -> FilerResult<Blob> {
        validate_name(name)?;
        let url = self.url_for(name);
        let response = self
            .transport
            .client
            .get(url)
            .send()
            .await
            .map_err(FilerError::transport)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FilerError::not_found(name));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(wire::reject(status, &body, None));
        }

        let metadata = wire::metadata_from_headers(name, response.headers());
        // absent Content-Length and a zero-byte blob are different cases:
        // the former skips reporting, the latter completes at 100
        let declared = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        debug!(size = metadata.file_size, "opened blob for download");

        let mut meter = ProgressMeter::new(progress, declared);
        let mut upstream = response.bytes_stream();
        let content = try_stream! {
            while let Some(chunk) = upstream.next().await {
                let chunk = chunk.map_err(std::io::Error::other)?;
                meter.record(chunk.len() as u64);
                yield chunk;
            }
            if declared.is_some() {
                meter.complete();
            }
        };

        Ok(Blob::new(metadata, Box::pin(content)))
    }

    /// Delete a blob by name
    ///
    /// Idempotent: deleting a name that does not exist succeeds. Exactly one
    /// DELETE request is issued.
    #[instrument(skip(self), fields(prefix = %self.prefix, name = %name))]
    pub async fn delete(&self, name: &str) -> FilerResult<()> {
        validate_name(name)?;
        let url = self.url_for(name);
        let response = self
            .transport
            .client
            .delete(url)
            .send()
            .await
            .map_err(FilerError::transport)?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            debug!("deleted blob");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(wire::reject(status, &body, None))
    }

    fn url_for(&self, name: &str) -> Url {
        let mut url = self.transport.base.clone();
        url.set_path(&format!("{}/{}", self.prefix.trim_end_matches('/'), name));
        url
    }

    fn listing_url(&self) -> Url {
        let mut url = self.transport.base.clone();
        url.set_path(&format!("{}/", self.prefix.trim_end_matches('/')));
        url
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

fn extended_header_name(key: &str) -> FilerResult<HeaderName> {
    HeaderName::try_from(format!("{EXTENDED_HEADER_PREFIX}{key}"))
        .map_err(|_| FilerError::invalid(format!("extended header key is not valid: {key:?}")))
}
