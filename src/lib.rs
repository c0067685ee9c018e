//! # seaweed-filer: async catalog/blob client for a SeaweedFS filer
//!
//! `seaweed-filer` gives applications a typed, streaming-first view of a
//! remote filer: directory-scoped **catalogs** of named **blobs** with
//! creation time, TTL and caller-defined extended metadata, uploaded and
//! downloaded as byte streams without buffering whole payloads in memory.
//!
//! ## Key features
//!
//! - **Streaming-first**: push and get move bounded chunks end to end
//! - **Out-of-band progress**: percentage updates flow through a bounded
//!   channel that never blocks or fails a transfer
//! - **Typed failures**: not-found, transport, server-rejected and
//!   write-aborted are distinct, so callers can decide to retry or abort
//! - **Round-tripped metadata**: TTL and multi-valued extended headers are
//!   attached on push and come back on list/get
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use seaweed_filer::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> FilerResult<()> {
//! // 1. One store per process, catalogs per directory
//! let store = FilerStore::new("http://localhost:8888")?;
//! let catalog = store.get_catalog("/documents")?;
//!
//! // 2. Push a blob with a TTL and an owner tag
//! let (metadata, content) = Blob::from_bytes("hello.txt", &b"hello"[..])?.into_parts();
//! let metadata = metadata.with_ttl(Ttl::days(7)).with_header("owner", "u1")?;
//! let blob = Blob::new(metadata, content);
//!
//! let (progress, mut updates) = store.progress_channel();
//! tokio::spawn(async move {
//!     while let Some(percent) = updates.recv().await {
//!         println!("upload: {percent}%");
//!     }
//! });
//! let confirmed = catalog.push(blob, Some(progress), UploadOptions::new()).await?;
//! println!("stored {} ({} bytes)", confirmed.name, confirmed.file_size);
//!
//! // 3. List and fetch
//! for entry in catalog.list().await? {
//!     println!("{} ttl={}", entry.name, entry.ttl);
//! }
//! let downloaded = catalog.get("hello.txt", None).await?;
//! # drop(downloaded);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  FilerStore  │  ← shared transport, one per process
//! ├──────────────┤
//! │   Catalog    │  ← one per directory prefix: list/push/get/delete
//! ├──────────────┤
//! │ Blob + wire  │  ← streams, metadata mapping, error taxonomy
//! └──────────────┘
//! ```
//!
//! The crate is a client only: replication, volume placement and expiry are
//! the store's business. It emits `tracing` events but never configures a
//! subscriber, and performs no retries of its own: wrap the injected
//! `reqwest::Client` if you need a resiliency layer.

mod blob;
mod catalog;
mod config;
mod error;
mod progress;
mod store;
mod types;
mod wire;

pub use blob::Blob;
pub use catalog::Catalog;
pub use config::FilerConfig;
pub use error::{FilerError, FilerResult};
pub use progress::{ProgressReceiver, TransferProgress, DEFAULT_PROGRESS_CAPACITY};
pub use store::FilerStore;
pub use types::{
    validate_extended_key, validate_name, validate_prefix, BlobMetadata, ByteStream,
    ExtendedHeaders, Ttl, UploadOptions,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Blob, BlobMetadata, ByteStream, Catalog, FilerConfig, FilerError, FilerResult,
        FilerStore, TransferProgress, Ttl, UploadOptions,
    };
}
