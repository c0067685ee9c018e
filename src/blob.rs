use bytes::Bytes;
use futures_util::stream;

use crate::{BlobMetadata, ByteStream, FilerResult};

/// A named byte payload plus its metadata
///
/// A blob owns exactly one content stream: the upload source handed in by
/// the caller, or the download result returned by [`Catalog::get`]. Dropping
/// a downloaded blob releases the underlying transport connection whether or
/// not the stream was fully consumed.
///
/// [`Catalog::get`]: crate::Catalog::get
pub struct Blob {
    metadata: BlobMetadata,
    content: ByteStream,
}

impl Blob {
    /// Create a blob from metadata and a content stream
    pub fn new(metadata: BlobMetadata, content: ByteStream) -> Self {
        Self { metadata, content }
    }

    /// Create a blob around an in-memory payload
    ///
    /// The metadata size hint is set from the payload length so push
    /// progress can be computed.
    pub fn from_bytes<S, B>(name: S, payload: B) -> FilerResult<Self>
    where
        S: Into<String>,
        B: Into<Bytes>,
    {
        let payload = payload.into();
        let metadata = BlobMetadata::new(name)?.with_size_hint(payload.len() as u64);
        let content: ByteStream = Box::pin(stream::once(async move { Ok(payload) }));
        Ok(Self { metadata, content })
    }

    pub fn metadata(&self) -> &BlobMetadata {
        &self.metadata
    }

    /// Consume the blob, returning its content stream
    pub fn into_content(self) -> ByteStream {
        self.content
    }

    /// Consume the blob, returning metadata and content stream
    pub fn into_parts(self) -> (BlobMetadata, ByteStream) {
        (self.metadata, self.content)
    }
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
