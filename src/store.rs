use reqwest::Url;
use std::sync::Arc;

use crate::types::validate_prefix;
use crate::{
    Catalog, FilerConfig, FilerError, FilerResult, ProgressReceiver, TransferProgress,
};

/// Shared, immutable transport behind every catalog a store produces
pub(crate) struct Transport {
    pub client: reqwest::Client,
    pub base: Url,
}

/// Factory for [`Catalog`] handles sharing one configured transport
///
/// Created once at process startup and cloned freely; all catalogs reuse
/// the same connection pool.
#[derive(Clone)]
pub struct FilerStore {
    transport: Arc<Transport>,
    config: FilerConfig,
}

impl FilerStore {
    /// Connect to a filer at `base_url` with default configuration
    pub fn new(base_url: &str) -> FilerResult<Self> {
        Self::with_config(base_url, FilerConfig::default())
    }

    /// Connect to a filer with explicit configuration
    pub fn with_config(base_url: &str, config: FilerConfig) -> FilerResult<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(FilerError::transport)?;
        Self::with_client(client, base_url, config)
    }

    /// Build a store around an externally configured HTTP client
    ///
    /// Auth layers, proxies and retry middleware belong to the injected
    /// client; this crate only issues requests through it.
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        config: FilerConfig,
    ) -> FilerResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|err| FilerError::invalid(format!("invalid base url {base_url:?}: {err}")))?;
        if base.cannot_be_a_base() {
            return Err(FilerError::invalid(format!(
                "base url cannot carry paths: {base_url:?}"
            )));
        }
        if !matches!(base.path(), "" | "/") {
            return Err(FilerError::invalid(format!(
                "base url must not carry a path, bind a catalog prefix instead: {base_url:?}"
            )));
        }
        Ok(Self {
            transport: Arc::new(Transport { client, base }),
            config,
        })
    }

    /// Produce a catalog bound to `prefix`
    ///
    /// Pure: validates the prefix and shares the transport, no I/O.
    pub fn get_catalog(&self, prefix: &str) -> FilerResult<Catalog> {
        validate_prefix(prefix)?;
        let trimmed = prefix.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Ok(Catalog::new(
            Arc::clone(&self.transport),
            normalized.to_string(),
        ))
    }

    /// Create a progress channel bounded by the configured capacity
    pub fn progress_channel(&self) -> (TransferProgress, ProgressReceiver) {
        TransferProgress::channel_with_capacity(self.config.progress_capacity)
    }

    pub fn base_url(&self) -> &Url {
        &self.transport.base
    }

    pub fn config(&self) -> &FilerConfig {
        &self.config
    }
}

impl std::fmt::Debug for FilerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilerStore")
            .field("base", &self.transport.base.as_str())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FilerError;

    #[test]
    fn get_catalog_normalizes_trailing_slashes() {
        let store = FilerStore::new("http://localhost:8888").unwrap();
        let catalog = store.get_catalog("/documents/").unwrap();
        assert_eq!(catalog.prefix(), "/documents");

        let root = store.get_catalog("/").unwrap();
        assert_eq!(root.prefix(), "/");
    }

    #[test]
    fn get_catalog_rejects_bad_prefixes_without_io() {
        let store = FilerStore::new("http://localhost:8888").unwrap();
        for bad in ["", "documents", "/a/../b", "/a//b"] {
            let err = store.get_catalog(bad).unwrap_err();
            assert!(matches!(err, FilerError::InvalidArgument { .. }), "{bad:?}");
        }
    }

    #[test]
    fn base_url_with_path_is_rejected() {
        let err = FilerStore::new("http://localhost:8888/api").unwrap_err();
        assert!(matches!(err, FilerError::InvalidArgument { .. }));
    }

    #[test]
    fn base_url_must_parse() {
        let err = FilerStore::new("not a url").unwrap_err();
        assert!(matches!(err, FilerError::InvalidArgument { .. }));
    }
}
