//! Engine configuration.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use gridgate_client::{ClientHandle, GridDriver};
use serde_json::{Map, Value};

use crate::upload::FileInfoProvider;

/// How the engine participates in the process-wide connection cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// No caching; the engine gets a private connection (the default)
    #[default]
    Disabled,
    /// Share connections through the default (unnamed) cache domain
    Shared,
    /// Share connections through an isolated, named cache domain
    Named(String),
}

impl CacheMode {
    /// Whether cache participation is requested at all.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, CacheMode::Disabled)
    }

    /// The cache domain to derive keys in, when caching is enabled.
    pub fn domain(&self) -> Option<&str> {
        match self {
            CacheMode::Disabled | CacheMode::Shared => None,
            CacheMode::Named(domain) => Some(domain),
        }
    }
}

impl From<bool> for CacheMode {
    fn from(enabled: bool) -> Self {
        if enabled {
            CacheMode::Shared
        } else {
            CacheMode::Disabled
        }
    }
}

impl From<&str> for CacheMode {
    fn from(domain: &str) -> Self {
        CacheMode::Named(domain.to_string())
    }
}

impl From<String> for CacheMode {
    fn from(domain: String) -> Self {
        CacheMode::Named(domain)
    }
}

/// A caller-supplied connection, either already resolved or still pending.
pub enum ClientSource {
    /// A pre-resolved connection handle
    Handle(ClientHandle),
    /// A connection that will resolve (or fail) later
    Pending(BoxFuture<'static, gridgate_client::Result<ClientHandle>>),
}

impl std::fmt::Debug for ClientSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientSource::Handle(_) => f.write_str("ClientSource::Handle"),
            ClientSource::Pending(_) => f.write_str("ClientSource::Pending"),
        }
    }
}

/// Configuration for [`GridEngine`](crate::GridEngine) construction.
///
/// Exactly one connection source must be supplied: a connection string via
/// [`with_url`](Self::with_url) (which also requires a driver), or a
/// caller-supplied client via [`with_client`](Self::with_client) /
/// [`with_pending_client`](Self::with_pending_client). Supplying both, or
/// neither, is a configuration error at construction.
#[derive(Default)]
pub struct EngineConfig {
    pub(crate) url: Option<String>,
    pub(crate) connect_options: Map<String, Value>,
    pub(crate) cache: CacheMode,
    pub(crate) client: Option<ClientSource>,
    pub(crate) driver: Option<Arc<dyn GridDriver>>,
    pub(crate) file_info: Option<Arc<dyn FileInfoProvider>>,
}

impl EngineConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect via a multi-host connection string. Mutually exclusive with
    /// the client sources.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// The connection factory used for the `url` source.
    pub fn with_driver(mut self, driver: Arc<dyn GridDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Set a single transport option, forwarded verbatim to the driver and
    /// folded into the connection's cache identity.
    pub fn with_connect_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.connect_options.insert(key.into(), value.into());
        self
    }

    /// Replace the transport options wholesale.
    pub fn with_connect_options(mut self, options: Map<String, Value>) -> Self {
        self.connect_options = options;
        self
    }

    /// Select cache participation: `false`/`true` for off/default domain, or
    /// a domain name for an isolated pool.
    pub fn with_cache(mut self, cache: impl Into<CacheMode>) -> Self {
        self.cache = cache.into();
        self
    }

    /// Adopt a pre-resolved connection handle. Mutually exclusive with `url`.
    pub fn with_client(mut self, handle: ClientHandle) -> Self {
        self.client = Some(ClientSource::Handle(handle));
        self
    }

    /// Adopt a connection that is still being established. Mutually
    /// exclusive with `url`.
    pub fn with_pending_client<F>(mut self, pending: F) -> Self
    where
        F: Future<Output = gridgate_client::Result<ClientHandle>> + Send + 'static,
    {
        self.client = Some(ClientSource::Pending(Box::pin(pending)));
        self
    }

    /// The per-file info provider consulted before each upload.
    pub fn with_file_info(mut self, provider: impl FileInfoProvider + 'static) -> Self {
        self.file_info = Some(Arc::new(provider));
        self
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("url", &self.url)
            .field("connect_options", &self.connect_options)
            .field("cache", &self.cache)
            .field("client", &self.client)
            .field("has_driver", &self.driver.is_some())
            .field("has_file_info", &self.file_info.is_some())
            .finish()
    }
}
