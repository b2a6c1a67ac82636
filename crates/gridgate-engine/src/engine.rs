//! The storage engine facade handed to the host middleware.

use std::sync::Arc;

use futures::StreamExt;
use gridgate_client::{CacheEntry, CacheKey, ClientCache, EntryState, StorageTarget};
use tokio::sync::broadcast;

use crate::config::{ClientSource, EngineConfig};
use crate::events::{Event, EventBus};
use crate::upload::{self, DefaultFileInfo, FileInfoProvider, IncomingFile, StoredFile, UploadRequest};
use crate::{Error, Result};

/// Tracing target for engine lifecycle operations.
const TRACING_TARGET: &str = "gridgate_engine::engine";

/// Storage engine over a cached (or adopted) grid storage connection.
///
/// Construction never waits for the connection: the engine holds a cache
/// entry that resolves in the background, and every operation suspends on
/// that entry's outcome. Once the entry fails, the captured error is
/// replayed to each subsequent operation without a new connection attempt.
pub struct GridEngine {
    entry: Arc<CacheEntry>,
    events: EventBus,
    file_info: Arc<dyn FileInfoProvider>,
}

impl GridEngine {
    /// Construct an engine using the process-wide connection cache.
    ///
    /// Fails synchronously with [`Error::InvalidConfig`] when the
    /// configuration does not name exactly one connection source, or when
    /// its connection string does not parse. Must be called from within a
    /// tokio runtime.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_cache(ClientCache::global(), config)
    }

    /// Construct an engine against a specific cache registry.
    ///
    /// Useful for isolated pools and for tests; [`new`](Self::new) is this
    /// with [`ClientCache::global`].
    pub fn with_cache(cache: &ClientCache, config: EngineConfig) -> Result<Self> {
        let EngineConfig {
            url,
            connect_options,
            cache: cache_mode,
            client,
            driver,
            file_info,
        } = config;

        let events = EventBus::new();
        let (entry, owns_connection) = match (url, client) {
            (Some(_), Some(_)) => {
                return Err(Error::invalid_config(
                    "'url' and 'client' are mutually exclusive connection sources",
                ));
            }
            (None, None) => {
                return Err(Error::invalid_config(
                    "a connection source is required: either 'url' or 'client'",
                ));
            }
            (Some(url), None) => {
                let driver = driver.ok_or_else(|| {
                    Error::invalid_config("the 'url' connection source requires a driver")
                })?;

                let mut target = StorageTarget::parse(&url)?;
                target.merge_options(&connect_options);
                let key = CacheKey::derive(&target, cache_mode.domain());

                let entry = if cache_mode.is_enabled() {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        storage = %target,
                        key = %key,
                        "requesting cached connection"
                    );
                    cache.get_or_create(key, move || async move { driver.connect(&target).await })
                } else {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        storage = %target,
                        "opening private connection"
                    );
                    let entry = Arc::new(CacheEntry::keyed(key));
                    entry.acquire();

                    let task_entry = entry.clone();
                    tokio::spawn(async move {
                        let outcome = driver.connect(&target).await;
                        let result = match outcome {
                            Ok(handle) => task_entry.resolve(handle),
                            Err(error) => task_entry.reject(error),
                        };
                        if let Err(error) = result {
                            tracing::error!(
                                target: TRACING_TARGET,
                                error = %error,
                                "private connection entry resolved twice"
                            );
                        }
                    });
                    entry
                };
                (entry, true)
            }
            (None, Some(source)) => {
                let entry = Arc::new(CacheEntry::detached());
                entry.acquire();

                match source {
                    ClientSource::Handle(handle) => {
                        // Fresh pending entry; this cannot be a double transition.
                        let _ = entry.resolve(handle);
                    }
                    ClientSource::Pending(pending) => {
                        let task_entry = entry.clone();
                        tokio::spawn(async move {
                            let result = match pending.await {
                                Ok(handle) => task_entry.resolve(handle),
                                Err(error) => task_entry.reject(error),
                            };
                            if let Err(error) = result {
                                tracing::error!(
                                    target: TRACING_TARGET,
                                    error = %error,
                                    "adopted connection entry resolved twice"
                                );
                            }
                        });
                    }
                }
                (entry, false)
            }
        };

        let engine = Self {
            entry,
            events,
            file_info: file_info.unwrap_or_else(|| Arc::new(DefaultFileInfo)),
        };
        engine.spawn_watcher(owns_connection);
        Ok(engine)
    }

    /// Emits the at-most-once readiness events and, for engines that own
    /// their connection, forwards asynchronous backend errors.
    fn spawn_watcher(&self, owns_connection: bool) {
        let entry = self.entry.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            match entry.await_outcome().await {
                Ok(handle) => {
                    events.emit(Event::Connected);
                    if owns_connection && let Some(mut errors) = handle.error_stream() {
                        while let Some(error) = errors.next().await {
                            events.emit(Event::BackendError(error));
                        }
                    }
                }
                Err(error) => {
                    events.emit(Event::ConnectionFailed(error.into()));
                }
            }
        });
    }

    /// Current state of the backing connection.
    pub fn connection_state(&self) -> EntryState {
        self.entry.state()
    }

    /// Register an event subscriber.
    ///
    /// Only events emitted after this call are observed; subscribe before
    /// triggering the work whose outcome you want to see.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Store one incoming file.
    ///
    /// Resolves the file's storage parameters through the configured
    /// provider, suspends until the connection reaches a terminal state,
    /// then streams the payload into the backend. Connection failures are
    /// replayed immediately; per-file failures affect only this call.
    pub async fn begin_file(
        &self,
        request: &UploadRequest,
        file: IncomingFile,
    ) -> Result<StoredFile> {
        let overrides = self.file_info.file_info(request, &file).await?;
        let params = upload::resolve_params(overrides, &file);
        let handle = self.entry.await_outcome().await?;
        upload::run(handle, params, file, &self.events).await
    }

    /// Delete a previously stored file's chunks and metadata.
    pub async fn remove_file(&self, file: &StoredFile) -> Result<()> {
        let handle = self.entry.await_outcome().await?;
        handle.delete(&file.bucket, &file.id).await?;

        tracing::info!(
            target: TRACING_TARGET,
            bucket = %file.bucket,
            id = %file.id,
            filename = %file.filename,
            "removed stored file"
        );
        Ok(())
    }
}

impl Drop for GridEngine {
    fn drop(&mut self) {
        self.entry.release();
    }
}

impl std::fmt::Debug for GridEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridEngine")
            .field("connection_state", &self.connection_state())
            .finish_non_exhaustive()
    }
}
