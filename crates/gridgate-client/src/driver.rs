//! Trait seams for the connection factory and the resolved backend handle.
//!
//! The actual transport and the chunk/metadata persistence protocol live
//! behind these traits; the cache and the engine only ever see them as
//! opaque services. [`memory`](crate::memory) ships a reference
//! implementation for tests and local development.

use std::sync::Arc;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;
use uuid::Uuid;

use crate::{Error, Result, StorageTarget};

/// Shared handle to a resolved backend connection.
pub type ClientHandle = Arc<dyn GridClient>;

/// Storage parameters for a single object, resolved before the write starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileParams {
    /// Generated object identifier
    pub id: Uuid,
    /// Stored filename
    pub filename: String,
    /// Target bucket name
    pub bucket: String,
    /// Chunk size in bytes for the binary payload
    pub chunk_size: u32,
    /// Caller-supplied metadata document, if any
    pub metadata: Option<serde_json::Value>,
    /// MIME content type
    pub content_type: String,
}

/// What the backend reports after a completed write.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Total bytes persisted
    pub size: u64,
    /// Backend timestamp of the completed write
    pub upload_date: jiff::Timestamp,
}

/// A resolved connection to a grid storage backend.
#[async_trait::async_trait]
pub trait GridClient: Send + Sync {
    /// Open a chunked write stream for `params`, consume `reader` to
    /// completion, and persist the chunks plus the metadata document.
    async fn store(
        &self,
        params: &FileParams,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<StoredObject>;

    /// Remove a stored object's chunks and metadata.
    ///
    /// Returns [`Error::ObjectNotFound`] when the backend has no object
    /// under `id` in `bucket`.
    async fn delete(&self, bucket: &str, id: &Uuid) -> Result<()>;

    /// Asynchronous errors reported by the underlying connection after it
    /// became ready.
    ///
    /// `None` when the transport has no such channel; that is the default.
    fn error_stream(&self) -> Option<BoxStream<'static, Error>> {
        None
    }
}

/// Factory for establishing backend connections.
///
/// Invoked at most once per cache entry and never retried in place; after a
/// failed entry is evicted, the next request with the same key creates a
/// fresh entry and a fresh `connect` call.
#[async_trait::async_trait]
pub trait GridDriver: Send + Sync + 'static {
    /// Establish a connection to `target`.
    ///
    /// The target's option map carries the caller's transport options
    /// verbatim; drivers pick out what they understand and ignore the rest.
    async fn connect(&self, target: &StorageTarget) -> Result<ClientHandle>;
}
