//! In-memory reference backend for tests and local development.
//!
//! [`MemoryGrid`] implements the chunk/metadata persistence contract over a
//! plain map: payloads are split into `chunk_size` pieces and kept alongside
//! their [`FileParams`]. It is not a production backend; it exists so the
//! cache, the engine, and downstream users can be exercised without a
//! running storage cluster.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use uuid::Uuid;

use crate::{ClientHandle, Error, FileParams, GridClient, GridDriver, Result, StorageTarget, StoredObject};

/// Tracing target for memory backend operations.
const TRACING_TARGET: &str = "gridgate_client::memory";

/// A stored object: resolved parameters plus the chunked payload.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// Parameters the object was stored under
    pub params: FileParams,
    /// Payload split into `chunk_size` pieces
    pub chunks: Vec<Bytes>,
    /// Total payload size in bytes
    pub size: u64,
    /// Timestamp of the completed write
    pub upload_date: jiff::Timestamp,
}

/// In-memory grid storage client.
#[derive(Debug, Default)]
pub struct MemoryGrid {
    buckets: Mutex<HashMap<String, HashMap<Uuid, StoredRecord>>>,
}

impl MemoryGrid {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a stored object.
    pub fn record(&self, bucket: &str, id: &Uuid) -> Option<StoredRecord> {
        self.lock().get(bucket).and_then(|objects| objects.get(id)).cloned()
    }

    /// Number of objects currently stored in `bucket`.
    pub fn object_count(&self, bucket: &str) -> usize {
        self.lock().get(bucket).map_or(0, HashMap::len)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, HashMap<Uuid, StoredRecord>>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl GridClient for MemoryGrid {
    async fn store(
        &self,
        params: &FileParams,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<StoredObject> {
        let mut payload = Vec::new();
        reader
            .read_to_end(&mut payload)
            .await
            .map_err(|e| Error::operation("store", e.to_string()))?;

        let chunk_size = (params.chunk_size as usize).max(1);
        let chunks: Vec<Bytes> = payload.chunks(chunk_size).map(Bytes::copy_from_slice).collect();
        let size = payload.len() as u64;
        let upload_date = jiff::Timestamp::now();

        tracing::debug!(
            target: TRACING_TARGET,
            bucket = %params.bucket,
            id = %params.id,
            filename = %params.filename,
            size,
            chunks = chunks.len(),
            "stored object"
        );

        self.lock().entry(params.bucket.clone()).or_default().insert(
            params.id,
            StoredRecord {
                params: params.clone(),
                chunks,
                size,
                upload_date,
            },
        );

        Ok(StoredObject { size, upload_date })
    }

    async fn delete(&self, bucket: &str, id: &Uuid) -> Result<()> {
        let removed = self
            .lock()
            .get_mut(bucket)
            .and_then(|objects| objects.remove(id));

        match removed {
            Some(_) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    bucket = %bucket,
                    id = %id,
                    "deleted object"
                );
                Ok(())
            }
            None => Err(Error::object_not_found(bucket, id)),
        }
    }
}

/// Driver handing out a shared [`MemoryGrid`].
///
/// Counts connection attempts so tests can assert the cache's
/// single-attempt guarantee, and can be configured to fail or to delay so
/// waiter behavior is observable.
#[derive(Debug)]
pub struct MemoryGridDriver {
    grid: Arc<MemoryGrid>,
    attempts: AtomicUsize,
    failure: Option<String>,
    connect_delay: Option<Duration>,
}

impl MemoryGridDriver {
    /// A driver that always connects to a fresh shared store.
    pub fn new() -> Self {
        Self {
            grid: Arc::new(MemoryGrid::new()),
            attempts: AtomicUsize::new(0),
            failure: None,
            connect_delay: None,
        }
    }

    /// A driver whose every connection attempt fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::new()
        }
    }

    /// Delay each connection attempt, keeping entries Pending long enough
    /// for tests to pile up waiters.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    /// Number of `connect` calls made so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// The shared store this driver connects to.
    pub fn grid(&self) -> Arc<MemoryGrid> {
        self.grid.clone()
    }
}

impl Default for MemoryGridDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GridDriver for MemoryGridDriver {
    async fn connect(&self, target: &StorageTarget) -> Result<ClientHandle> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = &self.failure {
            return Err(Error::connection(reason.clone()));
        }

        tracing::debug!(
            target: TRACING_TARGET,
            storage = %target,
            attempt = self.attempts(),
            "memory grid connected"
        );
        Ok(self.grid.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(chunk_size: u32) -> FileParams {
        FileParams {
            id: Uuid::new_v4(),
            filename: "report.bin".to_string(),
            bucket: "fs".to_string(),
            chunk_size,
            metadata: None,
            content_type: "application/octet-stream".to_string(),
        }
    }

    #[tokio::test]
    async fn store_splits_payload_into_chunks() {
        let grid = MemoryGrid::new();
        let params = params(4);
        let mut reader = std::io::Cursor::new(b"abcdefghij".to_vec());

        let stored = grid.store(&params, &mut reader).await.unwrap();
        assert_eq!(stored.size, 10);

        let record = grid.record("fs", &params.id).unwrap();
        assert_eq!(record.chunks.len(), 3);
        assert_eq!(record.chunks[0], Bytes::from_static(b"abcd"));
        assert_eq!(record.chunks[2], Bytes::from_static(b"ij"));
    }

    #[tokio::test]
    async fn delete_missing_object_errors() {
        let grid = MemoryGrid::new();
        let params = params(16);
        let mut reader = std::io::Cursor::new(b"payload".to_vec());
        grid.store(&params, &mut reader).await.unwrap();

        grid.delete("fs", &params.id).await.unwrap();
        assert!(matches!(
            grid.delete("fs", &params.id).await,
            Err(Error::ObjectNotFound { .. })
        ));
        assert_eq!(grid.object_count("fs"), 0);
    }

    #[tokio::test]
    async fn failing_driver_counts_attempts() {
        let driver = MemoryGridDriver::failing("connection refused");
        let target = StorageTarget::parse("grid://h1/db").unwrap();

        let outcome = driver.connect(&target).await;
        assert!(matches!(outcome, Err(Error::Connection { .. })));
        assert_eq!(driver.attempts(), 1);
    }
}
