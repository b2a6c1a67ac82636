//! Connection lifecycle behavior across engine instances.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::BoxStream;
use gridgate_client::memory::{MemoryGrid, MemoryGridDriver};
use gridgate_client::{
    ClientCache, ClientHandle, Error as ClientError, FileParams, GridClient, GridDriver,
    StorageTarget, StoredObject,
};
use gridgate_engine::prelude::*;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

async fn next_event(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Event {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[tokio::test]
async fn equivalent_urls_share_one_connection() {
    let cache = ClientCache::new();
    let driver = Arc::new(MemoryGridDriver::new().with_connect_delay(Duration::from_millis(20)));

    let first = GridEngine::with_cache(
        &cache,
        EngineConfig::new()
            .with_url("mongodb://h1:27017,h2:27017/db")
            .with_driver(driver.clone())
            .with_cache("x"),
    )
    .unwrap();
    let second = GridEngine::with_cache(
        &cache,
        EngineConfig::new()
            .with_url("mongodb://h2:27017,h1:27017/db")
            .with_driver(driver.clone())
            .with_cache("x"),
    )
    .unwrap();

    let request = UploadRequest::new("/upload");
    let (a, b) = tokio::join!(
        first.begin_file(&request, IncomingFile::from_bytes("file", b"one".to_vec())),
        second.begin_file(&request, IncomingFile::from_bytes("file", b"two".to_vec())),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(driver.attempts(), 1);
    // Both engines reached the same backing store through the shared handle.
    let grid = driver.grid();
    assert!(grid.record(&a.bucket, &a.id).is_some());
    assert!(grid.record(&b.bucket, &b.id).is_some());
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn named_domains_isolate_pools() {
    let cache = ClientCache::new();
    let driver = Arc::new(MemoryGridDriver::new());

    for domain in ["a", "b"] {
        let engine = GridEngine::with_cache(
            &cache,
            EngineConfig::new()
                .with_url("mongodb://h1:27017/db")
                .with_driver(driver.clone())
                .with_cache(domain),
        )
        .unwrap();
        engine
            .begin_file(
                &UploadRequest::new("/upload"),
                IncomingFile::from_bytes("file", b"payload".to_vec()),
            )
            .await
            .unwrap();
    }

    assert_eq!(driver.attempts(), 2);
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn uncached_engines_connect_privately() {
    let cache = ClientCache::new();
    let driver = Arc::new(MemoryGridDriver::new());

    for _ in 0..2 {
        let engine = GridEngine::with_cache(
            &cache,
            EngineConfig::new()
                .with_url("mongodb://h1:27017/db")
                .with_driver(driver.clone()),
        )
        .unwrap();
        engine
            .begin_file(
                &UploadRequest::new("/upload"),
                IncomingFile::from_bytes("file", b"payload".to_vec()),
            )
            .await
            .unwrap();
    }

    assert_eq!(driver.attempts(), 2);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn connection_failure_is_replayed_without_retry() {
    let cache = ClientCache::new();
    let driver = Arc::new(MemoryGridDriver::failing("connection refused"));

    let engine = GridEngine::with_cache(
        &cache,
        EngineConfig::new()
            .with_url("mongodb://h1:27017/db")
            .with_driver(driver.clone())
            .with_cache(true),
    )
    .unwrap();
    let mut events = engine.subscribe();

    let request = UploadRequest::new("/upload");
    let first = engine
        .begin_file(&request, IncomingFile::from_bytes("file", b"x".to_vec()))
        .await;
    assert!(first.unwrap_err().is_connection());

    // The failure is replayed; no second connection attempt happens.
    let second = engine
        .begin_file(&request, IncomingFile::from_bytes("file", b"y".to_vec()))
        .await;
    assert!(second.unwrap_err().is_connection());
    assert_eq!(driver.attempts(), 1);

    assert!(matches!(
        next_event(&mut events).await,
        Event::ConnectionFailed(_)
    ));

    // The failed entry was evicted, so the key is free for a fresh attempt.
    assert!(cache.is_empty());
}

#[tokio::test]
async fn adopted_handle_is_used_without_cache_interaction() {
    let cache = ClientCache::new();
    let grid = Arc::new(MemoryGrid::new());

    let engine = GridEngine::with_cache(
        &cache,
        EngineConfig::new().with_client(grid.clone() as ClientHandle),
    )
    .unwrap();
    let mut events = engine.subscribe();

    let stored = engine
        .begin_file(
            &UploadRequest::new("/upload"),
            IncomingFile::from_bytes("file", b"payload".to_vec()),
        )
        .await
        .unwrap();

    assert!(matches!(next_event(&mut events).await, Event::Connected));
    assert!(grid.record(&stored.bucket, &stored.id).is_some());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn pending_client_defers_uploads_until_resolution() {
    let grid = Arc::new(MemoryGrid::new());
    let pending_grid = grid.clone();

    let engine = GridEngine::new(EngineConfig::new().with_pending_client(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(pending_grid as ClientHandle)
    }))
    .unwrap();

    assert_eq!(engine.connection_state(), gridgate_client::EntryState::Pending);

    let stored = engine
        .begin_file(
            &UploadRequest::new("/upload"),
            IncomingFile::from_bytes("file", b"deferred".to_vec()),
        )
        .await
        .unwrap();

    assert!(grid.record(&stored.bucket, &stored.id).is_some());
}

#[tokio::test]
async fn pending_client_failure_fails_uploads() {
    let engine = GridEngine::new(EngineConfig::new().with_pending_client(async {
        Err(ClientError::connection("handshake rejected"))
    }))
    .unwrap();
    let mut events = engine.subscribe();

    let outcome = engine
        .begin_file(
            &UploadRequest::new("/upload"),
            IncomingFile::from_bytes("file", b"x".to_vec()),
        )
        .await;

    assert!(outcome.unwrap_err().is_connection());
    assert!(matches!(
        next_event(&mut events).await,
        Event::ConnectionFailed(_)
    ));
}

#[tokio::test]
async fn rejects_invalid_connection_sources() {
    let grid = Arc::new(MemoryGrid::new());
    let driver = Arc::new(MemoryGridDriver::new());

    // Neither source.
    assert!(matches!(
        GridEngine::new(EngineConfig::new()),
        Err(Error::InvalidConfig { .. })
    ));

    // Both sources.
    assert!(matches!(
        GridEngine::new(
            EngineConfig::new()
                .with_url("mongodb://h1/db")
                .with_driver(driver.clone())
                .with_client(grid.clone() as ClientHandle)
        ),
        Err(Error::InvalidConfig { .. })
    ));

    // URL without a driver.
    assert!(matches!(
        GridEngine::new(EngineConfig::new().with_url("mongodb://h1/db")),
        Err(Error::InvalidConfig { .. })
    ));

    // Unparseable URL.
    assert!(matches!(
        GridEngine::new(
            EngineConfig::new()
                .with_url("not a url")
                .with_driver(driver)
        ),
        Err(Error::Client(ClientError::InvalidTarget { .. }))
    ));
}

/// A client whose connection reports asynchronous errors after readiness.
struct NoisyClient {
    inner: MemoryGrid,
    errors: Mutex<Option<mpsc::Receiver<ClientError>>>,
}

#[async_trait::async_trait]
impl GridClient for NoisyClient {
    async fn store(
        &self,
        params: &FileParams,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> gridgate_client::Result<StoredObject> {
        self.inner.store(params, reader).await
    }

    async fn delete(&self, bucket: &str, id: &Uuid) -> gridgate_client::Result<()> {
        self.inner.delete(bucket, id).await
    }

    fn error_stream(&self) -> Option<BoxStream<'static, ClientError>> {
        let rx = self.errors.lock().unwrap().take()?;
        Some(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|error| (error, rx))
        })))
    }
}

struct NoisyDriver {
    client: Arc<NoisyClient>,
}

#[async_trait::async_trait]
impl GridDriver for NoisyDriver {
    async fn connect(&self, _target: &StorageTarget) -> gridgate_client::Result<ClientHandle> {
        Ok(self.client.clone())
    }
}

#[tokio::test]
async fn owned_connections_forward_backend_errors() {
    let (tx, rx) = mpsc::channel(4);
    let client = Arc::new(NoisyClient {
        inner: MemoryGrid::new(),
        errors: Mutex::new(Some(rx)),
    });

    let engine = GridEngine::new(
        EngineConfig::new()
            .with_url("mongodb://h1:27017/db")
            .with_driver(Arc::new(NoisyDriver { client })),
    )
    .unwrap();
    let mut events = engine.subscribe();

    assert!(matches!(next_event(&mut events).await, Event::Connected));

    tx.send(ClientError::connection("socket reset")).await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        Event::BackendError(ClientError::Connection { .. })
    ));
}
