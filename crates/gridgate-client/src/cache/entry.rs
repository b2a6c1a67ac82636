//! A single in-flight-or-resolved connection attempt.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::{CacheKey, ClientHandle, Error, Result};

/// Tracing target for entry lifecycle operations.
const TRACING_TARGET: &str = "gridgate_client::cache";

/// Observable lifecycle state of a [`CacheEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Connection attempt still in flight; waiters accumulate
    Pending,
    /// Connection established; handle available
    Ready,
    /// Connection attempt failed; error captured for replay
    Failed,
}

type OutcomeCallback = Box<dyn FnOnce(Result<ClientHandle>) + Send>;

enum Inner {
    Pending(Vec<OutcomeCallback>),
    Ready(ClientHandle),
    Failed(Error),
}

/// One in-flight-or-resolved connection attempt.
///
/// Entries progress `Pending → Ready | Failed` exactly once. Waiters
/// registered while Pending are flushed in registration order on the
/// transition; waiters registered afterwards receive the captured outcome
/// immediately. Entries are never reset: retry happens by evicting a failed
/// entry from its registry and creating a fresh one.
pub struct CacheEntry {
    key: Option<CacheKey>,
    refs: AtomicUsize,
    inner: Mutex<Inner>,
}

impl CacheEntry {
    /// Create a pending entry owned by a cache registry.
    pub fn keyed(key: CacheKey) -> Self {
        Self {
            key: Some(key),
            refs: AtomicUsize::new(0),
            inner: Mutex::new(Inner::Pending(Vec::new())),
        }
    }

    /// Create a pending entry that never enters a registry.
    ///
    /// Used for uncached connections and for caller-supplied handles.
    pub fn detached() -> Self {
        Self {
            key: None,
            refs: AtomicUsize::new(0),
            inner: Mutex::new(Inner::Pending(Vec::new())),
        }
    }

    /// The registry key, if this entry is cache-owned.
    pub fn key(&self) -> Option<&CacheKey> {
        self.key.as_ref()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EntryState {
        match &*self.lock() {
            Inner::Pending(_) => EntryState::Pending,
            Inner::Ready(_) => EntryState::Ready,
            Inner::Failed(_) => EntryState::Failed,
        }
    }

    /// The captured failure, if this entry has failed.
    pub fn failure(&self) -> Option<Error> {
        match &*self.lock() {
            Inner::Failed(error) => Some(error.clone()),
            _ => None,
        }
    }

    /// Register interest in this entry's outcome.
    ///
    /// While Pending the callback is queued; flush order is FIFO relative to
    /// registration. Once Ready or Failed the callback runs immediately on
    /// the caller, outside the entry lock.
    pub fn on_outcome(&self, callback: impl FnOnce(Result<ClientHandle>) + Send + 'static) {
        let outcome = {
            let mut inner = self.lock();
            match &mut *inner {
                Inner::Pending(waiters) => {
                    waiters.push(Box::new(callback));
                    return;
                }
                Inner::Ready(handle) => Ok(handle.clone()),
                Inner::Failed(error) => Err(error.clone()),
            }
        };
        callback(outcome);
    }

    /// Suspend until the entry reaches a terminal state.
    ///
    /// Resolves immediately when the outcome is already known. Returns
    /// [`Error::ConnectionAborted`] if the producing task disappears without
    /// ever resolving the entry.
    pub async fn await_outcome(&self) -> Result<ClientHandle> {
        let (tx, rx) = oneshot::channel();
        self.on_outcome(move |outcome| {
            let _ = tx.send(outcome);
        });
        rx.await.map_err(|_| Error::ConnectionAborted)?
    }

    /// Transition `Pending → Ready` and flush all waiters with the handle.
    ///
    /// Legal only from Pending; a second terminal transition is a
    /// programming error and is reported, not silently ignored.
    pub fn resolve(&self, handle: ClientHandle) -> Result<()> {
        let waiters = {
            let mut inner = self.lock();
            match &mut *inner {
                Inner::Pending(waiters) => {
                    let waiters = std::mem::take(waiters);
                    *inner = Inner::Ready(handle.clone());
                    waiters
                }
                Inner::Ready(_) => return Err(Error::EntryAlreadyResolved { state: "ready" }),
                Inner::Failed(_) => return Err(Error::EntryAlreadyResolved { state: "failed" }),
            }
        };

        tracing::debug!(
            target: TRACING_TARGET,
            key = ?self.key,
            waiters = waiters.len(),
            "connection ready, flushing waiters"
        );

        for callback in waiters {
            callback(Ok(handle.clone()));
        }
        Ok(())
    }

    /// Transition `Pending → Failed` and flush all waiters with the error.
    ///
    /// The registry evicts the entry after this returns, so a later request
    /// with the same key starts a fresh attempt instead of replaying a
    /// stale failure.
    pub fn reject(&self, error: Error) -> Result<()> {
        let waiters = {
            let mut inner = self.lock();
            match &mut *inner {
                Inner::Pending(waiters) => {
                    let waiters = std::mem::take(waiters);
                    *inner = Inner::Failed(error.clone());
                    waiters
                }
                Inner::Ready(_) => return Err(Error::EntryAlreadyResolved { state: "ready" }),
                Inner::Failed(_) => return Err(Error::EntryAlreadyResolved { state: "failed" }),
            }
        };

        tracing::warn!(
            target: TRACING_TARGET,
            key = ?self.key,
            waiters = waiters.len(),
            error = %error,
            "connection failed, flushing waiters"
        );

        for callback in waiters {
            callback(Err(error.clone()));
        }
        Ok(())
    }

    /// Increment the reference count; returns the new count.
    pub fn acquire(&self) -> usize {
        self.refs.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Decrement the reference count; returns the new count.
    ///
    /// Ready entries are not evicted at zero references: long-lived caching
    /// is intentional, and the count exists so a future teardown API can
    /// make an informed decision.
    pub fn release(&self) -> usize {
        self.refs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |refs| refs.checked_sub(1))
            .map(|previous| previous - 1)
            .unwrap_or(0)
    }

    /// Number of live facades holding this entry.
    pub fn ref_count(&self) -> usize {
        self.refs.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("state", &self.state())
            .field("refs", &self.ref_count())
            .finish()
    }
}
