//! Process-wide cached resource with single-flight fetches.
//!
//! [`CachedResource`] holds one value that is read far more often than it
//! changes. Readers share an `Arc` of the current value. A cold cache is
//! filled by exactly one in-flight fetch: concurrent callers queue behind
//! the fetch gate and observe its result instead of issuing their own
//! request. Every publish is broadcast to subscribers.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use tokio::sync::{Mutex, RwLock, broadcast};

/// Capacity of the publish channel.
///
/// A subscriber that falls further behind receives
/// [`broadcast::error::RecvError::Lagged`] and skips to the newest value.
const BROADCAST_CAPACITY: usize = 64;

/// A cached value of type `T` with a fetch-if-empty policy.
pub struct CachedResource<T> {
    /// The current value (`None` when absent).
    value: RwLock<Option<Arc<T>>>,
    /// Held for the duration of a fetch so at most one runs at a time.
    fetch_gate: Mutex<()>,
    /// Values for which this returns `true` are treated as a cold cache.
    is_empty: fn(&T) -> bool,
    /// Unix milliseconds of the last publish (0 before the first one).
    last_update_ms: AtomicI64,
    /// Publish channel.
    tx: broadcast::Sender<Option<Arc<T>>>,
}

impl<T: Send + Sync + 'static> CachedResource<T> {
    /// Create an absent cache with the given emptiness predicate.
    pub fn new(is_empty: fn(&T) -> bool) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            value: RwLock::new(None),
            fetch_gate: Mutex::new(()),
            is_empty,
            last_update_ms: AtomicI64::new(0),
            tx,
        }
    }

    /// Create a cache where only an absent value counts as empty.
    pub fn absent_when_none() -> Self {
        Self::new(|_| false)
    }

    /// The cached value, without any I/O.
    pub async fn current(&self) -> Option<Arc<T>> {
        self.value.read().await.clone()
    }

    /// Return the cached value, fetching it first if the cache is cold.
    ///
    /// A fetch error leaves the cache untouched. A fetch yielding `None`
    /// leaves the cache as it was.
    ///
    /// # Errors
    ///
    /// Returns whatever error `fetch` produced.
    pub async fn get_or_fetch<F, Fut, E>(&self, fetch: F) -> Result<Option<Arc<T>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if let Some(value) = self.warm().await {
            return Ok(Some(value));
        }

        let _gate = self.fetch_gate.lock().await;

        // Another caller may have filled the cache while we waited.
        if let Some(value) = self.warm().await {
            return Ok(Some(value));
        }

        match fetch().await? {
            Some(fresh) => Ok(self.publish(Some(fresh)).await),
            None => Ok(self.current().await),
        }
    }

    /// Fetch unconditionally and publish the result, including `None`.
    ///
    /// # Errors
    ///
    /// Returns whatever error `fetch` produced; the cache is untouched.
    pub async fn refetch<F, Fut, E>(&self, fetch: F) -> Result<Option<Arc<T>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let _gate = self.fetch_gate.lock().await;
        let fresh = fetch().await?;
        Ok(self.publish(fresh).await)
    }

    /// Replace the cached value and notify subscribers. Never fails.
    pub async fn publish(&self, value: Option<T>) -> Option<Arc<T>> {
        let value = value.map(Arc::new);

        let mut slot = self.value.write().await;
        *slot = value.clone();
        self.last_update_ms
            .store(Utc::now().timestamp_millis(), Ordering::Release);
        // send returns Err only when there are zero receivers.
        let receivers = self.tx.send(value.clone()).unwrap_or(0);
        drop(slot);

        tracing::trace!(receivers, present = value.is_some(), "cache published");
        value
    }

    /// Subscribe to every future publish.
    pub fn subscribe(&self) -> broadcast::Receiver<Option<Arc<T>>> {
        self.tx.subscribe()
    }

    /// Unix milliseconds of the last publish, or 0 if nothing was published.
    pub fn last_update_ms(&self) -> i64 {
        self.last_update_ms.load(Ordering::Acquire)
    }

    async fn warm(&self) -> Option<Arc<T>> {
        self.value
            .read()
            .await
            .as_ref()
            .filter(|value| !(self.is_empty)(value))
            .cloned()
    }
}
