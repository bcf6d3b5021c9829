//! # Source Feeds
//!
//! [`SourceFeed`] is a reactive single-value cache: one externally refreshed input
//! (a price, a fee quote, a ledger change marker) that other components read and watch.
//!
//! ## Guarantees
//!
//! - Values are swapped as whole `Arc<T>`s, so a reader never sees a half-written value.
//! - Publication is serialized: callbacks observe values in `set` order.
//! - Every `set`/`clear` bumps [`SourceFeed::version`], which memoizing readers key on.
//!
//! ## Observing
//!
//! Two styles are supported:
//!
//! ```rust
//! use lib_staking::feed::SourceFeed;
//!
//! let feed = SourceFeed::new();
//!
//! // Synchronous callback; unsubscribes when the guard drops.
//! let _subscription = feed.subscribe(|value: &u32| println!("new value {}", value));
//!
//! // Task-based observation through a tokio watch channel.
//! let mut rx = feed.watch();
//!
//! feed.set(7);
//! assert_eq!(feed.get().as_deref(), Some(&7));
//! assert!(rx.has_changed().unwrap());
//! ```
//!
//! Callbacks run on the thread calling `set` while publication is locked; they must not
//! call back into the same feed.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct FeedInner<T> {
    /// Current value and its version; replaced atomically.
    state: RwLock<(Option<Arc<T>>, u64)>,
    /// Subscribers; the lock also serializes publication.
    subscribers: Mutex<Vec<(u64, Callback<T>)>>,
    next_id: AtomicU64,
    watch_tx: watch::Sender<Option<Arc<T>>>,
}

/// Reactive single-value cache. Cloning yields another handle to the same feed.
pub struct SourceFeed<T> {
    inner: Arc<FeedInner<T>>,
}

impl<T> Clone for SourceFeed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> Default for SourceFeed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> SourceFeed<T> {
    pub fn new() -> Self {
        let (watch_tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(FeedInner {
                state: RwLock::new((None, 0)),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                watch_tx,
            }),
        }
    }

    /// Current value, `None` while unset.
    pub fn get(&self) -> Option<Arc<T>> {
        self.inner.state.read().0.clone()
    }

    /// Number of completed `set`/`clear` calls.
    pub fn version(&self) -> u64 {
        self.inner.state.read().1
    }

    /// Replace the value and notify every subscriber.
    pub fn set(&self, value: T) {
        let value = Arc::new(value);
        let subscribers = self.inner.subscribers.lock();

        {
            let mut state = self.inner.state.write();
            state.0 = Some(Arc::clone(&value));
            state.1 += 1;
        }
        self.inner.watch_tx.send_replace(Some(Arc::clone(&value)));

        for (_, callback) in subscribers.iter() {
            callback(value.as_ref());
        }
    }

    /// Reset to unset. Callback subscribers are not invoked; watchers see `None`.
    pub fn clear(&self) {
        let _publish = self.inner.subscribers.lock();
        {
            let mut state = self.inner.state.write();
            state.0 = None;
            state.1 += 1;
        }
        self.inner.watch_tx.send_replace(None);
    }

    /// Register a callback invoked with every new value.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.lock().push((id, Arc::new(callback)));

        let weak: Weak<FeedInner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.subscribers.lock().retain(|(sub_id, _)| *sub_id != id);
                }
            })),
        }
    }

    /// Receiver for async observation; starts at the current value.
    pub fn watch(&self) -> watch::Receiver<Option<Arc<T>>> {
        self.inner.watch_tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

/// Guard returned by [`SourceFeed::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
