//! Upstream change feeds
//!
//! Collaborators expose their state through a [`ChangeFeed`]. Subscribing
//! returns a [`Subscription`] handle; releasing the handle (explicitly or by
//! dropping it) removes the listener exactly once.
//!
//! Listeners run synchronously on whichever thread calls
//! [`ChangeFeed::notify`], normally the caller-owned polling loop. The feed
//! releases its own lock before invoking listeners, so a listener may take
//! other locks (or unsubscribe) without deadlocking against a concurrent
//! subscribe.

pub mod car;
pub mod controls;
pub mod device;
pub mod refresh;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

pub use car::{CarState, MAX_GEAR, MIN_GEAR};
pub use controls::{
    ButtonChange, CarButton, ControlAxis, ControlsFeed, ControlsSnapshot, BUTTON_COUNT,
};
pub use device::{ButtonMap, DeviceProfile};
pub use refresh::{RefreshInterval, RefreshIntervalManager};

/// Shared listener callback
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct FeedInner<T> {
    listeners: Mutex<Vec<(u64, Listener<T>)>>,
    next_id: AtomicU64,
}

/// A source of change notifications of type `T`
pub struct ChangeFeed<T> {
    inner: Arc<FeedInner<T>>,
}

impl<T: 'static> ChangeFeed<T> {
    /// Create a feed with no listeners
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FeedInner {
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Subscribe a closure
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_listener(Arc::new(listener))
    }

    /// Subscribe an already shared listener
    pub fn subscribe_listener(&self, listener: Listener<T>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push((id, listener));

        let feed: Weak<FeedInner<T>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = feed.upgrade() {
                inner.listeners.lock().retain(|(lid, _)| *lid != id);
            }
        })
    }

    /// Deliver a change to every current listener
    pub fn notify(&self, change: &T) {
        let listeners: Vec<Listener<T>> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            listener(change);
        }
    }

    /// Number of subscribed listeners
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

impl<T: 'static> Default for ChangeFeed<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one feed subscription
///
/// Dropping the handle unsubscribes.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Remove the listener from its feed
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    /// Whether the listener is still attached
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
