//! Update source lifecycle driver
//!
//! [`TopicSource`] wraps a [`ContentSource`] and drives it through the
//! broker's activation protocol:
//!
//! ```text
//!              on_active                on_standby
//! Inactive ──────────────► Active ─────────────────► Standby
//!                           ▲  │                        │
//!                           │  │ on_closed              │ on_active
//!                           │  ▼                        │
//!                           │ Closed ◄──────────────────┤ on_closed
//!                           └───────────────────────────┘
//! ```
//!
//! Entering `Active` subscribes to the upstream feed and pushes initial
//! content. Leaving it releases the subscription and drops the update
//! channel. All of it happens under one lock, so an upstream notification
//! that races with deactivation finds the source inactive and is dropped.
//! Pushes also run under that lock; a channel revoking authority from
//! inside `push` would deadlock, see [`UpdateChannel::push`].

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::broker::{UpdateAck, UpdateChannel, UpdateSource};
use crate::content::Content;
use crate::error::ContentError;
use crate::feed::{Listener, Subscription};
use crate::topic::TopicPath;

/// Lifecycle state of an update source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Registered, never activated
    Inactive,
    /// Holding update authority
    Active,
    /// Authority revoked, may be granted again
    Standby,
    /// Registration ended
    Closed,
}

/// Per-topic content production
///
/// Implementations only build content. Subscription management, channel
/// handling and state transitions belong to [`TopicSource`].
pub trait ContentSource: Send + 'static {
    /// Upstream notification type
    type Change: 'static;

    /// Short label used in logs
    fn name(&self) -> &'static str;

    /// Content pushed when the source becomes active
    fn initial_content(&mut self) -> Result<Content, ContentError>;

    /// Attach `listener` to the upstream feed
    ///
    /// Static sources return `None`.
    fn subscribe(&self, listener: Listener<Self::Change>) -> Option<Subscription>;

    /// Content for one upstream change, or `None` if the change is not ours
    fn content_for(&mut self, change: &Self::Change) -> Result<Option<Content>, ContentError>;
}

/// A registered source as seen by its owner
pub trait ManagedSource: UpdateSource {
    /// Path the source is bound to
    fn path(&self) -> &TopicPath;

    fn state(&self) -> SourceState;

    /// Number of times the source entered `Active`
    fn activations(&self) -> u64;

    /// Move to `Closed` without a broker call
    fn close(&self);

    /// View as the broker-facing trait object
    fn into_update_source(self: Arc<Self>) -> Arc<dyn UpdateSource>;
}

struct SourceInner<S> {
    state: SourceState,
    content: S,
    channel: Option<Arc<dyn UpdateChannel>>,
    subscription: Option<Subscription>,
    activations: u64,
}

struct Shared<S> {
    path: TopicPath,
    acks: Arc<dyn UpdateAck>,
    inner: Mutex<SourceInner<S>>,
}

/// Lifecycle driver for one topic
pub struct TopicSource<S: ContentSource> {
    shared: Arc<Shared<S>>,
}

impl<S: ContentSource> TopicSource<S> {
    pub fn new(path: TopicPath, content: S, acks: Arc<dyn UpdateAck>) -> Self {
        Self {
            shared: Arc::new(Shared {
                path,
                acks,
                inner: Mutex::new(SourceInner {
                    state: SourceState::Inactive,
                    content,
                    channel: None,
                    subscription: None,
                    activations: 0,
                }),
            }),
        }
    }

    /// Whether an upstream subscription is currently held
    pub fn is_subscribed(&self) -> bool {
        self.shared.inner.lock().subscription.is_some()
    }

    fn listener(&self) -> Listener<S::Change> {
        let shared: Weak<Shared<S>> = Arc::downgrade(&self.shared);
        Arc::new(move |change: &S::Change| {
            if let Some(shared) = shared.upgrade() {
                shared.on_change(change);
            }
        })
    }

    fn deactivate(&self, path: &TopicPath, next: SourceState) {
        let mut inner = self.shared.inner.lock();
        let previous = inner.state;

        if next == SourceState::Standby && previous != SourceState::Active {
            debug!(topic = %path, state = ?previous, "Standby ignored, source not active");
            return;
        }

        if let Some(subscription) = inner.subscription.take() {
            subscription.unsubscribe();
        }
        inner.channel = None;
        inner.state = next;

        if previous != next {
            info!(
                topic = %path,
                source = inner.content.name(),
                from = ?previous,
                to = ?next,
                "Update source deactivated"
            );
        }
    }
}

impl<S: ContentSource> Shared<S> {
    fn on_change(&self, change: &S::Change) {
        let mut inner = self.inner.lock();
        if inner.state != SourceState::Active {
            trace!(topic = %self.path, "Dropping change for inactive source");
            return;
        }

        match inner.content.content_for(change) {
            Ok(Some(content)) => self.push(&inner, content),
            Ok(None) => {}
            Err(e) => warn!(topic = %self.path, error = %e, "Failed to build update"),
        }
    }

    fn push(&self, inner: &SourceInner<S>, content: Content) {
        let Some(channel) = inner.channel.as_ref() else {
            return;
        };

        trace!(topic = %self.path, source = inner.content.name(), "Pushing update");
        if let Err(e) = channel.push(&self.path, content, Arc::clone(&self.acks)) {
            warn!(topic = %self.path, error = %e, "Update push refused");
            self.acks.on_failure(&self.path, &e);
        }
    }
}

impl<S: ContentSource> UpdateSource for TopicSource<S> {
    fn on_active(&self, path: &TopicPath, channel: Arc<dyn UpdateChannel>) {
        if *path != self.shared.path {
            warn!(topic = %path, bound = %self.shared.path, "Activation for foreign path ignored");
            return;
        }

        let listener = self.listener();
        let mut inner = self.shared.inner.lock();

        match inner.state {
            SourceState::Active => {
                warn!(topic = %path, "Duplicate activation ignored");
                return;
            }
            SourceState::Closed => {
                warn!(topic = %path, "Activation of closed source ignored");
                return;
            }
            SourceState::Inactive | SourceState::Standby => {}
        }

        inner.state = SourceState::Active;
        inner.activations += 1;
        inner.channel = Some(channel);
        inner.subscription = inner.content.subscribe(listener);

        info!(
            topic = %path,
            source = inner.content.name(),
            activation = inner.activations,
            "Update source active"
        );

        match inner.content.initial_content() {
            Ok(content) => self.shared.push(&inner, content),
            Err(e) => warn!(topic = %path, error = %e, "Failed to build initial content"),
        }
    }

    fn on_standby(&self, path: &TopicPath) {
        self.deactivate(path, SourceState::Standby);
    }

    fn on_closed(&self, path: &TopicPath) {
        self.deactivate(path, SourceState::Closed);
    }
}

impl<S: ContentSource> ManagedSource for TopicSource<S> {
    fn path(&self) -> &TopicPath {
        &self.shared.path
    }

    fn state(&self) -> SourceState {
        self.shared.inner.lock().state
    }

    fn activations(&self) -> u64 {
        self.shared.inner.lock().activations
    }

    fn close(&self) {
        let path = self.shared.path.clone();
        self.deactivate(&path, SourceState::Closed);
    }

    fn into_update_source(self: Arc<Self>) -> Arc<dyn UpdateSource> {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::broker::UpdateError;
    use crate::feed::ChangeFeed;

    struct Counter {
        feed: Arc<ChangeFeed<u64>>,
        value: u64,
        subscribes: Arc<AtomicUsize>,
    }

    impl ContentSource for Counter {
        type Change = u64;

        fn name(&self) -> &'static str {
            "counter"
        }

        fn initial_content(&mut self) -> Result<Content, ContentError> {
            Ok(Content::from(self.value))
        }

        fn subscribe(&self, listener: Listener<u64>) -> Option<Subscription> {
            self.subscribes.fetch_add(1, Ordering::SeqCst);
            Some(self.feed.subscribe_listener(listener))
        }

        fn content_for(&mut self, change: &u64) -> Result<Option<Content>, ContentError> {
            self.value = *change;
            Ok(Some(Content::from(*change)))
        }
    }

    #[derive(Default)]
    struct Recorder {
        pushes: Mutex<Vec<Content>>,
        refuse: Mutex<bool>,
    }

    impl UpdateChannel for Recorder {
        fn push(
            &self,
            _path: &TopicPath,
            content: Content,
            ack: Arc<dyn UpdateAck>,
        ) -> Result<(), UpdateError> {
            if *self.refuse.lock() {
                return Err(UpdateError::Rejected("full".into()));
            }
            self.pushes.lock().push(content);
            ack.on_success(&TopicPath::new("x").unwrap());
            Ok(())
        }
    }

    /// Refuses every push and revokes authority from another thread
    #[derive(Default)]
    struct RevokingChannel {
        source: Mutex<Option<Arc<dyn UpdateSource>>>,
        revoker: Mutex<Option<std::thread::JoinHandle<()>>>,
    }

    impl UpdateChannel for RevokingChannel {
        fn push(
            &self,
            path: &TopicPath,
            _content: Content,
            _ack: Arc<dyn UpdateAck>,
        ) -> Result<(), UpdateError> {
            if let Some(source) = self.source.lock().clone() {
                let path = path.clone();
                let handle = std::thread::spawn(move || source.on_standby(&path));
                *self.revoker.lock() = Some(handle);
            }
            Err(UpdateError::Rejected("revoked".into()))
        }
    }

    #[derive(Default)]
    struct Acks {
        ok: AtomicUsize,
        failed: AtomicUsize,
    }

    impl UpdateAck for Acks {
        fn on_success(&self, _path: &TopicPath) {
            self.ok.fetch_add(1, Ordering::SeqCst);
        }

        fn on_failure(&self, _path: &TopicPath, _error: &UpdateError) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        feed: Arc<ChangeFeed<u64>>,
        subscribes: Arc<AtomicUsize>,
        channel: Arc<Recorder>,
        acks: Arc<Acks>,
        source: TopicSource<Counter>,
        path: TopicPath,
    }

    fn fixture() -> Fixture {
        let feed = Arc::new(ChangeFeed::new());
        let subscribes = Arc::new(AtomicUsize::new(0));
        let acks = Arc::new(Acks::default());
        let path = TopicPath::new("Root/Counter").unwrap();
        let source = TopicSource::new(
            path.clone(),
            Counter {
                feed: Arc::clone(&feed),
                value: 7,
                subscribes: Arc::clone(&subscribes),
            },
            acks.clone(),
        );
        Fixture {
            feed,
            subscribes,
            channel: Arc::new(Recorder::default()),
            acks,
            source,
            path,
        }
    }

    fn pushed(f: &Fixture) -> Vec<String> {
        f.channel
            .pushes
            .lock()
            .iter()
            .map(|c| c.as_scalar().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_activation_pushes_initial_then_changes() {
        let f = fixture();
        f.feed.notify(&1);

        f.source.on_active(&f.path, f.channel.clone());
        assert_eq!(f.source.state(), SourceState::Active);
        f.feed.notify(&8);

        assert_eq!(pushed(&f), vec!["7", "8"]);
        assert_eq!(f.acks.ok.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_duplicate_activation_ignored() {
        let f = fixture();
        f.source.on_active(&f.path, f.channel.clone());
        f.source.on_active(&f.path, f.channel.clone());

        assert_eq!(f.subscribes.load(Ordering::SeqCst), 1);
        assert_eq!(f.source.activations(), 1);
        assert_eq!(f.feed.listener_count(), 1);
        assert_eq!(pushed(&f), vec!["7"]);
    }

    #[test]
    fn test_standby_then_closed_unsubscribes_once() {
        let f = fixture();
        f.source.on_active(&f.path, f.channel.clone());

        f.source.on_standby(&f.path);
        assert_eq!(f.source.state(), SourceState::Standby);
        assert!(!f.source.is_subscribed());
        assert_eq!(f.feed.listener_count(), 0);

        f.source.on_closed(&f.path);
        assert_eq!(f.source.state(), SourceState::Closed);

        f.feed.notify(&9);
        assert_eq!(pushed(&f), vec!["7"]);
    }

    #[test]
    fn test_reactivation_after_standby() {
        let f = fixture();
        f.source.on_active(&f.path, f.channel.clone());
        f.feed.notify(&3);
        f.source.on_standby(&f.path);
        f.feed.notify(&4);
        f.source.on_active(&f.path, f.channel.clone());

        assert_eq!(f.source.activations(), 2);
        assert_eq!(pushed(&f), vec!["7", "3", "3"]);
    }

    #[test]
    fn test_standby_when_inactive_is_noop() {
        let f = fixture();
        f.source.on_standby(&f.path);
        assert_eq!(f.source.state(), SourceState::Inactive);
    }

    #[test]
    fn test_closed_is_terminal() {
        let f = fixture();
        f.source.close();
        f.source.on_active(&f.path, f.channel.clone());

        assert_eq!(f.source.state(), SourceState::Closed);
        assert!(pushed(&f).is_empty());
    }

    #[test]
    fn test_refused_push_counts_failure_and_stays_active() {
        let f = fixture();
        *f.channel.refuse.lock() = true;

        f.source.on_active(&f.path, f.channel.clone());
        f.feed.notify(&2);

        assert_eq!(f.acks.failed.load(Ordering::SeqCst), 2);
        assert_eq!(f.source.state(), SourceState::Active);
    }

    #[test]
    fn test_foreign_path_ignored() {
        let f = fixture();
        let other = TopicPath::new("Root/Other").unwrap();
        f.source.on_active(&other, f.channel.clone());
        assert_eq!(f.source.state(), SourceState::Inactive);
    }

    #[test]
    fn test_revocation_while_push_refused() {
        let f = fixture();
        let source = Arc::new(f.source);
        let channel = Arc::new(RevokingChannel::default());
        *channel.source.lock() = Some(Arc::clone(&source) as Arc<dyn UpdateSource>);

        source.on_active(&f.path, channel.clone());
        let revoker = channel.revoker.lock().take().unwrap();
        revoker.join().unwrap();

        assert_eq!(source.state(), SourceState::Standby);
        assert!(!source.is_subscribed());
        assert_eq!(f.feed.listener_count(), 0);
        assert_eq!(f.acks.failed.load(Ordering::SeqCst), 1);

        // Later changes are dropped without reaching the channel
        f.feed.notify(&3);
        assert!(channel.revoker.lock().is_none());
    }
}
