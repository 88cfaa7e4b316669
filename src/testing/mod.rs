//! In-memory broker
//!
//! [`MockBroker`] implements [`TopicControl`] without a network. In manual
//! mode every query and creation request waits until the test answers it,
//! so acknowledgements can be delivered in any order. In auto mode requests
//! are answered immediately from the in-memory topic tree.
//!
//! The broker never invokes a callback while holding its own lock.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::broker::{
    AddFailure, AddTopicCallback, TopicControl, TopicDetails, TopicDetailsCallback, UpdateAck,
    UpdateChannel, UpdateError, UpdateSource,
};
use crate::content::Content;
use crate::topic::{TopicKind, TopicPath};

/// A call the publisher made into the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerCall {
    Query(TopicPath),
    Add(TopicPath),
    Register(TopicPath),
}

#[derive(Default)]
struct MockState {
    auto: bool,
    topics: BTreeMap<TopicPath, TopicKind>,
    calls: Vec<BrokerCall>,
    queries: Vec<(TopicPath, Arc<dyn TopicDetailsCallback>)>,
    adds: Vec<(TopicPath, Arc<dyn AddTopicCallback>)>,
    add_history: Vec<(TopicPath, Arc<dyn AddTopicCallback>)>,
    requested_kinds: BTreeMap<TopicPath, TopicKind>,
    registrations: Vec<(TopicPath, Arc<dyn UpdateSource>)>,
    active: BTreeSet<TopicPath>,
    pushes: Vec<(TopicPath, Content)>,
    payloads: Vec<(TopicPath, Bytes)>,
    refuse_pushes: bool,
    fail_acks: bool,
}

impl MockState {
    fn exists(&self, path: &TopicPath) -> bool {
        self.topics
            .keys()
            .any(|p| p == path || p.is_descendant_of(path))
    }

    fn details(&self, path: &TopicPath) -> TopicDetails {
        TopicDetails {
            path: path.clone(),
            kind: self.topics.get(path).cloned(),
        }
    }

    fn source(&self, path: &TopicPath) -> Option<Arc<dyn UpdateSource>> {
        self.registrations
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, s)| Arc::clone(s))
    }
}

/// In-memory [`TopicControl`] implementation
#[derive(Clone, Default)]
pub struct MockBroker {
    state: Arc<Mutex<MockState>>,
}

impl MockBroker {
    /// Broker whose requests wait for the test to answer them
    pub fn new() -> Self {
        Self::default()
    }

    /// Broker that answers every request immediately
    pub fn auto() -> Self {
        let broker = Self::default();
        broker.state.lock().auto = true;
        broker
    }

    /// Pre-create a topic
    pub fn with_topic(self, path: TopicPath, kind: TopicKind) -> Self {
        self.state.lock().topics.insert(path, kind);
        self
    }

    pub fn topic_exists(&self, path: &TopicPath) -> bool {
        self.state.lock().exists(path)
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<BrokerCall> {
        self.state.lock().calls.clone()
    }

    /// Paths of unanswered detail queries
    pub fn pending_queries(&self) -> Vec<TopicPath> {
        self.state
            .lock()
            .queries
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Answer the oldest query from the topic tree
    pub fn answer_query(&self) -> bool {
        let Some((path, callback, details)) = ({
            let mut state = self.state.lock();
            if state.queries.is_empty() {
                None
            } else {
                let (path, callback) = state.queries.remove(0);
                let details = state.exists(&path).then(|| state.details(&path));
                Some((path, callback, details))
            }
        }) else {
            return false;
        };

        match details {
            Some(details) => callback.on_topic_details(&path, &details),
            None => callback.on_topic_unknown(&path),
        }
        true
    }

    /// Answer the oldest query with details for a different path
    pub fn answer_query_as(&self, path: TopicPath) -> bool {
        let callback = {
            let mut state = self.state.lock();
            if state.queries.is_empty() {
                return false;
            }
            state.queries.remove(0).1
        };

        let details = TopicDetails {
            path: path.clone(),
            kind: None,
        };
        callback.on_topic_details(&path, &details);
        true
    }

    /// Discard the oldest query
    pub fn discard_query(&self) -> bool {
        let entry = {
            let mut state = self.state.lock();
            if state.queries.is_empty() {
                None
            } else {
                Some(state.queries.remove(0))
            }
        };

        match entry {
            Some((path, callback)) => {
                callback.on_discard(&path);
                true
            }
            None => false,
        }
    }

    /// Paths of unanswered creation requests
    pub fn pending_adds(&self) -> Vec<TopicPath> {
        self.state
            .lock()
            .adds
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Every creation request made so far
    pub fn added_paths(&self) -> Vec<TopicPath> {
        self.state
            .lock()
            .add_history
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Acknowledge a creation request
    ///
    /// If no request for `path` is pending, the acknowledgement is sent
    /// again through the callback of the latest request for it.
    pub fn ack_add(&self, path: &TopicPath) -> bool {
        let callback = {
            let mut state = self.state.lock();
            let callback = match state.adds.iter().position(|(p, _)| p == path) {
                Some(index) => Some(state.adds.remove(index).1),
                None => state
                    .add_history
                    .iter()
                    .rev()
                    .find(|(p, _)| p == path)
                    .map(|(_, cb)| Arc::clone(cb)),
            };
            if callback.is_some() {
                let kind = state
                    .requested_kinds
                    .get(path)
                    .cloned()
                    .unwrap_or(TopicKind::Scalar);
                state.topics.insert(path.clone(), kind);
            }
            callback
        };

        match callback {
            Some(callback) => {
                callback.on_topic_added(path);
                true
            }
            None => false,
        }
    }

    /// Fail a pending creation request
    pub fn fail_add(&self, path: &TopicPath, reason: AddFailure) -> bool {
        let callback = {
            let mut state = self.state.lock();
            match state.adds.iter().position(|(p, _)| p == path) {
                Some(index) => state.adds.remove(index).1,
                None => return false,
            }
        };

        callback.on_topic_add_failed(path, &reason);
        true
    }

    /// Paths with a registered update source, in registration order
    pub fn registered_paths(&self) -> Vec<TopicPath> {
        self.state
            .lock()
            .registrations
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Grant update authority to the source registered for `path`
    pub fn activate(&self, path: &TopicPath) -> bool {
        let Some(source) = ({
            let mut state = self.state.lock();
            let source = state.source(path);
            if source.is_some() {
                state.active.insert(path.clone());
            }
            source
        }) else {
            return false;
        };

        let channel = Arc::new(MockChannel {
            state: Arc::clone(&self.state),
        });
        source.on_active(path, channel);
        true
    }

    /// Activate every registered source
    pub fn activate_all(&self) -> usize {
        let paths = self.registered_paths();
        paths.iter().filter(|p| self.activate(p)).count()
    }

    /// Revoke update authority temporarily
    pub fn standby(&self, path: &TopicPath) -> bool {
        let Some(source) = self.revoke(path) else {
            return false;
        };
        source.on_standby(path);
        true
    }

    /// End the registration for `path`
    pub fn close(&self, path: &TopicPath) -> bool {
        let Some(source) = self.revoke(path) else {
            return false;
        };
        source.on_closed(path);
        true
    }

    fn revoke(&self, path: &TopicPath) -> Option<Arc<dyn UpdateSource>> {
        let mut state = self.state.lock();
        state.active.remove(path);
        state.source(path)
    }

    /// Drop all registrations, as a disconnected session would
    pub fn disconnect(&self) {
        let mut state = self.state.lock();
        state.registrations.clear();
        state.active.clear();
        state.queries.clear();
        state.adds.clear();
    }

    /// Content accepted for `path`, oldest first
    pub fn pushes_for(&self, path: &TopicPath) -> Vec<Content> {
        self.state
            .lock()
            .pushes
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Latest content accepted for `path`
    pub fn latest(&self, path: &TopicPath) -> Option<Content> {
        self.state
            .lock()
            .pushes
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, c)| c.clone())
    }

    /// Wire payloads accepted for `path`, oldest first
    pub fn payloads_for(&self, path: &TopicPath) -> Vec<Bytes> {
        self.state
            .lock()
            .payloads
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, b)| b.clone())
            .collect()
    }

    pub fn push_count(&self) -> usize {
        self.state.lock().pushes.len()
    }

    /// Refuse every push synchronously
    pub fn set_refuse_pushes(&self, refuse: bool) {
        self.state.lock().refuse_pushes = refuse;
    }

    /// Accept pushes but report them as failed through the ack
    pub fn set_fail_acks(&self, fail: bool) {
        self.state.lock().fail_acks = fail;
    }
}

impl TopicControl for MockBroker {
    fn query_topic_details(&self, path: &TopicPath, callback: Arc<dyn TopicDetailsCallback>) {
        let answer = {
            let mut state = self.state.lock();
            state.calls.push(BrokerCall::Query(path.clone()));
            if state.auto {
                Some(state.exists(path).then(|| state.details(path)))
            } else {
                state.queries.push((path.clone(), callback.clone()));
                None
            }
        };

        match answer {
            Some(Some(details)) => callback.on_topic_details(path, &details),
            Some(None) => callback.on_topic_unknown(path),
            None => {}
        }
    }

    fn add_topic(&self, path: &TopicPath, kind: &TopicKind, callback: Arc<dyn AddTopicCallback>) {
        let outcome = {
            let mut state = self.state.lock();
            state.calls.push(BrokerCall::Add(path.clone()));
            state.add_history.push((path.clone(), callback.clone()));
            state.requested_kinds.insert(path.clone(), kind.clone());
            if !state.auto {
                state.adds.push((path.clone(), callback.clone()));
                None
            } else if state.topics.contains_key(path) {
                Some(Err(AddFailure::Exists))
            } else {
                state.topics.insert(path.clone(), kind.clone());
                Some(Ok(()))
            }
        };

        match outcome {
            Some(Ok(())) => callback.on_topic_added(path),
            Some(Err(reason)) => callback.on_topic_add_failed(path, &reason),
            None => {}
        }
    }

    fn register_update_source(&self, path: &TopicPath, source: Arc<dyn UpdateSource>) {
        let mut state = self.state.lock();
        state.calls.push(BrokerCall::Register(path.clone()));
        state.registrations.push((path.clone(), source));
    }
}

struct MockChannel {
    state: Arc<Mutex<MockState>>,
}

impl UpdateChannel for MockChannel {
    fn push(
        &self,
        path: &TopicPath,
        content: Content,
        ack: Arc<dyn UpdateAck>,
    ) -> Result<(), UpdateError> {
        let fail = {
            let mut state = self.state.lock();
            if state.refuse_pushes {
                return Err(UpdateError::Rejected("refused by broker".into()));
            }
            if !state.active.contains(path) {
                return Err(UpdateError::NotActive);
            }
            state.payloads.push((path.clone(), content.to_bytes()));
            state.pushes.push((path.clone(), content));
            state.fail_acks
        };

        if fail {
            ack.on_failure(path, &UpdateError::Rejected("update failed".into()));
        } else {
            ack.on_success(path);
        }
        Ok(())
    }
}
