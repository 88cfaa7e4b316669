//! Topic provisioner
//!
//! Discovers whether the namespace root exists, creates the full topic tree
//! if it does not, and registers one update source per topic once every
//! topic exists.
//!
//! ```text
//! Idle ──start──► Querying ──details──────────────────────► Registered
//!                    │                                          ▲
//!                    └──unknown──► Creating ──last ack──────────┘
//!                    │                │
//!                    └──discard──►  Failed ◄──creation failure
//!
//! any phase ──close──► Closed
//! ```
//!
//! Broker callbacks may arrive on any thread. State changes happen under
//! one lock; broker calls are made only after it is released.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::broker::{
    AddFailure, AddTopicCallback, TopicControl, TopicDetails, TopicDetailsCallback, UpdateAck,
};
use crate::error::{ProtocolError, Result};
use crate::source::{Collaborators, ManagedSource};
use crate::topic::{TopicEntry, TopicLayout, TopicPath};

use super::error::ProvisionError;
use super::pending::PendingCreationSet;

/// What to do when the broker refuses to create a topic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CreationFailurePolicy {
    /// Stop provisioning on the first failure
    #[default]
    Abort,
    /// Re-issue the request until `max_attempts` failures were seen
    Retry { max_attempts: u32 },
}

/// Provisioning progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionPhase {
    /// `start` not called yet
    Idle,
    /// Waiting for the namespace root query
    Querying,
    /// Waiting for topic creation acknowledgements
    Creating,
    /// Every update source has been registered
    Registered,
    /// Provisioning stopped; a new session is needed
    Failed,
    /// The session ended; every later broker callback is ignored
    Closed,
}

/// Events raised while provisioning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionEvent {
    /// The namespace root already existed; creation was skipped
    NamespaceExists(TopicPath),
    /// Every topic of the namespace was created
    NamespaceCreated { count: usize },
    /// Update sources were registered with the broker
    SourcesRegistered { count: usize },
    /// Provisioning stopped
    Failed(ProvisionError),
}

struct ProvisionState {
    phase: ProvisionPhase,
    layout: Option<TopicLayout>,
    pending: PendingCreationSet,
    failures: HashMap<TopicPath, u32>,
    sources: Vec<Arc<dyn ManagedSource>>,
}

/// Per-session topic provisioner
pub struct TopicProvisioner {
    control: Arc<dyn TopicControl>,
    collaborators: Collaborators,
    acks: Arc<dyn UpdateAck>,
    policy: CreationFailurePolicy,
    state: Mutex<ProvisionState>,
    events: mpsc::Sender<ProvisionEvent>,
    me: Weak<TopicProvisioner>,
}

impl TopicProvisioner {
    /// Create a provisioner
    ///
    /// Returns the provisioner and a receiver for its events.
    pub fn new(
        control: Arc<dyn TopicControl>,
        collaborators: Collaborators,
        acks: Arc<dyn UpdateAck>,
        policy: CreationFailurePolicy,
        event_capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<ProvisionEvent>) {
        let (tx, rx) = mpsc::channel(event_capacity.max(1));

        let provisioner = Arc::new_cyclic(|me| Self {
            control,
            collaborators,
            acks,
            policy,
            state: Mutex::new(ProvisionState {
                phase: ProvisionPhase::Idle,
                layout: None,
                pending: PendingCreationSet::new(),
                failures: HashMap::new(),
                sources: Vec::new(),
            }),
            events: tx,
            me: me.clone(),
        });

        (provisioner, rx)
    }

    /// Begin provisioning below `root`
    ///
    /// Fails if this provisioner was already started.
    pub fn start(&self, root: TopicPath) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.phase != ProvisionPhase::Idle {
                return Err(ProtocolError::AlreadyStarted(root).into());
            }
            state.layout = Some(TopicLayout::new(root.clone())?);
            state.phase = ProvisionPhase::Querying;
        }

        info!(root = %root, "Querying namespace root");
        if let Some(me) = self.me.upgrade() {
            self.control.query_topic_details(&root, me);
        }
        Ok(())
    }

    pub fn phase(&self) -> ProvisionPhase {
        self.state.lock().phase
    }

    /// Number of topics still awaiting a creation acknowledgement
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Sources registered with the broker
    pub fn sources(&self) -> Vec<Arc<dyn ManagedSource>> {
        self.state.lock().sources.clone()
    }

    pub fn registered_count(&self) -> usize {
        self.state.lock().sources.len()
    }

    /// End the session this provisioner belongs to
    ///
    /// Provisioning stops in whatever phase it reached. Registered sources
    /// are closed, releasing their upstream subscriptions, and answers the
    /// broker delivers afterwards no longer create or register anything.
    pub fn close(&self) {
        let sources = {
            let mut state = self.state.lock();
            if state.phase != ProvisionPhase::Closed {
                debug!(phase = ?state.phase, "Provisioner closed");
            }
            state.phase = ProvisionPhase::Closed;
            state.pending.clear();
            state.failures.clear();
            std::mem::take(&mut state.sources)
        };
        for source in &sources {
            source.close();
        }
        if !sources.is_empty() {
            info!(count = sources.len(), "Update sources closed");
        }
    }

    /// Check a details answer against the queried root
    ///
    /// `None` means the answer arrived outside `Querying` and is ignored.
    fn expect_query_answer(
        &self,
        state: &ProvisionState,
        path: &TopicPath,
    ) -> Option<std::result::Result<(), ProvisionError>> {
        if state.phase != ProvisionPhase::Querying {
            debug!(topic = %path, phase = ?state.phase, "Late details answer ignored");
            return None;
        }
        let root = state.layout.as_ref().map(|l| l.root().clone())?;
        if *path != root {
            return Some(Err(ProtocolError::UnexpectedTopic {
                expected: root,
                actual: path.clone(),
            }
            .into()));
        }
        Some(Ok(()))
    }

    fn acknowledge(&self, path: &TopicPath) {
        let mut state = self.state.lock();
        if state.phase != ProvisionPhase::Creating {
            debug!(topic = %path, phase = ?state.phase, "Creation ack ignored");
            return;
        }
        if !state.pending.remove(path) {
            debug!(topic = %path, "Duplicate creation ack");
            return;
        }

        debug!(topic = %path, remaining = state.pending.len(), "Topic created");
        if state.pending.is_empty() {
            self.register_sources(state, true);
        }
    }

    fn register_sources(&self, mut state: MutexGuard<'_, ProvisionState>, created: bool) {
        let Some(layout) = state.layout.clone() else {
            return;
        };

        let sources: Vec<Arc<dyn ManagedSource>> = layout
            .entries()
            .iter()
            .map(|entry| self.collaborators.source_for(entry, Arc::clone(&self.acks)))
            .collect();
        state.sources = sources.clone();
        state.failures.clear();
        state.phase = ProvisionPhase::Registered;
        drop(state);

        if created {
            info!(root = %layout.root(), count = layout.len(), "Namespace created");
            self.emit(ProvisionEvent::NamespaceCreated {
                count: layout.len(),
            });
        }

        for source in &sources {
            if self.phase() == ProvisionPhase::Closed {
                debug!(topic = %source.path(), "Closed during registration, stopping");
                return;
            }
            self.control
                .register_update_source(source.path(), Arc::clone(source).into_update_source());
        }

        info!(root = %layout.root(), count = sources.len(), "Update sources registered");
        self.emit(ProvisionEvent::SourcesRegistered {
            count: sources.len(),
        });
    }

    fn fail(&self, mut state: MutexGuard<'_, ProvisionState>, error: ProvisionError) {
        state.phase = ProvisionPhase::Failed;
        state.pending.clear();
        state.failures.clear();
        drop(state);

        warn!(error = %error, "Provisioning failed");
        self.emit(ProvisionEvent::Failed(error));
    }

    fn emit(&self, event: ProvisionEvent) {
        if let Err(e) = self.events.try_send(event) {
            warn!(error = %e, "Provision event dropped");
        }
    }
}

impl TopicDetailsCallback for TopicProvisioner {
    fn on_topic_details(&self, path: &TopicPath, _details: &TopicDetails) {
        let state = self.state.lock();
        match self.expect_query_answer(&state, path) {
            None => {}
            Some(Err(e)) => self.fail(state, e),
            Some(Ok(())) => {
                // An existing root is taken to mean the whole tree exists
                info!(root = %path, "Namespace exists, skipping creation");
                self.emit(ProvisionEvent::NamespaceExists(path.clone()));
                self.register_sources(state, false);
            }
        }
    }

    fn on_topic_unknown(&self, path: &TopicPath) {
        let entries: Vec<TopicEntry> = {
            let mut state = self.state.lock();
            match self.expect_query_answer(&state, path) {
                None => return,
                Some(Err(e)) => return self.fail(state, e),
                Some(Ok(())) => {}
            }

            let entries = match state.layout.as_ref() {
                Some(layout) => layout.entries().to_vec(),
                None => return,
            };
            for entry in &entries {
                state.pending.insert(entry.path.clone());
            }
            state.phase = ProvisionPhase::Creating;
            entries
        };

        info!(root = %path, count = entries.len(), "Namespace unknown, creating topics");
        let Some(me) = self.me.upgrade() else {
            return;
        };
        for entry in &entries {
            if self.phase() != ProvisionPhase::Creating {
                break;
            }
            let callback: Arc<dyn AddTopicCallback> = me.clone();
            self.control.add_topic(&entry.path, &entry.kind, callback);
        }
    }

    fn on_discard(&self, path: &TopicPath) {
        let state = self.state.lock();
        if state.phase != ProvisionPhase::Querying {
            debug!(topic = %path, "Late discard ignored");
            return;
        }
        self.fail(state, ProvisionError::QueryDiscarded(path.clone()));
    }
}

impl AddTopicCallback for TopicProvisioner {
    fn on_topic_added(&self, path: &TopicPath) {
        self.acknowledge(path);
    }

    fn on_topic_add_failed(&self, path: &TopicPath, reason: &AddFailure) {
        if *reason == AddFailure::Exists {
            debug!(topic = %path, "Topic already exists");
            self.acknowledge(path);
            return;
        }

        let mut state = self.state.lock();
        if state.phase != ProvisionPhase::Creating || !state.pending.contains(path) {
            debug!(topic = %path, reason = %reason, "Creation failure ignored");
            return;
        }

        let attempts = {
            let count = state.failures.entry(path.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let retry = match self.policy {
            CreationFailurePolicy::Retry { max_attempts } if attempts < max_attempts => state
                .layout
                .as_ref()
                .and_then(|l| l.find(path))
                .map(|entry| entry.kind.clone()),
            _ => None,
        };

        match retry {
            Some(kind) => {
                drop(state);
                warn!(topic = %path, reason = %reason, attempts, "Retrying topic creation");
                if let Some(me) = self.me.upgrade() {
                    self.control.add_topic(path, &kind, me);
                }
            }
            None => self.fail(
                state,
                ProvisionError::CreationFailed {
                    path: path.clone(),
                    reason: reason.clone(),
                    attempts,
                },
            ),
        }
    }
}

impl std::fmt::Debug for TopicProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TopicProvisioner")
            .field("phase", &state.phase)
            .field("pending", &state.pending.len())
            .field("sources", &state.sources.len())
            .field("policy", &self.policy)
            .finish()
    }
}
