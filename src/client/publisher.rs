//! Telemetry publisher
//!
//! Ties one broker session to the upstream collaborators. Each connect
//! starts a fresh provisioner; each disconnect closes the sources it
//! registered. Nothing survives a disconnect, so a reconnect re-runs
//! namespace discovery.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::broker::TopicControl;
use crate::error::Result;
use crate::feed::{CarState, ControlsFeed, RefreshIntervalManager, Subscription};
use crate::provision::{ProvisionEvent, TopicProvisioner};
use crate::source::Collaborators;
use crate::stats::{AckRouter, Metrics};

use super::config::PublisherConfig;

struct Session {
    provisioner: Arc<TopicProvisioner>,
    acks: Arc<AckRouter>,
}

/// Telemetry publisher
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use f1_publisher::client::{Publisher, PublisherConfig};
/// use f1_publisher::provision::ProvisionEvent;
/// use f1_publisher::testing::MockBroker;
///
/// let publisher = Publisher::new(PublisherConfig::default());
/// let broker = MockBroker::auto();
///
/// let mut events = publisher.on_connected(Arc::new(broker.clone())).unwrap();
/// assert_eq!(
///     events.try_recv().unwrap(),
///     ProvisionEvent::NamespaceCreated { count: 13 }
/// );
/// assert_eq!(broker.registered_paths().len(), 13);
/// ```
pub struct Publisher {
    config: PublisherConfig,
    collaborators: Collaborators,
    session: Mutex<Option<Session>>,
    _car: Subscription,
}

impl Publisher {
    /// Create a publisher with fresh collaborators
    pub fn new(config: PublisherConfig) -> Self {
        let collaborators = Collaborators::new(
            Arc::new(ControlsFeed::new()),
            Arc::new(CarState::new()),
            Arc::new(RefreshIntervalManager::new()),
            Arc::new(Metrics::with_sample_interval(config.metrics_interval)),
        );
        Self::with_collaborators(config, collaborators)
    }

    /// Create a publisher over existing collaborators
    pub fn with_collaborators(config: PublisherConfig, collaborators: Collaborators) -> Self {
        let car = collaborators.attach_car();
        Self {
            config,
            collaborators,
            session: Mutex::new(None),
            _car: car,
        }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Start provisioning on a newly connected broker session
    ///
    /// Returns the receiver for the session's provisioning events.
    pub fn on_connected(
        &self,
        control: Arc<dyn TopicControl>,
    ) -> Result<mpsc::Receiver<ProvisionEvent>> {
        let root = self.config.root_path()?;

        let acks = Arc::new(AckRouter::new(Arc::clone(&self.collaborators.metrics)));
        let (provisioner, events) = TopicProvisioner::new(
            control,
            self.collaborators.clone(),
            acks.clone(),
            self.config.creation_failure_policy,
            self.config.event_capacity,
        );

        let previous = self.session.lock().replace(Session {
            provisioner: Arc::clone(&provisioner),
            acks,
        });
        if let Some(previous) = previous {
            warn!("Connected without a disconnect, closing previous session");
            previous.provisioner.close();
        }

        info!(root = %root, "Broker session connected");
        provisioner.start(root)?;
        Ok(events)
    }

    /// Tear down the current broker session
    pub fn on_disconnected(&self) {
        let Some(session) = self.session.lock().take() else {
            return;
        };

        session.provisioner.close();
        info!(
            succeeded = session.acks.succeeded(),
            failed = session.acks.failed(),
            "Broker session disconnected"
        );
    }

    pub fn is_connected(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Provisioner of the current session
    pub fn provisioner(&self) -> Option<Arc<TopicProvisioner>> {
        self.session
            .lock()
            .as_ref()
            .map(|s| Arc::clone(&s.provisioner))
    }

    /// Acknowledgement router of the current session
    pub fn acks(&self) -> Option<Arc<AckRouter>> {
        self.session.lock().as_ref().map(|s| Arc::clone(&s.acks))
    }

    /// Run the polling loop until `shutdown` completes
    ///
    /// Each iteration sleeps for the current refresh interval, calls `poll`
    /// to sample the input device, then recomputes metrics. An error from
    /// `poll` ends the loop.
    pub async fn run_until<F, P>(&self, shutdown: F, mut poll: P) -> Result<()>
    where
        F: Future<Output = ()>,
        P: FnMut(&Collaborators) -> Result<()>,
    {
        tokio::pin!(shutdown);

        loop {
            let interval = self.collaborators.refresh.current();
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    return Ok(());
                }
                _ = tokio::time::sleep(interval.sleep_duration()) => {}
            }

            poll(&self.collaborators)?;
            self.collaborators.metrics.update();
        }
    }
}
