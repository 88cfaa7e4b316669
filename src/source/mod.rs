//! Topic update sources
//!
//! One [`TopicSource`] per provisioned topic. The lifecycle driver is
//! generic; what differs per topic is the [`ContentSource`] it wraps and the
//! upstream collaborator that feeds it.

pub mod lifecycle;
pub mod record;
pub mod scalar;

use std::sync::Arc;

use crate::broker::UpdateAck;
use crate::feed::{CarState, ControlAxis, ControlsFeed, RefreshIntervalManager, Subscription};
use crate::stats::Metrics;
use crate::topic::{TopicEntry, TopicId};

pub use lifecycle::{ContentSource, ManagedSource, SourceState, TopicSource};
pub use record::{ButtonNamesSource, ButtonStatesSource, RefreshIntervalSource};
pub use scalar::{AxisSource, GearSource, MetricSource};

/// Upstream collaborators shared by every source of a publisher
#[derive(Clone)]
pub struct Collaborators {
    pub controls: Arc<ControlsFeed>,
    pub car: Arc<CarState>,
    pub refresh: Arc<RefreshIntervalManager>,
    pub metrics: Arc<Metrics>,
}

impl Collaborators {
    pub fn new(
        controls: Arc<ControlsFeed>,
        car: Arc<CarState>,
        refresh: Arc<RefreshIntervalManager>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            controls,
            car,
            refresh,
            metrics,
        }
    }

    /// Wire the car to the controls feed
    ///
    /// Gear shifts and refresh-rate buttons take effect while the returned
    /// subscription is held.
    pub fn attach_car(&self) -> Subscription {
        self.car.attach(&self.controls, Arc::clone(&self.refresh))
    }

    /// Build the update source for one topic
    pub fn source_for(&self, entry: &TopicEntry, acks: Arc<dyn UpdateAck>) -> Arc<dyn ManagedSource> {
        let path = entry.path.clone();
        match entry.id {
            TopicId::Steering => self.axis(entry, ControlAxis::Steering, acks),
            TopicId::Braking => self.axis(entry, ControlAxis::Braking, acks),
            TopicId::Acceleration => self.axis(entry, ControlAxis::Acceleration, acks),
            TopicId::Gear => Arc::new(TopicSource::new(
                path,
                GearSource::new(Arc::clone(&self.car)),
                acks,
            )),
            TopicId::RefreshInterval => Arc::new(TopicSource::new(
                path,
                RefreshIntervalSource::new(Arc::clone(&self.refresh)),
                acks,
            )),
            TopicId::ButtonStates => Arc::new(TopicSource::new(
                path,
                ButtonStatesSource::new(Arc::clone(&self.controls)),
                acks,
            )),
            TopicId::ButtonNames => {
                Arc::new(TopicSource::new(path, ButtonNamesSource::new(), acks))
            }
            TopicId::Metric(kind) => Arc::new(TopicSource::new(
                path,
                MetricSource::new(Arc::clone(&self.metrics), kind),
                acks,
            )),
        }
    }

    fn axis(
        &self,
        entry: &TopicEntry,
        axis: ControlAxis,
        acks: Arc<dyn UpdateAck>,
    ) -> Arc<dyn ManagedSource> {
        Arc::new(TopicSource::new(
            entry.path.clone(),
            AxisSource::new(Arc::clone(&self.controls), axis),
            acks,
        ))
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::new(
            Arc::new(ControlsFeed::new()),
            Arc::new(CarState::new()),
            Arc::new(RefreshIntervalManager::new()),
            Arc::new(Metrics::new()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::AckRouter;
    use crate::topic::{TopicLayout, TopicPath};

    #[test]
    fn test_one_source_per_topic() {
        let collaborators = Collaborators::default();
        let acks: Arc<dyn UpdateAck> = Arc::new(AckRouter::new(Arc::clone(&collaborators.metrics)));
        let layout = TopicLayout::new(TopicPath::new("F1Publisher").unwrap()).unwrap();

        let sources: Vec<_> = layout
            .entries()
            .iter()
            .map(|entry| collaborators.source_for(entry, Arc::clone(&acks)))
            .collect();

        assert_eq!(sources.len(), 13);
        for (source, entry) in sources.iter().zip(layout.entries()) {
            assert_eq!(source.path(), &entry.path);
            assert_eq!(source.state(), SourceState::Inactive);
        }
    }

    #[test]
    fn test_attach_car() {
        let collaborators = Collaborators::default();
        let _car = collaborators.attach_car();

        collaborators
            .controls
            .set_button(crate::feed::CarButton::ShiftUp, true);
        assert_eq!(collaborators.car.gear(), 2);
    }
}
