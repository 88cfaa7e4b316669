//! Scalar content sources

use std::sync::Arc;

use crate::content::Content;
use crate::error::ContentError;
use crate::feed::{CarState, ControlAxis, ControlsFeed, Listener, Subscription};
use crate::stats::{MetricChange, MetricKind, Metrics};

use super::lifecycle::ContentSource;

/// Publishes one calibrated control axis
pub struct AxisSource {
    controls: Arc<ControlsFeed>,
    axis: ControlAxis,
}

impl AxisSource {
    pub fn new(controls: Arc<ControlsFeed>, axis: ControlAxis) -> Self {
        Self { controls, axis }
    }
}

impl ContentSource for AxisSource {
    type Change = f64;

    fn name(&self) -> &'static str {
        self.axis.name()
    }

    fn initial_content(&mut self) -> Result<Content, ContentError> {
        Ok(Content::from(self.controls.axis(self.axis)))
    }

    fn subscribe(&self, listener: Listener<f64>) -> Option<Subscription> {
        Some(self.controls.axis_changes(self.axis).subscribe_listener(listener))
    }

    fn content_for(&mut self, value: &f64) -> Result<Option<Content>, ContentError> {
        Ok(Some(Content::from(*value)))
    }
}

/// Publishes the current gear
pub struct GearSource {
    car: Arc<CarState>,
}

impl GearSource {
    pub fn new(car: Arc<CarState>) -> Self {
        Self { car }
    }
}

impl ContentSource for GearSource {
    type Change = i64;

    fn name(&self) -> &'static str {
        "Gear"
    }

    fn initial_content(&mut self) -> Result<Content, ContentError> {
        Ok(Content::from(self.car.gear()))
    }

    fn subscribe(&self, listener: Listener<i64>) -> Option<Subscription> {
        Some(self.car.gear_changes().subscribe_listener(listener))
    }

    fn content_for(&mut self, gear: &i64) -> Result<Option<Content>, ContentError> {
        Ok(Some(Content::from(*gear)))
    }
}

/// Publishes one metric
///
/// Every metric source listens to the shared metrics feed and keeps only
/// the changes for its own kind.
pub struct MetricSource {
    metrics: Arc<Metrics>,
    kind: MetricKind,
}

impl MetricSource {
    pub fn new(metrics: Arc<Metrics>, kind: MetricKind) -> Self {
        Self { metrics, kind }
    }
}

impl ContentSource for MetricSource {
    type Change = MetricChange;

    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn initial_content(&mut self) -> Result<Content, ContentError> {
        Ok(Content::from(self.metrics.value(self.kind)))
    }

    fn subscribe(&self, listener: Listener<MetricChange>) -> Option<Subscription> {
        Some(self.metrics.changes().subscribe_listener(listener))
    }

    fn content_for(&mut self, change: &MetricChange) -> Result<Option<Content>, ContentError> {
        if change.kind != self.kind {
            return Ok(None);
        }
        Ok(Some(Content::from(change.value)))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn test_axis_content() {
        let controls = Arc::new(ControlsFeed::new());
        controls.set_axis(ControlAxis::Steering, -0.35);
        let mut source = AxisSource::new(Arc::clone(&controls), ControlAxis::Steering);

        assert_eq!(source.initial_content().unwrap(), Content::scalar("-0.35"));
        assert_eq!(
            source.content_for(&0.7).unwrap(),
            Some(Content::scalar("0.7"))
        );
        assert_eq!(source.name(), "Steering");
    }

    #[test]
    fn test_gear_content() {
        let car = Arc::new(CarState::new());
        car.shift_up();
        let mut source = GearSource::new(car);

        assert_eq!(source.initial_content().unwrap(), Content::scalar("2"));
    }

    #[test]
    fn test_metric_filters_by_kind() {
        let metrics = Arc::new(Metrics::new());
        metrics.update_at(Instant::now());
        let mut source = MetricSource::new(Arc::clone(&metrics), MetricKind::CountOfUpdates);

        assert_eq!(source.initial_content().unwrap(), Content::scalar("1"));
        assert_eq!(
            source
                .content_for(&MetricChange {
                    kind: MetricKind::UpTimeInSeconds,
                    value: 4
                })
                .unwrap(),
            None
        );
        assert_eq!(
            source
                .content_for(&MetricChange {
                    kind: MetricKind::CountOfUpdates,
                    value: 2
                })
                .unwrap(),
            Some(Content::scalar("2"))
        );
    }
}
