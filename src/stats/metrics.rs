//! Runtime metrics for the publisher
//!
//! Six `u64` values, recomputed once per poll by [`Metrics::update`]. Values
//! that differ from the last reported set are raised on the change feed.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::feed::ChangeFeed;

/// Number of metric kinds
pub const METRIC_COUNT: usize = 6;

/// Default window for the per-second rates
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Published metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    /// Number of polls so far
    CountOfUpdates,
    /// Whole seconds since the first poll
    UpTimeInSeconds,
    /// Pushes acknowledged by the broker
    CountOfSuccessfulTopicSourceUpdates,
    /// Pushes rejected or failed
    CountOfFailedTopicSourceUpdates,
    /// Polls per second over the last sample window
    RateOfUpdatesPerSecond,
    /// Acknowledged pushes per second over the last sample window
    RateOfSuccessfulTopicSourceUpdatesPerSecond,
}

impl MetricKind {
    pub const ALL: [MetricKind; METRIC_COUNT] = [
        MetricKind::CountOfUpdates,
        MetricKind::UpTimeInSeconds,
        MetricKind::CountOfSuccessfulTopicSourceUpdates,
        MetricKind::CountOfFailedTopicSourceUpdates,
        MetricKind::RateOfUpdatesPerSecond,
        MetricKind::RateOfSuccessfulTopicSourceUpdatesPerSecond,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            MetricKind::CountOfUpdates => "CountOfUpdates",
            MetricKind::UpTimeInSeconds => "UpTimeInSeconds",
            MetricKind::CountOfSuccessfulTopicSourceUpdates => {
                "CountOfSuccessfulTopicSourceUpdates"
            }
            MetricKind::CountOfFailedTopicSourceUpdates => "CountOfFailedTopicSourceUpdates",
            MetricKind::RateOfUpdatesPerSecond => "RateOfUpdatesPerSecond",
            MetricKind::RateOfSuccessfulTopicSourceUpdatesPerSecond => {
                "RateOfSuccessfulTopicSourceUpdatesPerSecond"
            }
        }
    }

    /// Path of the metric topic relative to the namespace root
    pub fn topic_path(self) -> &'static str {
        match self {
            MetricKind::CountOfUpdates => "Metrics/CountOfUpdates",
            MetricKind::UpTimeInSeconds => "Metrics/UpTimeInSeconds",
            MetricKind::CountOfSuccessfulTopicSourceUpdates => {
                "Metrics/CountOfSuccessfulTopicSourceUpdates"
            }
            MetricKind::CountOfFailedTopicSourceUpdates => {
                "Metrics/CountOfFailedTopicSourceUpdates"
            }
            MetricKind::RateOfUpdatesPerSecond => "Metrics/RateOfUpdatesPerSecond",
            MetricKind::RateOfSuccessfulTopicSourceUpdatesPerSecond => {
                "Metrics/RateOfSuccessfulTopicSourceUpdatesPerSecond"
            }
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A metric value that changed since the last update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricChange {
    pub kind: MetricKind,
    pub value: u64,
}

#[derive(Debug, Default)]
struct MetricsState {
    values: [u64; METRIC_COUNT],
    last_reported: [u64; METRIC_COUNT],
    started_at: Option<Instant>,
    sample_started_at: Option<Instant>,
    updates_this_sample: u64,
    successes_this_sample: u64,
}

/// Publisher metrics collaborator
pub struct Metrics {
    state: Mutex<MetricsState>,
    changes: ChangeFeed<MetricChange>,
    sample_interval: Duration,
}

impl Metrics {
    pub fn new() -> Self {
        Self::with_sample_interval(DEFAULT_SAMPLE_INTERVAL)
    }

    /// Create metrics whose rates are recomputed every `interval`
    pub fn with_sample_interval(interval: Duration) -> Self {
        Self {
            state: Mutex::new(MetricsState::default()),
            changes: ChangeFeed::new(),
            sample_interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Current value of a metric
    pub fn value(&self, kind: MetricKind) -> u64 {
        self.state.lock().values[kind.index()]
    }

    pub fn changes(&self) -> &ChangeFeed<MetricChange> {
        &self.changes
    }

    pub fn sample_interval(&self) -> Duration {
        self.sample_interval
    }

    /// Count one acknowledged push
    pub fn record_successful_update(&self) {
        let mut state = self.state.lock();
        state.successes_this_sample += 1;
        state.values[MetricKind::CountOfSuccessfulTopicSourceUpdates.index()] += 1;
    }

    /// Count one failed push
    pub fn record_failed_update(&self) {
        self.state.lock().values[MetricKind::CountOfFailedTopicSourceUpdates.index()] += 1;
    }

    /// Recompute metrics for one poll
    pub fn update(&self) {
        self.update_at(Instant::now());
    }

    /// Recompute metrics as if polled at `now`
    ///
    /// Returns the number of change notifications raised.
    pub fn update_at(&self, now: Instant) -> usize {
        let changes: Vec<MetricChange> = {
            let mut state = self.state.lock();

            state.values[MetricKind::CountOfUpdates.index()] += 1;
            let started = *state.started_at.get_or_insert(now);
            state.values[MetricKind::UpTimeInSeconds.index()] =
                now.saturating_duration_since(started).as_secs();

            match state.sample_started_at {
                None => {
                    state.sample_started_at = Some(now);
                    state.updates_this_sample = 0;
                    state.successes_this_sample = 0;
                }
                Some(sample_start) => {
                    state.updates_this_sample += 1;
                    if now.saturating_duration_since(sample_start) >= self.sample_interval {
                        let updates = self.per_second(state.updates_this_sample);
                        let successes = self.per_second(state.successes_this_sample);
                        state.values[MetricKind::RateOfUpdatesPerSecond.index()] = updates;
                        state.values
                            [MetricKind::RateOfSuccessfulTopicSourceUpdatesPerSecond.index()] =
                            successes;
                        state.sample_started_at = Some(now);
                        state.updates_this_sample = 0;
                        state.successes_this_sample = 0;
                    }
                }
            }

            let values = state.values;
            let changes = MetricKind::ALL
                .iter()
                .filter(|kind| values[kind.index()] != state.last_reported[kind.index()])
                .map(|&kind| MetricChange {
                    kind,
                    value: values[kind.index()],
                })
                .collect();
            state.last_reported = values;
            changes
        };

        for change in &changes {
            self.changes.notify(change);
        }
        changes.len()
    }

    fn per_second(&self, count: u64) -> u64 {
        let millis = self.sample_interval.as_millis().max(1);
        let rate = u128::from(count) * 1000 / millis;
        u64::try_from(rate).unwrap_or(u64::MAX)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn collect(metrics: &Metrics) -> (Arc<Mutex<Vec<MetricChange>>>, crate::feed::Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let sub = metrics.changes().subscribe(move |c| s.lock().push(*c));
        (seen, sub)
    }

    #[test]
    fn test_topic_paths() {
        for kind in MetricKind::ALL {
            assert_eq!(kind.topic_path(), format!("Metrics/{}", kind.name()));
        }
    }

    #[test]
    fn test_first_update() {
        let metrics = Metrics::new();
        let (seen, _sub) = collect(&metrics);

        assert_eq!(metrics.update_at(Instant::now()), 1);
        assert_eq!(
            *seen.lock(),
            vec![MetricChange {
                kind: MetricKind::CountOfUpdates,
                value: 1
            }]
        );
        assert_eq!(metrics.value(MetricKind::UpTimeInSeconds), 0);
    }

    #[test]
    fn test_uptime_and_rates() {
        let metrics = Metrics::new();
        let start = Instant::now();

        metrics.update_at(start);
        for i in 1..=9 {
            metrics.record_successful_update();
            metrics.update_at(start + Duration::from_millis(100 * i));
        }
        assert_eq!(metrics.value(MetricKind::RateOfUpdatesPerSecond), 0);

        metrics.update_at(start + Duration::from_millis(1500));
        assert_eq!(metrics.value(MetricKind::CountOfUpdates), 11);
        assert_eq!(metrics.value(MetricKind::UpTimeInSeconds), 1);
        assert_eq!(metrics.value(MetricKind::RateOfUpdatesPerSecond), 10);
        assert_eq!(
            metrics.value(MetricKind::RateOfSuccessfulTopicSourceUpdatesPerSecond),
            9
        );
    }

    #[test]
    fn test_rates_scale_with_interval() {
        let metrics = Metrics::with_sample_interval(Duration::from_secs(2));
        let start = Instant::now();

        metrics.update_at(start);
        for i in 1..=8 {
            metrics.update_at(start + Duration::from_millis(250 * i));
        }
        assert_eq!(metrics.value(MetricKind::RateOfUpdatesPerSecond), 4);
    }

    #[test]
    fn test_counters_reported_on_next_update() {
        let metrics = Metrics::new();
        let start = Instant::now();
        metrics.update_at(start);

        let (seen, _sub) = collect(&metrics);
        metrics.record_failed_update();
        assert!(seen.lock().is_empty());

        metrics.update_at(start);
        let kinds: Vec<_> = seen.lock().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MetricKind::CountOfUpdates,
                MetricKind::CountOfFailedTopicSourceUpdates
            ]
        );
    }
}
