//! Refresh interval
//!
//! The polling loop sleeps `floor(1000 / frequency)` milliseconds between
//! samples. Stepping the interval moves the sleep duration one millisecond
//! at a time until the integer frequency changes.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use super::ChangeFeed;

const MILLIS_PER_SECOND: u32 = 1000;

/// Sampling frequency and the matching sleep duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefreshInterval {
    frequency: u32,
    sleep_duration: u32,
}

impl RefreshInterval {
    /// Lowest supported frequency (Hz)
    pub const MIN_FREQUENCY: u32 = 1;
    /// Highest supported frequency (Hz)
    pub const MAX_FREQUENCY: u32 = 1000;
    /// Frequency used at startup and on reset (Hz)
    pub const DEFAULT_FREQUENCY: u32 = 50;

    pub const DEFAULT: RefreshInterval = RefreshInterval::new(Self::DEFAULT_FREQUENCY);
    pub const MINIMUM: RefreshInterval = RefreshInterval::new(Self::MIN_FREQUENCY);
    pub const MAXIMUM: RefreshInterval = RefreshInterval::new(Self::MAX_FREQUENCY);

    /// Interval for a frequency, clamped to the supported range
    pub const fn new(frequency: u32) -> Self {
        let frequency = if frequency < Self::MIN_FREQUENCY {
            Self::MIN_FREQUENCY
        } else if frequency > Self::MAX_FREQUENCY {
            Self::MAX_FREQUENCY
        } else {
            frequency
        };
        Self {
            frequency,
            sleep_duration: MILLIS_PER_SECOND / frequency,
        }
    }

    /// Frequency in Hz
    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Sleep between samples in milliseconds
    pub fn sleep_duration_ms(&self) -> u32 {
        self.sleep_duration
    }

    pub fn sleep_duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.sleep_duration))
    }

    /// Next higher frequency, or `None` past the maximum
    pub fn increase(&self) -> Option<Self> {
        self.step(-1)
    }

    /// Next lower frequency, or `None` below the minimum
    pub fn decrease(&self) -> Option<Self> {
        self.step(1)
    }

    fn step(&self, delta: i64) -> Option<Self> {
        let current = i64::from(self.frequency);
        let mut sleep = i64::from(self.sleep_duration);
        let mut frequency = current;

        while frequency == current {
            sleep += delta;
            frequency = if sleep <= 0 {
                i64::MAX
            } else {
                i64::from(MILLIS_PER_SECOND) / sleep
            };
        }

        if frequency < i64::from(Self::MIN_FREQUENCY) || frequency > i64::from(Self::MAX_FREQUENCY)
        {
            return None;
        }
        u32::try_from(frequency).ok().map(Self::new)
    }
}

impl Default for RefreshInterval {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for RefreshInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Hz ({}ms)", self.frequency, self.sleep_duration)
    }
}

/// Current refresh interval with a change feed
pub struct RefreshIntervalManager {
    current: Mutex<RefreshInterval>,
    changes: ChangeFeed<RefreshInterval>,
}

impl RefreshIntervalManager {
    pub fn new() -> Self {
        Self::with_interval(RefreshInterval::DEFAULT)
    }

    pub fn with_interval(interval: RefreshInterval) -> Self {
        Self {
            current: Mutex::new(interval),
            changes: ChangeFeed::new(),
        }
    }

    pub fn current(&self) -> RefreshInterval {
        *self.current.lock()
    }

    pub fn changes(&self) -> &ChangeFeed<RefreshInterval> {
        &self.changes
    }

    /// Step to the next higher frequency
    pub fn increase(&self) -> bool {
        self.update(|current| current.increase())
    }

    /// Step to the next lower frequency
    pub fn decrease(&self) -> bool {
        self.update(|current| current.decrease())
    }

    /// Return to the default frequency
    pub fn reset(&self) -> bool {
        self.set(RefreshInterval::DEFAULT)
    }

    pub fn minimum(&self) -> bool {
        self.set(RefreshInterval::MINIMUM)
    }

    pub fn maximum(&self) -> bool {
        self.set(RefreshInterval::MAXIMUM)
    }

    /// Replace the interval, notifying if it changed
    pub fn set(&self, interval: RefreshInterval) -> bool {
        self.update(|_| Some(interval))
    }

    fn update(&self, next: impl FnOnce(RefreshInterval) -> Option<RefreshInterval>) -> bool {
        let changed = {
            let mut current = self.current.lock();
            match next(*current) {
                Some(interval) if interval != *current => {
                    *current = interval;
                    Some(interval)
                }
                _ => None,
            }
        };

        match changed {
            Some(interval) => {
                debug!(%interval, "Refresh interval changed");
                self.changes.notify(&interval);
                true
            }
            None => false,
        }
    }
}

impl Default for RefreshIntervalManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_default() {
        let interval = RefreshInterval::default();
        assert_eq!(interval.frequency(), 50);
        assert_eq!(interval.sleep_duration_ms(), 20);
        assert_eq!(interval.sleep_duration(), Duration::from_millis(20));
    }

    #[test]
    fn test_new_clamps() {
        assert_eq!(RefreshInterval::new(0), RefreshInterval::MINIMUM);
        assert_eq!(RefreshInterval::new(5000), RefreshInterval::MAXIMUM);
        assert_eq!(RefreshInterval::new(3).sleep_duration_ms(), 333);
    }

    #[test]
    fn test_step_from_default() {
        let up = RefreshInterval::DEFAULT.increase().unwrap();
        assert_eq!(up.frequency(), 52);
        assert_eq!(up.sleep_duration_ms(), 19);

        let down = RefreshInterval::DEFAULT.decrease().unwrap();
        assert_eq!(down.frequency(), 47);
        assert_eq!(down.sleep_duration_ms(), 21);
    }

    #[test]
    fn test_step_skips_equal_frequencies() {
        // 1000/999 through 1000/501 all truncate to 1Hz
        let up = RefreshInterval::MINIMUM.increase().unwrap();
        assert_eq!(up.frequency(), 2);
        assert_eq!(up.sleep_duration_ms(), 500);
    }

    #[test]
    fn test_step_bounds() {
        assert_eq!(RefreshInterval::MINIMUM.decrease(), None);
        assert_eq!(RefreshInterval::MAXIMUM.increase(), None);
        assert_eq!(
            RefreshInterval::new(500).increase(),
            Some(RefreshInterval::MAXIMUM)
        );
    }

    #[test]
    fn test_manager_notifies_on_change() {
        let manager = RefreshIntervalManager::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = manager.changes().subscribe(move |i| s.lock().push(i.frequency()));

        assert!(!manager.reset());
        assert!(manager.increase());
        assert!(manager.reset());
        assert!(manager.maximum());
        assert!(!manager.increase());

        assert_eq!(*seen.lock(), vec![52, 50, 1000]);
        assert_eq!(manager.current(), RefreshInterval::MAXIMUM);
    }
}
