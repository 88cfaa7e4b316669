//! Car state feed
//!
//! Derived state driven by button presses: the gear, plus refresh-rate
//! adjustments forwarded to the [`RefreshIntervalManager`].

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::controls::{CarButton, ControlsFeed};
use super::refresh::RefreshIntervalManager;
use super::{ChangeFeed, Subscription};

pub const MIN_GEAR: i64 = 1;
pub const MAX_GEAR: i64 = 8;

/// Current gear with a change feed
pub struct CarState {
    gear: Mutex<i64>,
    changes: ChangeFeed<i64>,
}

impl CarState {
    pub fn new() -> Self {
        Self {
            gear: Mutex::new(MIN_GEAR),
            changes: ChangeFeed::new(),
        }
    }

    pub fn gear(&self) -> i64 {
        *self.gear.lock()
    }

    pub fn gear_changes(&self) -> &ChangeFeed<i64> {
        &self.changes
    }

    /// Shift one gear up unless already in top gear
    pub fn shift_up(&self) -> bool {
        self.shift(1)
    }

    /// Shift one gear down unless already in first gear
    pub fn shift_down(&self) -> bool {
        self.shift(-1)
    }

    fn shift(&self, delta: i64) -> bool {
        let gear = {
            let mut gear = self.gear.lock();
            let next = *gear + delta;
            if !(MIN_GEAR..=MAX_GEAR).contains(&next) {
                return false;
            }
            *gear = next;
            next
        };

        debug!(gear, "Gear changed");
        self.changes.notify(&gear);
        true
    }

    /// React to button presses from `controls`
    ///
    /// Releases are ignored. The returned subscription must be kept alive
    /// for as long as the car should respond.
    pub fn attach(
        self: &Arc<Self>,
        controls: &ControlsFeed,
        refresh: Arc<RefreshIntervalManager>,
    ) -> Subscription {
        let car = Arc::clone(self);
        controls.button_changes().subscribe(move |change| {
            if !change.on {
                return;
            }
            match change.button {
                CarButton::ShiftUp => {
                    car.shift_up();
                }
                CarButton::ShiftDown => {
                    car.shift_down();
                }
                CarButton::SE => {
                    refresh.decrease();
                }
                CarButton::ST => {
                    refresh.increase();
                }
                CarButton::Home => {
                    refresh.reset();
                }
                _ => {}
            }
        })
    }
}

impl Default for CarState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gear_range() {
        let car = CarState::new();
        assert_eq!(car.gear(), 1);
        assert!(!car.shift_down());

        for _ in 0..10 {
            car.shift_up();
        }
        assert_eq!(car.gear(), MAX_GEAR);
        assert!(!car.shift_up());
        assert!(car.shift_down());
        assert_eq!(car.gear(), 7);
    }

    #[test]
    fn test_gear_notifications() {
        let car = CarState::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = car.gear_changes().subscribe(move |g| s.lock().push(*g));

        car.shift_down();
        car.shift_up();
        car.shift_up();

        assert_eq!(*seen.lock(), vec![2, 3]);
    }

    #[test]
    fn test_attach_reacts_to_presses() {
        let controls = ControlsFeed::new();
        let refresh = Arc::new(RefreshIntervalManager::new());
        let car = Arc::new(CarState::new());
        let sub = car.attach(&controls, Arc::clone(&refresh));

        controls.set_button(CarButton::ShiftUp, true);
        controls.set_button(CarButton::ShiftUp, false);
        assert_eq!(car.gear(), 2);

        controls.set_button(CarButton::ST, true);
        assert_eq!(refresh.current().frequency(), 52);
        controls.set_button(CarButton::Home, true);
        assert_eq!(refresh.current().frequency(), 50);
        controls.set_button(CarButton::SE, true);
        assert_eq!(refresh.current().frequency(), 47);

        drop(sub);
        controls.set_button(CarButton::ShiftUp, true);
        assert_eq!(car.gear(), 2);
    }
}
