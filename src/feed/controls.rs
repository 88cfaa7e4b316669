//! Car controls feed
//!
//! Holds the latest calibrated axis values and button states reported by
//! the input device adapter. Every setter raises a notification only when
//! the value actually changes.

use parking_lot::Mutex;
use tracing::trace;

use crate::error::DeviceError;

use super::device::ButtonMap;
use super::ChangeFeed;

/// Number of tracked car buttons
pub const BUTTON_COUNT: usize = 13;

/// Car buttons in their stable enumeration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CarButton {
    RightQuadLeft,
    RightQuadDown,
    RightQuadRight,
    RightQuadUp,
    ShiftDown,
    ShiftUp,
    TopLeft2,
    TopRight1,
    SE,
    ST,
    TopLeft1,
    TopRight2,
    Home,
}

impl CarButton {
    /// Every button, in enumeration order
    pub const ALL: [CarButton; BUTTON_COUNT] = [
        CarButton::RightQuadLeft,
        CarButton::RightQuadDown,
        CarButton::RightQuadRight,
        CarButton::RightQuadUp,
        CarButton::ShiftDown,
        CarButton::ShiftUp,
        CarButton::TopLeft2,
        CarButton::TopRight1,
        CarButton::SE,
        CarButton::ST,
        CarButton::TopLeft1,
        CarButton::TopRight2,
        CarButton::Home,
    ];

    /// Ordinal of the button
    pub fn index(self) -> usize {
        self as usize
    }

    /// Button at an ordinal
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Stable display name
    pub fn name(self) -> &'static str {
        match self {
            CarButton::RightQuadLeft => "RightQuadLeft",
            CarButton::RightQuadDown => "RightQuadDown",
            CarButton::RightQuadRight => "RightQuadRight",
            CarButton::RightQuadUp => "RightQuadUp",
            CarButton::ShiftDown => "ShiftDown",
            CarButton::ShiftUp => "ShiftUp",
            CarButton::TopLeft2 => "TopLeft2",
            CarButton::TopRight1 => "TopRight1",
            CarButton::SE => "SE",
            CarButton::ST => "ST",
            CarButton::TopLeft1 => "TopLeft1",
            CarButton::TopRight2 => "TopRight2",
            CarButton::Home => "Home",
        }
    }
}

impl std::fmt::Display for CarButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Calibrated analogue control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlAxis {
    /// -1.0 (half turn left) to 1.0 (half turn right)
    Steering,
    /// 0.0 (no force) to 1.0 (full force)
    Braking,
    /// 0.0 (no force) to 1.0 (full force)
    Acceleration,
}

impl ControlAxis {
    pub const ALL: [ControlAxis; 3] = [
        ControlAxis::Steering,
        ControlAxis::Braking,
        ControlAxis::Acceleration,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ControlAxis::Steering => "Steering",
            ControlAxis::Braking => "Braking",
            ControlAxis::Acceleration => "Acceleration",
        }
    }
}

/// A button flipped state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonChange {
    pub button: CarButton,
    pub on: bool,
}

/// Point-in-time copy of every control value
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlsSnapshot {
    pub steering: f64,
    pub braking: f64,
    pub acceleration: f64,
    pub buttons: [bool; BUTTON_COUNT],
}

impl ControlsSnapshot {
    /// Value of one axis
    pub fn axis(&self, axis: ControlAxis) -> f64 {
        match axis {
            ControlAxis::Steering => self.steering,
            ControlAxis::Braking => self.braking,
            ControlAxis::Acceleration => self.acceleration,
        }
    }

    fn axis_mut(&mut self, axis: ControlAxis) -> &mut f64 {
        match axis {
            ControlAxis::Steering => &mut self.steering,
            ControlAxis::Braking => &mut self.braking,
            ControlAxis::Acceleration => &mut self.acceleration,
        }
    }
}

#[derive(Default)]
struct ControlsState {
    snapshot: ControlsSnapshot,
    last_raw_buttons: Option<Vec<bool>>,
}

/// Latest car control values with per-control change feeds
pub struct ControlsFeed {
    state: Mutex<ControlsState>,
    steering: ChangeFeed<f64>,
    braking: ChangeFeed<f64>,
    acceleration: ChangeFeed<f64>,
    buttons: ChangeFeed<ButtonChange>,
}

impl ControlsFeed {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ControlsState::default()),
            steering: ChangeFeed::new(),
            braking: ChangeFeed::new(),
            acceleration: ChangeFeed::new(),
            buttons: ChangeFeed::new(),
        }
    }

    /// Current value of an axis
    pub fn axis(&self, axis: ControlAxis) -> f64 {
        self.state.lock().snapshot.axis(axis)
    }

    /// Store a new axis value, notifying if it changed
    ///
    /// Returns `true` when a notification was raised.
    pub fn set_axis(&self, axis: ControlAxis, value: f64) -> bool {
        {
            let mut state = self.state.lock();
            let slot = state.snapshot.axis_mut(axis);
            if *slot == value {
                return false;
            }
            *slot = value;
        }

        self.axis_changes(axis).notify(&value);
        true
    }

    /// Change feed for one axis
    pub fn axis_changes(&self, axis: ControlAxis) -> &ChangeFeed<f64> {
        match axis {
            ControlAxis::Steering => &self.steering,
            ControlAxis::Braking => &self.braking,
            ControlAxis::Acceleration => &self.acceleration,
        }
    }

    /// Whether a button is currently held
    pub fn button(&self, button: CarButton) -> bool {
        self.state.lock().snapshot.buttons[button.index()]
    }

    /// Store a new button state, notifying if it changed
    pub fn set_button(&self, button: CarButton, on: bool) -> bool {
        {
            let mut state = self.state.lock();
            let slot = &mut state.snapshot.buttons[button.index()];
            if *slot == on {
                return false;
            }
            *slot = on;
        }

        self.buttons.notify(&ButtonChange { button, on });
        true
    }

    /// Change feed for button flips
    pub fn button_changes(&self) -> &ChangeFeed<ButtonChange> {
        &self.buttons
    }

    /// Copy of every control value
    pub fn snapshot(&self) -> ControlsSnapshot {
        self.state.lock().snapshot
    }

    /// Diff a raw device button array against the previous poll
    ///
    /// The first call only records the baseline. Afterwards every flipped
    /// index that the map covers updates the matching button and raises a
    /// notification; unmapped indices are logged and skipped. Returns the
    /// number of notifications raised.
    pub fn apply_raw_buttons(&self, map: &ButtonMap, raw: &[bool]) -> Result<usize, DeviceError> {
        if raw.len() > map.len() {
            return Err(DeviceError::UnmappedButtonCount {
                profile: map.profile().name(),
                mapped: map.len(),
                reported: raw.len(),
            });
        }

        let mut changes = Vec::new();
        {
            let mut state = self.state.lock();

            let previous = match state.last_raw_buttons.take() {
                None => {
                    for (index, &on) in raw.iter().enumerate() {
                        if let Some(button) = map.button_at(index) {
                            state.snapshot.buttons[button.index()] = on;
                        }
                    }
                    state.last_raw_buttons = Some(raw.to_vec());
                    return Ok(0);
                }
                Some(previous) => previous,
            };

            if previous.len() != raw.len() {
                let err = DeviceError::ButtonArrayLengthChanged {
                    previous: previous.len(),
                    current: raw.len(),
                };
                state.last_raw_buttons = Some(previous);
                return Err(err);
            }

            for (index, (&was, &on)) in previous.iter().zip(raw.iter()).enumerate() {
                if was == on {
                    continue;
                }
                match map.button_at(index) {
                    Some(button) => {
                        trace!(index, button = %button, on, "Button changed");
                        state.snapshot.buttons[button.index()] = on;
                        changes.push(ButtonChange { button, on });
                    }
                    None => trace!(index, on, "Button changed [not tracked]"),
                }
            }

            state.last_raw_buttons = Some(raw.to_vec());
        }

        for change in &changes {
            self.buttons.notify(change);
        }
        Ok(changes.len())
    }
}

impl Default for ControlsFeed {
    fn default() -> Self {
        Self::new()
    }
}
