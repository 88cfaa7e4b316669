//! Raw button index mapping
//!
//! Input devices report buttons as a flat array. The profile decides which
//! raw index corresponds to which car button.

use crate::error::DeviceError;

use super::controls::CarButton;

/// Kind of attached input device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceProfile {
    /// Steering wheel with pedals
    Driving,
    /// Single-stick joystick, throttle axis doubles as brake
    Joystick,
}

impl DeviceProfile {
    pub fn name(self) -> &'static str {
        match self {
            DeviceProfile::Driving => "driving",
            DeviceProfile::Joystick => "joystick",
        }
    }

    fn table(self) -> &'static [CarButton] {
        match self {
            DeviceProfile::Driving => &DRIVING_BUTTONS,
            DeviceProfile::Joystick => &JOYSTICK_BUTTONS,
        }
    }
}

const DRIVING_BUTTONS: [CarButton; 13] = [
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

// Fire button shifts up; buttons 2..5 follow.
const JOYSTICK_BUTTONS: [CarButton; 5] = [
    CarButton::ShiftUp,
    CarButton::ShiftDown,
    CarButton::Home,
    CarButton::SE,
    CarButton::ST,
];

/// Raw index to car button table for one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonMap {
    profile: DeviceProfile,
    table: &'static [CarButton],
}

impl ButtonMap {
    /// Build the map for a device reporting `reported_buttons` buttons
    pub fn new(profile: DeviceProfile, reported_buttons: usize) -> Result<Self, DeviceError> {
        let table = profile.table();
        if reported_buttons > table.len() {
            return Err(DeviceError::UnmappedButtonCount {
                profile: profile.name(),
                mapped: table.len(),
                reported: reported_buttons,
            });
        }
        Ok(Self { profile, table })
    }

    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    /// Number of mapped raw indices
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Car button at a raw index
    pub fn button_at(&self, index: usize) -> Option<CarButton> {
        self.table.get(index).copied()
    }

    /// Raw index of a car button
    pub fn index_of(&self, button: CarButton) -> Option<usize> {
        self.table.iter().position(|b| *b == button)
    }
}
