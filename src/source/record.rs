//! Record content sources
//!
//! Each source keeps one [`RecordBuilder`] for its lifetime and only sets
//! the fields a change touches. Untouched fields keep their last value.

use std::sync::Arc;

use crate::content::{Content, RecordBuilder};
use crate::error::ContentError;
use crate::feed::{
    ButtonChange, CarButton, ControlsFeed, Listener, RefreshInterval, RefreshIntervalManager,
    Subscription,
};
use crate::topic::{
    button_names_schema, button_states_schema, refresh_interval_schema, FREQUENCY_FIELD,
    SLEEP_DURATION_FIELD,
};

use super::lifecycle::ContentSource;

fn flag(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}

/// Publishes the pressed state of every button
pub struct ButtonStatesSource {
    controls: Arc<ControlsFeed>,
    builder: RecordBuilder,
}

impl ButtonStatesSource {
    pub fn new(controls: Arc<ControlsFeed>) -> Self {
        Self {
            controls,
            builder: RecordBuilder::new(button_states_schema()),
        }
    }
}

impl ContentSource for ButtonStatesSource {
    type Change = ButtonChange;

    fn name(&self) -> &'static str {
        "ButtonStates"
    }

    fn initial_content(&mut self) -> Result<Content, ContentError> {
        let snapshot = self.controls.snapshot();
        for button in CarButton::ALL {
            self.builder
                .set_index(button.index(), flag(snapshot.buttons[button.index()]))?;
        }
        Ok(self.builder.build())
    }

    fn subscribe(&self, listener: Listener<ButtonChange>) -> Option<Subscription> {
        Some(self.controls.button_changes().subscribe_listener(listener))
    }

    fn content_for(&mut self, change: &ButtonChange) -> Result<Option<Content>, ContentError> {
        self.builder
            .set_index(change.button.index(), flag(change.on))?;
        Ok(Some(self.builder.build()))
    }
}

/// Publishes the static button name table
pub struct ButtonNamesSource {
    builder: RecordBuilder,
}

impl ButtonNamesSource {
    pub fn new() -> Self {
        Self {
            builder: RecordBuilder::new(button_names_schema()),
        }
    }
}

impl Default for ButtonNamesSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentSource for ButtonNamesSource {
    type Change = ();

    fn name(&self) -> &'static str {
        "ButtonNames"
    }

    fn initial_content(&mut self) -> Result<Content, ContentError> {
        for button in CarButton::ALL {
            self.builder.set_index(button.index(), button.name())?;
        }
        Ok(self.builder.build())
    }

    fn subscribe(&self, _listener: Listener<()>) -> Option<Subscription> {
        None
    }

    fn content_for(&mut self, _change: &()) -> Result<Option<Content>, ContentError> {
        Ok(None)
    }
}

/// Publishes the polling frequency and sleep duration
pub struct RefreshIntervalSource {
    refresh: Arc<RefreshIntervalManager>,
    builder: RecordBuilder,
}

impl RefreshIntervalSource {
    pub fn new(refresh: Arc<RefreshIntervalManager>) -> Self {
        Self {
            refresh,
            builder: RecordBuilder::new(refresh_interval_schema()),
        }
    }

    fn build(&mut self, interval: RefreshInterval) -> Result<Content, ContentError> {
        self.builder
            .set(FREQUENCY_FIELD, interval.frequency().to_string())?
            .set(SLEEP_DURATION_FIELD, interval.sleep_duration_ms().to_string())?;
        Ok(self.builder.build())
    }
}

impl ContentSource for RefreshIntervalSource {
    type Change = RefreshInterval;

    fn name(&self) -> &'static str {
        "RefreshInterval"
    }

    fn initial_content(&mut self) -> Result<Content, ContentError> {
        let current = self.refresh.current();
        self.build(current)
    }

    fn subscribe(&self, listener: Listener<RefreshInterval>) -> Option<Subscription> {
        Some(self.refresh.changes().subscribe_listener(listener))
    }

    fn content_for(&mut self, interval: &RefreshInterval) -> Result<Option<Content>, ContentError> {
        self.build(*interval).map(Some)
    }
}
