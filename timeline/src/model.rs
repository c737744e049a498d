//! Tracks and time-ranged actions.
//!
//! Times are seconds. An action covers `[start, end]` and is only valid when
//! both bounds are finite and `start <= end`; constructors and
//! [`TimelineAction::validate`] enforce that, and the engine refuses tracks
//! that fail it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ActionError {
    #[error("action {id} starts after it ends ({start} > {end})")]
    InvertedRange { id: String, start: f64, end: f64 },
    #[error("action {id} has a non-finite time bound")]
    NonFiniteTime { id: String },
}

fn default_true() -> bool {
    true
}

/// A time-ranged entry on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineAction {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub start: f64,
    pub end: f64,
    /// Key of the controller that drives this action.
    pub effect_id: String,
    #[serde(default = "default_true")]
    pub movable: bool,
    #[serde(default = "default_true")]
    pub flexible: bool,
    #[serde(default, rename = "disable")]
    pub disabled: bool,
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl TimelineAction {
    /// Build a movable, flexible action.
    ///
    /// # Errors
    ///
    /// Returns an [`ActionError`] if the range is inverted or not finite.
    pub fn new(id: impl Into<String>, start: f64, end: f64, effect_id: impl Into<String>) -> Result<Self, ActionError> {
        let action = Self {
            id: id.into(),
            name: None,
            start,
            end,
            effect_id: effect_id.into(),
            movable: true,
            flexible: true,
            disabled: false,
            selected: false,
            src: None,
            data: None,
        };
        action.validate()?;
        Ok(action)
    }

    /// # Errors
    ///
    /// Returns an [`ActionError`] if the range is inverted or not finite.
    pub fn validate(&self) -> Result<(), ActionError> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(ActionError::NonFiniteTime { id: self.id.clone() });
        }
        if self.start > self.end {
            return Err(ActionError::InvertedRange { id: self.id.clone(), start: self.start, end: self.end });
        }
        Ok(())
    }

    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `time` lies within `[start, end]`.
    #[must_use]
    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }
}

/// A named track (timeline row) holding actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub actions: Vec<TimelineAction>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, rename = "lock")]
    pub locked: bool,
}

impl TimelineTrack {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), actions: Vec::new(), hidden: false, locked: false }
    }

    #[must_use]
    pub fn with_action(mut self, action: TimelineAction) -> Self {
        self.actions.push(action);
        self
    }

    /// # Errors
    ///
    /// Returns the first invalid action's error.
    pub fn validate(&self) -> Result<(), ActionError> {
        self.actions.iter().try_for_each(TimelineAction::validate)
    }

    /// Latest action end on this track, `0.0` when empty.
    #[must_use]
    pub fn end_time(&self) -> f64 {
        self.actions.iter().map(|a| a.end).fold(0.0, f64::max)
    }
}

/// Latest action end across all tracks.
#[must_use]
pub fn timeline_duration(tracks: &[TimelineTrack]) -> f64 {
    tracks.iter().map(TimelineTrack::end_time).fold(0.0, f64::max)
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
