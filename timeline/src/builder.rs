//! Build tracks from raw action inputs.
//!
//! Each input becomes its own single-action track. Sources without a scheme
//! are resolved against a base URL and repeated slashes are collapsed.
//! Building is best-effort: a bad input is skipped with a warning, and a
//! failure of the whole batch logs and yields no tracks.

use common::named_id;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{ActionError, TimelineAction, TimelineTrack};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BuildError {
    #[error("base url must start with http:// or https://: {0:?}")]
    InvalidBaseUrl(String),
    #[error("action input has no source")]
    EmptySource,
    #[error(transparent)]
    InvalidRange(#[from] ActionError),
}

/// Raw action description, typically from demo data or a drop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start: f64,
    /// Explicit end time. Falls back to `start + duration`, then to `start`.
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    pub effect_id: String,
    pub src: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Build one track per input. Never fails; problems are logged.
#[must_use]
pub fn build_tracks(inputs: Vec<ActionInput>, base_url: &str) -> Vec<TimelineTrack> {
    match try_build_tracks(inputs, base_url) {
        Ok(tracks) => tracks,
        Err(e) => {
            tracing::warn!(error = %e, "build_tracks failed");
            Vec::new()
        }
    }
}

/// Like [`build_tracks`] but reports batch-level failures.
///
/// # Errors
///
/// Returns [`BuildError::InvalidBaseUrl`] if `base_url` has no http(s) scheme.
pub fn try_build_tracks(inputs: Vec<ActionInput>, base_url: &str) -> Result<Vec<TimelineTrack>, BuildError> {
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(BuildError::InvalidBaseUrl(base_url.to_owned()));
    }

    let tracks = inputs
        .into_iter()
        .filter_map(|input| match build_action(input, base_url) {
            Ok(action) => {
                let track_id = named_id("track");
                let name = action.name.clone().unwrap_or_else(|| track_id.clone());
                Some(TimelineTrack::new(track_id, name).with_action(action))
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping action input");
                None
            }
        })
        .collect();
    Ok(tracks)
}

fn build_action(input: ActionInput, base_url: &str) -> Result<TimelineAction, BuildError> {
    if input.src.trim().is_empty() {
        return Err(BuildError::EmptySource);
    }
    let src = resolve_src(&input.src, base_url);
    let name = input.name.or_else(|| file_name(&src).map(str::to_owned));
    let end = input
        .end
        .or_else(|| input.duration.map(|d| input.start + d))
        .unwrap_or(input.start);
    let id = input.id.unwrap_or_else(|| named_id("action"));

    let mut action = TimelineAction::new(id, input.start, end, input.effect_id)?;
    action.name = name;
    action.src = Some(src);
    action.data = input.data;
    Ok(action)
}

/// Resolve `src` against `base_url` unless it already carries an http(s)
/// scheme, then collapse repeated slashes that do not follow a `:`.
#[must_use]
pub fn resolve_src(src: &str, base_url: &str) -> String {
    let joined = if src.contains("http") { src.to_owned() } else { format!("{base_url}{src}") };
    collapse_slashes(&joined)
}

fn collapse_slashes(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    let mut keep_run = false;
    for c in url.chars() {
        if c == '/' {
            if out.ends_with('/') {
                if !keep_run {
                    continue;
                }
            } else {
                keep_run = out.is_empty() || out.ends_with(':');
            }
        }
        out.push(c);
    }
    out
}

/// Last path segment of a URL, without query or fragment.
#[must_use]
pub fn file_name(src: &str) -> Option<&str> {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    path.rsplit('/').find(|s| !s.is_empty())
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod tests;
