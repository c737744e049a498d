//! Nested settings addressed by dot-separated paths.
//!
//! DESIGN
//! ======
//! Settings are a JSON object tree. `get("a.b.c")` walks the tree one
//! segment at a time; `set("a.b.c", v)` creates missing intermediate objects
//! on the way down. Writes are last-write-wins with no schema.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("invalid settings path: {0:?}")]
    InvalidPath(String),
    #[error("settings root must be an object")]
    NotAnObject,
    #[error("value at {path} could not be decoded: {message}")]
    Decode { path: String, message: String },
}

/// Dynamic nested configuration bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    root: Map<String, Value>,
}

/// Split a dot path, rejecting empty paths and empty segments (`a..b`, `.a`).
fn segments(path: &str) -> Result<Vec<&str>, SettingsError> {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(SettingsError::InvalidPath(path.to_owned()));
    }
    Ok(parts)
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing JSON value. Only objects are accepted as a root.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NotAnObject`] for any non-object value.
    pub fn from_value(value: Value) -> Result<Self, SettingsError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(SettingsError::NotAnObject),
        }
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Look up the value at `path`. Missing or non-object intermediates yield `None`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let parts = segments(path).ok()?;
        let (last, parents) = parts.split_last()?;
        let mut node = &self.root;
        for part in parents {
            node = node.get(*part)?.as_object()?;
        }
        node.get(*last)
    }

    /// Look up and decode the value at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Decode`] if the stored value does not match `T`.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, SettingsError> {
        let Some(value) = self.get(path) else {
            return Ok(None);
        };
        T::deserialize(value)
            .map(Some)
            .map_err(|e| SettingsError::Decode { path: path.to_owned(), message: e.to_string() })
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Write `value` at `path`, creating intermediate objects as needed.
    /// A non-object value sitting on an intermediate segment is replaced.
    ///
    /// Returns the previous value at `path`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidPath`] for empty paths or segments.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<Option<Value>, SettingsError> {
        let parts = segments(path)?;
        let Some((last, parents)) = parts.split_last() else {
            return Err(SettingsError::InvalidPath(path.to_owned()));
        };

        let mut node = &mut self.root;
        for part in parents {
            let slot = node
                .entry((*part).to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                tracing::debug!(path, segment = *part, "replacing scalar with object");
                *slot = Value::Object(Map::new());
            }
            let Value::Object(map) = slot else {
                return Err(SettingsError::InvalidPath(path.to_owned()));
            };
            node = map;
        }
        Ok(node.insert((*last).to_owned(), value.into()))
    }

    /// Remove and return the value at `path`. Empty parents are left in place.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let parts = segments(path).ok()?;
        let (last, parents) = parts.split_last()?;
        let mut node = &mut self.root;
        for part in parents {
            node = node.get_mut(*part)?.as_object_mut()?;
        }
        node.remove(*last)
    }

    /// Deep-merge `other` into `self`. Objects merge key by key; anything else
    /// from `other` overwrites.
    pub fn merge(&mut self, other: Settings) {
        merge_maps(&mut self.root, other.root);
    }
}

fn merge_maps(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, incoming) in source {
        match incoming {
            Value::Object(nested) => {
                if let Some(Value::Object(existing)) = target.get_mut(&key) {
                    merge_maps(existing, nested);
                } else {
                    target.insert(key, Value::Object(nested));
                }
            }
            other => {
                target.insert(key, other);
            }
        }
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
