//! Event dispatch for timeline playback.
//!
//! DESIGN
//! ======
//! [`Events`] is the container: one ordered listener list per event name,
//! seeded with empty lists for every lifecycle event. [`Emitter`] adds the
//! operations on top (subscribe, trigger, bind, unsubscribe). Listeners run
//! in insertion order on the caller's thread. A listener returning `false`
//! vetoes the triggering operation, but the remaining listeners still run.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub const BEFORE_SET_TIME: &str = "beforeSetTime";
pub const AFTER_SET_TIME: &str = "afterSetTime";
pub const SET_TIME_BY_TICK: &str = "setTimeByTick";
pub const BEFORE_SET_PLAY_RATE: &str = "beforeSetPlayRate";
pub const AFTER_SET_PLAY_RATE: &str = "afterSetPlayRate";
pub const PLAY: &str = "play";
pub const PAUSED: &str = "paused";
pub const ENDED: &str = "ended";

/// Every event a timeline engine emits.
pub const LIFECYCLE_EVENTS: [&str; 8] = [
    BEFORE_SET_TIME,
    AFTER_SET_TIME,
    SET_TIME_BY_TICK,
    BEFORE_SET_PLAY_RATE,
    AFTER_SET_PLAY_RATE,
    PLAY,
    PAUSED,
    ENDED,
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EmitterError {
    #[error("the event {0} does not exist")]
    UnknownEvent(String),
    #[error("the event {0} is already bound")]
    AlreadyBound(String),
}

/// Payload passed to listeners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventArgs {
    /// Time-related events (`beforeSetTime`, `afterSetTime`, `setTimeByTick`).
    Time { time: f64 },
    /// Rate-related events (`beforeSetPlayRate`, `afterSetPlayRate`).
    Rate { rate: f64 },
    /// Events that carry no data (`play`, `paused`, `ended`).
    Engine,
}

pub type Handler = Box<dyn FnMut(&EventArgs) -> bool>;

/// Token returned by [`Emitter::on`], used to remove a single listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    handler: Handler,
}

/// Named listener lists.
pub struct Events {
    handlers: HashMap<String, Vec<Listener>>,
    next_id: u64,
}

impl Events {
    /// All lifecycle events with empty listener lists.
    #[must_use]
    pub fn new() -> Self {
        let handlers = LIFECYCLE_EVENTS
            .iter()
            .map(|name| ((*name).to_owned(), Vec::new()))
            .collect();
        Self { handlers, next_id: 0 }
    }

    /// Merge a partial override map over the defaults. Events missing from
    /// `overrides` keep empty lists; names outside the lifecycle set are
    /// registered as custom events.
    #[must_use]
    pub fn with_overrides(overrides: HashMap<String, Vec<Handler>>) -> Self {
        let mut events = Self::new();
        for (name, handlers) in overrides {
            let listeners = handlers
                .into_iter()
                .map(|handler| Listener { id: events.allocate_id(), handler })
                .collect();
            events.handlers.insert(name, listeners);
        }
        events
    }

    fn allocate_id(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }

    /// Number of listeners registered for `name` (0 for unknown names).
    #[must_use]
    pub fn listener_count(&self, name: &str) -> usize {
        self.handlers.get(name).map_or(0, Vec::len)
    }

    /// Registered event names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for Events {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscribe/trigger operations over an [`Events`] container.
pub struct Emitter {
    events: Events,
}

impl Emitter {
    #[must_use]
    pub fn new(events: Events) -> Self {
        Self { events }
    }

    #[must_use]
    pub fn events(&self) -> &Events {
        &self.events
    }

    /// Add `handler` to one or more events. `names` may hold several
    /// space-separated names; repeats are subscribed once. All names share a
    /// single handler instance under one [`ListenerId`].
    ///
    /// # Errors
    ///
    /// Returns [`EmitterError::UnknownEvent`] if any name is not registered.
    /// Nothing is subscribed in that case.
    pub fn on<F>(&mut self, names: &str, handler: F) -> Result<ListenerId, EmitterError>
    where
        F: FnMut(&EventArgs) -> bool + 'static,
    {
        let mut unique: Vec<&str> = Vec::new();
        for name in names.split_whitespace() {
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        let names = unique;
        if names.is_empty() {
            return Err(EmitterError::UnknownEvent(String::new()));
        }
        if let Some(missing) = names.iter().find(|n| !self.events.handlers.contains_key(**n)) {
            return Err(EmitterError::UnknownEvent((*missing).to_owned()));
        }

        let id = self.events.allocate_id();
        if let [name] = names.as_slice() {
            if let Some(list) = self.events.handlers.get_mut(*name) {
                list.push(Listener { id, handler: Box::new(handler) });
            }
            return Ok(id);
        }
        let shared = Rc::new(RefCell::new(handler));
        for name in names {
            if let Some(list) = self.events.handlers.get_mut(name) {
                let shared = Rc::clone(&shared);
                list.push(Listener { id, handler: Box::new(move |args: &EventArgs| (&mut *shared.borrow_mut())(args)) });
            }
        }
        Ok(id)
    }

    /// Call every listener of `name` in order. Returns `false` if at least
    /// one listener returned `false`.
    ///
    /// # Errors
    ///
    /// Returns [`EmitterError::UnknownEvent`] if `name` is not registered.
    pub fn trigger(&mut self, name: &str, args: &EventArgs) -> Result<bool, EmitterError> {
        let list = self
            .events
            .handlers
            .get_mut(name)
            .ok_or_else(|| EmitterError::UnknownEvent(name.to_owned()))?;
        let mut proceed = true;
        for listener in list.iter_mut() {
            if !(listener.handler)(args) {
                proceed = false;
            }
        }
        Ok(proceed)
    }

    /// Register a new custom event with an empty listener list.
    ///
    /// # Errors
    ///
    /// Returns [`EmitterError::AlreadyBound`] if `name` already exists.
    pub fn bind(&mut self, name: &str) -> Result<(), EmitterError> {
        if self.events.handlers.contains_key(name) {
            return Err(EmitterError::AlreadyBound(name.to_owned()));
        }
        self.events.handlers.insert(name.to_owned(), Vec::new());
        Ok(())
    }

    #[must_use]
    pub fn exist(&self, name: &str) -> bool {
        self.events.handlers.contains_key(name)
    }

    /// Remove one listener from `name`, or all of them when `listener` is `None`.
    /// Unknown names are ignored.
    pub fn off(&mut self, name: &str, listener: Option<ListenerId>) {
        let Some(list) = self.events.handlers.get_mut(name) else {
            return;
        };
        match listener {
            None => list.clear(),
            Some(id) => list.retain(|l| l.id != id),
        }
    }

    /// Remove every listener but keep all event names registered.
    pub fn off_all(&mut self) {
        for list in self.events.handlers.values_mut() {
            list.clear();
        }
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new(Events::new())
    }
}

#[cfg(test)]
#[path = "emitter_test.rs"]
mod tests;
