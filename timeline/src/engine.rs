//! Timeline playback engine.
//!
//! DESIGN
//! ======
//! The engine keeps every action sorted by start time plus a cursor (`next`)
//! into that order and a list of currently active actions. Moving the
//! playhead runs two passes:
//! - leave: active actions whose range no longer contains the time are
//!   dropped and their controller gets `leave`.
//! - enter: the cursor advances over actions that have started; those that
//!   have not yet ended become active and their controller gets `enter`.
//!
//! There is no frame loop inside the engine. The host calls [`TimelineEngine::tick`]
//! with a monotonic timestamp in milliseconds (an animation frame, a timer,
//! or a test) and the engine advances by the elapsed time times the play rate.

use std::collections::HashMap;

use crate::emitter::{self, Emitter, EventArgs, Events, ListenerId};
use crate::model::{ActionError, TimelineAction, TimelineTrack, timeline_duration};

/// Upper bound on the time advanced by a single tick, in milliseconds.
const MAX_TICK_MS: f64 = 1000.0;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    InvalidAction(#[from] ActionError),
    #[error("duplicate action id: {0}")]
    DuplicateAction(String),
    #[error(transparent)]
    Emitter(#[from] emitter::EmitterError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayOptions {
    /// Stop once the playhead reaches this time. Takes priority over `auto_end`.
    pub to_time: Option<f64>,
    /// Stop once every action has been played through.
    pub auto_end: bool,
}

/// Arguments handed to controller hooks.
#[derive(Debug, Clone, Copy)]
pub struct ControllerParams<'a> {
    pub action: &'a TimelineAction,
    pub time: f64,
}

/// Per-effect behavior, registered under an action's `effect_id`.
pub trait ActionController {
    /// The playhead entered the action's range.
    fn enter(&mut self, _params: &ControllerParams<'_>) {}
    /// The playhead left the action's range.
    fn leave(&mut self, _params: &ControllerParams<'_>) {}
    /// Playback started while the action was active.
    fn start(&mut self, _params: &ControllerParams<'_>) {}
    /// Playback paused while the action was active.
    fn stop(&mut self, _params: &ControllerParams<'_>) {}
    /// Per-frame update while active.
    fn update(&mut self, _params: &ControllerParams<'_>) {}
}

#[derive(Clone, Copy)]
enum Hook {
    Enter,
    Leave,
    Start,
    Stop,
    Update,
}

fn notify(
    controllers: &mut HashMap<String, Box<dyn ActionController>>,
    action: &TimelineAction,
    time: f64,
    hook: Hook,
) {
    let Some(controller) = controllers.get_mut(&action.effect_id) else {
        return;
    };
    let params = ControllerParams { action, time };
    match hook {
        Hook::Enter => controller.enter(&params),
        Hook::Leave => controller.leave(&params),
        Hook::Start => controller.start(&params),
        Hook::Stop => controller.stop(&params),
        Hook::Update => controller.update(&params),
    }
}

pub struct TimelineEngine {
    emitter: Emitter,
    controllers: HashMap<String, Box<dyn ActionController>>,
    play_rate: f64,
    current_time: f64,
    play_state: PlayState,
    /// Options of the current run; `None` while paused.
    run: Option<PlayOptions>,
    /// Timestamp of the previous tick, in milliseconds.
    prev_tick: Option<f64>,
    tracks: Vec<TimelineTrack>,
    actions: HashMap<String, TimelineAction>,
    /// Action id -> index into `tracks`.
    action_tracks: HashMap<String, usize>,
    /// Action ids sorted by start time.
    sorted_ids: Vec<String>,
    /// Cursor into `sorted_ids`.
    next: usize,
    active_ids: Vec<String>,
}

impl TimelineEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::with_events(Events::new())
    }

    /// Build an engine whose emitter starts with pre-registered listeners.
    #[must_use]
    pub fn with_events(events: Events) -> Self {
        Self {
            emitter: Emitter::new(events),
            controllers: HashMap::new(),
            play_rate: 1.0,
            current_time: 0.0,
            play_state: PlayState::Paused,
            run: None,
            prev_tick: None,
            tracks: Vec::new(),
            actions: HashMap::new(),
            action_tracks: HashMap::new(),
            sorted_ids: Vec::new(),
            next: 0,
            active_ids: Vec::new(),
        }
    }

    pub fn emitter_mut(&mut self) -> &mut Emitter {
        &mut self.emitter
    }

    /// Subscribe to engine events. See [`Emitter::on`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Emitter`] for unknown event names.
    pub fn on<F>(&mut self, names: &str, handler: F) -> Result<ListenerId, EngineError>
    where
        F: FnMut(&EventArgs) -> bool + 'static,
    {
        Ok(self.emitter.on(names, handler)?)
    }

    pub fn register_controller(&mut self, effect_id: impl Into<String>, controller: Box<dyn ActionController>) {
        self.controllers.insert(effect_id.into(), controller);
    }

    /// Replace the loaded tracks. Pauses playback, leaves every active
    /// action, then re-enters at the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if an action is invalid or an action id repeats.
    /// The previously loaded tracks stay in place in that case.
    pub fn load_tracks(&mut self, tracks: Vec<TimelineTrack>) -> Result<(), EngineError> {
        let mut actions = HashMap::new();
        let mut action_tracks = HashMap::new();
        for (index, track) in tracks.iter().enumerate() {
            for action in &track.actions {
                action.validate()?;
                if actions.insert(action.id.clone(), action.clone()).is_some() {
                    return Err(EngineError::DuplicateAction(action.id.clone()));
                }
                action_tracks.insert(action.id.clone(), index);
            }
        }

        let mut sorted: Vec<&TimelineAction> = actions.values().collect();
        sorted.sort_by(|a, b| a.start.total_cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        let sorted_ids = sorted.into_iter().map(|a| a.id.clone()).collect();

        if self.is_playing() {
            self.pause();
        }
        self.clear_active();

        self.tracks = tracks;
        self.actions = actions;
        self.action_tracks = action_tracks;
        self.sorted_ids = sorted_ids;
        self.next = 0;
        tracing::debug!(actions = self.actions.len(), tracks = self.tracks.len(), "timeline loaded");

        self.enter_actions(self.current_time);
        Ok(())
    }

    #[must_use]
    pub fn tracks(&self) -> &[TimelineTrack] {
        &self.tracks
    }

    /// Latest action end across loaded tracks.
    #[must_use]
    pub fn duration(&self) -> f64 {
        timeline_duration(&self.tracks)
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.play_state == PlayState::Playing
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.play_state == PlayState::Paused
    }

    #[must_use]
    pub fn play_state(&self) -> PlayState {
        self.play_state
    }

    #[must_use]
    pub fn play_rate(&self) -> f64 {
        self.play_rate
    }

    #[must_use]
    pub fn time(&self) -> f64 {
        self.current_time
    }

    #[must_use]
    pub fn action(&self, id: &str) -> Option<&TimelineAction> {
        self.actions.get(id)
    }

    #[must_use]
    pub fn action_track(&self, id: &str) -> Option<&TimelineTrack> {
        self.action_tracks.get(id).and_then(|i| self.tracks.get(*i))
    }

    #[must_use]
    pub fn active_action_ids(&self) -> &[String] {
        &self.active_ids
    }

    /// Active actions that are selected, paired with their track.
    #[must_use]
    pub fn selected_actions(&self) -> Vec<(&TimelineAction, &TimelineTrack)> {
        self.active_ids
            .iter()
            .filter_map(|id| {
                let action = self.actions.get(id)?;
                let track = self.action_track(id)?;
                action.selected.then_some((action, track))
            })
            .collect()
    }

    fn emit(&mut self, name: &str, args: EventArgs) -> bool {
        self.emitter.trigger(name, &args).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "timeline event dropped");
            true
        })
    }

    /// Change the play rate. Rates `<= 0` are refused, as is any change a
    /// `beforeSetPlayRate` listener vetoes.
    pub fn set_play_rate(&mut self, rate: f64) -> bool {
        if rate <= 0.0 || !rate.is_finite() {
            tracing::error!(rate, "play rate must be positive");
            return false;
        }
        if !self.emit(emitter::BEFORE_SET_PLAY_RATE, EventArgs::Rate { rate }) {
            return false;
        }
        self.play_rate = rate;
        self.emit(emitter::AFTER_SET_PLAY_RATE, EventArgs::Rate { rate });
        true
    }

    /// Move the playhead. Manual moves (`is_tick == false`) can be vetoed by a
    /// `beforeSetTime` listener.
    pub fn set_time(&mut self, time: f64, is_tick: bool) -> bool {
        if !time.is_finite() {
            tracing::error!(time, "time must be finite");
            return false;
        }
        if !is_tick && !self.emit(emitter::BEFORE_SET_TIME, EventArgs::Time { time }) {
            return false;
        }

        self.current_time = time;
        self.next = 0;
        self.leave_actions(time);
        self.enter_actions(time);

        if is_tick {
            self.emit(emitter::SET_TIME_BY_TICK, EventArgs::Time { time });
        } else {
            self.emit(emitter::AFTER_SET_TIME, EventArgs::Time { time });
        }
        true
    }

    /// Start playing from the current time. Returns `false` when already
    /// playing or when `to_time` is not ahead of the playhead.
    pub fn play(&mut self, options: PlayOptions) -> bool {
        if let Some(to_time) = options.to_time.filter(|t| !t.is_finite()) {
            tracing::error!(to_time, "play target must be finite");
            return false;
        }
        if self.is_playing() || options.to_time.is_some_and(|to| to <= self.current_time) {
            return false;
        }
        self.play_state = PlayState::Playing;
        self.run = Some(options);
        self.prev_tick = None;
        self.start_or_stop(Hook::Start);
        self.emit(emitter::PLAY, EventArgs::Engine);
        true
    }

    pub fn pause(&mut self) {
        if self.is_playing() {
            self.play_state = PlayState::Paused;
            self.start_or_stop(Hook::Stop);
            self.emit(emitter::PAUSED, EventArgs::Engine);
        }
        self.run = None;
        self.prev_tick = None;
    }

    fn end(&mut self) {
        self.pause();
        self.emit(emitter::ENDED, EventArgs::Engine);
    }

    /// Advance playback to the host timestamp `now_ms`. The first tick after
    /// [`play`](Self::play) only records the timestamp. Returns whether the
    /// engine is still playing.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        let Some(options) = self.run.filter(|_| self.is_playing()) else {
            return false;
        };

        let elapsed = self.prev_tick.map_or(0.0, |prev| (now_ms - prev).clamp(0.0, MAX_TICK_MS));
        self.prev_tick = Some(now_ms);

        let mut time = self.current_time + elapsed / 1000.0 * self.play_rate;
        if let Some(to) = options.to_time {
            time = time.min(to);
        }
        self.set_time(time, true);
        self.tick_actions(time);

        match options.to_time {
            Some(to) if to <= time => self.end(),
            None if options.auto_end && self.next >= self.sorted_ids.len() && self.active_ids.is_empty() => {
                self.end();
            }
            _ => {}
        }
        self.is_playing()
    }

    /// Re-run the per-frame pass at the current time while paused.
    pub fn rerender(&mut self) {
        if self.is_playing() {
            return;
        }
        self.tick_actions(self.current_time);
    }

    fn tick_actions(&mut self, time: f64) {
        self.enter_actions(time);
        self.leave_actions(time);
        let now = self.current_time;
        for id in &self.active_ids {
            if let Some(action) = self.actions.get(id) {
                notify(&mut self.controllers, action, now, Hook::Update);
            }
        }
    }

    fn start_or_stop(&mut self, hook: Hook) {
        let now = self.current_time;
        for id in &self.active_ids {
            if let Some(action) = self.actions.get(id) {
                notify(&mut self.controllers, action, now, hook);
            }
        }
    }

    fn clear_active(&mut self) {
        let now = self.current_time;
        for id in self.active_ids.drain(..) {
            if let Some(action) = self.actions.get(&id) {
                notify(&mut self.controllers, action, now, Hook::Leave);
            }
        }
        self.next = 0;
    }

    fn enter_actions(&mut self, time: f64) {
        let now = self.current_time;
        while let Some(id) = self.sorted_ids.get(self.next) {
            if let Some(action) = self.actions.get(id) {
                if !action.disabled {
                    if action.start > time {
                        break;
                    }
                    if action.end > time && !self.active_ids.contains(id) {
                        notify(&mut self.controllers, action, now, Hook::Enter);
                        self.active_ids.push(id.clone());
                    }
                }
            }
            self.next += 1;
        }
    }

    fn leave_actions(&mut self, time: f64) {
        let now = self.current_time;
        let mut i = 0;
        while i < self.active_ids.len() {
            let keep = match self.actions.get(&self.active_ids[i]) {
                Some(action) if action.start > time || action.end < time => {
                    notify(&mut self.controllers, action, now, Hook::Leave);
                    false
                }
                Some(_) => true,
                None => false,
            };
            if keep {
                i += 1;
            } else {
                self.active_ids.remove(i);
            }
        }
    }
}

impl Default for TimelineEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
