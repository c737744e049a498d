//! Timeline model and playback.
//!
//! ARCHITECTURE
//! ============
//! - [`model`]: tracks and their time-ranged actions.
//! - [`emitter`]: named listener lists for playback lifecycle events.
//! - [`engine`]: a caller-driven playback engine that activates actions as
//!   the playhead enters and leaves their ranges.
//! - [`builder`]: best-effort conversion of raw action inputs into tracks.

pub mod builder;
pub mod emitter;
pub mod engine;
pub mod model;

pub use builder::{ActionInput, build_tracks};
pub use emitter::{Emitter, EmitterError, EventArgs, Events, ListenerId};
pub use engine::{ActionController, ControllerParams, EngineError, PlayOptions, PlayState, TimelineEngine};
pub use model::{ActionError, TimelineAction, TimelineTrack, timeline_duration};
