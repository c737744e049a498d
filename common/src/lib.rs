//! Shared building blocks used by the timeline and explorer crates.
//!
//! - [`settings`]: nested configuration addressed by dot-separated paths.
//! - [`named_id`]: prefixed random identifiers for generated tracks, actions and files.
//! - [`shadow_stage`]: the single per-process staging area for drag previews.

pub mod named_id;
pub mod settings;
pub mod shadow_stage;

pub use named_id::{named_id, named_id_with_len};
pub use settings::{Settings, SettingsError};
pub use shadow_stage::{ShadowStage, StageError, StageHandle};
