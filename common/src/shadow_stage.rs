//! Process-wide staging area for drag previews.
//!
//! DESIGN
//! ======
//! Exactly one stage exists at a time. [`ShadowStage::acquire`] creates it on
//! first use and hands out owned [`StageHandle`]s that share it; callers pass
//! those handles around instead of reaching for a global accessor.
//! [`ShadowStage::reset`] tears the stage down. Handles from the old lifecycle
//! become detached and every operation on them fails with
//! [`StageError::Detached`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

static CURRENT: Mutex<Option<Arc<Stage>>> = Mutex::new(None);
static GENERATION: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StageError {
    #[error("stage generation {0} has been reset")]
    Detached(u64),
}

struct Stage {
    generation: u64,
    detached: AtomicBool,
    previews: Mutex<BTreeMap<String, Value>>,
}

/// Lifecycle entry points for the shared stage.
pub struct ShadowStage;

impl ShadowStage {
    /// Return a handle to the current stage, creating it if none exists.
    #[must_use]
    pub fn acquire() -> StageHandle {
        let mut current = CURRENT.lock().unwrap_or_else(PoisonError::into_inner);
        let stage = current.get_or_insert_with(|| {
            let generation = GENERATION.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::debug!(generation, "shadow stage created");
            Arc::new(Stage { generation, detached: AtomicBool::new(false), previews: Mutex::new(BTreeMap::new()) })
        });
        StageHandle { stage: Arc::clone(stage) }
    }

    /// Tear down the current stage. Returns `true` if one existed.
    pub fn reset() -> bool {
        let taken = CURRENT
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match taken {
            Some(stage) => {
                stage.detached.store(true, Ordering::SeqCst);
                stage
                    .previews
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clear();
                tracing::debug!(generation = stage.generation, "shadow stage reset");
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_initialized() -> bool {
        CURRENT
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Owned handle to the shared stage.
#[derive(Clone)]
pub struct StageHandle {
    stage: Arc<Stage>,
}

impl std::fmt::Debug for StageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageHandle")
            .field("generation", &self.stage.generation)
            .field("current", &self.is_current())
            .finish()
    }
}

impl StageHandle {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.stage.generation
    }

    /// Whether this handle still points at the live stage.
    #[must_use]
    pub fn is_current(&self) -> bool {
        !self.stage.detached.load(Ordering::SeqCst)
    }

    fn previews(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Value>>, StageError> {
        if !self.is_current() {
            return Err(StageError::Detached(self.stage.generation));
        }
        Ok(self
            .stage
            .previews
            .lock()
            .unwrap_or_else(PoisonError::into_inner))
    }

    /// Stage a preview under `id`, returning the preview it replaced.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Detached`] if the stage was reset.
    pub fn stage(&self, id: impl Into<String>, preview: Value) -> Result<Option<Value>, StageError> {
        Ok(self.previews()?.insert(id.into(), preview))
    }

    /// # Errors
    ///
    /// Returns [`StageError::Detached`] if the stage was reset.
    pub fn unstage(&self, id: &str) -> Result<Option<Value>, StageError> {
        Ok(self.previews()?.remove(id))
    }

    /// # Errors
    ///
    /// Returns [`StageError::Detached`] if the stage was reset.
    pub fn preview(&self, id: &str) -> Result<Option<Value>, StageError> {
        Ok(self.previews()?.get(id).cloned())
    }

    /// # Errors
    ///
    /// Returns [`StageError::Detached`] if the stage was reset.
    pub fn staged_ids(&self) -> Result<Vec<String>, StageError> {
        Ok(self.previews()?.keys().cloned().collect())
    }

    /// # Errors
    ///
    /// Returns [`StageError::Detached`] if the stage was reset.
    pub fn clear(&self) -> Result<(), StageError> {
        self.previews()?.clear();
        Ok(())
    }
}

#[cfg(test)]
#[path = "shadow_stage_test.rs"]
mod tests;
