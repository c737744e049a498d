//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the subscriber store, the verification mailer, the normalized set of
//! origins allowed to subscribe, and the configured base URL for
//! verification links. Store and mailer are trait objects
//! so handlers can be exercised without Postgres or a mail provider.

use std::sync::Arc;

use crate::services::mailer::VerificationMailer;
use crate::services::subscriber::SubscriberStore;

/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub subscribers: Arc<dyn SubscriberStore>,
    pub mailer: Arc<dyn VerificationMailer>,
    /// Lowercase hosts without scheme, e.g. `stoked-ui.com`.
    pub allowed_origins: Arc<[String]>,
    /// Links never use the request `Host` header.
    pub verify_base_url: Arc<str>,
}

impl AppState {
    #[must_use]
    pub fn new(
        subscribers: Arc<dyn SubscriberStore>,
        mailer: Arc<dyn VerificationMailer>,
        allowed_origins: Vec<String>,
        verify_base_url: &str,
    ) -> Self {
        Self { subscribers, mailer, allowed_origins: allowed_origins.into(), verify_base_url: verify_base_url.into() }
    }

    #[must_use]
    pub fn origin_allowed(&self, host: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == host)
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
