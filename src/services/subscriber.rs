//! Newsletter subscription service.
//!
//! DESIGN
//! ======
//! Subscribers are keyed by normalized email. A verification token is a v4
//! UUID handed out once in the emailed link; only its SHA-256 hex digest is
//! stored. Every resend rotates the token, so older links stop working.
//!
//! Storage goes through [`SubscriberStore`] so the HTTP layer can run against
//! Postgres in production and an in-memory store in tests.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("invalid email")]
    InvalidEmail,
    #[error("email not subscribed")]
    NotSubscribed,
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub email: String,
    pub subscribed_at: OffsetDateTime,
    pub verification_token_hash: Option<String>,
    pub verified: bool,
}

#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// # Errors
    ///
    /// Storage failures.
    async fn find(&self, email: &str) -> Result<Option<Subscriber>, SubscriberError>;

    /// Insert unless the email already exists. Returns whether a row was added.
    ///
    /// # Errors
    ///
    /// Storage failures.
    async fn insert(&self, subscriber: &Subscriber) -> Result<bool, SubscriberError>;

    /// # Errors
    ///
    /// Storage failures.
    async fn set_token_hash(&self, email: &str, token_hash: &str) -> Result<(), SubscriberError>;

    /// # Errors
    ///
    /// Storage failures.
    async fn mark_verified(&self, email: &str) -> Result<(), SubscriberError>;
}

// =============================================================================
// OUTCOMES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// New subscriber; `token` must be sent in a verification link.
    Created { token: String },
    /// Known but unverified; the token was rotated.
    Resent { token: String },
    AlreadyVerified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    AlreadyVerified,
    /// Wrong or stale token; a fresh one was stored and must be re-sent.
    TokenMismatch { token: String },
}

// =============================================================================
// HELPERS
// =============================================================================

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || normalized.contains(char::is_whitespace) {
        return None;
    }
    Some(normalized)
}

#[must_use]
pub fn generate_token() -> String {
    Uuid::new_v4().to_string()
}

#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let bytes = hasher.finalize();
    bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Register `email`, or rotate the token of an unverified subscriber.
///
/// # Errors
///
/// [`SubscriberError::InvalidEmail`] for malformed input, or a storage error.
pub async fn subscribe(store: &dyn SubscriberStore, email: &str) -> Result<SubscribeOutcome, SubscriberError> {
    let email = normalize_email(email).ok_or(SubscriberError::InvalidEmail)?;

    if let Some(existing) = store.find(&email).await? {
        return resend_unless_verified(store, &existing).await;
    }

    let token = generate_token();
    let subscriber = Subscriber {
        email: email.clone(),
        subscribed_at: OffsetDateTime::now_utc(),
        verification_token_hash: Some(hash_token(&token)),
        verified: false,
    };
    if store.insert(&subscriber).await? {
        tracing::info!(%email, "subscriber created");
        return Ok(SubscribeOutcome::Created { token });
    }

    // Lost a race with a concurrent insert for the same email.
    let existing = store.find(&email).await?.ok_or(SubscriberError::NotSubscribed)?;
    resend_unless_verified(store, &existing).await
}

async fn resend_unless_verified(
    store: &dyn SubscriberStore,
    existing: &Subscriber,
) -> Result<SubscribeOutcome, SubscriberError> {
    if existing.verified {
        return Ok(SubscribeOutcome::AlreadyVerified);
    }
    let token = rotate_token(store, &existing.email).await?;
    Ok(SubscribeOutcome::Resent { token })
}

/// Check `token` for `email`.
///
/// # Errors
///
/// [`SubscriberError::InvalidEmail`], [`SubscriberError::NotSubscribed`] or a
/// storage error.
pub async fn verify(store: &dyn SubscriberStore, email: &str, token: &str) -> Result<VerifyOutcome, SubscriberError> {
    let email = normalize_email(email).ok_or(SubscriberError::InvalidEmail)?;
    let existing = store.find(&email).await?.ok_or(SubscriberError::NotSubscribed)?;

    if existing.verified {
        return Ok(VerifyOutcome::AlreadyVerified);
    }

    let presented = hash_token(token.trim());
    if existing.verification_token_hash.as_deref() != Some(presented.as_str()) {
        tracing::info!(%email, "verification token mismatch; rotating");
        let token = rotate_token(store, &email).await?;
        return Ok(VerifyOutcome::TokenMismatch { token });
    }

    store.mark_verified(&email).await?;
    tracing::info!(%email, "subscriber verified");
    Ok(VerifyOutcome::Verified)
}

async fn rotate_token(store: &dyn SubscriberStore, email: &str) -> Result<String, SubscriberError> {
    let token = generate_token();
    store.set_token_hash(email, &hash_token(&token)).await?;
    Ok(token)
}

// =============================================================================
// POSTGRES STORE
// =============================================================================

pub struct PgSubscriberStore {
    pool: PgPool,
}

impl PgSubscriberStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriberStore for PgSubscriberStore {
    async fn find(&self, email: &str) -> Result<Option<Subscriber>, SubscriberError> {
        let row = sqlx::query(
            r"SELECT email, subscribed_at, verification_token_hash, verified
              FROM subscribers
              WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Subscriber {
            email: row.get("email"),
            subscribed_at: row.get("subscribed_at"),
            verification_token_hash: row.get("verification_token_hash"),
            verified: row.get("verified"),
        }))
    }

    async fn insert(&self, subscriber: &Subscriber) -> Result<bool, SubscriberError> {
        let result = sqlx::query(
            r"INSERT INTO subscribers (email, subscribed_at, verification_token_hash, verified)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (email) DO NOTHING",
        )
        .bind(&subscriber.email)
        .bind(subscriber.subscribed_at)
        .bind(&subscriber.verification_token_hash)
        .bind(subscriber.verified)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_token_hash(&self, email: &str, token_hash: &str) -> Result<(), SubscriberError> {
        sqlx::query("UPDATE subscribers SET verification_token_hash = $2 WHERE email = $1")
            .bind(email)
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_verified(&self, email: &str) -> Result<(), SubscriberError> {
        sqlx::query("UPDATE subscribers SET verified = TRUE, verification_token_hash = NULL WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "subscriber_test.rs"]
mod tests;
