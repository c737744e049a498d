//! Subscription routes: `POST /subscribe` and `GET /verify`.
//!
//! `/subscribe` is mounted for every method so the origin check runs before
//! the method check. Mail failures are logged and never change the status.

use axum::extract::{Query, State};
use axum::http::header::ORIGIN;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;

use crate::config::normalize_origin;
use crate::services::mailer::verification_link;
use crate::services::subscriber::{self, SubscribeOutcome, SubscriberError, VerifyOutcome};
use crate::state::AppState;

#[derive(Deserialize)]
struct SubscribeBody {
    email: Option<String>,
}

#[derive(Deserialize)]
pub struct VerifyQuery {
    token: Option<String>,
    email: Option<String>,
}

pub(crate) fn subscriber_error_to_status(err: &SubscriberError) -> StatusCode {
    match err {
        SubscriberError::InvalidEmail | SubscriberError::NotSubscribed => StatusCode::BAD_REQUEST,
        SubscriberError::Db(_) | SubscriberError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reply(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn origin_allowed(state: &AppState, headers: &HeaderMap) -> bool {
    headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|origin| state.origin_allowed(&normalize_origin(origin)))
}

/// Non-blank `email` field of a JSON body.
fn parse_email(body: &str) -> Option<String> {
    let parsed: SubscribeBody = serde_json::from_str(body).ok()?;
    parsed.email.filter(|e| !e.trim().is_empty())
}

async fn send_link(state: &AppState, email: &str, token: &str) {
    let Some(email) = subscriber::normalize_email(email) else {
        return;
    };
    let link = verification_link(&state.verify_base_url, token, &email);
    if let Err(e) = state.mailer.send_verification(&email, &link).await {
        tracing::warn!(error = %e, %email, "verification email not sent");
    }
}

fn error_reply(err: &SubscriberError) -> Response {
    let status = subscriber_error_to_status(err);
    if status.is_server_error() {
        tracing::error!(error = %err, "subscriber storage failed");
        return reply(status, "Internal server error");
    }
    match err {
        SubscriberError::NotSubscribed => reply(status, "Email not subscribed."),
        _ => reply(status, "Invalid email"),
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /subscribe`: register an email and send a verification link.
pub async fn subscribe(State(state): State<AppState>, method: Method, headers: HeaderMap, body: String) -> Response {
    if !origin_allowed(&state, &headers) {
        tracing::info!(origin = ?headers.get(ORIGIN), "subscribe rejected: origin");
        return reply(StatusCode::FORBIDDEN, "Forbidden");
    }
    if method != Method::POST {
        return reply(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    }
    let Some(email) = parse_email(&body) else {
        return reply(StatusCode::BAD_REQUEST, "Email is required");
    };

    match subscriber::subscribe(state.subscribers.as_ref(), &email).await {
        Ok(SubscribeOutcome::Created { token }) => {
            send_link(&state, &email, &token).await;
            reply(StatusCode::CREATED, "Subscription successful. Verification email sent.")
        }
        Ok(SubscribeOutcome::Resent { token }) => {
            send_link(&state, &email, &token).await;
            reply(StatusCode::OK, "Email already subscribed but not verified. New verification email sent.")
        }
        Ok(SubscribeOutcome::AlreadyVerified) => reply(StatusCode::OK, "Email already subscribed and verified"),
        Err(e) => error_reply(&e),
    }
}

/// `GET /verify?token=..&email=..`: confirm a subscription.
pub async fn verify(State(state): State<AppState>, Query(query): Query<VerifyQuery>) -> Response {
    let token = query.token.filter(|t| !t.trim().is_empty());
    let email = query.email.filter(|e| !e.trim().is_empty());
    let (Some(token), Some(email)) = (token, email) else {
        return reply(StatusCode::BAD_REQUEST, "Invalid token or email");
    };

    match subscriber::verify(state.subscribers.as_ref(), &email, &token).await {
        Ok(VerifyOutcome::Verified) => reply(StatusCode::OK, "Email verified successfully"),
        Ok(VerifyOutcome::AlreadyVerified) => reply(StatusCode::OK, "User already verified."),
        Ok(VerifyOutcome::TokenMismatch { token }) => {
            send_link(&state, &email, &token).await;
            reply(StatusCode::BAD_REQUEST, "Invalid token. New verification email sent.")
        }
        Err(e) => error_reply(&e),
    }
}

#[cfg(test)]
#[path = "subscribe_test.rs"]
mod tests;
