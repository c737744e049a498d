use std::sync::atomic::Ordering;

use axum::http::HeaderValue;
use axum::http::header::HOST;

use super::*;
use crate::services::subscriber::hash_token;
use crate::state::test_helpers::{TestState, test_app_state};

fn headers(origin: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(HOST, HeaderValue::from_static("api.stoked-ui.com"));
    if let Some(origin) = origin {
        headers.insert(ORIGIN, HeaderValue::from_str(origin).unwrap());
    }
    headers
}

async fn post(t: &TestState, origin: Option<&str>, body: &str) -> Response {
    subscribe(State(t.state.clone()), Method::POST, headers(origin), body.to_owned()).await
}

async fn get_verify(t: &TestState, email: Option<&str>, token: Option<&str>) -> Response {
    let query = VerifyQuery { token: token.map(str::to_owned), email: email.map(str::to_owned) };
    verify(State(t.state.clone()), Query(query)).await
}

async fn message(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    body["message"].as_str().unwrap_or_default().to_owned()
}

fn token_from_link(link: &str) -> String {
    let start = link.find("token=").unwrap() + "token=".len();
    let end = link[start..].find('&').map_or(link.len(), |i| start + i);
    link[start..end].to_owned()
}

const BODY: &str = r#"{"email":"dev@stoked-ui.com"}"#;
const ORIGIN_OK: Option<&str> = Some("https://stoked-ui.com");

// =============================================================================
// subscriber_error_to_status
// =============================================================================

#[test]
fn error_status_mapping() {
    assert_eq!(subscriber_error_to_status(&SubscriberError::InvalidEmail), StatusCode::BAD_REQUEST);
    assert_eq!(subscriber_error_to_status(&SubscriberError::NotSubscribed), StatusCode::BAD_REQUEST);
    assert_eq!(
        subscriber_error_to_status(&SubscriberError::Storage("down".into())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn parse_email_requires_non_blank_field() {
    assert_eq!(parse_email(BODY), Some("dev@stoked-ui.com".into()));
    assert_eq!(parse_email(r#"{"email":"  "}"#), None);
    assert_eq!(parse_email("{}"), None);
    assert_eq!(parse_email("not json"), None);
}

// =============================================================================
// POST /subscribe
// =============================================================================

#[tokio::test]
async fn foreign_origin_is_forbidden_before_storage() {
    let t = test_app_state();
    let resp = post(&t, Some("https://evil.test"), BODY).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(message(resp).await, "Forbidden");
    assert_eq!(t.store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_origin_is_forbidden() {
    let t = test_app_state();
    assert_eq!(post(&t, None, BODY).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn origin_checked_before_method() {
    let t = test_app_state();
    let resp = subscribe(State(t.state.clone()), Method::GET, headers(Some("https://evil.test")), String::new()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn non_post_is_405() {
    let t = test_app_state();
    let resp = subscribe(State(t.state.clone()), Method::GET, headers(ORIGIN_OK), BODY.to_owned()).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(t.store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_or_bad_email_is_400() {
    let t = test_app_state();
    for body in ["", "{}", r#"{"email":""}"#, "[1,2]", r#"{"name":"x","source":"footer"}"#] {
        assert_eq!(post(&t, ORIGIN_OK, body).await.status(), StatusCode::BAD_REQUEST, "body {body:?}");
    }
    assert_eq!(post(&t, ORIGIN_OK, r#"{"email":"nope"}"#).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(t.store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn new_then_repeat_subscribe() {
    let t = test_app_state();
    let first = post(&t, ORIGIN_OK, BODY).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let sent = t.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "dev@stoked-ui.com");
    assert!(sent[0].1.starts_with("https://stoked-ui.com/verify?token="));
    assert!(sent[0].1.ends_with("&email=dev%40stoked-ui.com"));

    let second = post(&t, ORIGIN_OK, BODY).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(t.mailer.sent().len(), 2);
}

#[tokio::test]
async fn forged_host_does_not_change_link() {
    let t = test_app_state();
    let mut forged = headers(ORIGIN_OK);
    forged.insert(HOST, HeaderValue::from_static("evil.test"));
    let resp = subscribe(State(t.state.clone()), Method::POST, forged, BODY.to_owned()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    get_verify(&t, Some("dev@stoked-ui.com"), Some("wrong")).await;
    let sent = t.mailer.sent();
    assert_eq!(sent.len(), 2);
    for (_, link) in &sent {
        assert!(link.starts_with("https://stoked-ui.com/verify?token="), "{link}");
        assert!(!link.contains("evil.test"));
    }
}

#[tokio::test]
async fn verified_subscriber_gets_200_without_mail() {
    let t = test_app_state();
    post(&t, ORIGIN_OK, BODY).await;
    let token = token_from_link(&t.mailer.sent()[0].1);
    assert_eq!(get_verify(&t, Some("dev@stoked-ui.com"), Some(&token)).await.status(), StatusCode::OK);

    let resp = post(&t, ORIGIN_OK, BODY).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(message(resp).await, "Email already subscribed and verified");
    assert_eq!(t.mailer.sent().len(), 1);
}

#[tokio::test]
async fn storage_failure_is_500() {
    let t = test_app_state();
    t.store.fail.store(true, Ordering::SeqCst);
    let resp = post(&t, ORIGIN_OK, BODY).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(message(resp).await, "Internal server error");
}

#[tokio::test]
async fn mail_failure_does_not_fail_request() {
    let t = test_app_state();
    t.mailer.fail.store(true, Ordering::SeqCst);
    assert_eq!(post(&t, ORIGIN_OK, BODY).await.status(), StatusCode::CREATED);
    assert!(t.store.get("dev@stoked-ui.com").is_some());
}

#[tokio::test]
async fn origin_match_ignores_case_and_slash() {
    let t = test_app_state();
    assert_eq!(post(&t, Some("https://Stoked-UI.com/"), BODY).await.status(), StatusCode::CREATED);
}

// =============================================================================
// GET /verify
// =============================================================================

#[tokio::test]
async fn verify_missing_params_is_400() {
    let t = test_app_state();
    assert_eq!(get_verify(&t, None, Some("t")).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_verify(&t, Some("dev@stoked-ui.com"), None).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_verify(&t, Some(" "), Some("t")).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(t.store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn verify_unknown_email_is_400() {
    let t = test_app_state();
    let resp = get_verify(&t, Some("ghost@stoked-ui.com"), Some("t")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(resp).await, "Email not subscribed.");
}

#[tokio::test]
async fn verify_flow() {
    let t = test_app_state();
    post(&t, ORIGIN_OK, BODY).await;
    let token = token_from_link(&t.mailer.sent()[0].1);

    let wrong = get_verify(&t, Some("dev@stoked-ui.com"), Some("wrong")).await;
    assert_eq!(wrong.status(), StatusCode::BAD_REQUEST);
    assert_eq!(t.mailer.sent().len(), 2);
    // The original link is now stale.
    assert_eq!(get_verify(&t, Some("dev@stoked-ui.com"), Some(&token)).await.status(), StatusCode::BAD_REQUEST);

    let fresh = token_from_link(&t.mailer.sent()[2].1);
    let row = t.store.get("dev@stoked-ui.com").unwrap();
    assert_eq!(row.verification_token_hash, Some(hash_token(&fresh)));

    let ok = get_verify(&t, Some("dev@stoked-ui.com"), Some(&fresh)).await;
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(message(ok).await, "Email verified successfully");

    let again = get_verify(&t, Some("dev@stoked-ui.com"), Some(&fresh)).await;
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(message(again).await, "User already verified.");
}

#[tokio::test]
async fn verify_storage_failure_is_500() {
    let t = test_app_state();
    t.store.fail.store(true, Ordering::SeqCst);
    let resp = get_verify(&t, Some("dev@stoked-ui.com"), Some("t")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
