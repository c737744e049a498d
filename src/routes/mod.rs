//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the subscription endpoints and the health probe under one Axum
//! router with CORS and request tracing layers.

pub mod subscribe;

use axum::Router;
use axum::http::{HeaderValue, StatusCode};
use axum::routing::{any, get};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

fn cors_layer(state: &AppState, cors_any: bool) -> CorsLayer {
    let origin = if cors_any {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .allowed_origins
            .iter()
            .filter_map(|host| HeaderValue::from_str(&format!("https://{host}")).ok())
            .collect();
        AllowOrigin::list(origins)
    };
    CorsLayer::new().allow_origin(origin).allow_methods(Any).allow_headers(Any)
}

pub fn app(state: AppState, cors_any: bool) -> Router {
    let cors = cors_layer(&state, cors_any);
    Router::new()
        .route("/subscribe", any(subscribe::subscribe))
        .route("/verify", get(subscribe::verify))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
