mod config;
mod db;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use services::mailer::{LogMailer, ResendMailer, VerificationMailer};
use services::subscriber::PgSubscriberStore;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env().expect("invalid configuration");

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");

    // Mail delivery is optional: without Resend credentials links are logged.
    let mailer: Arc<dyn VerificationMailer> = match &config.resend {
        Some(resend) => {
            tracing::info!(from = %resend.from, "resend mailer configured");
            Arc::new(ResendMailer::new(resend))
        }
        None => {
            tracing::warn!("RESEND_API_KEY/RESEND_FROM not set; verification links will only be logged");
            Arc::new(LogMailer)
        }
    };

    let state = state::AppState::new(
        Arc::new(PgSubscriberStore::new(pool)),
        mailer,
        config.allowed_origins.clone(),
        &config.verify_base_url,
    );

    let app = routes::app(state, config.cors_any);
    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, origins = ?config.allowed_origins, "stoked-api listening");
    axum::serve(listener, app).await.expect("server failed");
}
