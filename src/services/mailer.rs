//! Verification email delivery.

use async_trait::async_trait;
use resend_rs::Resend;
use resend_rs::types::CreateEmailBaseOptions;

use crate::config::ResendConfig;

const VERIFY_EMAIL_TEMPLATE: &str = include_str!("../../templates/verify_email.html");
const VERIFY_EMAIL_SUBJECT: &str = "Verify Your Email";

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("email delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait VerificationMailer: Send + Sync {
    /// Send `link` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Delivery`] if the provider rejects the message.
    async fn send_verification(&self, to: &str, link: &str) -> Result<(), MailError>;
}

/// Delivers through the Resend API.
pub struct ResendMailer {
    client: Resend,
    from: String,
}

impl ResendMailer {
    #[must_use]
    pub fn new(config: &ResendConfig) -> Self {
        Self { client: Resend::new(&config.api_key), from: config.from.clone() }
    }
}

#[async_trait]
impl VerificationMailer for ResendMailer {
    async fn send_verification(&self, to: &str, link: &str) -> Result<(), MailError> {
        let html = render_verify_email(link);
        let email = CreateEmailBaseOptions::new(self.from.as_str(), [to], VERIFY_EMAIL_SUBJECT).with_html(&html);
        self.client
            .emails
            .send(email)
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?;
        Ok(())
    }
}

/// Used when no mail provider is configured: the link is only logged.
pub struct LogMailer;

#[async_trait]
impl VerificationMailer for LogMailer {
    async fn send_verification(&self, to: &str, link: &str) -> Result<(), MailError> {
        tracing::info!(%to, %link, "mail delivery not configured; verification link logged");
        Ok(())
    }
}

#[must_use]
pub fn render_verify_email(link: &str) -> String {
    VERIFY_EMAIL_TEMPLATE.replace("{{LINK}}", &escape_html(link))
}

/// `{base_url}/verify?token=..&email=..`
#[must_use]
pub fn verification_link(base_url: &str, token: &str, email: &str) -> String {
    let base = base_url.trim_end_matches('/');
    format!("{base}/verify?token={}&email={}", encode_query(token), encode_query(email))
}

fn encode_query(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
#[path = "mailer_test.rs"]
mod tests;
