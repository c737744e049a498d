pub mod mailer;
pub mod subscriber;
