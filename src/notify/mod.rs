//! Email notification delivery
//!
//! Delivery is best-effort: callers log a [`SendError`] and move on.

pub mod http_email;

use serde::Serialize;

pub use http_email::HttpEmailNotifier;

/// A rendered email ready for dispatch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Outbound email channel
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), SendError>;
}

/// Notifier errors
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Provider rejected email ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
