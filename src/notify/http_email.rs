//! JSON email API notifier (Resend-compatible)

use std::time::Duration;

use serde::Deserialize;

use super::{Email, Notifier, SendError};

pub const DEFAULT_API_URL: &str = "https://api.resend.com";

/// Sends emails through an HTTP email API with bearer authentication
#[derive(Debug, Clone)]
pub struct HttpEmailNotifier {
    http_client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpEmailNotifier {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SendError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SendError::Config("email API key is empty".to_string()));
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SendError::Config(e.to_string()))?;

        Ok(Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key,
            from: from.into(),
        })
    }
}

/// Error body returned by the provider on rejection
#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
}

#[async_trait::async_trait]
impl Notifier for HttpEmailNotifier {
    async fn send(&self, email: &Email) -> Result<(), SendError> {
        let url = format!("{}/emails", self.api_url);
        let payload = serde_json::json!({
            "from": self.from,
            "to": [email.to],
            "subject": email.subject,
            "html": email.html,
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ProviderError>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(SendError::Rejected {
                status: status.as_u16(),
                reason,
            });
        }

        tracing::debug!(to = %email.to, subject = %email.subject, "Email accepted by provider");

        Ok(())
    }
}
