//! Per-firing alert check

use std::sync::Arc;

use super::evaluator::evaluate;
use super::rule::AlertRule;
use crate::notify::{Email, Notifier};
use crate::provider::{Coordinates, ReadingProvider};
use crate::store::UserDirectory;

/// Salutation used when the rule owner has no resolvable name
pub const DEFAULT_RECIPIENT_NAME: &str = "there";

/// Terminal outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Email accepted by the notifier
    Sent { triggered: bool },
    /// Reading could not be fetched; nothing was sent
    FetchFailed,
    /// Notifier reported an error
    SendFailed,
    /// No notifier configured
    Skipped { triggered: bool },
}

/// Fetches, evaluates and notifies for a single rule
pub struct AlertRunner {
    provider: Arc<dyn ReadingProvider>,
    notifier: Option<Arc<dyn Notifier>>,
    users: Arc<dyn UserDirectory>,
    location: Coordinates,
}

impl AlertRunner {
    pub fn new(
        provider: Arc<dyn ReadingProvider>,
        notifier: Option<Arc<dyn Notifier>>,
        users: Arc<dyn UserDirectory>,
        location: Coordinates,
    ) -> Self {
        Self {
            provider,
            notifier,
            users,
            location,
        }
    }

    /// Run one check. Every failure is logged and contained here.
    pub async fn run_check(&self, rule: &AlertRule) -> CheckOutcome {
        let recipient_name = self.resolve_name(rule).await;

        let reading = match self.provider.fetch_reading(self.location).await {
            Ok(reading) => reading,
            Err(e) => {
                tracing::error!(
                    rule_id = %rule.id,
                    error = %e,
                    "Failed to fetch pollution reading, skipping this check"
                );
                return CheckOutcome::FetchFailed;
            }
        };

        let verdict = evaluate(&reading, rule.threshold, &recipient_name);

        let Some(notifier) = &self.notifier else {
            tracing::warn!(
                rule_id = %rule.id,
                triggered = verdict.triggered,
                index = reading.pollution_index,
                "No notifier configured, email not sent"
            );
            return CheckOutcome::Skipped {
                triggered: verdict.triggered,
            };
        };

        let email = Email {
            to: rule.recipient_email.clone(),
            subject: verdict.subject,
            html: verdict.body,
        };

        match notifier.send(&email).await {
            Ok(()) => {
                tracing::info!(
                    rule_id = %rule.id,
                    to = %email.to,
                    triggered = verdict.triggered,
                    index = reading.pollution_index,
                    threshold = rule.threshold,
                    "Alert email sent"
                );
                CheckOutcome::Sent {
                    triggered: verdict.triggered,
                }
            }
            Err(e) => {
                tracing::error!(
                    rule_id = %rule.id,
                    to = %email.to,
                    error = %e,
                    "Failed to send alert email"
                );
                CheckOutcome::SendFailed
            }
        }
    }

    async fn resolve_name(&self, rule: &AlertRule) -> String {
        match self.users.display_name(&rule.owner_id).await {
            Ok(Some(name)) => name,
            Ok(None) => DEFAULT_RECIPIENT_NAME.to_string(),
            Err(e) => {
                tracing::warn!(
                    rule_id = %rule.id,
                    owner_id = %rule.owner_id,
                    error = %e,
                    "Could not resolve owner name"
                );
                DEFAULT_RECIPIENT_NAME.to_string()
            }
        }
    }
}
