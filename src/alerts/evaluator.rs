//! Threshold evaluation and notification text
//!
//! Email bodies are rendered with minijinja. Auto-escaping is on for every
//! template, so the recipient name is always HTML-escaped.

use minijinja::{AutoEscape, Environment};
use serde::Serialize;

use crate::provider::Reading;

pub const HIGH_POLLUTION_SUBJECT: &str = "High pollution alert";
pub const SAFE_SUBJECT: &str = "Air quality is safe";

const HIGH_POLLUTION_BODY: &str = "<p>Hi {{ name }},</p>\
<p>Air pollution is above your alert level.</p>\
<ul><li>Pollution index: <strong>{{ index }}</strong></li>\
<li>Your threshold: <strong>{{ threshold }}</strong></li></ul>\
<p>Avoid or limit outdoor activity and keep windows closed.</p>";

const SAFE_BODY: &str = "<p>Hi {{ name }},</p>\
<p>Air pollution is within your alert level.</p>\
<ul><li>Pollution index: <strong>{{ index }}</strong></li>\
<li>Your threshold: <strong>{{ threshold }}</strong></li></ul>\
<p>It is safe to go outside today.</p>";

/// Sent if a body template fails to render; carries no user input
const FALLBACK_BODY: &str = "<p>Your daily air quality check has completed.</p>";

/// Outcome of comparing a reading against a rule threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    /// Whether the index is strictly above the threshold
    pub triggered: bool,
    pub subject: String,
    /// HTML email body
    pub body: String,
}

/// Values exposed to the body templates
#[derive(Debug, Serialize)]
struct BodyContext<'a> {
    name: &'a str,
    index: u32,
    /// Pre-formatted so `100.0` renders as `100`
    threshold: String,
}

/// Evaluate a reading against a threshold.
///
/// Pure and total for finite thresholds; rules are validated before they are
/// scheduled, so non-finite thresholds never reach this point.
pub fn evaluate(reading: &Reading, threshold: f64, recipient_name: &str) -> Verdict {
    let index = reading.pollution_index;
    let triggered = f64::from(index) > threshold;

    let (subject, template) = if triggered {
        (HIGH_POLLUTION_SUBJECT, HIGH_POLLUTION_BODY)
    } else {
        (SAFE_SUBJECT, SAFE_BODY)
    };

    let ctx = BodyContext {
        name: recipient_name,
        index,
        threshold: threshold.to_string(),
    };

    let body = build_env().render_str(template, &ctx).unwrap_or_else(|e| {
        tracing::error!(error = %e, triggered, "Failed to render alert email body");
        FALLBACK_BODY.to_string()
    });

    Verdict {
        triggered,
        subject: subject.to_string(),
        body,
    }
}

fn build_env() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    env
}
