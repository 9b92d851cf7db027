use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::alerts::{AlertRule, AlertScheduler, TimerInfo};
use crate::store::InMemoryStore;

/// Application state shared across handlers
pub struct AppState {
    pub store: Arc<InMemoryStore>,
    pub scheduler: Arc<AlertScheduler>,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Rules
// ============================================================================

#[derive(Deserialize)]
pub struct CreateRuleRequest {
    pub id: String,
    pub owner_id: String,
    pub fire_time: String,
    #[serde(default)]
    pub pollutant: Option<String>,
    pub threshold: f64,
    pub recipient_email: String,
}

#[derive(Serialize)]
pub struct CreateRuleResponse {
    pub id: String,
    /// Whether an existing rule with this ID was replaced
    pub replaced: bool,
}

pub async fn list_rules(State(state): State<Arc<AppState>>) -> Json<Vec<AlertRule>> {
    Json(state.store.rules())
}

pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRuleRequest>,
) -> Result<(StatusCode, Json<CreateRuleResponse>), ApiError> {
    if request.id.trim().is_empty() {
        return Err(ApiError::BadRequest("rule id must not be empty".to_string()));
    }
    if !request.recipient_email.contains('@') {
        return Err(ApiError::BadRequest(format!(
            "invalid recipient email: {}",
            request.recipient_email
        )));
    }

    let mut rule = AlertRule::new(
        request.id,
        request.owner_id,
        request.fire_time,
        request.threshold,
        request.recipient_email,
    );
    if let Some(pollutant) = request.pollutant {
        rule = rule.with_pollutant(pollutant);
    }

    rule.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let id = rule.id.clone();
    let replaced = state.store.insert_rule(rule).is_some();
    state.scheduler.on_rule_set_changed().await;

    let status = if replaced {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(CreateRuleResponse { id, replaced })))
}

pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .store
        .remove_rule(&id)
        .ok_or_else(|| ApiError::NotFound(format!("rule not found: {}", id)))?;

    state.scheduler.on_rule_set_changed().await;

    Ok(Json(serde_json::json!({ "deleted": id })))
}

// ============================================================================
// Schedule
// ============================================================================

#[derive(Serialize)]
pub struct ScheduleResponse {
    pub timezone: String,
    pub timers: Vec<TimerInfo>,
}

pub async fn schedule(State(state): State<Arc<AppState>>) -> Json<ScheduleResponse> {
    Json(ScheduleResponse {
        timezone: state.scheduler.timezone().name().to_string(),
        timers: state.scheduler.active_timers().await,
    })
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
