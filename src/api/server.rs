use axum::{
    routing::{delete, get},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    create_rule, delete_rule, health_check, list_rules, schedule, AppState,
};
use crate::alerts::{AlertRunner, AlertScheduler};
use crate::config::AppConfig;
use crate::notify::{HttpEmailNotifier, Notifier};
use crate::provider::OpenWeatherProvider;
use crate::store::InMemoryStore;

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Rule management
        .route("/rules", get(list_rules).post(create_rule))
        .route("/rules/:id", delete(delete_rule))
        // Active timers
        .route("/schedule", get(schedule))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Wire the alert engine and run the HTTP server
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = match &config.rules_file {
        Some(path) => {
            let store = InMemoryStore::load_json(path)?;
            tracing::info!(
                "Loaded {} rules from {}",
                store.rules().len(),
                path.display()
            );
            Arc::new(store)
        }
        None => Arc::new(InMemoryStore::new()),
    };

    let provider = Arc::new(OpenWeatherProvider::new(
        config.openweather_base_url.clone(),
        config.openweather_api_key.clone(),
        config.http_timeout,
    )?);

    let notifier: Option<Arc<dyn Notifier>> = match &config.email {
        Some(email) => Some(Arc::new(HttpEmailNotifier::new(
            email.api_url.clone(),
            email.api_key.clone(),
            email.from.clone(),
            config.http_timeout,
        )?)),
        None => {
            tracing::warn!("EMAIL_API_KEY not set, alert emails will be skipped");
            None
        }
    };

    let runner = Arc::new(AlertRunner::new(
        provider,
        notifier,
        Arc::clone(&store) as Arc<dyn crate::store::UserDirectory>,
        config.location,
    ));
    let scheduler = Arc::new(AlertScheduler::new(
        Arc::clone(&store) as Arc<dyn crate::store::RuleStore>,
        runner,
        config.timezone,
    ));

    // Initial schedule
    scheduler.rebuild().await;

    let state = Arc::new(AppState {
        store,
        scheduler: Arc::clone(&scheduler),
    });
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting airwatch server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(scheduler))
        .await?;

    tracing::info!("airwatch server stopped");
    Ok(())
}

async fn shutdown_signal(scheduler: Arc<AlertScheduler>) {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");

    tracing::info!("Shutdown signal received, cancelling alert timers...");
    scheduler.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::runner::tests::StubProvider;
    use crate::provider::Coordinates;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    fn create_test_state() -> Arc<AppState> {
        let store = Arc::new(InMemoryStore::new());
        let runner = AlertRunner::new(
            StubProvider::returning(2),
            None,
            Arc::clone(&store) as Arc<dyn crate::store::UserDirectory>,
            Coordinates::new(0.0, 0.0),
        );
        let scheduler = AlertScheduler::new(
            Arc::clone(&store) as Arc<dyn crate::store::RuleStore>,
            Arc::new(runner),
            chrono_tz::UTC,
        );
        Arc::new(AppState {
            store,
            scheduler: Arc::new(scheduler),
        })
    }

    fn post_rule(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/rules")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = build_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_rule_schedules_timer() {
        let state = create_test_state();
        let app = build_router(Arc::clone(&state));

        let response = app
            .clone()
            .oneshot(post_rule(serde_json::json!({
                "id": "r1",
                "owner_id": "u1",
                "fire_time": "07:30",
                "pollutant": "pm2_5",
                "threshold": 3,
                "recipient_email": "ana@example.com"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/schedule")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["timezone"], "UTC");
        assert_eq!(body["timers"][0]["rule_id"], "r1");
        assert_eq!(body["timers"][0]["fire_time"], "07:30");

        state.scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_create_rule_rejects_bad_fire_time() {
        let state = create_test_state();
        let app = build_router(Arc::clone(&state));

        let response = app
            .oneshot(post_rule(serde_json::json!({
                "id": "r1",
                "owner_id": "u1",
                "fire_time": "7 o'clock",
                "threshold": 3,
                "recipient_email": "ana@example.com"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.store.rules().is_empty());
    }

    #[tokio::test]
    async fn test_replace_and_delete_rule() {
        let state = create_test_state();
        let app = build_router(Arc::clone(&state));
        let rule = serde_json::json!({
            "id": "r1",
            "owner_id": "u1",
            "fire_time": "07:30",
            "threshold": 3,
            "recipient_email": "ana@example.com"
        });

        app.clone().oneshot(post_rule(rule.clone())).await.unwrap();
        let response = app.clone().oneshot(post_rule(rule)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["replaced"], true);
        assert_eq!(state.scheduler.active_timers().await.len(), 1);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/rules/r1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.scheduler.active_timers().await.is_empty());

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/rules/r1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
