use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use fern_core::SharedBotState;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    state: SharedBotState,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_sessions: usize,
    pub tracked_users: usize,
    pub checked_at: String,
}

pub fn router(state: SharedBotState) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { state })
}

pub async fn spawn(bind_address: &str, port: u16, state: SharedBotState) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(state)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(health): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let (active_sessions, tracked_users) = {
        let state = health.state.lock().await;
        (state.sessions.len(), state.tasks.user_count())
    };

    let payload = HealthResponse {
        status: "ready",
        active_sessions,
        tracked_users,
        checked_at: Utc::now().to_rfc3339(),
    };
    (StatusCode::OK, Json(payload))
}
