use axum::{http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

/// Static keep-alive surface for the external uptime monitor. Nothing here
/// inspects bot state; a reachable process is a healthy process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub checked_at: String,
}

pub fn router() -> Router {
    Router::new().route("/", get(root)).route("/ping", get(ping))
}

pub async fn spawn(bind_address: &str, port: u16) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.liveness.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "liveness endpoint started"
    );

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router()).await {
            error!(
                event_name = "system.liveness.error",
                correlation_id = "bootstrap",
                error = %err,
                "liveness endpoint terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn root() -> (StatusCode, Json<LivenessResponse>) {
    let payload = LivenessResponse {
        status: "ok",
        service: "kingscribe",
        checked_at: Utc::now().to_rfc3339(),
    };
    (StatusCode::OK, Json(payload))
}

pub async fn ping() -> (StatusCode, &'static str) {
    (StatusCode::OK, "pong")
}
