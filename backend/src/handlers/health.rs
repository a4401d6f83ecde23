//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub version: String,
    pub database: String,
}

/// Health check endpoint handler, probes database connectivity
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "connected".to_string(),
        Err(err) => {
            tracing::warn!("Health check database probe failed: {}", err);
            "disconnected".to_string()
        }
    };

    Json(HealthResponse {
        ok: database == "connected",
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
    })
}
