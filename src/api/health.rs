use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use super::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub payzone_configured: bool,
    pub order_store: String,
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let version = env!("CARGO_PKG_VERSION").to_string();

    let order_store = if state.config.order_store.url.is_some() {
        "http"
    } else {
        "in_memory"
    };

    let response = HealthResponse {
        status: "healthy".to_string(),
        version,
        environment: state.config.server.environment.clone(),
        payzone_configured: state.config.payzone.has_custom_credentials(),
        order_store: order_store.to_string(),
    };

    Ok(Json(response))
}
