use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{error::ApiResult, state::AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub advisor_enabled: bool,
    pub services: HashMap<String, String>,
}

/// Health check endpoint
///
/// Reports the store connection and whether the advisor has a model behind it
pub async fn health_check(State(state): State<Arc<AppState>>) -> ApiResult<Json<HealthResponse>> {
    let mut services = HashMap::new();

    match check_store(&state).await {
        Ok(_) => services.insert("store".to_string(), "connected".to_string()),
        Err(_) => services.insert("store".to_string(), "disconnected".to_string()),
    };

    let advisor_enabled = state.market.advisor().is_enabled();
    let advisor = if advisor_enabled { "model" } else { "fallback" };
    services.insert("advisor".to_string(), advisor.to_string());

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        advisor_enabled,
        services,
    }))
}

async fn check_store(state: &AppState) -> ApiResult<()> {
    // Listing chats for an unknown viewer is the cheapest round trip
    let _ = state.market.registry().chats_for("_health_check").await?;
    Ok(())
}
