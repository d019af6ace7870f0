use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::configs::Storage;
use crate::errors::ApiError;

#[derive(Clone)]
pub struct HealthState {
    pub storage: Arc<Storage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub fn health_router(health_state: HealthState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .with_state(health_state)
}

pub async fn get_health(State(state): State<HealthState>) -> Result<Json<HealthResponse>, ApiError> {
    sqlx::query("SELECT 1").execute(state.storage.get_pool()).await?;

    Ok(Json(HealthResponse {
        status: String::from("ok"),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
