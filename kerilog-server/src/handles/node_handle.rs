use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use kerilog_api::command::build_enable_commands;
use kerilog_api::HardwareId;

use crate::errors::ApiError;
use crate::services::Registry;

#[derive(Clone)]
pub struct NodeState {
    pub registry: Arc<dyn Registry>,
}

pub fn node_router(node_state: NodeState) -> Router {
    Router::new()
        .route("/nodes/:hw_id/commands", get(get_enable_commands))
        .with_state(node_state)
}

/// The enable commands a handshake would send to the node right now
pub async fn get_enable_commands(
    Path(hw_id): Path<HardwareId>,
    State(state): State<NodeState>,
) -> Result<Json<Vec<String>>, ApiError> {
    state
        .registry
        .node_by_hardware_id(hw_id)
        .await?
        .ok_or(ApiError::NodeNotFound(hw_id))?;

    let sensors = state.registry.sensors_by_node(hw_id).await?;

    Ok(Json(build_enable_commands(&sensors)))
}
