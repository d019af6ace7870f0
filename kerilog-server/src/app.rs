use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::configs::Storage;
use crate::handles::*;
use crate::repositories::DataPointRepository;
use crate::services::Registry;

pub fn create_app(storage: Arc<Storage>, registry: Arc<dyn Registry>) -> Router {
    let data_point_repository = Arc::new(DataPointRepository::new(storage.clone()));

    Router::new()
        .merge(health_router(HealthState { storage }))
        .merge(series_router(SeriesState { data_point_repository }))
        .merge(node_router(NodeState { registry }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
