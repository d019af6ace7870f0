use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;
use crate::models::DataPoint;
use crate::repositories::DataPointRepository;

#[derive(Clone)]
pub struct SeriesState {
    pub data_point_repository: Arc<DataPointRepository>,
}

/// Inclusive unix-second bounds, both optional
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TimeRangeQuery {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

pub fn series_router(series_state: SeriesState) -> Router {
    Router::new()
        .route("/series/:key", get(get_series))
        .with_state(series_state)
}

pub async fn get_series(
    Path(key): Path<String>,
    Query(range): Query<TimeRangeQuery>,
    State(state): State<SeriesState>,
) -> Result<Json<Vec<DataPoint>>, ApiError> {
    let points = match (range.from, range.to) {
        (None, None) => state.data_point_repository.find_by_series(&key).await?,
        (from, to) => {
            let from = from.unwrap_or(i64::MIN);
            let to = to.unwrap_or(i64::MAX);
            if from > to {
                return Err(ApiError::InvalidRange { from, to });
            }

            state
                .data_point_repository
                .find_by_series_and_time_range(&key, from, to)
                .await?
        }
    };

    Ok(Json(points))
}
