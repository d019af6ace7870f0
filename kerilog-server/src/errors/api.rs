use axum::http::StatusCode;

use crate::errors::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Node {0} not found")]
    NodeNotFound(i64),

    #[error("Invalid time range: {from} > {to}")]
    InvalidRange { from: i64, to: i64 },

    #[error(transparent)]
    StorageError(#[from] StorageError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NodeNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRange { .. } => StatusCode::BAD_REQUEST,
            ApiError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        ApiError::StorageError(StorageError::Database(error))
    }
}
