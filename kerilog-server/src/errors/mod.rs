pub mod api;
pub mod dispatch;
pub mod publish;
pub mod storage;

pub use api::ApiError;
pub use dispatch::DispatchError;
pub use publish::PublishError;
pub use storage::StorageError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_id) = match self {
            ApiError::NodeNotFound(_) => (self.status_code(), self.to_string(), None),
            ApiError::InvalidRange { .. } => (self.status_code(), self.to_string(), None),
            ApiError::StorageError(e) => {
                let error_id = Uuid::new_v4();
                tracing::error!(error_id = ?error_id, "Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Some(error_id.to_string()),
                )
            }
        };

        let mut error_obj = json!({
            "code": status.as_u16(),
            "message": error_message
        });

        if let Some(error_id) = error_id {
            error_obj["error_id"] = json!(error_id);
        }

        (status, Json(json!({ "error": error_obj }))).into_response()
    }
}
