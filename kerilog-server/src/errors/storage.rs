#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid sensor {id}: {reason}")]
    InvalidSensor { id: i64, reason: String },
}
