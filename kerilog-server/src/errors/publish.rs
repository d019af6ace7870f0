#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("Publish rejected: {0}")]
    Rejected(String),
}
