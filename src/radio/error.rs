use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RadioError {
    #[error("Invalid channel ID: {0}")]
    InvalidChannelId(String),

    #[error("Channel {0} not found")]
    ChannelNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Catalog could not be loaded: {0}")]
    Catalog(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Why an event did not reach a connection.
///
/// `Closed` and `Backlogged` make the registry drop the connection. `Encode`
/// means the event never left the server and nobody is dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("connection closed")]
    Closed,

    #[error("outbound queue full")]
    Backlogged,

    #[error("event could not be encoded: {0}")]
    Encode(String),
}

impl DeliveryError {
    pub fn is_dead_connection(&self) -> bool {
        matches!(self, DeliveryError::Closed | DeliveryError::Backlogged)
    }
}

// Tells Axum how to convert our errors into HTTP responses
impl IntoResponse for RadioError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            RadioError::InvalidChannelId(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            RadioError::ChannelNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        tracing::error!("Request failed: {}", self);

        (status, message).into_response()
    }
}

pub type RadioResult<T> = Result<T, RadioError>;
