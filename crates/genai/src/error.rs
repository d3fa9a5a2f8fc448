use thiserror::Error;

/// Failure reported by a generation backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// Backend is missing an API key, model name or similar.
    #[error("backend configuration error: {0}")]
    Configuration(String),

    /// The request never reached the service, or the response could not be read.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("service returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The call completed but carried no usable payload.
    #[error("{0}")]
    NoPayload(String),

    /// A long-running operation finished with an explicit error payload.
    #[error("operation failed: {0}")]
    Operation(String),
}

impl ServiceError {
    pub fn transport(msg: impl Into<String>) -> Self {
        ServiceError::Transport(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        ServiceError::InvalidResponse(msg.into())
    }

    pub fn no_payload(msg: impl Into<String>) -> Self {
        ServiceError::NoPayload(msg.into())
    }

    /// Network-level failure, as opposed to a failure the service reported.
    pub fn is_transport(&self) -> bool {
        matches!(self, ServiceError::Transport(_))
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::InvalidResponse(err.to_string())
        } else {
            ServiceError::Transport(err.to_string())
        }
    }
}
