use genai::ServiceError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StudioError {
    /// A precondition was not met; no remote call was made.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Another remote operation is still in flight.
    #[error("busy: {0}")]
    Busy(String),

    /// The service completed the call with a failure or returned nothing usable.
    #[error("service error: {0}")]
    Service(String),

    /// The service or the generated media could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// Resource handle bookkeeping is inconsistent.
    #[error("resource error: {0}")]
    Resource(String),

    /// The session was reset while the call was in flight; its result was dropped.
    #[error("result discarded: the session was reset while the operation was running")]
    Stale,
}

impl StudioError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        StudioError::InvalidRequest(msg.into())
    }

    /// True for every error raised before a remote call was issued.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, StudioError::InvalidRequest(_) | StudioError::Busy(_))
    }

    /// Single notification shown to the user for a failed operation.
    pub fn user_message(&self, action: &str) -> String {
        match self {
            StudioError::InvalidRequest(msg) | StudioError::Busy(msg) => msg.clone(),
            StudioError::Service(msg) | StudioError::Transport(msg) => {
                format!("Sorry, we couldn't {action}. Reason: {msg} Please try again.")
            }
            StudioError::Resource(_) | StudioError::Stale => {
                format!("Sorry, we couldn't {action}. Please try again.")
            }
        }
    }
}

impl From<ServiceError> for StudioError {
    fn from(err: ServiceError) -> Self {
        if err.is_transport() {
            StudioError::Transport(err.to_string())
        } else {
            StudioError::Service(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_mapping() {
        assert!(matches!(
            StudioError::from(ServiceError::transport("dns")),
            StudioError::Transport(_)
        ));
        assert!(matches!(
            StudioError::from(ServiceError::Operation("quota".to_string())),
            StudioError::Service(_)
        ));
    }

    #[test]
    fn test_user_message() {
        let err = StudioError::Service("Image generation failed.".to_string());
        assert_eq!(
            err.user_message("generate the image"),
            "Sorry, we couldn't generate the image. Reason: Image generation failed. Please try again."
        );
        assert!(StudioError::Busy("Refining your image...".to_string()).is_invalid_request());
        assert!(!StudioError::Stale.is_invalid_request());
    }
}
