use thiserror::Error;

use crate::{
    ProtocolError,
    backoff::BackoffError,
    resource::ResourceRef,
    session::SessionError,
    validation::{Mismatch, ValidationError},
};

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(ResourceRef),

    #[error("{0} already exists")]
    ResourceConflict(ResourceRef),

    #[error("Not authorized to access {0}")]
    Authorization(ResourceRef),

    #[error("Transport error: {0}")]
    Transport(#[source] SessionError),

    #[error(
        "Server error {protocol_error} for {resource} with message \"{}\"",
        .error_message.as_deref().unwrap_or_default()
    )]
    ServerError {
        protocol_error: ProtocolError,
        error_message: Option<String>,
        resource: ResourceRef,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("All retries failed: {0}")]
    RetryFailed(#[from] BackoffError),
}

impl Error {
    pub(crate) fn unexpected_entries(resource: ResourceRef, mismatch: Mismatch) -> Self {
        match mismatch {
            Mismatch::Missing { found: 0 } => Self::NotFound(resource),
            Mismatch::Missing { found } => Self::InvalidResponse(format!(
                "Expected an entry for {resource} but got {found} other entries"
            )),
            Mismatch::Surplus { extra } => Self::InvalidResponse(format!(
                "Expected a single entry for {resource} but got {extra} additional entries"
            )),
        }
    }

    /// The resource an operation addressed does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<SessionError> for Error {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Server {
                error,
                resource,
                message,
            } => {
                if error.is_not_found() {
                    Self::NotFound(resource)
                } else if error.is_authorization_failure() {
                    Self::Authorization(resource)
                } else if error == ProtocolError::TopicAlreadyExists {
                    Self::ResourceConflict(resource)
                } else if error == ProtocolError::RequestTimedOut {
                    Self::Transport(SessionError::Server {
                        error,
                        resource,
                        message,
                    })
                } else {
                    Self::ServerError {
                        protocol_error: error,
                        error_message: message,
                        resource,
                    }
                }
            }
            other => Self::Transport(other),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
