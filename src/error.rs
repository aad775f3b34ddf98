use thiserror::Error;

use crate::state::InvalidTransition;
use crate::upstream::UpstreamError;

/// Errors that can occur in service layer operations.
///
/// State-inconsistency replies on the realtime channel (wrong room code,
/// closed window) are not errors; they are discriminated rejection messages
/// sent back to the requester.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// An upstream collaborator could not be reached or answered garbage.
    #[error("upstream unavailable")]
    Upstream(#[from] UpstreamError),
    /// Operation cannot be performed in the current show phase.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}
