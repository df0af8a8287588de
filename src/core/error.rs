use thiserror::Error;

use crate::services::StoreError;

/// Errors surfaced by the matching operations
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any store failure. Never retried here; the caller may re-trigger the action
    #[error("Store unavailable: {0}")]
    TransientStore(#[source] StoreError),

    #[error("Daily swipe limit reached: {used}/{limit}")]
    LimitExceeded { used: u32, limit: u32 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<StoreError> for MatchError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(what) => MatchError::NotFound(what),
            StoreError::Quota(exceeded) => MatchError::LimitExceeded {
                used: exceeded.used,
                limit: exceeded.limit,
            },
            other => MatchError::TransientStore(other),
        }
    }
}
