//! Errors surfaced by [`Resolution`](crate::Resolution)

use thiserror::Error;
use tokio::task::JoinError;

use crate::dispatchable::ActionKind;

pub type Result<T> = std::result::Result<T, ResolveError>;

/// Why a resolution could not produce the next stage's value.
///
/// Failed computations are not errors: they are forwarded as fail actions.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no tokio runtime available to settle {0} action")]
    NoRuntime(ActionKind),

    #[error("settlement task panicked")]
    Panicked,

    #[error("settlement task was cancelled")]
    Cancelled,

    #[error("pipeline dropped before dispatch")]
    Detached,
}

impl From<JoinError> for ResolveError {
    fn from(err: JoinError) -> Self {
        if err.is_panic() {
            ResolveError::Panicked
        } else {
            ResolveError::Cancelled
        }
    }
}
