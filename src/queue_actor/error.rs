//! Error types for the queue actor.

use thiserror::Error;

use crate::framework::FrameworkError;

/// Errors seen by callers of the queue.
///
/// Conflicting operations (duplicates, removing an unknown key, completing
/// while idle) are not errors; only mailbox failures surface here.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueueError {
    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for QueueError {
    fn from(e: FrameworkError) -> Self {
        QueueError::ActorCommunicationError(e.to_string())
    }
}
