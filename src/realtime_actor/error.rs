//! Error types for the realtime adapter.

use thiserror::Error;

use super::transport::TransportError;
use crate::framework::FrameworkError;

/// Errors seen by callers of the realtime adapter.
///
/// Subscription faults never show up here; they are retried and only visible
/// as connection status.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RealtimeError {
    /// No store is connected, so there is nothing to fetch.
    #[error("Not connected to a store")]
    NotConnected,

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for RealtimeError {
    fn from(e: FrameworkError) -> Self {
        RealtimeError::ActorCommunicationError(e.to_string())
    }
}
