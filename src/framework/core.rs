//! # Core Actor Plumbing
//!
//! Both actors in this crate (the notification queue and the realtime adapter)
//! follow the same shape: a task owns the state and drains an `mpsc` mailbox,
//! and cloneable clients send requests carrying a `oneshot` reply slot.
//!
//! ## Key Types
//!
//! - [`Response`]: the reply slot carried by every request.
//! - [`FrameworkError`]: mailbox failures (actor gone, reply dropped).
//! - [`request`]: send-and-wait helper used by every client method.

use tokio::sync::{mpsc, oneshot};

// =============================================================================
// 1. ERRORS
// =============================================================================

/// Errors that can occur within the actor plumbing itself.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
}

// =============================================================================
// 2. MESSAGES
// =============================================================================

/// Type alias for the one-shot response channel used by actors.
///
/// Actor operations in this crate never fail on the actor side (conflicts are
/// silent no-ops), so the reply carries the plain value.
pub type Response<T> = oneshot::Sender<T>;

// =============================================================================
// 3. CLIENT HELPER
// =============================================================================

/// Sends a request built by `make` and waits for the actor's reply.
///
/// # Errors
/// - [`FrameworkError::ActorClosed`] if the actor's mailbox is closed.
/// - [`FrameworkError::ActorDropped`] if the actor dropped the reply slot.
pub async fn request<M, T>(
    sender: &mpsc::Sender<M>,
    make: impl FnOnce(Response<T>) -> M,
) -> Result<T, FrameworkError> {
    let (respond_to, response) = oneshot::channel();
    sender
        .send(make(respond_to))
        .await
        .map_err(|_| FrameworkError::ActorClosed)?;
    response.await.map_err(|_| FrameworkError::ActorDropped)
}

/// Returns the last path segment of a type name, e.g. `QueueActor`.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    std::any::type_name::<T>()
        .split("::")
        .last()
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum Ping {
        Echo { value: u32, respond_to: Response<u32> },
    }

    #[tokio::test]
    async fn test_request_round_trip() {
        let (sender, mut receiver) = mpsc::channel::<Ping>(4);
        tokio::spawn(async move {
            while let Some(Ping::Echo { value, respond_to }) = receiver.recv().await {
                let _ = respond_to.send(value * 2);
            }
        });

        let reply = request(&sender, |respond_to| Ping::Echo { value: 21, respond_to }).await;
        assert_eq!(reply, Ok(42));
    }

    #[tokio::test]
    async fn test_request_to_closed_actor() {
        let (sender, receiver) = mpsc::channel::<Ping>(4);
        drop(receiver);

        let reply = request(&sender, |respond_to| Ping::Echo { value: 1, respond_to }).await;
        assert_eq!(reply, Err(FrameworkError::ActorClosed));
    }

    #[tokio::test]
    async fn test_request_with_dropped_reply() {
        let (sender, mut receiver) = mpsc::channel::<Ping>(4);
        tokio::spawn(async move {
            // Drop the reply slot without answering
            while let Some(msg) = receiver.recv().await {
                drop(msg);
            }
        });

        let reply = request(&sender, |respond_to| Ping::Echo { value: 1, respond_to }).await;
        assert_eq!(reply, Err(FrameworkError::ActorDropped));
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<FrameworkError>(), "FrameworkError");
    }
}
