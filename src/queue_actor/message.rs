//! # Queue Messages
//!
//! Requests accepted by the [`QueueActor`](super::QueueActor) and the lifecycle
//! events it publishes.

use uuid::Uuid;

use crate::framework::Response;
use crate::model::{CallKey, NotificationItem, QueueStatus};

/// Request sent to the queue actor.
#[derive(Debug)]
pub enum QueueRequest {
    Enqueue {
        key: CallKey,
        respond_to: Response<EnqueueOutcome>,
    },
    Remove {
        key: CallKey,
        respond_to: Response<RemoveOutcome>,
    },
    MarkCurrentCompleted {
        respond_to: Response<Option<NotificationItem>>,
    },
    Clear {
        respond_to: Response<()>,
    },
    Status {
        respond_to: Response<QueueStatus>,
    },
}

/// What happened to an enqueue request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The queue was idle; the first call has already started.
    Started { id: Uuid },
    /// Appended behind other work. `position` is 1-based within the pending list.
    Queued { id: Uuid, position: usize },
    /// The same call is already pending or being announced.
    Duplicate,
}

impl EnqueueOutcome {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, EnqueueOutcome::Duplicate)
    }
}

/// What a removal touched. Both fields zero/false means the key was unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoveOutcome {
    pub removed_pending: usize,
    pub cancelled_current: bool,
}

/// Lifecycle notification published on every queue mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEvent {
    pub kind: QueueEventKind,
    /// Queue state right after the mutation.
    pub status: QueueStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueueEventKind {
    /// Show (or refresh) the popup for this item.
    ShowPopup(NotificationItem),
    HidePopup,
    /// The item reached `completed` and left the queue.
    Completed(NotificationItem),
    /// Pending list or speech state changed without a visible transition.
    StatusChanged,
}
