use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, instrument};

use crate::framework::request;
use crate::model::{CallKey, NotificationItem, OrderNumber, OrderType, QueueStatus};
use crate::queue_actor::{EnqueueOutcome, QueueError, QueueEvent, QueueRequest, RemoveOutcome};

/// Client for interacting with the notification queue actor.
#[derive(Clone)]
pub struct QueueClient {
    sender: mpsc::Sender<QueueRequest>,
    events: broadcast::Sender<QueueEvent>,
}

impl QueueClient {
    pub fn new(sender: mpsc::Sender<QueueRequest>, events: broadcast::Sender<QueueEvent>) -> Self {
        Self { sender, events }
    }

    /// Subscribes to queue lifecycle events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Adds a call to the queue. Duplicates of an active call are ignored.
    #[instrument(skip(self))]
    pub async fn enqueue(&self, order_type: OrderType, order_number: OrderNumber) -> Result<EnqueueOutcome, QueueError> {
        let key = CallKey::new(order_type, order_number);
        debug!(%key, "enqueue called");
        let outcome = request(&self.sender, |respond_to| QueueRequest::Enqueue { key, respond_to }).await?;
        if outcome.is_accepted() {
            info!(?outcome, "Call accepted");
        }
        Ok(outcome)
    }

    /// Drops pending calls for the key and stops it if it is being announced.
    #[instrument(skip(self))]
    pub async fn remove_from_queue(&self, order_type: OrderType, order_number: OrderNumber) -> Result<RemoveOutcome, QueueError> {
        let key = CallKey::new(order_type, order_number);
        Ok(request(&self.sender, |respond_to| QueueRequest::Remove { key, respond_to }).await?)
    }

    /// Forces the current item to completion. Returns it, or `None` when idle.
    #[instrument(skip(self))]
    pub async fn mark_current_completed(&self) -> Result<Option<NotificationItem>, QueueError> {
        Ok(request(&self.sender, |respond_to| QueueRequest::MarkCurrentCompleted { respond_to }).await?)
    }

    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), QueueError> {
        Ok(request(&self.sender, |respond_to| QueueRequest::Clear { respond_to }).await?)
    }

    pub async fn status(&self) -> Result<QueueStatus, QueueError> {
        Ok(request(&self.sender, |respond_to| QueueRequest::Status { respond_to }).await?)
    }
}
