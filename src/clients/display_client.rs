use tokio::sync::watch;
use tracing::{info, instrument};

use crate::clients::{QueueClient, RealtimeClient};
use crate::model::{DisplayState, NotificationItem, OrderNumber, OrderType, QueueSnapshot};
use crate::queue_actor::{EnqueueOutcome, QueueError, RemoveOutcome};

/// Handle the display surface and operators use.
///
/// Reads come from the controller's read model; administrative operations go
/// straight to the queue.
#[derive(Clone)]
pub struct DisplayClient {
    queue: QueueClient,
    realtime: RealtimeClient,
    state: watch::Receiver<DisplayState>,
}

impl DisplayClient {
    pub fn new(queue: QueueClient, realtime: RealtimeClient, state: watch::Receiver<DisplayState>) -> Self {
        Self { queue, realtime, state }
    }

    /// Latest read model.
    pub fn state(&self) -> DisplayState {
        self.state.borrow().clone()
    }

    /// Watches the read model for changes.
    pub fn watch(&self) -> watch::Receiver<DisplayState> {
        self.state.clone()
    }

    /// Queue state joined with the live connection status.
    pub async fn snapshot(&self) -> Result<QueueSnapshot, QueueError> {
        let status = self.queue.status().await?;
        Ok(QueueSnapshot::new(status, self.realtime.connection_status()))
    }

    /// Skips the rest of the current announcement.
    #[instrument(skip(self))]
    pub async fn force_complete(&self) -> Result<Option<NotificationItem>, QueueError> {
        info!("Force complete requested");
        self.queue.mark_current_completed().await
    }

    #[instrument(skip(self))]
    pub async fn clear_queue(&self) -> Result<(), QueueError> {
        info!("Clear requested");
        self.queue.clear().await
    }

    /// Enqueues a call without a source record.
    #[instrument(skip(self))]
    pub async fn add_test_notification(
        &self,
        order_type: OrderType,
        order_number: OrderNumber,
    ) -> Result<EnqueueOutcome, QueueError> {
        self.queue.enqueue(order_type, order_number).await
    }

    pub async fn remove_from_queue(
        &self,
        order_type: OrderType,
        order_number: OrderNumber,
    ) -> Result<RemoveOutcome, QueueError> {
        self.queue.remove_from_queue(order_type, order_number).await
    }
}
