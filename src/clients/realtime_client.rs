use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{info, instrument};

use crate::framework::request;
use crate::model::{ConnectionStatus, OrderCallChange, OrderCallRecord};
use crate::realtime_actor::{RealtimeError, RealtimeRequest};

/// Client for interacting with the realtime adapter.
#[derive(Clone)]
pub struct RealtimeClient {
    sender: mpsc::Sender<RealtimeRequest>,
    status: watch::Receiver<ConnectionStatus>,
    changes: broadcast::Sender<OrderCallChange>,
}

impl RealtimeClient {
    pub fn new(
        sender: mpsc::Sender<RealtimeRequest>,
        status: watch::Sender<ConnectionStatus>,
        changes: broadcast::Sender<OrderCallChange>,
    ) -> Self {
        Self {
            sender,
            status: status.subscribe(),
            changes,
        }
    }

    /// Subscribes to the feed of `store_id`. Calling it again for the same
    /// store is a no-op; a different store replaces the subscription.
    #[instrument(skip(self))]
    pub async fn connect(&self, store_id: &str) -> Result<(), RealtimeError> {
        info!("Connecting");
        let store_id = store_id.to_string();
        Ok(request(&self.sender, |respond_to| RealtimeRequest::Connect { store_id, respond_to }).await?)
    }

    #[instrument(skip(self))]
    pub async fn disconnect(&self) -> Result<(), RealtimeError> {
        Ok(request(&self.sender, |respond_to| RealtimeRequest::Disconnect { respond_to }).await?)
    }

    /// Active calls of the connected store since `since`, newest first.
    #[instrument(skip(self))]
    pub async fn fetch_recent(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<OrderCallRecord>, RealtimeError> {
        request(&self.sender, |respond_to| RealtimeRequest::FetchRecent { since, limit, respond_to }).await?
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Watches connection status changes.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Subscribes to normalized changes from this point on.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<OrderCallChange> {
        self.changes.subscribe()
    }
}
