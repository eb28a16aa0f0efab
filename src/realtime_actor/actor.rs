//! # Realtime Actor
//!
//! Owns at most one store-scoped subscription and keeps it alive:
//!
//! ```text
//! connect ──► connecting ──(subscribed)──► connected
//!                 ▲                            │
//!                 │               error / timed out / stream ended
//!                 │                            ▼
//!                 └──────(reconnect delay)── disconnected
//! ```
//!
//! An explicit `closed` status ends in `disconnected` without a retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::message::RealtimeRequest;
use super::transport::{
    normalize_change, ChannelFilter, EventTransport, SubscribeStatus, Subscription, TransportMessage,
};
use super::RealtimeError;
use crate::framework::short_type_name;
use crate::model::{ConnectionStatus, OrderCallChange};

pub struct RealtimeActor {
    receiver: mpsc::Receiver<RealtimeRequest>,
    status: watch::Sender<ConnectionStatus>,
    changes: broadcast::Sender<OrderCallChange>,
    reconnect_delay: Duration,
    store_id: Option<String>,
    subscription: Option<Subscription>,
    reconnect_at: Option<Instant>,
}

impl RealtimeActor {
    pub fn new(
        receiver: mpsc::Receiver<RealtimeRequest>,
        status: watch::Sender<ConnectionStatus>,
        changes: broadcast::Sender<OrderCallChange>,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            receiver,
            status,
            changes,
            reconnect_delay,
            store_id: None,
            subscription: None,
            reconnect_at: None,
        }
    }

    /// Runs the actor's event loop until every client is dropped.
    ///
    /// # Context Injection
    /// The transport is injected here so the adapter can be created before the
    /// feed it talks to.
    pub async fn run(mut self, transport: Arc<dyn EventTransport>) {
        info!(actor = short_type_name::<Self>(), "Started");

        loop {
            tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Some(msg) => self.handle_request(msg, &transport).await,
                    None => break,
                },
                message = next_message(&mut self.subscription) => self.handle_message(message),
                _ = sleep_until_deadline(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.open(&transport).await;
                }
            }
        }

        self.subscription = None;
        self.reconnect_at = None;
        let status = *self.status.borrow();
        info!(store_id = ?self.store_id, %status, "Shutdown");
    }

    async fn handle_request(&mut self, msg: RealtimeRequest, transport: &Arc<dyn EventTransport>) {
        match msg {
            RealtimeRequest::Connect { store_id, respond_to } => {
                self.connect(store_id, transport).await;
                let _ = respond_to.send(());
            }
            RealtimeRequest::Disconnect { respond_to } => {
                self.disconnect();
                let _ = respond_to.send(());
            }
            RealtimeRequest::FetchRecent { since, limit, respond_to } => {
                let Some(store_id) = self.store_id.clone() else {
                    let _ = respond_to.send(Err(RealtimeError::NotConnected));
                    return;
                };
                // Runs beside the loop; changes keep flowing meanwhile
                let transport = transport.clone();
                tokio::spawn(async move {
                    let result = transport
                        .fetch_recent(&store_id, since, limit)
                        .await
                        .map_err(RealtimeError::from);
                    let _ = respond_to.send(result);
                });
            }
        }
    }

    async fn connect(&mut self, store_id: String, transport: &Arc<dyn EventTransport>) {
        let live = self.subscription.is_some() || self.reconnect_at.is_some();
        if live && self.store_id.as_deref() == Some(store_id.as_str()) {
            debug!(%store_id, "Already connected");
            return;
        }
        if let Some(previous) = self.store_id.as_deref().filter(|id| *id != store_id) {
            info!(previous, "Switching store");
        }
        self.subscription = None;
        self.reconnect_at = None;
        self.store_id = Some(store_id);
        self.open(transport).await;
    }

    fn disconnect(&mut self) {
        info!(store_id = ?self.store_id, "Disconnecting");
        self.subscription = None;
        self.reconnect_at = None;
        self.store_id = None;
        self.set_status(ConnectionStatus::Disconnected);
    }

    /// Opens a subscription for the current store.
    async fn open(&mut self, transport: &Arc<dyn EventTransport>) {
        let Some(store_id) = self.store_id.clone() else {
            return;
        };
        let filter = ChannelFilter::for_store(&store_id);
        self.set_status(ConnectionStatus::Connecting);
        info!(%store_id, channel = %filter.channel, "Subscribing");

        match transport.subscribe(&filter).await {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(e) => {
                warn!(%store_id, error = %e, "Subscribe failed");
                self.fail();
            }
        }
    }

    /// Drops the subscription and schedules a retry.
    fn fail(&mut self) {
        self.subscription = None;
        self.set_status(ConnectionStatus::Disconnected);
        if self.store_id.is_some() {
            self.reconnect_at = Some(Instant::now() + self.reconnect_delay);
            info!(delay_ms = self.reconnect_delay.as_millis() as u64, "Reconnect scheduled");
        }
    }

    fn handle_message(&mut self, message: Option<TransportMessage>) {
        match message {
            None => {
                warn!(store_id = ?self.store_id, "Subscription ended without status");
                self.fail();
            }
            Some(TransportMessage::Status(status)) => self.handle_status(status),
            Some(TransportMessage::Change(payload)) => self.handle_change(payload),
        }
    }

    fn handle_status(&mut self, status: SubscribeStatus) {
        match status {
            SubscribeStatus::Subscribed => {
                info!(store_id = ?self.store_id, "Subscribed");
                self.set_status(ConnectionStatus::Connected);
            }
            SubscribeStatus::ChannelError(e) => {
                warn!(store_id = ?self.store_id, error = %e, "Channel error");
                self.fail();
            }
            SubscribeStatus::TimedOut => {
                warn!(store_id = ?self.store_id, "Subscription timed out");
                self.fail();
            }
            SubscribeStatus::Closed => {
                info!(store_id = ?self.store_id, "Channel closed");
                self.subscription = None;
                self.set_status(ConnectionStatus::Disconnected);
            }
        }
    }

    fn handle_change(&mut self, payload: serde_json::Value) {
        let change = match normalize_change(payload) {
            Ok(change) => change,
            Err(e) => {
                warn!(error = %e, "Dropping change payload");
                return;
            }
        };

        let record = change.record();
        if self.store_id.as_deref() != Some(record.store_id.as_str()) {
            warn!(record_store = %record.store_id, store_id = ?self.store_id, "Dropping change for another store");
            return;
        }
        if matches!(&change, OrderCallChange::Inserted(r) if !r.is_active()) {
            debug!(id = %record.id, "Ignoring insert of a deleted record");
            return;
        }

        debug!(kind = change.kind(), id = %record.id, number = %record.number, "Change");
        // No subscribers is fine
        let _ = self.changes.send(change);
    }

    fn set_status(&self, status: ConnectionStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            debug!(from = %previous, to = %status, "Connection status");
        }
    }
}

async fn next_message(subscription: &mut Option<Subscription>) -> Option<TransportMessage> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
