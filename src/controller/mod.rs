//! # Notification Controller
//!
//! Glue between the realtime adapter, the queue, and the display surface.
//!
//! - Feed changes become queue operations: an active insert enqueues, a soft
//!   delete or hard delete removes.
//! - Queue lifecycle events, connection status and the recent calls board are
//!   folded into one [`DisplayState`] published on a `watch` channel.
//!
//! The controller holds no queue state of its own; everything it shows comes
//! from the events it receives.

pub mod recent_calls;

pub use recent_calls::RecentCallsBoard;

use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::clients::{DisplayClient, QueueClient, RealtimeClient};
use crate::config::RecentCallsConfig;
use crate::model::{ConnectionStatus, DisplayState, OrderCallChange};
use crate::queue_actor::{QueueEvent, QueueEventKind};

pub struct NotificationController {
    queue: QueueClient,
    realtime: RealtimeClient,
    changes: broadcast::Receiver<OrderCallChange>,
    events: broadcast::Receiver<QueueEvent>,
    connection: watch::Receiver<ConnectionStatus>,
    state: watch::Sender<DisplayState>,
    recent: RecentCallsBoard,
    refresh_interval: Duration,
}

impl NotificationController {
    /// Creates the controller and the client the display surface uses.
    pub fn new(
        queue: QueueClient,
        realtime: RealtimeClient,
        recent_calls: &RecentCallsConfig,
        audio_enabled: bool,
    ) -> (Self, DisplayClient) {
        let mut initial = DisplayState::new(audio_enabled);
        initial.connection_status = realtime.connection_status();
        let (state, state_rx) = watch::channel(initial);

        // Subscribed here so nothing published before `run` is polled is lost
        let client = DisplayClient::new(queue.clone(), realtime.clone(), state_rx);
        let controller = Self {
            changes: realtime.subscribe_changes(),
            events: queue.subscribe(),
            connection: realtime.watch_status(),
            queue,
            realtime,
            state,
            recent: RecentCallsBoard::from_config(recent_calls),
            refresh_interval: recent_calls.refresh_interval(),
        };
        (controller, client)
    }

    /// Folds every input into the display state until `shutdown` fires or an
    /// upstream actor goes away.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut refresh = tokio::time::interval(self.refresh_interval);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let status = *self.connection.borrow_and_update();
        self.on_connection(status).await;
        info!("Controller started");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                change = self.changes.recv() => match change {
                    Ok(change) => self.on_change(change).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Change feed lagged, reloading recent calls");
                        self.refresh_recent().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                event = self.events.recv() => match event {
                    Ok(event) => self.on_queue_event(event),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Queue events lagged, resyncing");
                        self.resync_queue().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                changed = self.connection.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let status = *self.connection.borrow_and_update();
                    self.on_connection(status).await;
                }
                _ = refresh.tick() => self.refresh_recent().await,
            }
        }

        info!("Controller stopped");
    }

    async fn on_change(&mut self, change: OrderCallChange) {
        let record = change.record();
        let result = match &change {
            OrderCallChange::Inserted(r) if r.is_active() => {
                self.queue.enqueue(r.order_type, r.number).await.map(|_| ())
            }
            OrderCallChange::Updated(r) if !r.is_active() => {
                self.queue.remove_from_queue(r.order_type, r.number).await.map(|_| ())
            }
            OrderCallChange::Deleted(r) => self.queue.remove_from_queue(r.order_type, r.number).await.map(|_| ()),
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!(kind = change.kind(), id = %record.id, error = %e, "Queue operation failed");
        }

        if self.recent.apply(&change, Utc::now()) {
            self.publish_recent();
        }
    }

    fn on_queue_event(&self, event: QueueEvent) {
        let QueueEvent { kind, status } = event;
        self.state.send_modify(|state| {
            match kind {
                QueueEventKind::ShowPopup(item) => {
                    state.current_notification = Some(item);
                    state.is_visible = true;
                }
                QueueEventKind::HidePopup => {
                    state.is_visible = false;
                    if status.current_item.is_none() {
                        state.current_notification = None;
                    }
                }
                QueueEventKind::Completed(item) => {
                    if state.current_notification.as_ref().is_some_and(|n| n.id == item.id) {
                        state.current_notification = None;
                        state.is_visible = false;
                    }
                }
                QueueEventKind::StatusChanged => {}
            }
            state.queue_status = status;
        });
    }

    async fn resync_queue(&self) {
        match self.queue.status().await {
            Ok(status) => self.state.send_modify(|state| {
                if status.current_item.is_none() {
                    state.current_notification = None;
                    state.is_visible = false;
                }
                state.queue_status = status;
            }),
            Err(e) => warn!(error = %e, "Queue status unavailable"),
        }
    }

    async fn on_connection(&mut self, status: ConnectionStatus) {
        info!(%status, "Connection");
        self.state.send_modify(|state| state.connection_status = status);
        if status == ConnectionStatus::Connected {
            self.refresh_recent().await;
        }
    }

    async fn refresh_recent(&mut self) {
        let now = Utc::now();
        let pruned = self.recent.prune(now);
        match self.realtime.fetch_recent(self.recent.since(now), self.recent.limit()).await {
            Ok(records) => {
                debug!(count = records.len(), "Recent calls loaded");
                self.recent.replace(records, now);
                self.publish_recent();
            }
            Err(e) => {
                debug!(error = %e, "Recent calls not reloaded");
                if pruned {
                    self.publish_recent();
                }
            }
        }
    }

    fn publish_recent(&self) {
        let calls = self.recent.calls().to_vec();
        self.state.send_modify(|state| state.recent_calls = calls);
    }
}
