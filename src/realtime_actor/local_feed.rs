//! In-process change feed.
//!
//! [`LocalFeed`] is the transport side and [`FeedPublisher`] the writer side
//! of the same feed. Subscriptions are acknowledged immediately and only see
//! payloads whose row belongs to their store. The feed keeps a bounded history
//! of rows so `fetch_recent` can answer the display's initial list load.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::transport::{
    change_payload, normalize_change, payload_store_id, ChannelFilter, EventTransport, SubscribeStatus,
    Subscription, TransportError, TransportMessage,
};
use crate::model::{OrderCallChange, OrderCallRecord};

const SUBSCRIPTION_BUFFER: usize = 64;

struct Subscriber {
    store_id: String,
    sender: mpsc::Sender<TransportMessage>,
}

#[derive(Default)]
struct FeedState {
    subscribers: Vec<Subscriber>,
    history: VecDeque<OrderCallRecord>,
}

fn lock(state: &Mutex<FeedState>) -> MutexGuard<'_, FeedState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Transport side of the in-process feed.
#[derive(Clone)]
pub struct LocalFeed {
    state: Arc<Mutex<FeedState>>,
}

/// Writer side of the in-process feed.
#[derive(Clone)]
pub struct FeedPublisher {
    state: Arc<Mutex<FeedState>>,
    history_limit: usize,
}

impl LocalFeed {
    /// Creates a feed that remembers up to `history_limit` rows.
    pub fn new(history_limit: usize) -> (LocalFeed, FeedPublisher) {
        let state = Arc::new(Mutex::new(FeedState::default()));
        let feed = LocalFeed { state: state.clone() };
        let publisher = FeedPublisher {
            state,
            history_limit: history_limit.max(1),
        };
        (feed, publisher)
    }
}

#[async_trait]
impl EventTransport for LocalFeed {
    async fn subscribe(&self, filter: &ChannelFilter) -> Result<Subscription, TransportError> {
        let (sender, subscription) = Subscription::channel(SUBSCRIPTION_BUFFER);
        sender
            .try_send(TransportMessage::Status(SubscribeStatus::Subscribed))
            .map_err(|e| TransportError::SubscribeFailed(e.to_string()))?;

        let mut state = lock(&self.state);
        state.subscribers.retain(|s| !s.sender.is_closed());
        state.subscribers.push(Subscriber {
            store_id: filter.store_id.clone(),
            sender,
        });
        debug!(channel = %filter.channel, subscribers = state.subscribers.len(), "Local subscription opened");
        Ok(subscription)
    }

    async fn fetch_recent(
        &self,
        store_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<OrderCallRecord>, TransportError> {
        let state = lock(&self.state);
        let mut records: Vec<_> = state
            .history
            .iter()
            .filter(|r| r.store_id == store_id && r.is_active() && r.called_at >= since)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.called_at.cmp(&a.called_at));
        records.truncate(limit);
        Ok(records)
    }
}

impl FeedPublisher {
    /// Routes a raw payload to the subscribers of its store.
    ///
    /// Returns how many subscriptions received it. Payloads that parse as
    /// changes also update the history.
    pub fn publish(&self, payload: Value) -> usize {
        let Some(store_id) = payload_store_id(&payload).map(str::to_string) else {
            warn!("Payload without store_id dropped");
            return 0;
        };

        let mut state = lock(&self.state);
        if let Ok(change) = normalize_change(payload.clone()) {
            self.record(&mut state, &change);
        }

        state.subscribers.retain(|s| !s.sender.is_closed());
        let mut delivered = 0;
        for subscriber in state.subscribers.iter().filter(|s| s.store_id == store_id) {
            match subscriber.sender.try_send(TransportMessage::Change(payload.clone())) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(%store_id, error = %e, "Subscriber lagging, payload dropped"),
            }
        }
        delivered
    }

    pub fn publish_change(&self, change: &OrderCallChange) -> usize {
        self.publish(change_payload(change))
    }

    /// Sends `status` to every subscription of `store_id` and drops them.
    ///
    /// Simulates the server ending the channel.
    pub fn terminate(&self, store_id: &str, status: SubscribeStatus) -> usize {
        let mut state = lock(&self.state);
        let (matching, rest): (Vec<_>, Vec<_>) =
            state.subscribers.drain(..).partition(|s| s.store_id == store_id);
        state.subscribers = rest;
        matching
            .iter()
            .filter(|s| s.sender.try_send(TransportMessage::Status(status.clone())).is_ok())
            .count()
    }

    pub fn subscriber_count(&self, store_id: &str) -> usize {
        lock(&self.state)
            .subscribers
            .iter()
            .filter(|s| s.store_id == store_id && !s.sender.is_closed())
            .count()
    }

    fn record(&self, state: &mut FeedState, change: &OrderCallChange) {
        let history = &mut state.history;
        match change {
            OrderCallChange::Inserted(record) => {
                history.push_back(record.clone());
                while history.len() > self.history_limit {
                    history.pop_front();
                }
            }
            OrderCallChange::Updated(record) => {
                if let Some(existing) = history.iter_mut().find(|r| r.id == record.id) {
                    *existing = record.clone();
                }
            }
            OrderCallChange::Deleted(record) => history.retain(|r| r.id != record.id),
        }
    }
}
