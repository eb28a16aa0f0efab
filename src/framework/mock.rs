//! # Mock Framework
//!
//! Test doubles for every seam in the crate.
//!
//! - [`RecordingSpeech`]: a speech engine with a scripted outcome that records
//!   what it was asked to say and how often it was cancelled.
//! - [`ScriptedTransport`]: a feed whose subscriptions follow a script of
//!   statuses, recording every subscribe attempt.
//! - [`create_mock_queue_client`] with [`expect_enqueue`], [`expect_remove`]
//!   and friends: a `QueueClient` whose requests land in a receiver the test
//!   controls.
//! - [`MockRealtime`]: a `RealtimeClient` whose changes and status the test
//!   drives directly.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;

use crate::clients::{QueueClient, RealtimeClient};
use crate::framework::Response;
use crate::model::{CallKey, ConnectionStatus, NotificationItem, OrderCallChange, OrderCallRecord, QueueStatus};
use crate::queue_actor::{EnqueueOutcome, QueueRequest, RemoveOutcome};
use crate::realtime_actor::{
    ChannelFilter, EventTransport, RealtimeRequest, SubscribeStatus, Subscription, TransportError,
    TransportMessage,
};
use crate::speech::{SpeechEngine, SpeechError, Utterance};

// =============================================================================
// SPEECH
// =============================================================================

/// How every `speak` call of a [`RecordingSpeech`] behaves.
#[derive(Debug, Clone)]
pub enum SpeechScript {
    /// Resolve successfully after the given playback time.
    Finish(Duration),
    /// Resolve immediately with this error.
    Fail(SpeechError),
    /// Never resolve.
    Hang,
}

/// Speech engine double.
pub struct RecordingSpeech {
    script: SpeechScript,
    spoken: Mutex<Vec<(Instant, String)>>,
    cancels: AtomicUsize,
}

impl RecordingSpeech {
    pub fn new(script: SpeechScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            spoken: Mutex::new(Vec::new()),
            cancels: AtomicUsize::new(0),
        })
    }

    pub fn spoken_texts(&self) -> Vec<String> {
        self.spoken.lock().unwrap().iter().map(|(_, text)| text.clone()).collect()
    }

    /// When each utterance started, in order.
    pub fn spoken_at(&self) -> Vec<Instant> {
        self.spoken.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechEngine for RecordingSpeech {
    async fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
        self.spoken.lock().unwrap().push((Instant::now(), utterance.text.clone()));
        match &self.script {
            SpeechScript::Finish(playback) => {
                tokio::time::sleep(*playback).await;
                Ok(())
            }
            SpeechScript::Fail(e) => Err(e.clone()),
            SpeechScript::Hang => std::future::pending().await,
        }
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "recording"
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// What one subscribe attempt of a [`ScriptedTransport`] does.
#[derive(Debug, Clone)]
pub enum SubscribeScript {
    /// Succeed and deliver these statuses in order. The stream stays open.
    Statuses(Vec<SubscribeStatus>),
    /// Fail the subscribe call itself.
    Fail(String),
    /// Succeed, then end the stream without any status.
    EndStream,
}

struct ScriptState {
    script: VecDeque<SubscribeScript>,
    attempts: Vec<(Instant, ChannelFilter)>,
    live: Option<mpsc::Sender<TransportMessage>>,
    recent: Vec<OrderCallRecord>,
}

/// Feed double. Attempts past the end of the script subscribe successfully.
pub struct ScriptedTransport {
    state: Mutex<ScriptState>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<SubscribeScript>) -> Arc<Self> {
        Self::with_recent(script, Vec::new())
    }

    /// Like [`ScriptedTransport::new`], answering `fetch_recent` from `recent`.
    pub fn with_recent(script: Vec<SubscribeScript>, recent: Vec<OrderCallRecord>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ScriptState {
                script: script.into(),
                attempts: Vec::new(),
                live: None,
                recent,
            }),
        })
    }

    /// When each subscribe attempt happened.
    pub fn attempts(&self) -> Vec<Instant> {
        self.state.lock().unwrap().attempts.iter().map(|(at, _)| *at).collect()
    }

    pub fn filters(&self) -> Vec<ChannelFilter> {
        self.state.lock().unwrap().attempts.iter().map(|(_, f)| f.clone()).collect()
    }

    /// Pushes a message into the newest subscription.
    pub fn push(&self, message: TransportMessage) -> bool {
        let state = self.state.lock().unwrap();
        match &state.live {
            Some(sender) => sender.try_send(message).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl EventTransport for ScriptedTransport {
    async fn subscribe(&self, filter: &ChannelFilter) -> Result<Subscription, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.attempts.push((Instant::now(), filter.clone()));
        let step = state
            .script
            .pop_front()
            .unwrap_or(SubscribeScript::Statuses(vec![SubscribeStatus::Subscribed]));

        match step {
            SubscribeScript::Fail(reason) => Err(TransportError::SubscribeFailed(reason)),
            SubscribeScript::EndStream => {
                let (_sender, subscription) = Subscription::channel(1);
                Ok(subscription)
            }
            SubscribeScript::Statuses(statuses) => {
                let (sender, subscription) = Subscription::channel(64);
                for status in statuses {
                    let _ = sender.try_send(TransportMessage::Status(status));
                }
                state.live = Some(sender);
                Ok(subscription)
            }
        }
    }

    async fn fetch_recent(
        &self,
        store_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<OrderCallRecord>, TransportError> {
        let state = self.state.lock().unwrap();
        let mut records: Vec<_> = state
            .recent
            .iter()
            .filter(|r| r.store_id == store_id && r.is_active() && r.called_at >= since)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.called_at.cmp(&a.called_at));
        records.truncate(limit);
        Ok(records)
    }
}

// =============================================================================
// QUEUE CLIENT
// =============================================================================

/// Creates a queue client and a receiver for asserting requests.
///
/// # Testing Strategy
/// Code that drives the queue (the controller, the binary) is tested without
/// spawning a `QueueActor`: the test reads requests off `receiver` and answers
/// them through the reply slot, so success, duplicates and delays are all under
/// its control. The returned event sender publishes `QueueEvent`s to whoever
/// called `subscribe()` on the client.
pub fn create_mock_queue_client(
    buffer_size: usize,
) -> (QueueClient, mpsc::Receiver<QueueRequest>, broadcast::Sender<crate::queue_actor::QueueEvent>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    let (events, _) = broadcast::channel(buffer_size.max(1));
    (QueueClient::new(sender, events.clone()), receiver, events)
}

/// Helper to verify that the next message is an Enqueue request
pub async fn expect_enqueue(
    receiver: &mut mpsc::Receiver<QueueRequest>,
) -> Option<(CallKey, Response<EnqueueOutcome>)> {
    match receiver.recv().await {
        Some(QueueRequest::Enqueue { key, respond_to }) => Some((key, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Remove request
pub async fn expect_remove(
    receiver: &mut mpsc::Receiver<QueueRequest>,
) -> Option<(CallKey, Response<RemoveOutcome>)> {
    match receiver.recv().await {
        Some(QueueRequest::Remove { key, respond_to }) => Some((key, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a MarkCurrentCompleted request
pub async fn expect_mark_completed(
    receiver: &mut mpsc::Receiver<QueueRequest>,
) -> Option<Response<Option<NotificationItem>>> {
    match receiver.recv().await {
        Some(QueueRequest::MarkCurrentCompleted { respond_to }) => Some(respond_to),
        _ => None,
    }
}

/// Helper to verify that the next message is a Clear request
pub async fn expect_clear(receiver: &mut mpsc::Receiver<QueueRequest>) -> Option<Response<()>> {
    match receiver.recv().await {
        Some(QueueRequest::Clear { respond_to }) => Some(respond_to),
        _ => None,
    }
}

/// Helper to verify that the next message is a Status request
pub async fn expect_status(receiver: &mut mpsc::Receiver<QueueRequest>) -> Option<Response<QueueStatus>> {
    match receiver.recv().await {
        Some(QueueRequest::Status { respond_to }) => Some(respond_to),
        _ => None,
    }
}

// =============================================================================
// REALTIME CLIENT
// =============================================================================

/// A realtime client backed by a responder task instead of a `RealtimeActor`.
///
/// Connect and disconnect are acknowledged, `fetch_recent` is answered from
/// the records given at construction. Changes and status are driven by the
/// test through [`MockRealtime::send_change`] and [`MockRealtime::set_status`].
pub struct MockRealtime {
    client: RealtimeClient,
    status: watch::Sender<ConnectionStatus>,
    changes: broadcast::Sender<OrderCallChange>,
    fetches: Arc<AtomicUsize>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockRealtime {
    pub fn new(recent: Vec<OrderCallRecord>) -> Self {
        let (sender, mut receiver) = mpsc::channel::<RealtimeRequest>(16);
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        let (changes, _) = broadcast::channel(64);
        let fetches = Arc::new(AtomicUsize::new(0));
        let fetch_counter = fetches.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                match request {
                    RealtimeRequest::Connect { respond_to, .. } | RealtimeRequest::Disconnect { respond_to } => {
                        let _ = respond_to.send(());
                    }
                    RealtimeRequest::FetchRecent { limit, respond_to, .. } => {
                        fetch_counter.fetch_add(1, Ordering::SeqCst);
                        let _ = respond_to.send(Ok(recent.iter().take(limit).cloned().collect()));
                    }
                }
            }
        });

        Self {
            client: RealtimeClient::new(sender, status.clone(), changes.clone()),
            status,
            changes,
            fetches,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> RealtimeClient {
        self.client.clone()
    }

    pub fn send_change(&self, change: OrderCallChange) -> bool {
        self.changes.send(change).is_ok()
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        self.status.send_replace(status);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrderNumber, OrderType};

    #[tokio::test]
    async fn test_mock_queue_client() {
        let (client, mut receiver, _events) = create_mock_queue_client(10);

        let enqueue_task = tokio::spawn(async move {
            client.enqueue(OrderType::Takeout, OrderNumber::new(12).unwrap()).await
        });

        let (key, responder) = expect_enqueue(&mut receiver).await.expect("Expected Enqueue request");
        assert_eq!(key.order_number.get(), 12);
        responder.send(EnqueueOutcome::Duplicate).unwrap();

        let result = enqueue_task.await.unwrap();
        assert_eq!(result, Ok(EnqueueOutcome::Duplicate));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_transport_follows_script() {
        let transport = ScriptedTransport::new(vec![
            SubscribeScript::Fail("boom".to_string()),
            SubscribeScript::Statuses(vec![SubscribeStatus::TimedOut]),
        ]);
        let filter = ChannelFilter::for_store("s1");

        assert!(transport.subscribe(&filter).await.is_err());

        let mut sub = transport.subscribe(&filter).await.unwrap();
        assert_eq!(sub.recv().await, Some(TransportMessage::Status(SubscribeStatus::TimedOut)));

        let mut sub = transport.subscribe(&filter).await.unwrap();
        assert_eq!(sub.recv().await, Some(TransportMessage::Status(SubscribeStatus::Subscribed)));
        assert_eq!(transport.attempts().len(), 3);
    }
}
