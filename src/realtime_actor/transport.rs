//! # Event Transport
//!
//! The realtime adapter talks to the change feed through [`EventTransport`].
//! A transport hands back a [`Subscription`], a stream of lifecycle statuses
//! and raw JSON change payloads; the adapter turns those into connection state
//! and typed [`OrderCallChange`]s.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::model::{ModelError, OrderCallChange, OrderCallRecord};

pub const SCHEMA: &str = "public";
pub const TABLE: &str = "order_calls";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("Subscribe failed: {0}")]
    SubscribeFailed(String),

    #[error("Fetch failed: {0}")]
    FetchFailed(String),
}

/// Row-level change kinds a subscription asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Describes the store-scoped subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFilter {
    pub store_id: String,
    pub channel: String,
    pub schema: String,
    pub table: String,
    /// Row filter in `column=eq.value` form.
    pub filter: String,
    pub events: Vec<ChangeKind>,
}

impl ChannelFilter {
    pub fn for_store(store_id: &str) -> Self {
        Self {
            store_id: store_id.to_string(),
            channel: format!("order-calls-store-{store_id}"),
            schema: SCHEMA.to_string(),
            table: TABLE.to_string(),
            filter: format!("store_id=eq.{store_id}"),
            events: vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete],
        }
    }
}

/// Terminal and non-terminal states reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeStatus {
    Subscribed,
    ChannelError(String),
    TimedOut,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportMessage {
    Status(SubscribeStatus),
    Change(Value),
}

/// A live subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::Receiver<TransportMessage>,
}

impl Subscription {
    pub fn new(receiver: mpsc::Receiver<TransportMessage>) -> Self {
        Self { receiver }
    }

    /// Creates a subscription together with the sender that feeds it.
    pub fn channel(buffer: usize) -> (mpsc::Sender<TransportMessage>, Self) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (sender, Self::new(receiver))
    }

    /// Next message, or `None` once the transport side is gone.
    pub async fn recv(&mut self) -> Option<TransportMessage> {
        self.receiver.recv().await
    }
}

/// Source of order-call changes for one store.
#[async_trait]
pub trait EventTransport: Send + Sync + 'static {
    async fn subscribe(&self, filter: &ChannelFilter) -> Result<Subscription, TransportError>;

    /// Active records of `store_id` called at or after `since`, newest first.
    async fn fetch_recent(
        &self,
        _store_id: &str,
        _since: DateTime<Utc>,
        _limit: usize,
    ) -> Result<Vec<OrderCallRecord>, TransportError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct RawChange {
    #[serde(rename = "eventType")]
    event_type: String,
    #[serde(default)]
    new: Option<Value>,
    #[serde(default)]
    old: Option<Value>,
}

fn record_from(side: Option<Value>, name: &str) -> Result<OrderCallRecord, ModelError> {
    let value = side.ok_or_else(|| ModelError::MalformedPayload(format!("missing `{name}` row")))?;
    serde_json::from_value(value).map_err(|e| ModelError::MalformedPayload(format!("`{name}` row: {e}")))
}

/// Turns a raw `{eventType, new, old}` payload into a typed change.
///
/// Inserts and updates read the `new` row, deletes read the `old` row.
pub fn normalize_change(payload: Value) -> Result<OrderCallChange, ModelError> {
    let raw: RawChange =
        serde_json::from_value(payload).map_err(|e| ModelError::MalformedPayload(e.to_string()))?;
    match raw.event_type.as_str() {
        "INSERT" => Ok(OrderCallChange::Inserted(record_from(raw.new, "new")?)),
        "UPDATE" => Ok(OrderCallChange::Updated(record_from(raw.new, "new")?)),
        "DELETE" => Ok(OrderCallChange::Deleted(record_from(raw.old, "old")?)),
        other => Err(ModelError::MalformedPayload(format!("unknown eventType `{other}`"))),
    }
}

/// Builds the raw payload for a change, the inverse of [`normalize_change`].
pub fn change_payload(change: &OrderCallChange) -> Value {
    let (event_type, new, old) = match change {
        OrderCallChange::Inserted(r) => ("INSERT", serde_json::to_value(r), Ok(Value::Object(Default::default()))),
        OrderCallChange::Updated(r) => ("UPDATE", serde_json::to_value(r), serde_json::to_value(r)),
        OrderCallChange::Deleted(r) => ("DELETE", Ok(Value::Object(Default::default())), serde_json::to_value(r)),
    };
    serde_json::json!({
        "eventType": event_type,
        "new": new.unwrap_or(Value::Null),
        "old": old.unwrap_or(Value::Null),
    })
}

/// Store id of the row a raw payload refers to, if it carries one.
pub fn payload_store_id(payload: &Value) -> Option<&str> {
    ["new", "old"]
        .iter()
        .find_map(|side| payload.get(side)?.get("store_id")?.as_str())
}
