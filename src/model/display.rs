use serde::{Deserialize, Serialize};

use super::{NotificationItem, OrderCallRecord, OrderType};

/// State of the realtime subscription as seen by the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Projection of the queue actor's state, recomputed on every mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub is_processing: bool,
    pub pending_count: usize,
    pub current_item: Option<NotificationItem>,
    pub speech_active: bool,
}

/// Queue status joined with the connection state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub is_processing: bool,
    pub pending_count: usize,
    pub current_item: Option<NotificationItem>,
    pub connection_status: ConnectionStatus,
}

impl QueueSnapshot {
    pub fn new(status: QueueStatus, connection_status: ConnectionStatus) -> Self {
        Self {
            is_processing: status.is_processing,
            pending_count: status.pending_count,
            current_item: status.current_item,
            connection_status,
        }
    }
}

/// The read model rendered by the display surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayState {
    pub current_notification: Option<NotificationItem>,
    pub is_visible: bool,
    pub queue_status: QueueStatus,
    pub connection_status: ConnectionStatus,
    pub audio_enabled: bool,
    /// Active calls, newest first.
    pub recent_calls: Vec<OrderCallRecord>,
}

impl DisplayState {
    pub fn new(audio_enabled: bool) -> Self {
        Self {
            current_notification: None,
            is_visible: false,
            queue_status: QueueStatus::default(),
            connection_status: ConnectionStatus::Connecting,
            audio_enabled,
            recent_calls: Vec::new(),
        }
    }

    pub fn recent_calls_of(&self, order_type: OrderType) -> impl Iterator<Item = &OrderCallRecord> {
        self.recent_calls.iter().filter(move |c| c.order_type == order_type)
    }
}
