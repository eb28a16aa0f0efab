use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CallKey, OrderNumber, OrderType};

/// Announcement stage of a queued call.
///
/// Transitions only ever move forward:
/// `Pending -> FirstCall -> SecondCall -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    FirstCall,
    SecondCall,
    Completed,
}

/// A call being announced on the display. Owned by the queue actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationItem {
    pub id: Uuid,
    pub order_type: OrderType,
    pub order_number: OrderNumber,
    pub status: NotificationStatus,
    pub call_count: u8,
    pub enqueued_at: DateTime<Utc>,
    pub last_call_at: Option<DateTime<Utc>>,
}

impl NotificationItem {
    pub fn new(order_type: OrderType, order_number: OrderNumber) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_type,
            order_number,
            status: NotificationStatus::Pending,
            call_count: 0,
            enqueued_at: Utc::now(),
            last_call_at: None,
        }
    }

    pub fn key(&self) -> CallKey {
        CallKey::new(self.order_type, self.order_number)
    }

    pub fn matches(&self, key: &CallKey) -> bool {
        self.key() == *key
    }

    pub fn is_completed(&self) -> bool {
        self.status == NotificationStatus::Completed
    }

    /// Moves the item into its next call stage.
    ///
    /// Returns `false` and leaves the item untouched when no call stage
    /// follows the current status.
    pub fn advance_call(&mut self) -> bool {
        let next = match self.status {
            NotificationStatus::Pending => NotificationStatus::FirstCall,
            NotificationStatus::FirstCall => NotificationStatus::SecondCall,
            NotificationStatus::SecondCall | NotificationStatus::Completed => return false,
        };
        self.status = next;
        self.call_count += 1;
        self.last_call_at = Some(Utc::now());
        true
    }

    pub fn complete(&mut self) {
        self.status = NotificationStatus::Completed;
    }
}
