//! Order-call records as they arrive from the event source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ModelError;

/// How the customer picks up the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Takeout,
    DineIn,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Takeout => "takeout",
            OrderType::DineIn => "dine_in",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "takeout" => Ok(OrderType::Takeout),
            "dine_in" => Ok(OrderType::DineIn),
            other => Err(ModelError::UnknownOrderType(other.to_string())),
        }
    }
}

/// An order number in the range `1..=999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct OrderNumber(u16);

impl OrderNumber {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 999;

    pub fn new(value: u16) -> Result<Self, ModelError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ModelError::InvalidOrderNumber(value))
        }
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for OrderNumber {
    type Error = ModelError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrderNumber> for u16 {
    fn from(number: OrderNumber) -> Self {
        number.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a call for announcement purposes.
///
/// Two source rows with the same type and number are the same logical call,
/// whatever their row ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallKey {
    pub order_type: OrderType,
    pub order_number: OrderNumber,
}

impl CallKey {
    pub fn new(order_type: OrderType, order_number: OrderNumber) -> Self {
        Self { order_type, order_number }
    }
}

impl fmt::Display for CallKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.order_type, self.order_number)
    }
}

/// A row of the `order_calls` table.
///
/// A record is active while `deleted_at` is unset; setting it is a soft delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCallRecord {
    pub id: String,
    pub store_id: String,
    pub number: OrderNumber,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub called_at: DateTime<Utc>,
    #[serde(default)]
    pub admin_id: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl OrderCallRecord {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// A normalized change delivered by the realtime adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderCallChange {
    Inserted(OrderCallRecord),
    Updated(OrderCallRecord),
    Deleted(OrderCallRecord),
}

impl OrderCallChange {
    pub fn record(&self) -> &OrderCallRecord {
        match self {
            OrderCallChange::Inserted(r) | OrderCallChange::Updated(r) | OrderCallChange::Deleted(r) => r,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OrderCallChange::Inserted(_) => "inserted",
            OrderCallChange::Updated(_) => "updated",
            OrderCallChange::Deleted(_) => "deleted",
        }
    }
}
