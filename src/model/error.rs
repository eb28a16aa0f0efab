//! Error types for the domain model.

use thiserror::Error;

/// Errors raised while building domain values from external input.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    /// The order number is outside `1..=999`.
    #[error("Invalid order number: {0}")]
    InvalidOrderNumber(u16),

    /// The order type is neither `takeout` nor `dine_in`.
    #[error("Unknown order type: {0}")]
    UnknownOrderType(String),

    /// A change payload could not be read.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}
