//! Typed handles to the actors. Callers never build actor messages themselves.

pub mod display_client;
pub mod queue_client;
pub mod realtime_client;

pub use display_client::*;
pub use queue_client::*;
pub use realtime_client::*;
