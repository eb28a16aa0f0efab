//! Actor plumbing shared by the queue and realtime actors.
//!
//! # Main Components
//!
//! - [`request`] - Send a request and await the actor's reply
//! - [`Response`] - Reply slot carried by every request
//! - [`FrameworkError`] - Mailbox failures
//!
//! # Testing
//!
//! See [`mock`] module for test doubles of every seam.

pub mod core;
pub mod mock;

// Re-export core types for convenience
pub use core::*;
