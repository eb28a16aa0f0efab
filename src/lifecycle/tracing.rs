//! # Observability & Tracing
//!
//! The [`setup_tracing`] function initializes structured logging with the
//! `tracing` crate.
//!
//! ## Configuration
//!
//! The compact format hides the crate/module prefix (`with_target(false)`);
//! log levels come from `RUST_LOG`.
//!
//! ```bash
//! # Lifecycle transitions only
//! RUST_LOG=info cargo run
//!
//! # Payloads, speech reports and connection status changes
//! RUST_LOG=debug cargo run
//! ```
//!
//! ## What Gets Traced
//!
//! - **Actors**: startup and final state on shutdown
//! - **Queue**: enqueue, each call stage, completion, removal and clear, with
//!   `order_type`, `order_number` and `item_id` fields
//! - **Realtime**: subscribe attempts, status reports, scheduled reconnects,
//!   dropped payloads
//! - **Clients**: a span per operation via `#[instrument]`
//!
//! ## Announcement Trace Example
//!
//! One call going through both stages with `RUST_LOG=info`:
//!
//! ```text
//! INFO Enqueued key=takeout#12 item_id=6c1e... pending=1
//! INFO Call item_id=6c1e... order_type=takeout order_number=12 call=1
//! INFO enqueue: Call accepted outcome=Started { id: 6c1e... }
//! INFO Call item_id=6c1e... order_type=takeout order_number=12 call=2
//! INFO Completed item_id=6c1e... order_type=takeout order_number=12 calls=2 forced=false
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // Module paths add nothing next to the structured fields
        .compact() // Compact format shows spans inline (e.g., "enqueue:")
        .init();
}
