//! # Order Call Display
//!
//! > **Announces called orders on a public display, one at a time, twice each.**
//!
//! A store operator calls numbered orders (takeout or dine-in). Each call
//! arrives as a row on a store-scoped change feed; this crate turns that feed
//! into a strictly ordered announcement sequence: a popup plus synthesized
//! speech, repeated once, then hidden.
//!
//! ## 🏗️ Design
//!
//! ### Actors, not shared state
//! The queue and the realtime adapter each run in their own Tokio task and own
//! their state outright. Everything else talks to them through cloneable
//! clients that send a message and await a `oneshot` reply. Messages are
//! processed one at a time, so no locks guard the queue.
//!
//! ### One clock per item
//! The visual timeline is authoritative. Each in-flight item carries the
//! deadline of its next transition; the queue's event loop sleeps until the
//! nearest one. Speech runs beside the timeline and can never hold it up: a
//! stuck engine is cut off by a watchdog.
//!
//! ### Async Context Injection
//! Dependencies are injected at runtime via `run()`, not at construction time:
//! the queue receives its optional speech engine, the realtime actor its
//! transport. See [`lifecycle::DisplaySystem`] for the wiring.
//!
//! ### Observability
//! `tracing` everywhere with structured fields. See [`lifecycle::tracing`].
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Queue ([`queue_actor`])
//! Dedup by `(order type, number)`, FIFO, single flight, two timed call stages.
//! - **Key items**: [`QueueActor`](queue_actor::QueueActor), [`QueueEvent`](queue_actor::QueueEvent).
//!
//! ### 2. The Feed ([`realtime_actor`])
//! One subscription per store, reconnected after a fixed delay on failure.
//! Raw payloads are normalized into [`OrderCallChange`](model::OrderCallChange)s.
//! - **Key items**: [`EventTransport`](realtime_actor::EventTransport), [`LocalFeed`](realtime_actor::LocalFeed).
//!
//! ### 3. The Glue ([`controller`])
//! Feed changes become queue operations; queue events, connection status and
//! the recent calls board become one [`DisplayState`](model::DisplayState).
//!
//! ### 4. The Interface ([`clients`])
//! - **Key items**: [`DisplayClient`](clients::DisplayClient), [`QueueClient`](clients::QueueClient), [`RealtimeClient`](clients::RealtimeClient).
//!
//! ### 5. The Orchestrator ([`lifecycle`])
//! - **Key items**: [`DisplaySystem`](lifecycle::DisplaySystem), [`shutdown`](lifecycle::DisplaySystem::shutdown).
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Feed change payloads or commands on stdin
//! echo 'test takeout 12' | RUST_LOG=info cargo run -- order-call-display.toml
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod announcement;
pub mod clients;
pub mod config;
pub mod controller;
pub mod framework;
pub mod lifecycle;
pub mod model;
pub mod queue_actor;
pub mod realtime_actor;
pub mod speech;
