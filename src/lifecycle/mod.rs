//! Startup, wiring and shutdown of a display, plus logging setup.

pub mod display_system;
pub mod tracing;

pub use display_system::DisplaySystem;
pub use self::tracing::setup_tracing;
