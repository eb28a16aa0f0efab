//! Domain types shared by the realtime adapter, the queue and the controller.

pub mod display;
pub mod error;
pub mod notification;
pub mod order_call;

pub use display::*;
pub use error::*;
pub use notification::*;
pub use order_call::*;
