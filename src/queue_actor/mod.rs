//! The notification queue: dedup, FIFO ordering, and the two-stage call clock.

pub mod actor;
pub mod error;
pub mod message;
pub(crate) mod speaker;

pub use actor::QueueActor;
pub use error::*;
pub use message::*;

use tokio::sync::{broadcast, mpsc};

use crate::clients::QueueClient;
use crate::config::TimingConfig;
use crate::speech::VoiceSettings;

const MAILBOX_SIZE: usize = 32;

/// Creates a new queue actor and its client.
///
/// `event_buffer` bounds how far a slow observer may lag behind before it
/// starts missing lifecycle events.
pub fn new(timing: TimingConfig, voice: VoiceSettings, event_buffer: usize) -> (QueueActor, QueueClient) {
    let (sender, receiver) = mpsc::channel(MAILBOX_SIZE);
    let (events, _) = broadcast::channel(event_buffer.max(1));
    let actor = QueueActor::new(receiver, events.clone(), timing, voice);
    (actor, QueueClient::new(sender, events))
}
