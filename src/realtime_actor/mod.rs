//! The realtime channel adapter: one reconnecting subscription to the
//! store-scoped order-call feed.

pub mod actor;
pub mod error;
pub mod local_feed;
pub mod message;
pub mod transport;

pub use actor::RealtimeActor;
pub use error::*;
pub use local_feed::{FeedPublisher, LocalFeed};
pub use message::*;
pub use transport::*;

use tokio::sync::{broadcast, mpsc, watch};

use crate::clients::RealtimeClient;
use crate::config::RealtimeConfig;
use crate::model::ConnectionStatus;

const MAILBOX_SIZE: usize = 16;

/// Creates a new realtime actor and its client.
pub fn new(config: &RealtimeConfig) -> (RealtimeActor, RealtimeClient) {
    let (sender, receiver) = mpsc::channel(MAILBOX_SIZE);
    let (status, _) = watch::channel(ConnectionStatus::Disconnected);
    let (changes, _) = broadcast::channel(config.event_buffer.max(1));
    let actor = RealtimeActor::new(receiver, status.clone(), changes.clone(), config.reconnect_delay());
    (actor, RealtimeClient::new(sender, status, changes))
}
