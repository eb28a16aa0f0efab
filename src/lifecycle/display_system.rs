use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::clients::{DisplayClient, QueueClient, RealtimeClient};
use crate::config::DisplayConfig;
use crate::controller::NotificationController;
use crate::realtime_actor::{EventTransport, RealtimeError};
use crate::speech::SpeechEngine;

/// The runtime orchestrator of one display.
///
/// `DisplaySystem` is responsible for:
/// - **Lifecycle Management**: starting and stopping the queue actor, the
///   realtime actor and the controller
/// - **Dependency Wiring**: injecting the speech engine into the queue, the
///   transport into the realtime actor, and both clients into the controller
///
/// Each display owns its own queue; two systems never share state.
///
/// # Example
///
/// ```ignore
/// let (feed, publisher) = LocalFeed::new(100);
/// let system = DisplaySystem::start(&config, Arc::new(feed), None).await?;
///
/// let mut state = system.display.watch();
/// // ... render `state` on every change ...
///
/// system.shutdown().await?;
/// ```
pub struct DisplaySystem {
    /// Read model and administrative operations
    pub display: DisplayClient,

    pub queue_client: QueueClient,

    pub realtime_client: RealtimeClient,

    controller_shutdown: oneshot::Sender<()>,
    controller_handle: JoinHandle<()>,

    /// Task handles of the actors (used for graceful shutdown)
    handles: Vec<JoinHandle<()>>,
}

impl DisplaySystem {
    /// Spawns all tasks. The realtime actor stays disconnected until
    /// [`connect`](RealtimeClient::connect) is called.
    ///
    /// No speech engine is injected when `config.speech.enabled` is false,
    /// whatever `speech` holds.
    pub fn new(
        config: &DisplayConfig,
        transport: Arc<dyn EventTransport>,
        speech: Option<Arc<dyn SpeechEngine>>,
    ) -> Self {
        let audio_enabled = config.speech.enabled && speech.is_some();

        // 1. Create actors (no dependencies)
        let (queue_actor, queue_client) = crate::queue_actor::new(
            config.timing.clone(),
            config.speech.voice.clone(),
            config.realtime.event_buffer,
        );
        let (realtime_actor, realtime_client) = crate::realtime_actor::new(&config.realtime);

        // 2. Start actors with injected context
        let speech = speech.filter(|_| config.speech.enabled);
        let queue_handle = tokio::spawn(queue_actor.run(speech));
        let realtime_handle = tokio::spawn(realtime_actor.run(transport));

        // 3. The controller needs both clients
        let (controller, display) = NotificationController::new(
            queue_client.clone(),
            realtime_client.clone(),
            &config.recent_calls,
            audio_enabled,
        );
        let (controller_shutdown, shutdown_rx) = oneshot::channel();
        let controller_handle = tokio::spawn(controller.run(shutdown_rx));

        Self {
            display,
            queue_client,
            realtime_client,
            controller_shutdown,
            controller_handle,
            handles: vec![queue_handle, realtime_handle],
        }
    }

    /// Spawns all tasks and connects to `config.store_id`.
    pub async fn start(
        config: &DisplayConfig,
        transport: Arc<dyn EventTransport>,
        speech: Option<Arc<dyn SpeechEngine>>,
    ) -> Result<Self, RealtimeError> {
        let system = Self::new(config, transport, speech);
        system.realtime_client.connect(&config.store_id).await?;
        info!(store_id = %config.store_id, "Display started");
        Ok(system)
    }

    /// Gracefully shuts down the display.
    ///
    /// # Shutdown Process
    ///
    /// 1. Stops the controller, which releases its clients
    /// 2. Drops the remaining clients, closing the actors' mailboxes
    /// 3. Waits for every actor task to finish
    ///
    /// Clones of [`DisplayClient`] or the actor clients held elsewhere keep the
    /// actors alive; drop them first.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down display...");

        // =====================================================================
        // Step 1: Stop the controller
        // =====================================================================

        let _ = self.controller_shutdown.send(());
        if let Err(e) = self.controller_handle.await {
            error!("Controller task failed: {:?}", e);
            return Err(format!("Controller task failed: {:?}", e));
        }

        // =====================================================================
        // Step 2: Close all channels by dropping clients
        // =====================================================================

        drop(self.display);
        drop(self.queue_client);
        drop(self.realtime_client);

        // =====================================================================
        // Step 3: Wait for all actor tasks to complete
        // =====================================================================

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(format!("Actor task failed: {:?}", e));
            }
        }

        info!("Display shutdown complete.");
        Ok(())
    }
}
