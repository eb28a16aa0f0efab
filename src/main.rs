//! # Order Call Display (demo)
//!
//! Runs one display over an in-process feed and reads stdin, one line at a time:
//!
//! - a raw change payload, e.g. `{"eventType":"INSERT","new":{...},"old":{}}`
//! - `call <type> <number>`: publish an insert for the configured store
//! - `test <type> <number>`: enqueue directly, bypassing the feed
//! - `remove <type> <number>`
//! - `skip`: force-complete the current announcement
//! - `clear`
//!
//! Every read-model change is logged. On EOF the demo waits for the queue to
//! drain, then shuts down.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use order_call_display::config::{load_config, load_config_from_path, DisplayConfig};
use order_call_display::lifecycle::{setup_tracing, DisplaySystem};
use order_call_display::model::{OrderCallChange, OrderCallRecord, OrderNumber, OrderType};
use order_call_display::realtime_actor::{FeedPublisher, LocalFeed};
use order_call_display::speech::{SpeechEngine, TracingSpeech};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

const FEED_HISTORY: usize = 200;
const DRAIN_POLL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = match std::env::args().nth(1) {
        Some(path) => load_config_from_path(Path::new(&path)),
        None => load_config(),
    }
    .map_err(|e| e.to_string())?;
    config.validate().map_err(|e| e.to_string())?;

    let (feed, publisher) = LocalFeed::new(FEED_HISTORY);
    let speech: Option<Arc<dyn SpeechEngine>> = Some(Arc::new(TracingSpeech::default()));
    let system = DisplaySystem::start(&config, Arc::new(feed), speech)
        .await
        .map_err(|e| e.to_string())?;

    let mut state = system.display.watch();
    let watcher = tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let s = state.borrow_and_update().clone();
            info!(
                visible = s.is_visible,
                current = ?s.current_notification.as_ref().map(|n| (n.order_type, n.order_number.get(), n.status)),
                pending = s.queue_status.pending_count,
                connection = %s.connection_status,
                recent = s.recent_calls.len(),
                "Display"
            );
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.map_err(|e| e.to_string())? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let span = tracing::info_span!("stdin");
        if let Err(e) = handle_line(line, &config, &system, &publisher).instrument(span).await {
            warn!(%line, error = %e, "Ignored input");
        }
    }

    info!("Input closed, waiting for the queue to drain");
    loop {
        let snapshot = system.display.snapshot().await.map_err(|e| e.to_string())?;
        if !snapshot.is_processing && snapshot.pending_count == 0 {
            break;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }

    system.shutdown().await?;
    watcher.await.map_err(|e| e.to_string())?;
    Ok(())
}

async fn handle_line(
    line: &str,
    config: &DisplayConfig,
    system: &DisplaySystem,
    publisher: &FeedPublisher,
) -> Result<(), String> {
    if line.starts_with('{') {
        let payload: serde_json::Value = serde_json::from_str(line).map_err(|e| e.to_string())?;
        let delivered = publisher.publish(payload);
        info!(delivered, "Payload published");
        return Ok(());
    }

    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default();
    match command {
        "skip" => {
            system.display.force_complete().await.map_err(|e| e.to_string())?;
        }
        "clear" => {
            system.display.clear_queue().await.map_err(|e| e.to_string())?;
        }
        "call" | "test" | "remove" => {
            let order_type: OrderType = words
                .next()
                .ok_or("missing order type")?
                .parse()
                .map_err(|e: order_call_display::model::ModelError| e.to_string())?;
            let number: u16 = words
                .next()
                .ok_or("missing order number")?
                .parse()
                .map_err(|e: std::num::ParseIntError| e.to_string())?;
            let number = OrderNumber::new(number).map_err(|e| e.to_string())?;

            match command {
                "call" => {
                    let record = OrderCallRecord {
                        id: Uuid::new_v4().to_string(),
                        store_id: config.store_id.clone(),
                        number,
                        order_type,
                        called_at: Utc::now(),
                        admin_id: None,
                        deleted_at: None,
                    };
                    publisher.publish_change(&OrderCallChange::Inserted(record));
                }
                "test" => {
                    let outcome = system
                        .display
                        .add_test_notification(order_type, number)
                        .await
                        .map_err(|e| e.to_string())?;
                    info!(?outcome, "Test notification");
                }
                _ => {
                    let outcome = system
                        .display
                        .remove_from_queue(order_type, number)
                        .await
                        .map_err(|e| e.to_string())?;
                    info!(?outcome, "Removed");
                }
            }
        }
        other => return Err(format!("unknown command `{other}`")),
    }
    Ok(())
}
