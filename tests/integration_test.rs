//! End-to-end: feed → realtime actor → controller → queue → display state.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use order_call_display::config::DisplayConfig;
use order_call_display::framework::mock::{RecordingSpeech, SpeechScript};
use order_call_display::lifecycle::DisplaySystem;
use order_call_display::model::{
    ConnectionStatus, NotificationStatus, OrderCallChange, OrderCallRecord, OrderNumber, OrderType,
};
use order_call_display::realtime_actor::{FeedPublisher, LocalFeed, SubscribeStatus};
use order_call_display::speech::SpeechEngine;
use tokio::time::sleep;

const STORE: &str = "store-1";

fn config() -> DisplayConfig {
    DisplayConfig {
        store_id: STORE.to_string(),
        ..DisplayConfig::default()
    }
}

fn call(id: &str, order_type: OrderType, number: u16) -> OrderCallRecord {
    OrderCallRecord {
        id: id.to_string(),
        store_id: STORE.to_string(),
        number: OrderNumber::new(number).unwrap(),
        order_type,
        called_at: Utc::now(),
        admin_id: None,
        deleted_at: None,
    }
}

async fn start() -> (DisplaySystem, FeedPublisher, Arc<RecordingSpeech>) {
    let (feed, publisher) = LocalFeed::new(100);
    let speech = RecordingSpeech::new(SpeechScript::Finish(Duration::from_millis(800)));
    let engine: Arc<dyn SpeechEngine> = speech.clone();
    let system = DisplaySystem::start(&config(), Arc::new(feed), Some(engine)).await.unwrap();

    let mut state = system.display.watch();
    state
        .wait_for(|s| s.connection_status == ConnectionStatus::Connected)
        .await
        .unwrap();
    (system, publisher, speech)
}

#[tokio::test(start_paused = true)]
async fn test_inserted_call_is_announced_twice() {
    let (system, publisher, speech) = start().await;
    let mut state = system.display.watch();

    assert_eq!(publisher.publish_change(&OrderCallChange::Inserted(call("c1", OrderType::Takeout, 12))), 1);

    let shown = state
        .wait_for(|s| s.is_visible && s.current_notification.is_some())
        .await
        .unwrap()
        .clone();
    let current = shown.current_notification.unwrap();
    assert_eq!(current.order_number.get(), 12);
    assert_eq!(current.status, NotificationStatus::FirstCall);
    assert!(shown.audio_enabled);
    assert_eq!(shown.recent_calls.len(), 1);

    state
        .wait_for(|s| {
            s.current_notification
                .as_ref()
                .is_some_and(|n| n.status == NotificationStatus::SecondCall)
        })
        .await
        .unwrap();
    assert!(state.borrow().is_visible);

    state
        .wait_for(|s| !s.is_visible && s.current_notification.is_none())
        .await
        .unwrap();
    assert_eq!(speech.spoken_texts(), vec!["포장 십 이번 고객님", "포장 십 이번 고객님"]);

    let snapshot = system.display.snapshot().await.unwrap();
    assert!(!snapshot.is_processing);
    assert_eq!(snapshot.pending_count, 0);
    assert_eq!(snapshot.connection_status, ConnectionStatus::Connected);

    drop(state);
    system.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_soft_delete_cancels_announcement() {
    let (system, publisher, speech) = start().await;
    let mut state = system.display.watch();

    let record = call("c7", OrderType::DineIn, 7);
    publisher.publish_change(&OrderCallChange::Inserted(record.clone()));
    state.wait_for(|s| s.is_visible).await.unwrap();

    let mut deleted = record;
    deleted.deleted_at = Some(Utc::now());
    publisher.publish_change(&OrderCallChange::Updated(deleted));

    let hidden = state
        .wait_for(|s| !s.is_visible && s.current_notification.is_none())
        .await
        .unwrap()
        .clone();
    assert!(hidden.recent_calls.is_empty());

    // No second call ever happens
    sleep(Duration::from_secs(10)).await;
    assert_eq!(speech.spoken_texts().len(), 1);
    assert!(speech.cancel_count() >= 1);

    drop(state);
    system.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_rows_announce_once_and_calls_run_in_order() {
    let (system, publisher, speech) = start().await;

    publisher.publish_change(&OrderCallChange::Inserted(call("r1", OrderType::Takeout, 12)));
    publisher.publish_change(&OrderCallChange::Inserted(call("r2", OrderType::Takeout, 12)));
    publisher.publish_change(&OrderCallChange::Inserted(call("r3", OrderType::DineIn, 3)));

    sleep(Duration::from_secs(30)).await;
    assert_eq!(
        speech.spoken_texts(),
        vec![
            "포장 십 이번 고객님",
            "포장 십 이번 고객님",
            "매장 삼번 고객님",
            "매장 삼번 고객님",
        ]
    );

    // Both rows are on the board even though only one was announced
    let state = system.display.state();
    assert_eq!(state.recent_calls.len(), 3);
    assert_eq!(state.recent_calls_of(OrderType::DineIn).count(), 1);

    system.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_feed_error_reconnects_and_keeps_working() {
    let (system, publisher, speech) = start().await;
    let mut state = system.display.watch();

    assert_eq!(publisher.terminate(STORE, SubscribeStatus::ChannelError("lost".to_string())), 1);
    state
        .wait_for(|s| s.connection_status == ConnectionStatus::Disconnected)
        .await
        .unwrap();
    assert_eq!(publisher.subscriber_count(STORE), 0);

    state
        .wait_for(|s| s.connection_status == ConnectionStatus::Connected)
        .await
        .unwrap();
    assert_eq!(publisher.subscriber_count(STORE), 1);

    publisher.publish_change(&OrderCallChange::Inserted(call("c5", OrderType::Takeout, 5)));
    state.wait_for(|s| s.is_visible).await.unwrap();
    sleep(Duration::from_millis(100)).await;
    assert_eq!(speech.spoken_texts(), vec!["포장 오번 고객님"]);

    drop(state);
    system.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_admin_operations() {
    let (system, _publisher, _speech) = start().await;
    let mut state = system.display.watch();

    let seven = OrderNumber::new(7).unwrap();
    system.display.add_test_notification(OrderType::Takeout, seven).await.unwrap();
    system
        .display
        .add_test_notification(OrderType::Takeout, OrderNumber::new(8).unwrap())
        .await
        .unwrap();
    state.wait_for(|s| s.is_visible).await.unwrap();

    let skipped = system.display.force_complete().await.unwrap().unwrap();
    assert_eq!(skipped.order_number, seven);

    system.display.clear_queue().await.unwrap();
    let cleared = state
        .wait_for(|s| !s.is_visible && s.queue_status.pending_count == 0 && !s.queue_status.is_processing)
        .await
        .unwrap()
        .clone();
    assert!(cleared.current_notification.is_none());

    drop(state);
    system.shutdown().await.unwrap();
}
