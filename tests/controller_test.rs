//! Controller with a mocked queue and a mocked realtime adapter.
//!
//! The test plays the queue actor: it reads requests off the mock receiver and
//! answers them, and it publishes queue events directly.

use std::time::Duration;

use chrono::Utc;
use order_call_display::config::RecentCallsConfig;
use order_call_display::controller::NotificationController;
use order_call_display::framework::mock::{
    create_mock_queue_client, expect_enqueue, expect_mark_completed, expect_remove, MockRealtime,
};
use order_call_display::model::{
    ConnectionStatus, NotificationItem, OrderCallChange, OrderCallRecord, OrderNumber, OrderType, QueueStatus,
};
use order_call_display::queue_actor::{EnqueueOutcome, QueueEvent, QueueEventKind, RemoveOutcome};
use tokio::sync::oneshot;

fn record(id: &str, order_type: OrderType, number: u16) -> OrderCallRecord {
    OrderCallRecord {
        id: id.to_string(),
        store_id: "s1".to_string(),
        number: OrderNumber::new(number).unwrap(),
        order_type,
        called_at: Utc::now(),
        admin_id: None,
        deleted_at: None,
    }
}

fn soft_deleted(mut record: OrderCallRecord) -> OrderCallRecord {
    record.deleted_at = Some(Utc::now());
    record
}

#[tokio::test]
async fn test_changes_become_queue_operations() {
    let (queue, mut requests, _events) = create_mock_queue_client(16);
    let realtime = MockRealtime::new(vec![]);
    let (controller, _display) =
        NotificationController::new(queue, realtime.client(), &RecentCallsConfig::default(), true);
    let (shutdown, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(controller.run(shutdown_rx));

    // Active insert enqueues
    realtime.send_change(OrderCallChange::Inserted(record("c1", OrderType::Takeout, 12)));
    let (key, reply) = expect_enqueue(&mut requests).await.expect("Expected Enqueue request");
    assert_eq!(key.order_type, OrderType::Takeout);
    assert_eq!(key.order_number.get(), 12);
    reply.send(EnqueueOutcome::Duplicate).unwrap();

    // Updates that keep the row active touch nothing; soft delete removes
    realtime.send_change(OrderCallChange::Updated(record("c1", OrderType::Takeout, 12)));
    realtime.send_change(OrderCallChange::Updated(soft_deleted(record("c1", OrderType::Takeout, 12))));
    let (key, reply) = expect_remove(&mut requests).await.expect("Expected Remove request");
    assert_eq!(key.order_number.get(), 12);
    reply.send(RemoveOutcome::default()).unwrap();

    // Hard delete removes
    realtime.send_change(OrderCallChange::Deleted(record("c2", OrderType::DineIn, 7)));
    let (key, reply) = expect_remove(&mut requests).await.expect("Expected Remove request");
    assert_eq!(key.order_type, OrderType::DineIn);
    reply.send(RemoveOutcome::default()).unwrap();

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_queue_events_fold_into_display_state() {
    let (queue, _requests, events) = create_mock_queue_client(16);
    let realtime = MockRealtime::new(vec![]);
    let (controller, display) =
        NotificationController::new(queue, realtime.client(), &RecentCallsConfig::default(), false);
    let (shutdown, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(controller.run(shutdown_rx));
    let mut state = display.watch();

    let mut item = NotificationItem::new(OrderType::Takeout, OrderNumber::new(3).unwrap());
    item.advance_call();
    let processing = QueueStatus {
        is_processing: true,
        pending_count: 1,
        current_item: Some(item.clone()),
        speech_active: false,
    };

    events
        .send(QueueEvent {
            kind: QueueEventKind::ShowPopup(item.clone()),
            status: processing.clone(),
        })
        .unwrap();
    let shown = state.wait_for(|s| s.is_visible).await.unwrap().clone();
    assert_eq!(shown.current_notification.as_ref().map(|n| n.id), Some(item.id));
    assert_eq!(shown.queue_status.pending_count, 1);
    assert!(!shown.audio_enabled);

    let mut done = item.clone();
    done.complete();
    let idle = QueueStatus {
        pending_count: 1,
        ..QueueStatus::default()
    };
    events
        .send(QueueEvent {
            kind: QueueEventKind::HidePopup,
            status: idle.clone(),
        })
        .unwrap();
    events
        .send(QueueEvent {
            kind: QueueEventKind::Completed(done),
            status: idle,
        })
        .unwrap();
    let hidden = state
        .wait_for(|s| !s.is_visible && s.current_notification.is_none())
        .await
        .unwrap()
        .clone();
    assert!(!hidden.queue_status.is_processing);

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_connection_and_recent_calls_reach_display_state() {
    let (queue, _requests, _events) = create_mock_queue_client(16);
    let realtime = MockRealtime::new(vec![
        record("b", OrderType::DineIn, 2),
        record("a", OrderType::Takeout, 1),
    ]);
    let (controller, display) =
        NotificationController::new(queue, realtime.client(), &RecentCallsConfig::default(), true);
    let (shutdown, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(controller.run(shutdown_rx));
    let mut state = display.watch();

    state.wait_for(|s| s.recent_calls.len() == 2).await.unwrap();
    let fetches_before = realtime.fetch_count();

    realtime.set_status(ConnectionStatus::Connected);
    let connected = state
        .wait_for(|s| s.connection_status == ConnectionStatus::Connected)
        .await
        .unwrap()
        .clone();
    assert_eq!(connected.recent_calls_of(OrderType::DineIn).count(), 1);

    // Connecting reloads the board
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(realtime.fetch_count() > fetches_before);

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_display_client_passthroughs() {
    let (queue, mut requests, _events) = create_mock_queue_client(16);
    let realtime = MockRealtime::new(vec![]);
    let (_controller, display) =
        NotificationController::new(queue, realtime.client(), &RecentCallsConfig::default(), true);

    let task = tokio::spawn({
        let display = display.clone();
        async move { display.force_complete().await }
    });
    let reply = expect_mark_completed(&mut requests).await.expect("Expected MarkCurrentCompleted request");
    reply.send(None).unwrap();
    assert_eq!(task.await.unwrap(), Ok(None));

    let task = tokio::spawn({
        let display = display.clone();
        async move { display.add_test_notification(OrderType::DineIn, OrderNumber::new(8).unwrap()).await }
    });
    let (key, reply) = expect_enqueue(&mut requests).await.expect("Expected Enqueue request");
    assert_eq!(key.order_number.get(), 8);
    reply.send(EnqueueOutcome::Duplicate).unwrap();
    assert_eq!(task.await.unwrap(), Ok(EnqueueOutcome::Duplicate));
}
