// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Connection Integration Tests
//!
//! Integration tests for the connection manager:
//!
//! - Connect/disconnect lifecycle and error conversion
//! - Reconnect mutual exclusion
//! - Three-tier recovery ordering (reattach, recreate, fresh start)
//! - End-to-end notification flow and event forwarding

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use uascope_client::client::{
    ClientEvent, ConnectionManager, ConnectionState, SessionClient, StatusClass, Value,
};

use uascope_tests::common::fixtures::{test_config, NodeFixtures, TEST_ENDPOINT};
use uascope_tests::common::init_test_logging;
use uascope_tests::common::mocks::{push_connection_lost, push_data_change, MockSessionClient};

fn setup() -> (Arc<ConnectionManager>, Arc<Mutex<MockSessionClient>>) {
    init_test_logging();
    let mock = Arc::new(Mutex::new(MockSessionClient::new()));
    let session: Arc<Mutex<dyn SessionClient>> = mock.clone();
    let manager = Arc::new(ConnectionManager::new(session, test_config()));
    (manager, mock)
}

/// Waits for an event matching the predicate, ignoring everything else.
async fn wait_for_event<F>(
    events: &mut tokio::sync::broadcast::Receiver<ClientEvent>,
    mut predicate: F,
) -> ClientEvent
where
    F: FnMut(&ClientEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            if predicate(&event) {
                break event;
            }
        }
    })
    .await
    .expect("expected event not observed within timeout")
}

// =============================================================================
// Connect / Disconnect
// =============================================================================

#[tokio::test]
async fn test_connect_success_transitions_to_connected() {
    let (manager, mock) = setup();
    let mut events = manager.events();

    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(manager.connect(TEST_ENDPOINT).await);
    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(mock.lock().await.connect_count(), 1);
    assert_eq!(mock.lock().await.create_subscription_count(), 1);

    wait_for_event(&mut events, |e| {
        matches!(e, ClientEvent::StateChanged(ConnectionState::Connected))
    })
    .await;
}

#[tokio::test]
async fn test_connect_failure_returns_false_and_emits_error() {
    let (manager, mock) = setup();
    mock.lock().await.fail_connect(true);
    let mut events = manager.events();

    assert!(!manager.connect(TEST_ENDPOINT).await);
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    wait_for_event(&mut events, |e| matches!(e, ClientEvent::ConnectionError(_))).await;
}

#[tokio::test]
async fn test_connect_fails_when_subscription_setup_fails() {
    let (manager, mock) = setup();
    mock.lock().await.fail_create_subscription(true);

    assert!(!manager.connect(TEST_ENDPOINT).await);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    // The half-open session was closed again.
    assert_eq!(mock.lock().await.disconnect_count(), 1);
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let (manager, _) = setup();
    assert!(manager.connect(TEST_ENDPOINT).await);

    manager.disconnect().await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    manager.disconnect().await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_connect_tears_down_previous_session() {
    let (manager, mock) = setup();
    assert!(manager.connect(TEST_ENDPOINT).await);
    manager.subscribe(NodeFixtures::temperature(), "Temperature").await;

    assert!(manager.connect("opc.tcp://other:4840").await);
    assert!(manager.variables().await.is_empty());
    assert_eq!(mock.lock().await.connect_count(), 2);
}

// =============================================================================
// Subscribe / Unsubscribe
// =============================================================================

#[tokio::test]
async fn test_subscribe_returns_none_when_disconnected() {
    let (manager, _) = setup();
    assert!(manager
        .subscribe(NodeFixtures::temperature(), "Temperature")
        .await
        .is_none());
}

#[tokio::test]
async fn test_subscribe_and_unsubscribe_round_trip() {
    let (manager, _) = setup();
    assert!(manager.connect(TEST_ENDPOINT).await);

    let variable = manager
        .subscribe(NodeFixtures::temperature(), "Temperature")
        .await
        .expect("subscribe should succeed");

    assert!(manager.unsubscribe(variable.client_handle).await);
    assert!(!manager.unsubscribe(variable.client_handle).await);
    assert!(manager.variables().await.is_empty());
}

#[tokio::test]
async fn test_subscribe_failure_is_converted_to_none() {
    let (manager, mock) = setup();
    assert!(manager.connect(TEST_ENDPOINT).await);

    mock.lock().await.fail_all_create_items(true);
    assert!(manager
        .subscribe(NodeFixtures::temperature(), "Temperature")
        .await
        .is_none());
}

#[tokio::test]
async fn test_variable_added_event_is_forwarded() {
    let (manager, _) = setup();
    assert!(manager.connect(TEST_ENDPOINT).await);
    let mut events = manager.events();

    let variable = manager
        .subscribe(NodeFixtures::temperature(), "Temperature")
        .await
        .unwrap();

    let event = wait_for_event(&mut events, |e| matches!(e, ClientEvent::VariableAdded(_))).await;
    if let ClientEvent::VariableAdded(v) = event {
        assert_eq!(v.client_handle, variable.client_handle);
    }
}

// =============================================================================
// Notification Flow
// =============================================================================

#[tokio::test]
async fn test_data_change_flows_to_value_changed_event() {
    let (manager, mock) = setup();
    assert!(manager.connect(TEST_ENDPOINT).await);

    let variable = manager
        .subscribe(NodeFixtures::temperature(), "Temperature")
        .await
        .unwrap();
    let mut events = manager.events();

    let sink = mock.lock().await.sink().expect("sink installed on connect");
    push_data_change(&sink, variable.item_id, Value::Double(19.994), 0).await;

    let event =
        wait_for_event(&mut events, |e| matches!(e, ClientEvent::ValueChanged(_))).await;
    if let ClientEvent::ValueChanged(v) = event {
        assert_eq!(v.client_handle, variable.client_handle);
        assert_eq!(v.value, "19.99");
        assert_eq!(v.status_class(), StatusClass::Good);
    }
}

#[tokio::test]
async fn test_connection_loss_raises_auto_reconnect_without_retrying() {
    let (manager, mock) = setup();
    assert!(manager.connect(TEST_ENDPOINT).await);
    let mut events = manager.events();

    let sink = mock.lock().await.sink().expect("sink installed on connect");
    push_connection_lost(&sink, "keepalive expired").await;

    wait_for_event(&mut events, |e| {
        matches!(e, ClientEvent::AutoReconnectRequired)
    })
    .await;

    // The manager only signals; the caller decides when to reconnect.
    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(mock.lock().await.reconnect_count(), 0);
}

// =============================================================================
// Reconnect
// =============================================================================

#[tokio::test]
async fn test_reconnect_requires_a_prior_connect() {
    let (manager, _) = setup();
    assert!(!manager.reconnect().await);
}

#[tokio::test]
async fn test_reconnect_failure_transitions_to_disconnected() {
    let (manager, mock) = setup();
    assert!(manager.connect(TEST_ENDPOINT).await);

    mock.lock().await.fail_reconnect(true);
    assert!(!manager.reconnect().await);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_reconnect_mutual_exclusion() {
    let (manager, mock) = setup();
    assert!(manager.connect(TEST_ENDPOINT).await);
    mock.lock().await.set_reconnect_delay(Duration::from_millis(300));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let manager = manager.clone();
        tasks.push(tokio::spawn(async move { manager.reconnect().await }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.expect("task panicked") {
            successes += 1;
        }
    }

    assert_eq!(successes, 1, "exactly one concurrent reconnect may proceed");
    assert_eq!(mock.lock().await.reconnect_count(), 1);
}

#[tokio::test]
async fn test_data_path_is_live_after_disconnect_then_reconnect() {
    let (manager, mock) = setup();
    assert!(manager.connect(TEST_ENDPOINT).await);
    manager.disconnect().await;

    // The last endpoint is remembered, so reconnect from Disconnected is
    // valid and must come back with a working notification path.
    assert!(manager.reconnect().await);
    assert_eq!(manager.state(), ConnectionState::Connected);

    let variable = manager
        .subscribe(NodeFixtures::temperature(), "Temperature")
        .await
        .expect("subscribe should succeed after reconnect");
    let mut events = manager.events();

    let sink = mock.lock().await.sink().expect("sink installed on reconnect");
    push_data_change(&sink, variable.item_id, Value::Double(7.5), 0).await;

    let event =
        wait_for_event(&mut events, |e| matches!(e, ClientEvent::ValueChanged(_))).await;
    if let ClientEvent::ValueChanged(v) = event {
        assert_eq!(v.client_handle, variable.client_handle);
        assert_eq!(v.value, "7.50");
    }
}

#[tokio::test]
async fn test_reconnect_can_run_again_after_completion() {
    let (manager, mock) = setup();
    assert!(manager.connect(TEST_ENDPOINT).await);

    assert!(manager.reconnect().await);
    assert!(manager.reconnect().await);
    assert_eq!(mock.lock().await.reconnect_count(), 2);
}

// =============================================================================
// Recovery Policy
// =============================================================================

#[tokio::test]
async fn test_scenario_reattach_preserves_monitored_set() {
    let (manager, mock) = setup();
    assert!(manager.connect(TEST_ENDPOINT).await);

    // Receiver opened before the add: the forwarder re-broadcasts the
    // subscribe-time event asynchronously, so it must be drained here
    // rather than assumed gone before reconnect.
    let mut events = manager.events();
    let variable = manager
        .subscribe(NodeFixtures::temperature(), "Temperature")
        .await
        .unwrap();
    wait_for_event(&mut events, |e| matches!(e, ClientEvent::VariableAdded(_))).await;

    assert!(manager.reconnect().await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let after = manager.variables().await;
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].client_handle, variable.client_handle);
    assert_eq!(after[0].item_id, variable.item_id);
    assert!(after[0].stale, "stale until the next notification");

    // Transfer attempted, no rebuild, no add/remove churn.
    assert_eq!(mock.lock().await.transfer_count(), 1);
    assert_eq!(mock.lock().await.create_subscription_count(), 1);
    while let Ok(event) = events.try_recv() {
        assert!(
            !matches!(
                event,
                ClientEvent::VariableAdded(_) | ClientEvent::VariableRemoved(_)
            ),
            "reattach must not fire add/remove events"
        );
    }

    // The next notification clears the stale marker.
    let mut events = manager.events();
    let sink = mock.lock().await.sink().expect("sink installed on connect");
    push_data_change(&sink, variable.item_id, Value::Double(20.0), 0).await;
    wait_for_event(&mut events, |e| matches!(e, ClientEvent::ValueChanged(_))).await;

    let resumed = manager.variables().await;
    assert!(!resumed[0].stale);
}

#[tokio::test]
async fn test_scenario_recreate_preserves_handle_with_new_item_id() {
    let (manager, mock) = setup();
    assert!(manager.connect(TEST_ENDPOINT).await);

    let variable = manager
        .subscribe(NodeFixtures::temperature(), "Temperature")
        .await
        .unwrap();

    mock.lock().await.set_transferable(false);
    assert!(manager.reconnect().await);

    let after = manager.variables().await;
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].client_handle, variable.client_handle);
    assert_eq!(after[0].display_name, variable.display_name);
    assert_ne!(after[0].item_id, variable.item_id);

    // Recreate went straight to a rebuild, no transfer attempt.
    assert_eq!(mock.lock().await.transfer_count(), 0);
    assert_eq!(mock.lock().await.create_subscription_count(), 2);
}

#[tokio::test]
async fn test_recovery_falls_back_to_fresh_subscription() {
    let (manager, mock) = setup();
    assert!(manager.connect(TEST_ENDPOINT).await);

    manager
        .subscribe(NodeFixtures::temperature(), "Temperature")
        .await
        .unwrap();

    // Recreate's rebuild fails once; the fresh-start tier then succeeds.
    mock.lock().await.set_transferable(false);
    mock.lock().await.fail_create_subscription_times(1);

    assert!(manager.reconnect().await);
    assert_eq!(manager.state(), ConnectionState::Connected);
    assert!(
        manager.variables().await.is_empty(),
        "fresh start loses the monitored set"
    );
}

#[tokio::test]
async fn test_recovery_failure_disconnects() {
    let (manager, mock) = setup();
    assert!(manager.connect(TEST_ENDPOINT).await);

    mock.lock().await.set_transferable(false);
    mock.lock().await.fail_create_subscription(true);

    assert!(!manager.reconnect().await);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}
