// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Subscription Integration Tests
//!
//! Integration tests for the subscription manager and the value model:
//!
//! - Handle allocation and removal semantics
//! - Stale marking
//! - Value formatting and status classification
//! - Reattach and recreate recovery

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use uascope_client::client::{
    ItemNotification, MonitorEvent, SessionClient, StatusClass, SubscriptionManager, Value,
};

use uascope_tests::common::fixtures::{fast_settings, NodeFixtures};
use uascope_tests::common::mocks::MockSessionClient;
use uascope_tests::common::init_test_logging;

fn setup() -> (Arc<SubscriptionManager>, Arc<Mutex<MockSessionClient>>) {
    init_test_logging();
    let mock = Arc::new(Mutex::new(MockSessionClient::new()));
    let session: Arc<Mutex<dyn SessionClient>> = mock.clone();
    let manager = Arc::new(SubscriptionManager::new(session, fast_settings()));
    (manager, mock)
}

// =============================================================================
// Handle Allocation
// =============================================================================

#[tokio::test]
async fn test_handle_uniqueness_across_many_adds() {
    let (manager, _) = setup();
    manager.initialize().await.unwrap();

    let mut handles = HashSet::new();
    for node in NodeFixtures::batch(25) {
        let name = node.to_opc_string();
        let variable = manager.add_variable(node, name).await.unwrap();
        assert!(
            handles.insert(variable.client_handle),
            "duplicate handle {}",
            variable.client_handle
        );
    }
    assert_eq!(handles.len(), 25);
}

#[tokio::test]
async fn test_handle_counter_survives_failed_adds() {
    let (manager, mock) = setup();
    manager.initialize().await.unwrap();

    let first = manager
        .add_variable(NodeFixtures::temperature(), "Temperature")
        .await
        .unwrap();

    mock.lock().await.fail_next_create_item();
    assert!(manager
        .add_variable(NodeFixtures::pressure(), "Pressure")
        .await
        .is_err());

    let second = manager
        .add_variable(NodeFixtures::motor_state(), "Motor")
        .await
        .unwrap();

    // The failed attempt did not consume a handle.
    assert_eq!(second.client_handle, first.client_handle + 1);
}

#[tokio::test]
async fn test_failed_attribute_read_rejects_add() {
    let (manager, mock) = setup();
    manager.initialize().await.unwrap();

    mock.lock().await.fail_read_attributes(true);
    assert!(manager
        .add_variable(NodeFixtures::temperature(), "Temperature")
        .await
        .is_err());
    assert!(manager.variables().await.is_empty());
}

// =============================================================================
// Removal
// =============================================================================

#[tokio::test]
async fn test_removal_is_idempotent_and_eventless_on_unknown_handle() {
    let (manager, _) = setup();
    manager.initialize().await.unwrap();

    let variable = manager
        .add_variable(NodeFixtures::temperature(), "Temperature")
        .await
        .unwrap();
    let mut events = manager.subscribe_events();

    assert!(manager.remove_variable(variable.client_handle).await);
    assert!(!manager.remove_variable(variable.client_handle).await);
    assert!(!manager.remove_variable(424242).await);

    let event = events.recv().await.unwrap();
    assert!(
        matches!(event, MonitorEvent::VariableRemoved(h) if h == variable.client_handle),
        "expected a single removal event"
    );
    assert!(events.try_recv().is_err(), "no further events expected");
}

// =============================================================================
// Stale Marking
// =============================================================================

#[tokio::test]
async fn test_stale_marking_is_additive_only() {
    let (manager, _) = setup();
    manager.initialize().await.unwrap();

    for node in NodeFixtures::batch(5) {
        let name = node.to_opc_string();
        manager.add_variable(node, name).await.unwrap();
    }
    let before = manager.variables().await;

    manager.mark_all_stale().await;

    let after = manager.variables().await;
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(after.iter()) {
        assert!(a.stale);
        assert_eq!(a.client_handle, b.client_handle);
        assert_eq!(a.node_id, b.node_id);
        assert_eq!(a.display_name, b.display_name);
        assert_eq!(a.value, b.value);
        assert_eq!(a.item_id, b.item_id);
    }
}

// =============================================================================
// Value Formatting and Status Classification
// =============================================================================

#[tokio::test]
async fn test_format_value_exactness() {
    assert_eq!(Value::Double(3.14159).display_string(), "3.14");
    assert_eq!(Value::Double(100.0).display_string(), "100.00");
    assert_eq!(Value::Boolean(true).display_string(), "True");
    assert_eq!(Value::ByteString(vec![0; 5]).display_string(), "[5 bytes]");
    assert_eq!(
        Value::Array(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]).display_string(),
        "[3 items]"
    );
    assert_eq!(Value::Null.display_string(), "null");
}

#[tokio::test]
async fn test_status_classification_bits() {
    assert_eq!(StatusClass::from_code(0), StatusClass::Good);
    assert_eq!(StatusClass::from_code(0x8000_0000), StatusClass::Bad);
    assert_eq!(StatusClass::from_code(0x4000_0000), StatusClass::Uncertain);
    assert_eq!(StatusClass::from_code(0xC000_0000), StatusClass::Bad);
}

#[tokio::test]
async fn test_notification_formats_value_onto_variable() {
    let (manager, _) = setup();
    manager.initialize().await.unwrap();

    let variable = manager
        .add_variable(NodeFixtures::temperature(), "Temperature")
        .await
        .unwrap();

    manager
        .apply_notification(ItemNotification {
            item_id: variable.item_id,
            value: Value::Double(21.456),
            status_code: 0x4000_0000,
            timestamp: Utc::now(),
        })
        .await;

    let updated = manager.variable(variable.client_handle).await.unwrap();
    assert_eq!(updated.value, "21.46");
    assert_eq!(updated.status_class(), StatusClass::Uncertain);
    assert!(updated.timestamp.is_some());
}

// =============================================================================
// Recovery
// =============================================================================

#[tokio::test]
async fn test_reattach_preserves_items_and_defers_stale_clearing() {
    let (manager, _) = setup();
    manager.initialize().await.unwrap();

    let variable = manager
        .add_variable(NodeFixtures::temperature(), "Temperature")
        .await
        .unwrap();
    manager.mark_all_stale().await;

    assert!(manager.is_transferable().await);
    assert!(manager.reattach().await);

    let after = manager.variable(variable.client_handle).await.unwrap();
    assert_eq!(after.item_id, variable.item_id);
    assert!(after.stale, "stale clears on the next notification only");

    manager
        .apply_notification(ItemNotification {
            item_id: after.item_id,
            value: Value::Double(22.0),
            status_code: 0,
            timestamp: Utc::now(),
        })
        .await;
    let resumed = manager.variable(variable.client_handle).await.unwrap();
    assert!(!resumed.stale);
}

#[tokio::test]
async fn test_recreate_reassigns_item_ids_but_not_handles() {
    let (manager, mock) = setup();
    manager.initialize().await.unwrap();

    let variable = manager
        .add_variable(NodeFixtures::temperature(), "Temperature")
        .await
        .unwrap();
    manager.mark_all_stale().await;

    mock.lock().await.set_transferable(false);
    assert!(!manager.is_transferable().await);
    assert!(manager.recreate().await);

    let after = manager.variable(variable.client_handle).await.unwrap();
    assert_eq!(after.client_handle, variable.client_handle);
    assert_eq!(after.display_name, variable.display_name);
    assert_ne!(after.item_id, variable.item_id);
    assert!(!after.stale, "successful re-add confirms the item");
}

#[tokio::test]
async fn test_recreate_is_best_effort_per_variable() {
    let (manager, mock) = setup();
    manager.initialize().await.unwrap();

    let first = manager
        .add_variable(NodeFixtures::temperature(), "Temperature")
        .await
        .unwrap();
    let second = manager
        .add_variable(NodeFixtures::pressure(), "Pressure")
        .await
        .unwrap();

    // Re-adds run in ascending handle order: fail the first one.
    mock.lock().await.fail_next_create_item();

    let mut events = manager.subscribe_events();
    assert!(manager.recreate().await);

    assert!(manager.variable(first.client_handle).await.is_none());
    assert!(manager.variable(second.client_handle).await.is_some());

    let event = events.recv().await.unwrap();
    assert!(matches!(event, MonitorEvent::VariableRemoved(h) if h == first.client_handle));
}

#[tokio::test]
async fn test_recreate_fails_when_subscription_cannot_be_rebuilt() {
    let (manager, mock) = setup();
    manager.initialize().await.unwrap();

    manager
        .add_variable(NodeFixtures::temperature(), "Temperature")
        .await
        .unwrap();

    mock.lock().await.fail_create_subscription(true);
    assert!(!manager.recreate().await);
}
