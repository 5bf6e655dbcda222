// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Mock session client for testing the managers in isolation.
//!
//! ## Design Principles
//!
//! - Configurable behavior for different test scenarios
//! - Recording of interactions for verification
//! - Thread-safe for concurrent testing
//! - Easy to set up error injection

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use uascope_client::client::{ItemNotification, SessionClient, SessionNotification, Value};
use uascope_client::error::{ClientResult, ConnectionError, OperationError, SubscriptionError};
use uascope_client::types::{DataTypeId, NodeAttributes, NodeId, SubscriptionSettings};

// =============================================================================
// Mock Session Client
// =============================================================================

/// A highly configurable mock session client for testing.
pub struct MockSessionClient {
    connected: AtomicBool,
    endpoint: StdMutex<Option<String>>,
    sink: StdMutex<Option<mpsc::Sender<SessionNotification>>>,

    /// Whether subscriptions report as transferable.
    transferable: AtomicBool,

    /// Force connect to fail.
    fail_connect: AtomicBool,

    /// Force reconnect to fail.
    fail_reconnect: AtomicBool,

    /// Remaining subscription creations to fail (`u64::MAX` = always).
    fail_create_subscription: AtomicU64,

    /// Force the next monitored item creation to fail (one-shot).
    fail_next_create_item: AtomicBool,

    /// Force all monitored item creations to fail.
    fail_all_create_items: AtomicBool,

    /// Force attribute reads to fail.
    fail_read_attributes: AtomicBool,

    /// How long reconnect takes, to widen race windows in tests.
    reconnect_delay: StdMutex<Duration>,

    next_subscription_id: AtomicU32,
    next_item_id: AtomicU32,

    connect_count: AtomicU64,
    disconnect_count: AtomicU64,
    reconnect_count: AtomicU64,
    transfer_count: AtomicU64,
    create_subscription_count: AtomicU64,
    create_item_count: AtomicU64,
    delete_item_count: AtomicU64,
}

impl MockSessionClient {
    /// Create a new mock with default settings: everything succeeds and
    /// subscriptions are transferable.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            endpoint: StdMutex::new(None),
            sink: StdMutex::new(None),
            transferable: AtomicBool::new(true),
            fail_connect: AtomicBool::new(false),
            fail_reconnect: AtomicBool::new(false),
            fail_create_subscription: AtomicU64::new(0),
            fail_next_create_item: AtomicBool::new(false),
            fail_all_create_items: AtomicBool::new(false),
            fail_read_attributes: AtomicBool::new(false),
            reconnect_delay: StdMutex::new(Duration::ZERO),
            next_subscription_id: AtomicU32::new(1),
            next_item_id: AtomicU32::new(100),
            connect_count: AtomicU64::new(0),
            disconnect_count: AtomicU64::new(0),
            reconnect_count: AtomicU64::new(0),
            transfer_count: AtomicU64::new(0),
            create_subscription_count: AtomicU64::new(0),
            create_item_count: AtomicU64::new(0),
            delete_item_count: AtomicU64::new(0),
        }
    }

    /// Control whether subscriptions report as transferable.
    pub fn set_transferable(&self, transferable: bool) {
        self.transferable.store(transferable, Ordering::SeqCst);
    }

    /// Force connect attempts to fail.
    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Force reconnect attempts to fail.
    pub fn fail_reconnect(&self, fail: bool) {
        self.fail_reconnect.store(fail, Ordering::SeqCst);
    }

    /// Force subscription creation to fail.
    pub fn fail_create_subscription(&self, fail: bool) {
        let remaining = if fail { u64::MAX } else { 0 };
        self.fail_create_subscription.store(remaining, Ordering::SeqCst);
    }

    /// Fail the next `n` subscription creations, then succeed again.
    pub fn fail_create_subscription_times(&self, n: u64) {
        self.fail_create_subscription.store(n, Ordering::SeqCst);
    }

    /// Force the next monitored item creation to fail (one-shot).
    pub fn fail_next_create_item(&self) {
        self.fail_next_create_item.store(true, Ordering::SeqCst);
    }

    /// Force all monitored item creations to fail.
    pub fn fail_all_create_items(&self, fail: bool) {
        self.fail_all_create_items.store(fail, Ordering::SeqCst);
    }

    /// Force attribute reads to fail.
    pub fn fail_read_attributes(&self, fail: bool) {
        self.fail_read_attributes.store(fail, Ordering::SeqCst);
    }

    /// Make reconnect take this long, to widen race windows.
    pub fn set_reconnect_delay(&self, delay: Duration) {
        let mut guard = self.reconnect_delay.lock().unwrap_or_else(|e| e.into_inner());
        *guard = delay;
    }

    /// Returns a clone of the installed notification sink, if any.
    pub fn sink(&self) -> Option<mpsc::Sender<SessionNotification>> {
        let guard = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    /// Number of connect calls observed.
    pub fn connect_count(&self) -> u64 {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// Number of disconnect calls observed.
    pub fn disconnect_count(&self) -> u64 {
        self.disconnect_count.load(Ordering::SeqCst)
    }

    /// Number of reconnect calls observed.
    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::SeqCst)
    }

    /// Number of subscription transfer attempts observed.
    pub fn transfer_count(&self) -> u64 {
        self.transfer_count.load(Ordering::SeqCst)
    }

    /// Number of subscription creations observed.
    pub fn create_subscription_count(&self) -> u64 {
        self.create_subscription_count.load(Ordering::SeqCst)
    }

    /// Number of monitored item creations observed.
    pub fn create_item_count(&self) -> u64 {
        self.create_item_count.load(Ordering::SeqCst)
    }

    /// Number of monitored item deletions observed.
    pub fn delete_item_count(&self) -> u64 {
        self.delete_item_count.load(Ordering::SeqCst)
    }
}

impl Default for MockSessionClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Sends a data change through a sink, as the session's I/O context would.
pub async fn push_data_change(
    sink: &mpsc::Sender<SessionNotification>,
    item_id: u32,
    value: Value,
    status_code: u32,
) {
    sink.send(SessionNotification::DataChange(ItemNotification {
        item_id,
        value,
        status_code,
        timestamp: Utc::now(),
    }))
    .await
    .expect("notification sink closed");
}

/// Sends a connection-loss notification through a sink.
pub async fn push_connection_lost(sink: &mpsc::Sender<SessionNotification>, reason: &str) {
    sink.send(SessionNotification::ConnectionLost {
        reason: reason.to_string(),
    })
    .await
    .expect("notification sink closed");
}

#[async_trait]
impl SessionClient for MockSessionClient {
    async fn connect(&mut self, endpoint: &str) -> ClientResult<()> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(ConnectionError::refused(endpoint).into());
        }
        {
            let mut guard = self.endpoint.lock().unwrap_or_else(|e| e.into_inner());
            *guard = Some(endpoint.to_string());
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) -> ClientResult<()> {
        self.disconnect_count.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn reconnect(&mut self) -> ClientResult<()> {
        self.reconnect_count.fetch_add(1, Ordering::SeqCst);

        let delay = {
            let guard = self.reconnect_delay.lock().unwrap_or_else(|e| e.into_inner());
            *guard
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.fail_reconnect.load(Ordering::SeqCst) {
            return Err(ConnectionError::dropped("injected reconnect failure").into());
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn create_subscription(&mut self, _settings: &SubscriptionSettings) -> ClientResult<u32> {
        self.create_subscription_count.fetch_add(1, Ordering::SeqCst);
        let should_fail = self
            .fail_create_subscription
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| match remaining {
                0 => None,
                u64::MAX => Some(u64::MAX),
                n => Some(n - 1),
            })
            .is_ok();
        if should_fail {
            return Err(SubscriptionError::creation_failed("injected").into());
        }
        Ok(self.next_subscription_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn delete_subscription(&mut self, _subscription_id: u32) -> ClientResult<()> {
        Ok(())
    }

    async fn create_monitored_item(
        &mut self,
        _subscription_id: u32,
        node_id: &NodeId,
        _client_handle: u32,
        _settings: &SubscriptionSettings,
    ) -> ClientResult<u32> {
        self.create_item_count.fetch_add(1, Ordering::SeqCst);

        let fail_once = self
            .fail_next_create_item
            .swap(false, Ordering::SeqCst);
        if fail_once || self.fail_all_create_items.load(Ordering::SeqCst) {
            return Err(
                OperationError::monitor_create_failed(node_id.to_opc_string(), "injected").into(),
            );
        }
        Ok(self.next_item_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn delete_monitored_item(
        &mut self,
        _subscription_id: u32,
        _item_id: u32,
    ) -> ClientResult<()> {
        self.delete_item_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn is_subscription_transferable(&self, _subscription_id: u32) -> bool {
        self.transferable.load(Ordering::SeqCst)
    }

    async fn transfer_subscription(&mut self, _subscription_id: u32) -> ClientResult<bool> {
        self.transfer_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.transferable.load(Ordering::SeqCst))
    }

    async fn read_attributes(&self, node_id: &NodeId) -> ClientResult<NodeAttributes> {
        if self.fail_read_attributes.load(Ordering::SeqCst) {
            return Err(
                OperationError::attribute_read_failed(node_id.to_opc_string(), "injected").into(),
            );
        }
        Ok(NodeAttributes::readable_scalar(DataTypeId::Double))
    }

    fn set_notification_sink(&mut self, sink: mpsc::Sender<SessionNotification>) {
        let mut guard = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(sink);
    }
}
