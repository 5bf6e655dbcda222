// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! A deterministic in-process session client.
//!
//! Stands in for a real protocol library: synthesizes value changes on a
//! timer per subscription, honors the transferability toggle, and supports
//! injected connection loss. Drives the binary's monitor mode and is usable
//! from tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{ClientResult, ConnectionError, OperationError};
use crate::types::{DataTypeId, NodeAttributes, NodeId, NodeIdentifier, SubscriptionSettings};

use super::session::{ItemNotification, SessionClient, SessionNotification};
use super::value::Value;

struct SimItem {
    node_id: NodeId,
    client_handle: u32,
}

struct SimSubscription {
    items: Arc<StdMutex<HashMap<u32, SimItem>>>,
    ticker: JoinHandle<()>,
}

type SharedSink = Arc<StdMutex<Option<mpsc::Sender<SessionNotification>>>>;

/// In-process [`SessionClient`] producing synthetic value changes.
pub struct SimulatedSessionClient {
    connected: bool,
    endpoint: Option<String>,
    sink: SharedSink,
    transferable: Arc<AtomicBool>,
    next_subscription_id: u32,
    next_item_id: u32,
    subscriptions: HashMap<u32, SimSubscription>,
}

impl SimulatedSessionClient {
    /// Creates a disconnected simulated client. Subscriptions are
    /// transferable by default.
    pub fn new() -> Self {
        Self {
            connected: false,
            endpoint: None,
            sink: Arc::new(StdMutex::new(None)),
            transferable: Arc::new(AtomicBool::new(true)),
            next_subscription_id: 1,
            next_item_id: 1,
            subscriptions: HashMap::new(),
        }
    }

    /// Controls whether subscriptions report as transferable after a
    /// reconnect.
    pub fn set_transferable(&self, transferable: bool) {
        self.transferable.store(transferable, Ordering::SeqCst);
    }

    /// Pushes a connection-loss notification through the installed sink, as
    /// a real client library would on keepalive expiry.
    pub async fn inject_connection_loss(&self, reason: impl Into<String>) {
        let sink = {
            let guard = self.sink.lock().unwrap_or_else(|e| e.into_inner());
            guard.clone()
        };
        if let Some(sink) = sink {
            let _ = sink
                .send(SessionNotification::ConnectionLost {
                    reason: reason.into(),
                })
                .await;
        }
    }

    /// Deterministic value for one item at one tick.
    fn synthesize(node_id: &NodeId, client_handle: u32, tick: u64) -> Value {
        match &node_id.identifier {
            NodeIdentifier::Numeric(n) => {
                Value::Double(*n as f64 + (tick % 100) as f64 * 0.25)
            }
            _ => Value::Double(client_handle as f64 * 100.0 + (tick % 100) as f64 * 0.5),
        }
    }

    fn spawn_ticker(
        &self,
        settings: &SubscriptionSettings,
        items: Arc<StdMutex<HashMap<u32, SimItem>>>,
    ) -> JoinHandle<()> {
        let sink = self.sink.clone();
        let interval = settings.clamped().publishing_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut tick: u64 = 0;

            loop {
                ticker.tick().await;
                tick += 1;

                let sender = {
                    let guard = sink.lock().unwrap_or_else(|e| e.into_inner());
                    guard.clone()
                };
                let Some(sender) = sender else { continue };

                let batch: Vec<ItemNotification> = {
                    let items = items.lock().unwrap_or_else(|e| e.into_inner());
                    items
                        .iter()
                        .map(|(&item_id, item)| ItemNotification {
                            item_id,
                            value: Self::synthesize(&item.node_id, item.client_handle, tick),
                            status_code: 0,
                            timestamp: Utc::now(),
                        })
                        .collect()
                };

                for notification in batch {
                    if sender
                        .send(SessionNotification::DataChange(notification))
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
            }
        })
    }
}

impl Default for SimulatedSessionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SimulatedSessionClient {
    fn drop(&mut self) {
        for sub in self.subscriptions.values() {
            sub.ticker.abort();
        }
    }
}

#[async_trait]
impl SessionClient for SimulatedSessionClient {
    async fn connect(&mut self, endpoint: &str) -> ClientResult<()> {
        if !endpoint.starts_with("opc.tcp://") {
            return Err(ConnectionError::refused(endpoint).into());
        }
        self.endpoint = Some(endpoint.to_string());
        self.connected = true;
        debug!(endpoint, "Simulated session opened");
        Ok(())
    }

    async fn disconnect(&mut self) -> ClientResult<()> {
        for (_, sub) in self.subscriptions.drain() {
            sub.ticker.abort();
        }
        self.connected = false;
        debug!("Simulated session closed");
        Ok(())
    }

    async fn reconnect(&mut self) -> ClientResult<()> {
        if self.endpoint.is_none() {
            return Err(ConnectionError::NotConnected.into());
        }
        self.connected = true;
        debug!("Simulated session re-established");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn create_subscription(&mut self, settings: &SubscriptionSettings) -> ClientResult<u32> {
        if !self.connected {
            return Err(ConnectionError::NotConnected.into());
        }

        let id = self.next_subscription_id;
        self.next_subscription_id += 1;

        let items = Arc::new(StdMutex::new(HashMap::new()));
        let ticker = self.spawn_ticker(settings, items.clone());
        self.subscriptions.insert(id, SimSubscription { items, ticker });
        Ok(id)
    }

    async fn delete_subscription(&mut self, subscription_id: u32) -> ClientResult<()> {
        if let Some(sub) = self.subscriptions.remove(&subscription_id) {
            sub.ticker.abort();
        }
        Ok(())
    }

    async fn create_monitored_item(
        &mut self,
        subscription_id: u32,
        node_id: &NodeId,
        client_handle: u32,
        _settings: &SubscriptionSettings,
    ) -> ClientResult<u32> {
        let Some(sub) = self.subscriptions.get(&subscription_id) else {
            return Err(OperationError::monitor_create_failed(
                node_id.to_opc_string(),
                "Unknown subscription",
            )
            .into());
        };

        let item_id = self.next_item_id;
        self.next_item_id += 1;

        let mut items = sub.items.lock().unwrap_or_else(|e| e.into_inner());
        items.insert(
            item_id,
            SimItem {
                node_id: node_id.clone(),
                client_handle,
            },
        );
        Ok(item_id)
    }

    async fn delete_monitored_item(
        &mut self,
        subscription_id: u32,
        item_id: u32,
    ) -> ClientResult<()> {
        if let Some(sub) = self.subscriptions.get(&subscription_id) {
            let mut items = sub.items.lock().unwrap_or_else(|e| e.into_inner());
            items.remove(&item_id);
        }
        Ok(())
    }

    async fn is_subscription_transferable(&self, subscription_id: u32) -> bool {
        self.subscriptions.contains_key(&subscription_id)
            && self.transferable.load(Ordering::SeqCst)
    }

    async fn transfer_subscription(&mut self, subscription_id: u32) -> ClientResult<bool> {
        Ok(self.is_subscription_transferable(subscription_id).await)
    }

    async fn read_attributes(&self, node_id: &NodeId) -> ClientResult<NodeAttributes> {
        if node_id.is_null() {
            return Err(
                OperationError::attribute_read_failed(node_id.to_opc_string(), "Null node id")
                    .into(),
            );
        }
        Ok(NodeAttributes::readable_scalar(DataTypeId::Double))
    }

    fn set_notification_sink(&mut self, sink: mpsc::Sender<SessionNotification>) {
        let mut guard = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(sink);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_connect_rejects_bad_endpoint() {
        let mut client = SimulatedSessionClient::new();
        assert!(client.connect("http://localhost:4840").await.is_err());
        assert!(!client.is_connected());

        assert!(client.connect("opc.tcp://localhost:4840").await.is_ok());
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_reconnect_requires_prior_connect() {
        let mut client = SimulatedSessionClient::new();
        assert!(client.reconnect().await.is_err());

        client.connect("opc.tcp://localhost:4840").await.unwrap();
        client.disconnect().await.unwrap();
        assert!(client.reconnect().await.is_ok());
    }

    #[tokio::test]
    async fn test_ticker_delivers_data_changes() {
        let mut client = SimulatedSessionClient::new();
        let (sink, mut rx) = mpsc::channel(16);
        client.set_notification_sink(sink);
        client.connect("opc.tcp://localhost:4840").await.unwrap();

        let settings = SubscriptionSettings::fast();
        let sub_id = client.create_subscription(&settings).await.unwrap();
        let item_id = client
            .create_monitored_item(sub_id, &NodeId::numeric(2, 10), 1, &settings)
            .await
            .unwrap();

        let notification = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match rx.recv().await {
                    Some(SessionNotification::DataChange(change)) => break change,
                    Some(_) => continue,
                    None => panic!("sink closed"),
                }
            }
        })
        .await
        .expect("no notification within timeout");

        assert_eq!(notification.item_id, item_id);
        assert!(matches!(notification.value, Value::Double(_)));
        assert_eq!(notification.status_code, 0);
    }

    #[tokio::test]
    async fn test_transferability_toggle() {
        let mut client = SimulatedSessionClient::new();
        client.connect("opc.tcp://localhost:4840").await.unwrap();
        let sub_id = client
            .create_subscription(&SubscriptionSettings::default())
            .await
            .unwrap();

        assert!(client.is_subscription_transferable(sub_id).await);
        client.set_transferable(false);
        assert!(!client.is_subscription_transferable(sub_id).await);
        assert!(!client.is_subscription_transferable(999).await);
    }

    #[tokio::test]
    async fn test_injected_connection_loss() {
        let mut client = SimulatedSessionClient::new();
        let (sink, mut rx) = mpsc::channel(16);
        client.set_notification_sink(sink);
        client.connect("opc.tcp://localhost:4840").await.unwrap();

        client.inject_connection_loss("keepalive expired").await;

        let notification = rx.recv().await.unwrap();
        assert!(matches!(
            notification,
            SessionNotification::ConnectionLost { reason } if reason == "keepalive expired"
        ));
    }
}
