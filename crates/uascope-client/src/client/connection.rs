// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Connection manager: top-level lifecycle orchestrator.
//!
//! Owns one session client and, while connected, one subscription manager.
//! Session-client failures never escape its boundary methods: `connect` and
//! `reconnect` return `false` and emit a [`ClientEvent::ConnectionError`],
//! `subscribe` returns `None` with a logged warning.
//!
//! Two background tasks are spawned on connect and torn down with the
//! session: a pump that drains the session notification sink, and a
//! forwarder that re-wires subscription manager events into client events.
//! Both handles are stored and aborted explicitly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::types::{ClientConfig, NodeId};

use super::session::{SessionClient, SessionNotification};
use super::subscription::{MonitorEvent, MonitoredVariable, SubscriptionManager};

// =============================================================================
// ConnectionState
// =============================================================================

/// Connection lifecycle state. Owned solely by the connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No session.
    Disconnected,
    /// A connect attempt is in progress.
    Connecting,
    /// A session is established.
    Connected,
    /// A reconnect attempt is in progress.
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Reconnecting => write!(f, "Reconnecting"),
        }
    }
}

// =============================================================================
// ClientEvent
// =============================================================================

/// Public events emitted by the connection manager.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The connection state changed.
    StateChanged(ConnectionState),

    /// A connection-level error occurred.
    ConnectionError(String),

    /// A monitored variable received a new value.
    ValueChanged(MonitoredVariable),

    /// A variable was added to the monitored set.
    VariableAdded(MonitoredVariable),

    /// The variable with this client handle was removed.
    VariableRemoved(u32),

    /// The session layer reported an unexpected drop. The manager does not
    /// retry on its own; the caller decides whether to invoke `reconnect`.
    AutoReconnectRequired,
}

// =============================================================================
// ConnectionManager
// =============================================================================

const EVENT_CHANNEL_CAPACITY: usize = 256;
const NOTIFICATION_CHANNEL_CAPACITY: usize = 1024;

/// Releases the reconnect guard when the winning attempt finishes, on every
/// exit path.
struct ReconnectPermit<'a>(&'a AtomicBool);

impl Drop for ReconnectPermit<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Orchestrates the session lifecycle and owns the subscription manager.
pub struct ConnectionManager {
    config: ClientConfig,
    session: Arc<Mutex<dyn SessionClient>>,
    monitor: Arc<RwLock<Option<Arc<SubscriptionManager>>>>,
    state: std::sync::RwLock<ConnectionState>,
    last_endpoint: std::sync::Mutex<Option<String>>,
    reconnect_in_progress: AtomicBool,
    events: broadcast::Sender<ClientEvent>,
    pump_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    forwarder_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Creates a manager around a session client. No session is opened until
    /// [`connect`](Self::connect).
    pub fn new(session: Arc<Mutex<dyn SessionClient>>, config: ClientConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            session,
            monitor: Arc::new(RwLock::new(None)),
            state: std::sync::RwLock::new(ConnectionState::Disconnected),
            last_endpoint: std::sync::Mutex::new(None),
            reconnect_in_progress: AtomicBool::new(false),
            events,
            pump_task: std::sync::Mutex::new(None),
            forwarder_task: std::sync::Mutex::new(None),
        }
    }

    /// Returns the current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a receiver for client events.
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    fn set_state(&self, new: ConnectionState) {
        let changed = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            if *state == new {
                false
            } else {
                debug!(from = %*state, to = %new, "Connection state changed");
                *state = new;
                true
            }
        };
        if changed {
            let _ = self.events.send(ClientEvent::StateChanged(new));
        }
    }

    /// Opens a session to the given endpoint.
    ///
    /// Any existing session and subscription are torn down first. Returns
    /// `false` (never an error) if the session cannot be opened; the failure
    /// is logged and reported as a [`ClientEvent::ConnectionError`].
    pub async fn connect(&self, endpoint: &str) -> bool {
        self.teardown().await;
        self.set_state(ConnectionState::Connecting);
        info!(endpoint, "Connecting");

        let (sink, notifications) = mpsc::channel(NOTIFICATION_CHANNEL_CAPACITY);

        let connect_result = {
            let mut session = self.session.lock().await;
            session.set_notification_sink(sink);
            session.connect(endpoint).await
        };

        if let Err(e) = connect_result {
            error!(endpoint, error = %e, "Connect failed");
            let _ = self.events.send(ClientEvent::ConnectionError(e.to_string()));
            self.set_state(ConnectionState::Disconnected);
            return false;
        }

        let monitor = Arc::new(SubscriptionManager::new(
            self.session.clone(),
            self.config.subscription.clone(),
        ));

        if let Err(e) = monitor.initialize().await {
            error!(endpoint, error = %e, "Subscription setup failed after connect");
            let _ = self.events.send(ClientEvent::ConnectionError(e.to_string()));
            let mut session = self.session.lock().await;
            if let Err(e) = session.disconnect().await {
                debug!(error = %e, "Session cleanup failed");
            }
            drop(session);
            self.set_state(ConnectionState::Disconnected);
            return false;
        }

        self.spawn_forwarder(&monitor);
        *self.monitor.write().await = Some(monitor);
        self.spawn_pump(notifications);

        {
            let mut last = self
                .last_endpoint
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            *last = Some(endpoint.to_string());
        }

        self.set_state(ConnectionState::Connected);
        info!(endpoint, "Connected");
        true
    }

    /// Closes the session and disposes the subscription. Idempotent.
    pub async fn disconnect(&self) {
        self.teardown().await;
        self.set_state(ConnectionState::Disconnected);
        info!("Disconnected");
    }

    /// Re-establishes the session to the last connected endpoint and runs
    /// the recovery policy.
    ///
    /// Single-flight: while one reconnect is executing, concurrent calls
    /// return `false` immediately. Recovery order is reattach when the
    /// subscription is transferable, otherwise recreate, with a fresh empty
    /// subscription as the last resort.
    pub async fn reconnect(&self) -> bool {
        let endpoint = {
            let last = self
                .last_endpoint
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            last.clone()
        };
        let Some(endpoint) = endpoint else {
            warn!("Reconnect requested before any successful connect");
            return false;
        };

        if self
            .reconnect_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Reconnect already in progress; ignoring");
            return false;
        }
        let _permit = ReconnectPermit(&self.reconnect_in_progress);

        self.set_state(ConnectionState::Reconnecting);
        info!(endpoint = %endpoint, "Reconnecting");

        if let Some(monitor) = self.monitor.read().await.as_ref() {
            monitor.mark_all_stale().await;
        }

        // A fresh sink every attempt: after a disconnect the old pump is
        // gone, and after a session drop the old channel may be dangling.
        let (sink, notifications) = mpsc::channel(NOTIFICATION_CHANNEL_CAPACITY);

        let reconnect_result = {
            let mut session = self.session.lock().await;
            session.set_notification_sink(sink);
            session.reconnect().await
        };

        if let Err(e) = reconnect_result {
            error!(endpoint = %endpoint, error = %e, "Reconnect failed");
            let _ = self.events.send(ClientEvent::ConnectionError(e.to_string()));
            self.set_state(ConnectionState::Disconnected);
            return false;
        }

        self.spawn_pump(notifications);

        if !self.recover_subscription().await {
            let _ = self.events.send(ClientEvent::ConnectionError(
                "Subscription recovery failed".to_string(),
            ));
            self.abort_tasks();
            self.set_state(ConnectionState::Disconnected);
            return false;
        }

        self.set_state(ConnectionState::Connected);
        info!(endpoint = %endpoint, "Reconnected");
        true
    }

    /// Three-tier recovery: reattach, recreate, fresh start.
    async fn recover_subscription(&self) -> bool {
        let existing = self.monitor.read().await.clone();
        let had_monitored_set = existing.is_some();

        if let Some(monitor) = existing {
            if monitor.is_transferable().await {
                if monitor.reattach().await {
                    info!("Recovery: subscription reattached");
                    return true;
                }
                warn!("Recovery: reattach failed, falling back to recreate");
            } else {
                debug!("Recovery: subscription not transferable, recreating");
            }

            if monitor.recreate().await {
                info!("Recovery: subscription recreated");
                return true;
            }
            warn!("Recovery: recreate failed, starting with a fresh subscription");
        }

        // Last resort: previously monitored variables are gone.
        let fresh = Arc::new(SubscriptionManager::new(
            self.session.clone(),
            self.config.subscription.clone(),
        ));
        match fresh.initialize().await {
            Ok(()) => {
                self.spawn_forwarder(&fresh);
                *self.monitor.write().await = Some(fresh);
                if had_monitored_set {
                    warn!("Recovery: fresh subscription established; monitored set was lost");
                } else {
                    info!("Recovery: fresh subscription established");
                }
                true
            }
            Err(e) => {
                error!(error = %e, "Recovery: fresh subscription could not be established");
                false
            }
        }
    }

    /// Adds a monitored variable.
    ///
    /// Returns `None` with a logged warning when not connected or when the
    /// session refuses the node.
    pub async fn subscribe(
        &self,
        node_id: NodeId,
        display_name: impl Into<String>,
    ) -> Option<MonitoredVariable> {
        let display_name = display_name.into();

        if self.state() != ConnectionState::Connected {
            warn!(node_id = %node_id, "Subscribe ignored: not connected");
            return None;
        }

        let monitor = self.monitor.read().await.clone()?;
        match monitor.add_variable(node_id.clone(), display_name).await {
            Ok(variable) => Some(variable),
            Err(e) => {
                warn!(node_id = %node_id, error = %e, "Subscribe failed");
                None
            }
        }
    }

    /// Removes the variable with the given client handle. Returns `false`
    /// when not connected or the handle is unknown.
    pub async fn unsubscribe(&self, client_handle: u32) -> bool {
        let Some(monitor) = self.monitor.read().await.clone() else {
            warn!(client_handle, "Unsubscribe ignored: not connected");
            return false;
        };
        monitor.remove_variable(client_handle).await
    }

    /// Returns a snapshot of all monitored variables.
    pub async fn variables(&self) -> Vec<MonitoredVariable> {
        match self.monitor.read().await.as_ref() {
            Some(monitor) => monitor.variables().await,
            None => Vec::new(),
        }
    }

    /// Drains session notifications: data changes go to the subscription
    /// manager, connection loss raises `AutoReconnectRequired`.
    fn spawn_pump(&self, mut notifications: mpsc::Receiver<SessionNotification>) {
        let monitor = self.monitor.clone();
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            while let Some(notification) = notifications.recv().await {
                match notification {
                    SessionNotification::DataChange(change) => {
                        let current = monitor.read().await.clone();
                        if let Some(manager) = current {
                            manager.apply_notification(change).await;
                        }
                    }
                    SessionNotification::ConnectionLost { reason } => {
                        warn!(reason = %reason, "Session reported connection loss");
                        let _ = events.send(ClientEvent::AutoReconnectRequired);
                    }
                    SessionNotification::KeepAlive => {}
                }
            }
            debug!("Notification pump stopped");
        });

        let mut slot = self.pump_task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = slot.replace(handle) {
            old.abort();
        }
    }

    /// Re-wires subscription manager events into client events.
    fn spawn_forwarder(&self, monitor: &SubscriptionManager) {
        let mut monitor_events = monitor.subscribe_events();
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            loop {
                match monitor_events.recv().await {
                    Ok(MonitorEvent::VariableAdded(v)) => {
                        let _ = events.send(ClientEvent::VariableAdded(v));
                    }
                    Ok(MonitorEvent::VariableRemoved(handle)) => {
                        let _ = events.send(ClientEvent::VariableRemoved(handle));
                    }
                    Ok(MonitorEvent::ValueChanged(v)) => {
                        let _ = events.send(ClientEvent::ValueChanged(v));
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event forwarder lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Event forwarder stopped");
        });

        let mut slot = self
            .forwarder_task
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(old) = slot.replace(handle) {
            old.abort();
        }
    }

    fn abort_tasks(&self) {
        let mut pump = self.pump_task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = pump.take() {
            handle.abort();
        }
        let mut forwarder = self
            .forwarder_task
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = forwarder.take() {
            handle.abort();
        }
    }

    async fn teardown(&self) {
        let monitor = self.monitor.write().await.take();
        if let Some(monitor) = monitor {
            monitor.dispose().await;
        }

        self.abort_tasks();

        let mut session = self.session.lock().await;
        if session.is_connected() {
            if let Err(e) = session.disconnect().await {
                debug!(error = %e, "Session close failed during teardown");
            }
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Disconnected.to_string(), "Disconnected");
        assert_eq!(ConnectionState::Reconnecting.to_string(), "Reconnecting");
    }

    #[test]
    fn test_reconnect_permit_releases_on_drop() {
        let flag = AtomicBool::new(false);
        assert!(flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok());
        {
            let _permit = ReconnectPermit(&flag);
            assert!(flag.load(Ordering::Acquire));
        }
        assert!(!flag.load(Ordering::Acquire));
    }
}
