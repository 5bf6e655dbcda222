// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscription manager: the data path of the client core.
//!
//! One manager owns one server-side subscription and the set of monitored
//! variables on it. Each variable carries a stable client handle that never
//! changes while the variable is live, even when the protocol item id is
//! reassigned by a subscription rebuild.
//!
//! All map and counter state sits behind a single `tokio::sync::Mutex`, so
//! caller operations and notification application serialize through one
//! point. Lock order is always manager state first, session client second.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::error::{ClientResult, OperationError, SubscriptionError};
use crate::types::{AccessLevel, DataTypeId, NodeId, SubscriptionSettings};

use super::session::{ItemNotification, SessionClient};
use super::value::StatusClass;

// =============================================================================
// MonitoredVariable
// =============================================================================

/// One subscribed data point, as consumed by presentation layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredVariable {
    /// Client-assigned identity. Unique among live variables and stable
    /// across reconnection.
    pub client_handle: u32,

    /// Protocol item id assigned by the server. May change when the
    /// subscription is recreated.
    pub item_id: u32,

    /// The monitored node.
    pub node_id: NodeId,

    /// Display name, fixed at creation.
    pub display_name: String,

    /// Last formatted value.
    pub value: String,

    /// Source timestamp of the last notification.
    pub timestamp: Option<DateTime<Utc>>,

    /// Raw status code of the last notification.
    pub status_code: u32,

    /// When the displayed value last changed.
    pub last_change: Option<DateTime<Utc>>,

    /// Access level read from the address space at provisioning time.
    pub access_level: AccessLevel,

    /// Data type read from the address space at provisioning time.
    pub data_type: DataTypeId,

    /// Whether the presentation layer has this variable selected for the
    /// scope view. Owned by the caller; the manager only preserves it.
    pub selected_for_scope: bool,

    /// Set when connectivity was disrupted and the value may be outdated.
    pub stale: bool,
}

impl MonitoredVariable {
    /// Quality classification of the last received status code.
    pub fn status_class(&self) -> StatusClass {
        StatusClass::from_code(self.status_code)
    }
}

// =============================================================================
// MonitorEvent
// =============================================================================

/// Events emitted by the subscription manager.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A variable was added to the monitored set.
    VariableAdded(MonitoredVariable),

    /// The variable with this client handle was removed.
    VariableRemoved(u32),

    /// A variable received a new value.
    ValueChanged(MonitoredVariable),
}

// =============================================================================
// SubscriptionManager
// =============================================================================

/// Capacity of the event broadcast channel. Slow receivers observe a lag
/// error rather than blocking the data path.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
struct ManagerState {
    /// Server-side subscription id, set by `initialize`.
    subscription_id: Option<u32>,

    /// Live variables by client handle.
    variables: HashMap<u32, MonitoredVariable>,

    /// Protocol item id to client handle.
    item_index: HashMap<u32, u32>,

    /// Next client handle. Advances only on successful add.
    next_handle: u32,
}

/// Manages one server-side subscription and its monitored variables.
pub struct SubscriptionManager {
    session: Arc<Mutex<dyn SessionClient>>,
    settings: SubscriptionSettings,
    state: Mutex<ManagerState>,
    events: broadcast::Sender<MonitorEvent>,
}

impl SubscriptionManager {
    /// Creates a manager bound to a live session. The subscription itself is
    /// opened by [`initialize`](Self::initialize).
    pub fn new(session: Arc<Mutex<dyn SessionClient>>, settings: SubscriptionSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            session,
            settings: settings.clamped(),
            state: Mutex::new(ManagerState {
                next_handle: 1,
                ..Default::default()
            }),
            events,
        }
    }

    /// Returns a receiver for monitor events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    /// Opens the underlying server-side subscription.
    pub async fn initialize(&self) -> ClientResult<()> {
        let mut state = self.state.lock().await;
        if state.subscription_id.is_some() {
            return Ok(());
        }

        let subscription_id = {
            let mut session = self.session.lock().await;
            session.create_subscription(&self.settings).await?
        };

        state.subscription_id = Some(subscription_id);
        info!(
            subscription_id,
            publishing_interval_ms = self.settings.publishing_interval.as_millis() as u64,
            "Subscription created"
        );
        Ok(())
    }

    /// Adds a monitored variable for the given node.
    ///
    /// Reads the node's attributes, provisions the monitored item, and
    /// assigns the next client handle. The handle counter only advances when
    /// the add succeeds, so failed attempts do not burn handles.
    pub async fn add_variable(
        &self,
        node_id: NodeId,
        display_name: impl Into<String>,
    ) -> ClientResult<MonitoredVariable> {
        let display_name = display_name.into();
        let mut state = self.state.lock().await;

        let subscription_id = state
            .subscription_id
            .ok_or(SubscriptionError::NotInitialized)?;

        // Peek the handle; commit it only after the item exists server-side.
        let client_handle = state.next_handle;

        let (attributes, item_id) = {
            let mut session = self.session.lock().await;

            let attributes = session.read_attributes(&node_id).await.map_err(|e| {
                OperationError::attribute_read_failed(node_id.to_opc_string(), e.to_string())
            })?;

            let item_id = session
                .create_monitored_item(subscription_id, &node_id, client_handle, &self.settings)
                .await
                .map_err(|e| {
                    OperationError::monitor_create_failed(node_id.to_opc_string(), e.to_string())
                })?;

            (attributes, item_id)
        };

        state.next_handle += 1;

        let variable = MonitoredVariable {
            client_handle,
            item_id,
            node_id,
            display_name,
            value: "null".to_string(),
            timestamp: None,
            status_code: 0,
            last_change: None,
            access_level: attributes.access_level,
            data_type: attributes.data_type,
            selected_for_scope: false,
            stale: false,
        };

        state.variables.insert(client_handle, variable.clone());
        state.item_index.insert(item_id, client_handle);

        info!(
            client_handle,
            item_id,
            node_id = %variable.node_id,
            display_name = %variable.display_name,
            "Variable added"
        );

        let _ = self.events.send(MonitorEvent::VariableAdded(variable.clone()));
        Ok(variable)
    }

    /// Removes the variable with the given client handle.
    ///
    /// Returns `false` without an event if the handle is unknown. Removal of
    /// the server-side item is best-effort; the local entry is dropped
    /// either way.
    pub async fn remove_variable(&self, client_handle: u32) -> bool {
        let mut state = self.state.lock().await;

        let Some(variable) = state.variables.remove(&client_handle) else {
            debug!(client_handle, "Remove ignored: unknown handle");
            return false;
        };
        state.item_index.remove(&variable.item_id);
        let subscription_id = state.subscription_id;

        if let Some(subscription_id) = subscription_id {
            let mut session = self.session.lock().await;
            if let Err(e) = session
                .delete_monitored_item(subscription_id, variable.item_id)
                .await
            {
                warn!(
                    client_handle,
                    item_id = variable.item_id,
                    error = %e,
                    "Failed to delete monitored item; dropping local entry anyway"
                );
            }
        }

        info!(client_handle, item_id = variable.item_id, "Variable removed");
        let _ = self.events.send(MonitorEvent::VariableRemoved(client_handle));
        true
    }

    /// Marks every tracked variable stale. Mutates no other field.
    pub async fn mark_all_stale(&self) {
        let mut state = self.state.lock().await;
        for variable in state.variables.values_mut() {
            variable.stale = true;
        }
        debug!(count = state.variables.len(), "All variables marked stale");
    }

    /// Returns `true` if the current subscription is eligible for transfer
    /// onto a re-established session.
    pub async fn is_transferable(&self) -> bool {
        let state = self.state.lock().await;
        let Some(subscription_id) = state.subscription_id else {
            return false;
        };

        let session = self.session.lock().await;
        session.is_subscription_transferable(subscription_id).await
    }

    /// Attempts to transfer the existing subscription onto the current
    /// session.
    ///
    /// On success every client handle and item id survives unchanged, and no
    /// add/remove events fire. Variables stay stale until their next
    /// confirmed notification.
    pub async fn reattach(&self) -> bool {
        let state = self.state.lock().await;
        let Some(subscription_id) = state.subscription_id else {
            warn!("Reattach requested with no subscription");
            return false;
        };

        let transferred = {
            let mut session = self.session.lock().await;
            match session.transfer_subscription(subscription_id).await {
                Ok(ok) => ok,
                Err(e) => {
                    warn!(subscription_id, error = %e, "Subscription transfer failed");
                    false
                }
            }
        };

        if transferred {
            info!(
                subscription_id,
                variables = state.variables.len(),
                "Subscription transferred onto new session"
            );
        } else {
            info!(subscription_id, "Subscription transfer rejected by server");
        }
        transferred
    }

    /// Tears down and rebuilds the subscription, re-adding every tracked
    /// variable under its existing client handle.
    ///
    /// Per-variable re-adds are best-effort: a variable the server refuses
    /// is dropped with a removal event and a warning. Returns `false` only
    /// when the subscription itself cannot be re-established.
    pub async fn recreate(&self) -> bool {
        let mut state = self.state.lock().await;

        let new_subscription_id = {
            let mut session = self.session.lock().await;

            if let Some(old_id) = state.subscription_id.take() {
                // The old subscription died with the old session.
                if let Err(e) = session.delete_subscription(old_id).await {
                    debug!(subscription_id = old_id, error = %e, "Old subscription cleanup failed");
                }
            }

            match session.create_subscription(&self.settings).await {
                Ok(id) => id,
                Err(e) => {
                    warn!(error = %e, "Subscription recreate failed");
                    return false;
                }
            }
        };
        state.subscription_id = Some(new_subscription_id);
        state.item_index.clear();

        let mut handles: Vec<u32> = state.variables.keys().copied().collect();
        handles.sort_unstable();

        let mut dropped = Vec::new();
        for client_handle in handles {
            let node_id = state.variables[&client_handle].node_id.clone();

            let result = {
                let mut session = self.session.lock().await;
                session
                    .create_monitored_item(
                        new_subscription_id,
                        &node_id,
                        client_handle,
                        &self.settings,
                    )
                    .await
            };

            match result {
                Ok(new_item_id) => {
                    if let Some(variable) = state.variables.get_mut(&client_handle) {
                        variable.item_id = new_item_id;
                        // The server confirmed the item; no longer stale.
                        variable.stale = false;
                    }
                    state.item_index.insert(new_item_id, client_handle);
                    debug!(client_handle, item_id = new_item_id, "Variable re-added");
                }
                Err(e) => {
                    warn!(
                        client_handle,
                        node_id = %node_id,
                        error = %e,
                        "Variable could not be re-added; dropping it"
                    );
                    state.variables.remove(&client_handle);
                    dropped.push(client_handle);
                }
            }
        }

        info!(
            subscription_id = new_subscription_id,
            restored = state.variables.len(),
            dropped = dropped.len(),
            "Subscription recreated"
        );

        for client_handle in dropped {
            let _ = self.events.send(MonitorEvent::VariableRemoved(client_handle));
        }
        true
    }

    /// Applies a data change notification from the session client.
    ///
    /// Unknown item ids are ignored (the item may have been removed while
    /// the notification was in flight). A confirmed notification clears the
    /// stale flag.
    pub async fn apply_notification(&self, notification: ItemNotification) {
        let mut state = self.state.lock().await;

        let Some(&client_handle) = state.item_index.get(&notification.item_id) else {
            debug!(
                item_id = notification.item_id,
                "Notification for unknown item ignored"
            );
            return;
        };

        let Some(variable) = state.variables.get_mut(&client_handle) else {
            return;
        };

        let formatted = notification.value.display_string();
        if formatted != variable.value {
            variable.last_change = Some(Utc::now());
        }
        variable.value = formatted;
        variable.timestamp = Some(notification.timestamp);
        variable.status_code = notification.status_code;
        variable.stale = false;

        let snapshot = variable.clone();
        drop(state);

        let _ = self.events.send(MonitorEvent::ValueChanged(snapshot));
    }

    /// Returns a snapshot of all tracked variables, ordered by client
    /// handle.
    pub async fn variables(&self) -> Vec<MonitoredVariable> {
        let state = self.state.lock().await;
        let mut list: Vec<MonitoredVariable> = state.variables.values().cloned().collect();
        list.sort_unstable_by_key(|v| v.client_handle);
        list
    }

    /// Returns a snapshot of one variable.
    pub async fn variable(&self, client_handle: u32) -> Option<MonitoredVariable> {
        let state = self.state.lock().await;
        state.variables.get(&client_handle).cloned()
    }

    /// Sets the scope-selection flag on a variable. Returns `false` if the
    /// handle is unknown.
    pub async fn set_selected_for_scope(&self, client_handle: u32, selected: bool) -> bool {
        let mut state = self.state.lock().await;
        match state.variables.get_mut(&client_handle) {
            Some(variable) => {
                variable.selected_for_scope = selected;
                true
            }
            None => false,
        }
    }

    /// Removes every variable and deletes the server-side subscription.
    /// Safe to call repeatedly.
    pub async fn dispose(&self) {
        let handles: Vec<u32> = {
            let state = self.state.lock().await;
            state.variables.keys().copied().collect()
        };

        for client_handle in handles {
            self.remove_variable(client_handle).await;
        }

        let mut state = self.state.lock().await;
        if let Some(subscription_id) = state.subscription_id.take() {
            let mut session = self.session.lock().await;
            if let Err(e) = session.delete_subscription(subscription_id).await {
                debug!(subscription_id, error = %e, "Subscription cleanup failed");
            }
            info!(subscription_id, "Subscription disposed");
        }
        state.item_index.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================
