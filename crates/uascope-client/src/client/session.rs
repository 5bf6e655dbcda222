// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The session client seam.
//!
//! [`SessionClient`] is the interface to the underlying protocol library: it
//! owns the wire session and the server-side subscription machinery, and
//! delivers notifications through an installed mpsc sink. The managers in
//! this crate never touch the wire directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::error::ClientResult;
use crate::types::{NodeAttributes, NodeId, SubscriptionSettings};

use super::value::Value;

// =============================================================================
// SessionNotification
// =============================================================================

/// A notification pushed by the session client from its own I/O context.
#[derive(Debug, Clone)]
pub enum SessionNotification {
    /// A monitored item produced a new value.
    DataChange(ItemNotification),

    /// The session was lost unexpectedly.
    ConnectionLost {
        /// Why the session dropped.
        reason: String,
    },

    /// Periodic liveness signal from the server.
    KeepAlive,
}

/// Payload of a data change notification for one monitored item.
#[derive(Debug, Clone)]
pub struct ItemNotification {
    /// Protocol item id the change belongs to.
    pub item_id: u32,

    /// The new value.
    pub value: Value,

    /// Raw status code attached to the value.
    pub status_code: u32,

    /// Source timestamp of the change.
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// SessionClient
// =============================================================================

/// Interface to the protocol session library.
///
/// Implementations own the session state; the connection manager drives the
/// lifecycle and the subscription manager drives item provisioning. All
/// notifications flow through the sink installed with
/// [`set_notification_sink`](SessionClient::set_notification_sink).
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Opens a session to the given endpoint.
    async fn connect(&mut self, endpoint: &str) -> ClientResult<()>;

    /// Closes the current session. Must be safe to call when not connected.
    async fn disconnect(&mut self) -> ClientResult<()>;

    /// Re-establishes the session to the last connected endpoint.
    async fn reconnect(&mut self) -> ClientResult<()>;

    /// Returns `true` if a session is currently open.
    fn is_connected(&self) -> bool;

    /// Creates a server-side subscription and returns its id.
    async fn create_subscription(&mut self, settings: &SubscriptionSettings) -> ClientResult<u32>;

    /// Deletes a server-side subscription.
    async fn delete_subscription(&mut self, subscription_id: u32) -> ClientResult<()>;

    /// Creates a monitored item on a subscription and returns the protocol
    /// item id assigned by the server.
    async fn create_monitored_item(
        &mut self,
        subscription_id: u32,
        node_id: &NodeId,
        client_handle: u32,
        settings: &SubscriptionSettings,
    ) -> ClientResult<u32>;

    /// Deletes a monitored item from a subscription.
    async fn delete_monitored_item(
        &mut self,
        subscription_id: u32,
        item_id: u32,
    ) -> ClientResult<()>;

    /// Returns `true` if the given subscription can be transferred onto the
    /// current (re-established) session.
    async fn is_subscription_transferable(&self, subscription_id: u32) -> bool;

    /// Transfers an existing subscription onto the current session.
    /// Returns `true` on success.
    async fn transfer_subscription(&mut self, subscription_id: u32) -> ClientResult<bool>;

    /// Reads the attributes of a node from the address space.
    async fn read_attributes(&self, node_id: &NodeId) -> ClientResult<NodeAttributes>;

    /// Installs the sink notifications are delivered to. Replaces any
    /// previously installed sink.
    fn set_notification_sink(&mut self, sink: mpsc::Sender<SessionNotification>);
}
