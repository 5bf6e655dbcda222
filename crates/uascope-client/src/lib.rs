// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session and subscription lifecycle core for the UA Scope terminal OPC UA
//! client.
//!
//! The crate is organized around three layers:
//!
//! - [`SessionClient`](client::SessionClient): the seam to the protocol
//!   library that owns the wire session, with
//!   [`SimulatedSessionClient`](client::SimulatedSessionClient) as the
//!   in-process implementation.
//! - [`SubscriptionManager`](client::SubscriptionManager): maps stable
//!   client handles to monitored variables, formats incoming values, and
//!   implements reattach/recreate recovery.
//! - [`ConnectionManager`](client::ConnectionManager): connect, disconnect,
//!   and single-flight reconnect with the three-tier recovery policy
//!   (reattach, recreate, fresh start).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//! use uascope_client::client::{ConnectionManager, SimulatedSessionClient};
//! use uascope_client::types::{ClientConfig, NodeId};
//!
//! # async fn run() {
//! let session = Arc::new(Mutex::new(SimulatedSessionClient::new()));
//! let config = ClientConfig::new("opc.tcp://localhost:4840");
//! let manager = ConnectionManager::new(session, config);
//!
//! if manager.connect("opc.tcp://localhost:4840").await {
//!     let variable = manager
//!         .subscribe(NodeId::numeric(2, 1001), "Temperature")
//!         .await;
//!     println!("subscribed: {:?}", variable);
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod types;

pub use client::{
    ClientEvent, ConnectionManager, ConnectionState, ItemNotification, MonitorEvent,
    MonitoredVariable, SessionClient, SessionNotification, SimulatedSessionClient, StatusClass,
    SubscriptionManager, Value,
};
pub use error::{ClientError, ClientResult};
pub use types::{ClientConfig, NodeAttributes, NodeId, SubscriptionSettings};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
