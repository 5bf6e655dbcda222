// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client components: the session seam, the subscription data path, the
//! connection orchestrator, and the simulated session client.

pub mod connection;
pub mod session;
pub mod sim;
pub mod subscription;
pub mod value;

pub use connection::{ClientEvent, ConnectionManager, ConnectionState};
pub use session::{ItemNotification, SessionClient, SessionNotification};
pub use sim::SimulatedSessionClient;
pub use subscription::{MonitorEvent, MonitoredVariable, SubscriptionManager};
pub use value::{StatusClass, Value};
