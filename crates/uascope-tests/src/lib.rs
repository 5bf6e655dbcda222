// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # UA Scope Integration Tests
//!
//! This crate provides integration tests for the UA Scope client core,
//! plus the shared test utilities they build on.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `mocks`: Configurable mock session client with failure injection
//!   - `fixtures`: Pre-built node ids and settings
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p uascope-tests
//!
//! # Run specific test suite
//! cargo test -p uascope-tests --test integration_subscription
//! cargo test -p uascope-tests --test integration_connection
//! ```
//!
//! ## Test Categories
//!
//! ### Subscription Tests (`integration_subscription.rs`)
//! - Handle uniqueness and idempotent removal
//! - Stale marking
//! - Value formatting and status classification
//! - Reattach and recreate recovery
//!
//! ### Connection Tests (`integration_connection.rs`)
//! - Connect/disconnect lifecycle and error conversion
//! - Reconnect mutual exclusion
//! - Three-tier recovery ordering
//! - End-to-end notification flow and event forwarding

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::fixtures::*;
    pub use crate::common::mocks::*;
}
