// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built node ids, settings, and configurations for consistent testing.

use std::time::Duration;

use uascope_client::types::{ClientConfig, NodeId, SubscriptionSettings};

/// Endpoint used by integration tests.
pub const TEST_ENDPOINT: &str = "opc.tcp://test-server:4840";

/// Node id fixtures for common test variables.
pub struct NodeFixtures;

impl NodeFixtures {
    /// A temperature sensor node.
    pub fn temperature() -> NodeId {
        NodeId::string(2, "Line1.Temperature")
    }

    /// A pressure sensor node.
    pub fn pressure() -> NodeId {
        NodeId::string(2, "Line1.Pressure")
    }

    /// A motor state node (numeric identifier).
    pub fn motor_state() -> NodeId {
        NodeId::numeric(2, 4711)
    }

    /// A batch of distinct numeric nodes.
    pub fn batch(count: u32) -> Vec<NodeId> {
        (0..count).map(|i| NodeId::numeric(2, 1000 + i)).collect()
    }
}

/// Subscription settings tuned for fast tests.
pub fn fast_settings() -> SubscriptionSettings {
    SubscriptionSettings {
        publishing_interval: Duration::from_millis(100),
        sampling_interval: Duration::from_millis(50),
        queue_size: 5,
    }
}

/// A valid client configuration pointing at the test endpoint.
pub fn test_config() -> ClientConfig {
    ClientConfig::builder()
        .endpoint(TEST_ENDPOINT)
        .application_name("UA Scope Tests")
        .subscription(fast_settings())
        .build()
        .expect("test config must be valid")
}
