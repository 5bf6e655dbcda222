// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core types for the UA Scope client: node addressing, attribute metadata,
//! and configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ClientError, ConfigurationError};

// =============================================================================
// NodeId
// =============================================================================

/// An OPC UA node identifier.
///
/// # Examples
///
/// ```
/// use uascope_client::types::NodeId;
///
/// let numeric = NodeId::numeric(2, 1001);
/// let string = NodeId::string(2, "Line1.Temperature");
///
/// let parsed: NodeId = "ns=2;s=Line1.Temperature".parse().unwrap();
/// assert_eq!(parsed, string);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = OPC UA standard namespace).
    pub namespace_index: u16,

    /// The node identifier.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    /// Creates a numeric node id.
    #[inline]
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node id.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node id.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Returns the null node id (ns=0, i=0).
    #[inline]
    pub const fn null() -> Self {
        Self {
            namespace_index: 0,
            identifier: NodeIdentifier::Numeric(0),
        }
    }

    /// Returns `true` if this is a null node id.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.namespace_index == 0 && matches!(self.identifier, NodeIdentifier::Numeric(0))
    }

    /// Returns `true` if this is a numeric identifier.
    #[inline]
    pub const fn is_numeric(&self) -> bool {
        matches!(self.identifier, NodeIdentifier::Numeric(_))
    }

    /// Returns `true` if this is a string identifier.
    #[inline]
    pub const fn is_string(&self) -> bool {
        matches!(self.identifier, NodeIdentifier::String(_))
    }

    /// Converts to the OPC UA string format.
    ///
    /// Format: `ns=<namespace>;{i|s|g}=<identifier>`; the namespace prefix is
    /// omitted for namespace 0.
    pub fn to_opc_string(&self) -> String {
        let id_str = match &self.identifier {
            NodeIdentifier::Numeric(v) => format!("i={}", v),
            NodeIdentifier::String(v) => format!("s={}", v),
            NodeIdentifier::Guid(v) => format!("g={}", v),
        };

        if self.namespace_index == 0 {
            id_str
        } else {
            format!("ns={};{}", self.namespace_index, id_str)
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_opc_string())
    }
}

impl FromStr for NodeId {
    type Err = ClientError;

    /// Parses a node id from OPC UA string format.
    ///
    /// Supported formats:
    /// - `ns=2;i=1001` (numeric)
    /// - `ns=2;s=MyNode` (string)
    /// - `ns=2;g=550e8400-e29b-41d4-a716-446655440000` (GUID)
    /// - `i=1001` / `s=MyNode` (namespace 0)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (namespace_index, identifier_part) = if s.starts_with("ns=") {
            let parts: Vec<&str> = s.splitn(2, ';').collect();
            if parts.len() != 2 {
                return Err(ClientError::configuration(
                    ConfigurationError::invalid_node_id(s, "Missing identifier after namespace"),
                ));
            }

            let ns_str = parts[0].strip_prefix("ns=").unwrap();
            let ns: u16 = ns_str.parse().map_err(|_| {
                ClientError::configuration(ConfigurationError::invalid_node_id(
                    s,
                    "Invalid namespace index",
                ))
            })?;

            (ns, parts[1])
        } else {
            (0, s)
        };

        let identifier = if let Some(id) = identifier_part.strip_prefix("i=") {
            let value: u32 = id.parse().map_err(|_| {
                ClientError::configuration(ConfigurationError::invalid_node_id(
                    s,
                    "Invalid numeric identifier",
                ))
            })?;
            NodeIdentifier::Numeric(value)
        } else if let Some(id) = identifier_part.strip_prefix("s=") {
            NodeIdentifier::String(id.to_string())
        } else if let Some(id) = identifier_part.strip_prefix("g=") {
            let uuid = Uuid::parse_str(id).map_err(|e| {
                ClientError::configuration(ConfigurationError::invalid_node_id(
                    s,
                    format!("Invalid GUID: {}", e),
                ))
            })?;
            NodeIdentifier::Guid(uuid)
        } else {
            return Err(ClientError::configuration(
                ConfigurationError::invalid_node_id(
                    s,
                    "Unknown identifier type. Expected i=, s=, or g=",
                ),
            ));
        };

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

// =============================================================================
// NodeIdentifier
// =============================================================================

/// The identifier part of a node id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),

    /// String identifier.
    String(String),

    /// GUID identifier.
    Guid(Uuid),
}

// =============================================================================
// DataTypeId
// =============================================================================

/// Data type of a monitored node, read from the address space at
/// provisioning time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataTypeId {
    /// Boolean.
    Boolean,
    /// Signed 8-bit integer.
    SByte,
    /// Unsigned 8-bit integer.
    Byte,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    UInt64,
    /// 32-bit float.
    Float,
    /// 64-bit double.
    Double,
    /// UTF-8 string.
    String,
    /// Date/time.
    DateTime,
    /// GUID.
    Guid,
    /// Byte string.
    ByteString,
    /// Unknown or composite type.
    #[default]
    Variant,
}

impl fmt::Display for DataTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "Boolean",
            Self::SByte => "SByte",
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::String => "String",
            Self::DateTime => "DateTime",
            Self::Guid => "Guid",
            Self::ByteString => "ByteString",
            Self::Variant => "Variant",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// AccessLevel
// =============================================================================

/// Access level bitmask of a node, as defined by the OPC UA attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct AccessLevel(pub u8);

impl AccessLevel {
    /// Current value is readable.
    pub const CURRENT_READ: u8 = 0x01;

    /// Current value is writable.
    pub const CURRENT_WRITE: u8 = 0x02;

    /// History is readable.
    pub const HISTORY_READ: u8 = 0x04;

    /// Creates an access level from raw bits.
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Returns the raw bitmask.
    #[inline]
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Returns `true` if the current value can be read.
    #[inline]
    pub const fn readable(&self) -> bool {
        self.0 & Self::CURRENT_READ != 0
    }

    /// Returns `true` if the current value can be written.
    #[inline]
    pub const fn writable(&self) -> bool {
        self.0 & Self::CURRENT_WRITE != 0
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.readable() {
            parts.push("Read");
        }
        if self.writable() {
            parts.push("Write");
        }
        if self.0 & Self::HISTORY_READ != 0 {
            parts.push("HistoryRead");
        }
        if parts.is_empty() {
            write!(f, "None")
        } else {
            write!(f, "{}", parts.join("|"))
        }
    }
}

// =============================================================================
// NodeAttributes
// =============================================================================

/// Attribute metadata read from the address space when a variable is
/// provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAttributes {
    /// Access level bitmask.
    pub access_level: AccessLevel,

    /// Data type of the node's value.
    pub data_type: DataTypeId,

    /// Value rank (-1 = scalar, >= 1 = array dimensions).
    pub value_rank: i32,
}

impl NodeAttributes {
    /// Attributes for a readable scalar of the given type.
    pub fn readable_scalar(data_type: DataTypeId) -> Self {
        Self {
            access_level: AccessLevel::from_bits(AccessLevel::CURRENT_READ),
            data_type,
            value_rank: -1,
        }
    }
}

// =============================================================================
// SubscriptionSettings
// =============================================================================

/// Minimum accepted publishing interval.
pub const MIN_PUBLISHING_INTERVAL: Duration = Duration::from_millis(100);

/// Maximum accepted publishing interval.
pub const MAX_PUBLISHING_INTERVAL: Duration = Duration::from_secs(10);

/// Subscription configuration supplied at subscription manager construction.
///
/// Reused unchanged across a recreate, so the rebuilt subscription behaves
/// like the original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSettings {
    /// Publishing interval, clamped to
    /// [[`MIN_PUBLISHING_INTERVAL`], [`MAX_PUBLISHING_INTERVAL`]] when applied.
    #[serde(default = "default_publishing_interval")]
    #[serde(with = "humantime_serde")]
    pub publishing_interval: Duration,

    /// Sampling interval for monitored items.
    #[serde(default = "default_sampling_interval")]
    #[serde(with = "humantime_serde")]
    pub sampling_interval: Duration,

    /// Server-side queue size for buffered values per monitored item.
    #[serde(default = "default_queue_size")]
    pub queue_size: u32,
}

fn default_publishing_interval() -> Duration {
    Duration::from_millis(1000)
}

fn default_sampling_interval() -> Duration {
    Duration::from_millis(250)
}

fn default_queue_size() -> u32 {
    10
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self {
            publishing_interval: default_publishing_interval(),
            sampling_interval: default_sampling_interval(),
            queue_size: default_queue_size(),
        }
    }
}

impl SubscriptionSettings {
    /// Creates settings with a custom publishing interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            publishing_interval: interval,
            ..Default::default()
        }
    }

    /// Settings for fast sampling (100ms publishing interval).
    pub fn fast() -> Self {
        Self {
            publishing_interval: Duration::from_millis(100),
            sampling_interval: Duration::from_millis(50),
            ..Default::default()
        }
    }

    /// Settings for slow sampling (5s publishing interval).
    pub fn slow() -> Self {
        Self {
            publishing_interval: Duration::from_secs(5),
            sampling_interval: Duration::from_secs(1),
            ..Default::default()
        }
    }

    /// Returns a copy with the publishing interval clamped to the valid
    /// range.
    pub fn clamped(&self) -> Self {
        Self {
            publishing_interval: self
                .publishing_interval
                .clamp(MIN_PUBLISHING_INTERVAL, MAX_PUBLISHING_INTERVAL),
            sampling_interval: self.sampling_interval,
            queue_size: self.queue_size.max(1),
        }
    }
}

// =============================================================================
// ClientConfig
// =============================================================================

/// Configuration for the connection manager.
///
/// # Examples
///
/// ```
/// use uascope_client::types::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .endpoint("opc.tcp://localhost:4840")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Default server endpoint URL (e.g. "opc.tcp://localhost:4840").
    pub endpoint: String,

    /// Application name reported to the server.
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Session timeout.
    #[serde(default = "default_session_timeout")]
    #[serde(with = "humantime_serde")]
    pub session_timeout: Duration,

    /// Per-request timeout.
    #[serde(default = "default_request_timeout")]
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Default subscription settings.
    #[serde(default)]
    pub subscription: SubscriptionSettings,
}

fn default_application_name() -> String {
    "UA Scope".to_string()
}

fn default_session_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

impl ClientConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Creates a configuration with just the endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            application_name: default_application_name(),
            session_timeout: default_session_timeout(),
            request_timeout: default_request_timeout(),
            subscription: SubscriptionSettings::default(),
        }
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.endpoint.is_empty() {
            return Err(ClientError::configuration(
                ConfigurationError::missing_field("endpoint"),
            ));
        }

        if !self.endpoint.starts_with("opc.tcp://") {
            return Err(ClientError::configuration(
                ConfigurationError::invalid_endpoint(
                    &self.endpoint,
                    "Endpoint must start with opc.tcp://",
                ),
            ));
        }

        if self.session_timeout.is_zero() {
            return Err(ClientError::configuration(
                ConfigurationError::invalid_interval(
                    self.session_timeout,
                    "Session timeout must be greater than 0",
                ),
            ));
        }

        if self.subscription.sampling_interval.is_zero() {
            return Err(ClientError::configuration(
                ConfigurationError::invalid_interval(
                    self.subscription.sampling_interval,
                    "Sampling interval must be greater than 0",
                ),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// ClientConfigBuilder
// =============================================================================

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    endpoint: Option<String>,
    application_name: Option<String>,
    session_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    subscription: Option<SubscriptionSettings>,
}

impl ClientConfigBuilder {
    /// Sets the server endpoint URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Sets the session timeout.
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = Some(timeout);
        self
    }

    /// Sets the per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the default subscription settings.
    pub fn subscription(mut self, settings: SubscriptionSettings) -> Self {
        self.subscription = Some(settings);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<ClientConfig, ClientError> {
        let endpoint = self.endpoint.ok_or_else(|| {
            ClientError::configuration(ConfigurationError::missing_field("endpoint"))
        })?;

        let config = ClientConfig {
            endpoint,
            application_name: self.application_name.unwrap_or_else(default_application_name),
            session_timeout: self.session_timeout.unwrap_or_else(default_session_timeout),
            request_timeout: self.request_timeout.unwrap_or_else(default_request_timeout),
            subscription: self.subscription.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Tests
// =============================================================================
