// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uascope-bin
//!
//! CLI binary for the UA Scope client core.
//!
//! This crate provides the main binary entry point, including:
//!
//! - CLI argument parsing with clap
//! - Logging initialization
//! - Command implementations (monitor, version)
//!
//! ## Usage
//!
//! ```bash
//! # Monitor the default node on the simulated server
//! uascope
//!
//! # Monitor specific nodes
//! uascope monitor "ns=2;i=1001" "ns=2;s=Line1.Temp"
//!
//! # Monitor for 30 seconds with JSON logs
//! uascope --log-format json monitor -d 30
//!
//! # Show version
//! uascope version
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
