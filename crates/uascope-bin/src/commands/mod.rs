// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `monitor`: Subscribe to nodes and print value updates
//! - `version`: Show version information

mod monitor;
mod version;

pub use monitor::monitor;
pub use version::version;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Monitor(args) => monitor::monitor(&cli, args).await,
        Commands::Version => version::version(&cli),
    }
}
