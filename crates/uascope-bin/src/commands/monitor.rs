// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `monitor` command.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use uascope_client::client::{ClientEvent, ConnectionManager, SimulatedSessionClient};
use uascope_client::types::{ClientConfig, NodeId, SubscriptionSettings};

use crate::cli::{Cli, MonitorArgs};
use crate::error::{BinError, BinResult};

/// Executes the `monitor` command: connect, subscribe, print updates.
pub async fn monitor(_cli: &Cli, args: MonitorArgs) -> BinResult<()> {
    let nodes: Vec<NodeId> = args
        .nodes
        .iter()
        .map(|s| s.parse::<NodeId>())
        .collect::<Result<_, _>>()?;

    let settings = SubscriptionSettings::with_interval(Duration::from_millis(
        args.publishing_interval_ms,
    ));
    let config = ClientConfig::builder()
        .endpoint(&args.endpoint)
        .application_name("UA Scope Monitor")
        .subscription(settings)
        .build()?;

    let session = Arc::new(Mutex::new(SimulatedSessionClient::new()));
    let manager = ConnectionManager::new(session, config);
    let mut events = manager.events();

    if !manager.connect(&args.endpoint).await {
        return Err(BinError::runtime(format!(
            "Could not connect to {}",
            args.endpoint
        )));
    }

    for node_id in nodes {
        let display_name = node_id.to_opc_string();
        if manager.subscribe(node_id.clone(), display_name).await.is_none() {
            warn!(node_id = %node_id, "Could not subscribe");
        }
    }

    info!(
        endpoint = %args.endpoint,
        variables = manager.variables().await.len(),
        "Monitoring; press Ctrl-C to stop"
    );

    let deadline = if args.duration > 0 {
        Some(tokio::time::sleep(Duration::from_secs(args.duration)))
    } else {
        None
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            _ = async {
                match deadline.as_mut().as_pin_mut() {
                    Some(sleep) => sleep.await,
                    None => std::future::pending().await,
                }
            } => {
                info!(seconds = args.duration, "Duration elapsed");
                break;
            }
            event = events.recv() => {
                match event {
                    Ok(event) => print_event(event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event stream lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    manager.disconnect().await;
    Ok(())
}

fn print_event(event: ClientEvent) {
    match event {
        ClientEvent::ValueChanged(v) => {
            let stale = if v.stale { " (stale)" } else { "" };
            println!(
                "[{}] {} = {} [{}]{}",
                v.client_handle,
                v.display_name,
                v.value,
                v.status_class(),
                stale
            );
        }
        ClientEvent::VariableAdded(v) => {
            println!("+ [{}] {} ({})", v.client_handle, v.display_name, v.node_id);
        }
        ClientEvent::VariableRemoved(handle) => {
            println!("- [{}]", handle);
        }
        ClientEvent::StateChanged(state) => {
            println!("* connection: {}", state);
        }
        ClientEvent::ConnectionError(message) => {
            println!("! {}", message);
        }
        ClientEvent::AutoReconnectRequired => {
            println!("! session lost; reconnect required");
        }
    }
}
