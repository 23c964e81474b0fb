//! # Finality Gadget Daemon Library
//!
//! Configuration, logging and command wiring behind the `fgd` binary.
//!
//! ## Startup Sequence
//!
//! 1. Parse the command line
//! 2. Load configuration (file, then `FG_LOG_LEVEL`) and validate it
//! 3. Install the tracing subscriber
//! 4. Load the collaborator snapshot and build the service
//! 5. Run the requested query under the configured deadline

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;

use std::sync::Arc;

use anyhow::{Context, Result};
use fg_finality::{FinalityGadgetService, QueryContext, SnapshotCollaborators};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::Command;
use crate::config::{ConfigError, DaemonConfig};

/// Service wired to snapshot collaborators
pub type SnapshotService =
    FinalityGadgetService<SnapshotCollaborators, SnapshotCollaborators, SnapshotCollaborators>;

/// Build the service described by `config`
pub fn build_service(config: &DaemonConfig) -> Result<SnapshotService> {
    let path = config
        .collaborators
        .snapshot
        .as_ref()
        .ok_or(ConfigError::MissingSnapshot)?;
    let collaborators = Arc::new(
        SnapshotCollaborators::load(path)
            .with_context(|| format!("loading snapshot {}", path.display()))?,
    );

    let service = FinalityGadgetService::new(
        config.engine.finality_config(),
        Arc::clone(&collaborators),
        Arc::clone(&collaborators),
        collaborators,
    );

    info!(
        contract = %config.babylon.contract_addr,
        chain_id = %config.babylon.chain_id,
        babylon_rpc = config.babylon.rpc_addr(),
        bitcoin_rpc = %config.bitcoin.rpc_host,
        max_in_flight = service.config().max_in_flight_queries,
        strategy = ?service.config().power_strategy,
        "finality gadget service ready"
    );
    Ok(service)
}

/// Query context driven by `shutdown`, carrying the configured deadline
pub fn query_context(config: &DaemonConfig, shutdown: CancellationToken) -> QueryContext {
    let ctx = QueryContext::with_token(shutdown);
    match config.engine.query_timeout() {
        Some(timeout) => ctx.with_timeout(timeout),
        None => ctx,
    }
}

/// Build the service and run one command, cancelling it on Ctrl+C
pub async fn run(config: &DaemonConfig, command: Command) -> Result<String> {
    let service = build_service(config)?;
    let shutdown = CancellationToken::new();
    let ctx = query_context(config, shutdown.clone());

    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling query");
            shutdown.cancel();
        }
    });

    let result = commands::execute(&service, &ctx, command).await;
    watcher.abort();
    result
}
