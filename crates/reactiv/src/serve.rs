// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `reactiv serve` command implementation.
//!
//! Builds the channel adapters and the state store from configuration,
//! restores the fallback system, starts the health and drain loops and,
//! when enabled, the operational gateway. Runs until SIGINT/SIGTERM and
//! writes a final snapshot on the way out.

use std::sync::Arc;

use reactiv_config::ReactivConfig;
use reactiv_core::ReactivError;
use reactiv_fallback::{FallbackSettings, FallbackSystem};
use reactiv_gateway::{AuthConfig, GatewayState, ServerConfig};
use tracing::{error, info};

use crate::shutdown;

/// Assembles a [`FallbackSystem`] from configuration.
pub async fn build_system(config: &ReactivConfig) -> Result<Arc<FallbackSystem>, ReactivError> {
    let channels = reactiv_channels::build_channel_set(&config.channels)?;
    let store = reactiv_storage::open_store(&config.storage).await?;
    let system = FallbackSystem::open(FallbackSettings::from_config(config), channels, store).await?;
    Ok(Arc::new(system))
}

/// Runs the `reactiv serve` command.
pub async fn run_serve(config: ReactivConfig) -> Result<(), ReactivError> {
    init_tracing(&config.service.log_level);
    info!(name = %config.service.name, "starting reactiv");

    let system = build_system(&config).await?;

    if config.health.enabled {
        // Establish the real level before the first interval elapses.
        system.run_health_check().await;
    }

    let cancel = shutdown::install_signal_handler();
    let tasks = system.start(cancel.clone());

    let gateway = if config.gateway.enabled {
        let server_config = ServerConfig::from_config(&config.gateway);
        let state = GatewayState {
            system: Arc::clone(&system),
            auth: AuthConfig {
                bearer_token: config.gateway.bearer_token.clone(),
            },
        };
        let gateway_cancel = cancel.clone();
        Some(tokio::spawn(async move {
            if let Err(e) =
                reactiv_gateway::start_server(&server_config, state, gateway_cancel.clone()).await
            {
                error!(error = %e, "gateway stopped with an error");
                gateway_cancel.cancel();
            }
        }))
    } else {
        None
    };

    let status = system.status().await;
    info!(
        level = %status.health.level,
        mode = %status.health.mode,
        channels = ?status.registered_channels,
        pending = status.queue.pending,
        "reactiv running"
    );

    cancel.cancelled().await;
    info!("shutting down");

    tasks.join().await;
    if let Some(handle) = gateway {
        let _ = handle.await;
    }
    system.shutdown().await;

    info!("reactiv stopped");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("reactiv={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
