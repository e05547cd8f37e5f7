// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background loops: health probing (with automatic recovery) and queue
//! draining.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::system::FallbackSystem;

/// Handles for the spawned loops.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every loop to exit after its token is cancelled.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }
    }
}

impl FallbackSystem {
    /// Spawns the periodic tasks. They stop when `cancel` fires.
    pub fn start(self: &Arc<Self>, cancel: CancellationToken) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::default();

        if self.settings.health_enabled || self.settings.recovery_enabled {
            let system = Arc::clone(self);
            let cancel = cancel.clone();
            tasks
                .handles
                .push(tokio::spawn(async move { health_loop(system, cancel).await }));
        }

        let system = Arc::clone(self);
        tasks
            .handles
            .push(tokio::spawn(async move { drain_loop(system, cancel).await }));

        info!(
            health_interval_secs = self.settings.health_interval.as_secs(),
            drain_interval_secs = self.settings.drain_interval.as_secs(),
            "background tasks started"
        );
        tasks
    }
}

fn interval(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn health_loop(system: Arc<FallbackSystem>, cancel: CancellationToken) {
    let mut ticker = interval(system.settings.health_interval);
    // Skip the first immediate tick.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if system.settings.health_enabled {
                    system.run_health_check().await;
                }
                if let Some(result) = system.maybe_recover().await {
                    debug!(restored = result.restored(), "automatic recovery finished");
                }
            }
            _ = cancel.cancelled() => {
                debug!("health loop shutting down");
                break;
            }
        }
    }
}

async fn drain_loop(system: Arc<FallbackSystem>, cancel: CancellationToken) {
    let mut ticker = interval(system.settings.drain_interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                system.drain_queue().await;
            }
            _ = cancel.cancelled() => {
                debug!("drain loop shutting down");
                break;
            }
        }
    }
}
