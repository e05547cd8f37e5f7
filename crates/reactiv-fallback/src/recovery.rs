// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recovery controller.
//!
//! Runs when consecutive failures reach the configured threshold (timer
//! path) or on demand (manual path). Actions run in a fixed order and stop at
//! the first one that restores service. Every run starts by closing all
//! channel circuit breakers so the actions can reach every channel.

use reactiv_core::types::AlertSeverity;
use reactiv_core::{ChannelKind, HealthLevel};
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{info, warn};

use crate::mode::derive_mode;
use crate::system::FallbackSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecoveryAction {
    /// Probe the primary and switch back to it if it answers.
    ReactivatePrimary,
    /// Drain the queue; restored if anything was delivered.
    DrainQueue,
    /// Re-probe every channel; restored if the level is healthy or degraded.
    FullProbe,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryResult {
    pub restored_by: Option<RecoveryAction>,
    pub attempted: Vec<RecoveryAction>,
    /// Health level once recovery finished.
    pub level: HealthLevel,
    /// Lifetime recovery counter after this run.
    pub recovery_attempts: u32,
}

impl RecoveryResult {
    pub fn restored(&self) -> bool {
        self.restored_by.is_some()
    }
}

impl FallbackSystem {
    /// Whether the failure counter has reached the recovery threshold.
    pub async fn needs_recovery(&self) -> bool {
        self.health.lock().await.consecutive_failures >= self.settings.failure_threshold
    }

    /// Timer path: recovers only when enabled and past the threshold.
    pub async fn maybe_recover(&self) -> Option<RecoveryResult> {
        if !self.settings.recovery_enabled || !self.needs_recovery().await {
            return None;
        }
        Some(self.recover().await)
    }

    /// Manual path: always runs every action until one succeeds.
    ///
    /// The recovery counter goes up whether or not anything was restored.
    pub async fn recover(&self) -> RecoveryResult {
        let _running = self.recovery_lock.lock().await;
        let reopened = self.breakers.lock().await.reset_all();
        info!(breakers_reset = ?reopened, "recovery started");

        let mut attempted = Vec::new();
        let mut restored_by = None;

        attempted.push(RecoveryAction::ReactivatePrimary);
        if self.reactivate_primary().await {
            restored_by = Some(RecoveryAction::ReactivatePrimary);
        }

        if restored_by.is_none() {
            attempted.push(RecoveryAction::DrainQueue);
            let report = self.drain_queue().await;
            if report.completed > 0 {
                restored_by = Some(RecoveryAction::DrainQueue);
            }
        }

        if restored_by.is_none() {
            attempted.push(RecoveryAction::FullProbe);
            self.run_health_check().await;
            if self.health.lock().await.level.is_operational() {
                restored_by = Some(RecoveryAction::FullProbe);
            }
        }

        let (level, recovery_attempts) = {
            let mut health = self.health.lock().await;
            health.recovery_attempts = health.recovery_attempts.saturating_add(1);
            match restored_by {
                Some(action) => health.push_alert(
                    AlertSeverity::Info,
                    None,
                    format!("recovery succeeded via {action}"),
                ),
                None => health.push_alert(
                    AlertSeverity::Critical,
                    None,
                    "recovery failed, manual intervention required",
                ),
            }
            (health.level, health.recovery_attempts)
        };
        self.persist_health().await;
        self.errors.lock().await.record_recovery(restored_by.is_some());

        match restored_by {
            Some(action) => info!(%action, %level, recovery_attempts, "recovery succeeded"),
            None => warn!(%level, recovery_attempts, "recovery failed"),
        }

        RecoveryResult {
            restored_by,
            attempted,
            level,
            recovery_attempts,
        }
    }

    async fn reactivate_primary(&self) -> bool {
        if !self.channels.contains(ChannelKind::Primary) {
            return false;
        }
        let probe = self.monitor.probe(ChannelKind::Primary).await;
        if !probe.reachable {
            return false;
        }

        {
            let mut health = self.health.lock().await;
            health.primary_active = true;
            health.consecutive_failures = 0;
            health.reachability.insert(ChannelKind::Primary, true);
            let reachable = health.reachability.values().filter(|up| **up).count();
            health.level = HealthLevel::from_reachability(reachable, health.reachability.len());
            health.mode = derive_mode(health.level, true);
            health.push_alert(
                AlertSeverity::Info,
                Some(ChannelKind::Primary),
                "primary channel reactivated",
            );
            info!(level = %health.level, mode = %health.mode, "primary channel reactivated");
        }
        self.persist_health().await;
        true
    }
}
