// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reachability probing and health level bookkeeping.
//!
//! [`HealthMonitor`] only talks to the network; [`apply_probe_results`] is
//! the pure state transition so it can be tested without I/O.

use std::time::Duration;

use chrono::Utc;
use reactiv_core::types::AlertSeverity;
use reactiv_core::{ChannelKind, ChannelSet, HealthLevel, ProbeResult, SystemHealthState};
use tracing::{debug, info, warn};

use crate::mode::derive_mode;

/// Extra time granted on top of the adapter's own probe timeout.
const PROBE_GRACE: Duration = Duration::from_secs(1);

/// What a probe cycle changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthTransition {
    pub previous: HealthLevel,
    pub current: HealthLevel,
    pub reachable: usize,
    pub total: usize,
}

impl HealthTransition {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Probes every registered channel.
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    channels: ChannelSet,
    probe_timeout: Duration,
}

impl HealthMonitor {
    pub fn new(channels: ChannelSet, probe_timeout: Duration) -> Self {
        Self {
            channels,
            probe_timeout,
        }
    }

    /// Probes each channel in preference order.
    ///
    /// A probe that hangs past its deadline counts as unreachable; nothing
    /// here returns an error.
    pub async fn probe_all(&self) -> Vec<ProbeResult> {
        let mut results = Vec::with_capacity(self.channels.len());
        for (kind, _) in self.channels.iter() {
            results.push(self.probe(kind).await);
        }
        results
    }

    /// Probes a single channel; an unregistered one is reported unreachable.
    pub async fn probe(&self, kind: ChannelKind) -> ProbeResult {
        let Some(adapter) = self.channels.get(kind) else {
            return ProbeResult::unreachable(kind, 0, "channel not configured");
        };
        let deadline = self.probe_timeout + PROBE_GRACE;
        let started = tokio::time::Instant::now();
        let result = match tokio::time::timeout(deadline, adapter.probe()).await {
            Ok(result) => result,
            Err(_) => ProbeResult::unreachable(
                kind,
                started.elapsed().as_millis() as u64,
                format!("probe timed out after {}s", deadline.as_secs()),
            ),
        };
        debug!(
            channel = %kind,
            reachable = result.reachable,
            latency_ms = result.latency_ms,
            "probe finished"
        );
        result
    }
}

/// Folds a probe cycle into the health state.
///
/// Updates reachability, level, primary state, failure counters, alerts,
/// mode and the last-check timestamp. Counters only move when the primary
/// channel was part of the cycle.
pub fn apply_probe_results(
    state: &mut SystemHealthState,
    results: &[ProbeResult],
) -> HealthTransition {
    let previous = state.level;

    for result in results {
        state.reachability.insert(result.channel, result.reachable);
        if !result.reachable {
            let detail = result.detail.as_deref().unwrap_or("unreachable");
            warn!(channel = %result.channel, detail, "channel probe failed");
            state.push_alert(
                AlertSeverity::Warning,
                Some(result.channel),
                format!("{} probe failed: {detail}", result.channel),
            );
        }
    }

    if let Some(primary) = results.iter().find(|r| r.channel == ChannelKind::Primary) {
        state.primary_active = primary.reachable;
        if primary.reachable {
            state.consecutive_failures = 0;
        } else {
            state.record_failure();
        }
    }

    let total = state.reachability.len();
    let reachable = state.reachability.values().filter(|up| **up).count();
    state.level = HealthLevel::from_reachability(reachable, total);
    state.mode = derive_mode(state.level, state.primary_active);
    state.last_check_at = Some(Utc::now());

    let transition = HealthTransition {
        previous,
        current: state.level,
        reachable,
        total,
    };

    if transition.changed() {
        let severity = match state.level {
            HealthLevel::Healthy => AlertSeverity::Info,
            HealthLevel::Degraded => AlertSeverity::Warning,
            HealthLevel::Critical | HealthLevel::Fallback => AlertSeverity::Critical,
        };
        let message = format!(
            "health changed from {previous} to {} ({reachable}/{total} reachable)",
            state.level
        );
        if severity == AlertSeverity::Info {
            info!(from = %previous, to = %state.level, mode = %state.mode, "health level changed");
        } else {
            warn!(from = %previous, to = %state.level, mode = %state.mode, "health level changed");
        }
        state.push_alert(severity, None, message);
    }

    transition
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactiv_core::OperatingMode;
    use reactiv_test_utils::MockChannel;

    fn results(reachable: [bool; 4]) -> Vec<ProbeResult> {
        ChannelKind::ALL
            .into_iter()
            .zip(reachable)
            .map(|(kind, up)| {
                if up {
                    ProbeResult::reachable(kind, 3)
                } else {
                    ProbeResult::unreachable(kind, 3, "connection refused")
                }
            })
            .collect()
    }

    #[test]
    fn one_of_four_reachable_is_fallback() {
        let mut state = SystemHealthState::default();
        let transition = apply_probe_results(&mut state, &results([false, false, false, true]));
        assert_eq!(state.level, HealthLevel::Fallback);
        assert_eq!(state.mode, OperatingMode::LocalOnly);
        assert!(!state.primary_active);
        assert!(transition.changed());
        assert_eq!((transition.reachable, transition.total), (1, 4));
    }

    #[test]
    fn thresholds_follow_reachable_fraction() {
        let cases = [
            ([true, true, true, true], HealthLevel::Healthy),
            ([false, true, true, true], HealthLevel::Degraded),
            ([false, false, true, true], HealthLevel::Critical),
            ([false, false, false, true], HealthLevel::Fallback),
            ([false, false, false, false], HealthLevel::Fallback),
        ];
        for (reachable, expected) in cases {
            let mut state = SystemHealthState::default();
            apply_probe_results(&mut state, &results(reachable));
            assert_eq!(state.level, expected, "{reachable:?}");
        }
    }

    #[test]
    fn primary_probe_drives_failure_counters() {
        let mut state = SystemHealthState::default();
        apply_probe_results(&mut state, &results([false, true, true, true]));
        apply_probe_results(&mut state, &results([false, true, true, true]));
        assert_eq!(state.consecutive_failures, 2);
        assert_eq!(state.total_failures, 2);
        assert!(state.last_failure_at.is_some());

        apply_probe_results(&mut state, &results([true, true, true, true]));
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.total_failures, 2);
        assert!(state.primary_active);
        assert_eq!(state.mode, OperatingMode::Normal);
    }

    #[test]
    fn failed_probes_and_level_changes_raise_alerts() {
        let mut state = SystemHealthState::default();
        apply_probe_results(&mut state, &results([false, false, true, true]));
        // two probe alerts + one level change
        assert_eq!(state.alerts.len(), 3);
        assert_eq!(
            state.alerts.back().map(|a| a.severity),
            Some(AlertSeverity::Critical)
        );

        apply_probe_results(&mut state, &results([true, true, true, true]));
        assert_eq!(state.alerts.len(), 4);
        assert_eq!(
            state.alerts.back().map(|a| a.severity),
            Some(AlertSeverity::Info)
        );
    }

    #[test]
    fn cycle_without_primary_leaves_counters_alone() {
        let mut state = SystemHealthState::default();
        state.consecutive_failures = 2;
        let partial = vec![
            ProbeResult::reachable(ChannelKind::Bridge, 1),
            ProbeResult::reachable(ChannelKind::Local, 1),
        ];
        apply_probe_results(&mut state, &partial);
        assert_eq!(state.consecutive_failures, 2);
        assert_eq!(state.level, HealthLevel::Healthy);
        assert!(state.last_check_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_probe_counts_as_unreachable() {
        struct Hanging;

        #[async_trait::async_trait]
        impl reactiv_core::ChannelAdapter for Hanging {
            fn kind(&self) -> ChannelKind {
                ChannelKind::Bridge
            }
            async fn attempt_deliver(
                &self,
                _request: &reactiv_core::DeliveryRequest,
            ) -> reactiv_core::DeliveryOutcome {
                unreachable!("not used")
            }
            async fn probe(&self) -> ProbeResult {
                std::future::pending().await
            }
        }

        let channels = ChannelSet::new()
            .with(MockChannel::succeeding(ChannelKind::Primary).adapter())
            .with(std::sync::Arc::new(Hanging));
        let monitor = HealthMonitor::new(channels, Duration::from_secs(5));
        let results = monitor.probe_all().await;

        assert_eq!(results.len(), 2);
        assert!(results[0].reachable);
        assert!(!results[1].reachable);
        assert!(results[1].detail.as_deref().unwrap_or("").contains("timed out"));
    }

    #[tokio::test]
    async fn probe_of_unregistered_channel_is_unreachable() {
        let monitor = HealthMonitor::new(ChannelSet::new(), Duration::from_secs(5));
        assert!(!monitor.probe(ChannelKind::Backup).await.reachable);
    }
}
