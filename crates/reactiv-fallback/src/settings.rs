// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime knobs for the fallback system, resolved from configuration.

use std::time::Duration;

use reactiv_config::ReactivConfig;

use crate::retry::RetryPolicy;

/// Everything [`FallbackSystem`](crate::FallbackSystem) needs from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackSettings {
    pub retry: RetryPolicy,
    pub health_enabled: bool,
    pub health_interval: Duration,
    /// Upper bound on a single probe; the monitor adds a small grace on top.
    pub probe_timeout: Duration,
    pub drain_interval: Duration,
    pub max_items_per_cycle: usize,
    /// Queue-level attempts before an item is marked failed.
    pub queue_max_attempts: u32,
    /// Completed and failed items kept for inspection.
    pub history_limit: usize,
    pub recovery_enabled: bool,
    pub failure_threshold: u32,
    pub breaker_enabled: bool,
    /// Consecutive delivery failures that open a channel's breaker.
    pub breaker_threshold: u32,
    pub breaker_open_timeout: Duration,
    pub stats_window: Duration,
    pub stats_max_events: usize,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self::from_config(&ReactivConfig::default())
    }
}

impl FallbackSettings {
    pub fn from_config(config: &ReactivConfig) -> Self {
        Self {
            retry: RetryPolicy::from_config(&config.retry),
            health_enabled: config.health.enabled,
            health_interval: Duration::from_secs(config.health.interval_secs.max(1)),
            probe_timeout: Duration::from_secs(config.channels.probe_timeout_secs.max(1)),
            drain_interval: Duration::from_secs(config.queue.drain_interval_secs.max(1)),
            max_items_per_cycle: config.queue.max_items_per_cycle.max(1),
            queue_max_attempts: config.queue.max_attempts.max(1),
            history_limit: config.queue.history_limit,
            recovery_enabled: config.recovery.enabled,
            failure_threshold: config.recovery.failure_threshold.max(1),
            breaker_enabled: config.breaker.enabled,
            breaker_threshold: config.breaker.failure_threshold.max(1),
            breaker_open_timeout: Duration::from_secs(config.breaker.open_timeout_secs.max(1)),
            stats_window: Duration::from_secs(config.breaker.stats_window_secs.max(1)),
            stats_max_events: config.breaker.stats_max_events.max(1),
        }
    }
}
