// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The fallback system object: owned state, persistence and status.
//!
//! Dispatch, queue draining, recovery and the background loops are
//! implemented in their own modules as further `impl FallbackSystem` blocks.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use reactiv_core::{
    ChannelKind, ChannelSet, HealthLevel, PersistedState, QueueSnapshot, QueueStats,
    ReactivError, StateStore, SystemHealthState,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::breaker::{BreakerStatus, CircuitBreakers};
use crate::health::{HealthMonitor, HealthTransition, apply_probe_results};
use crate::mode::{derive_mode, permitted_channels};
use crate::queue::DeliveryQueue;
use crate::retry::RetryExecutor;
use crate::settings::FallbackSettings;
use crate::stats::{ErrorLog, ErrorStats};

/// Point-in-time view for the status surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStatus {
    pub health: SystemHealthState,
    pub queue: QueueStats,
    /// Channels a dispatch would try right now, in order.
    pub permitted_channels: Vec<ChannelKind>,
    pub registered_channels: Vec<ChannelKind>,
    /// Channels with a breaker that is open, half-open or counting failures.
    pub breakers: BTreeMap<ChannelKind, BreakerStatus>,
    pub errors: ErrorStats,
    pub uptime_secs: u64,
}

/// Orchestrates delivery across the registered channels.
///
/// Holds the health state and the queue behind their own mutexes. Neither
/// lock is held across a network call. Every mutation is followed by a
/// snapshot write through the configured [`StateStore`]; a failed write is
/// logged and the system carries on with its in-memory state.
pub struct FallbackSystem {
    pub(crate) settings: FallbackSettings,
    pub(crate) channels: ChannelSet,
    pub(crate) executor: RetryExecutor,
    pub(crate) monitor: HealthMonitor,
    pub(crate) health: Mutex<SystemHealthState>,
    pub(crate) queue: Mutex<DeliveryQueue>,
    pub(crate) breakers: Mutex<CircuitBreakers>,
    pub(crate) errors: Mutex<ErrorLog>,
    store: Arc<dyn StateStore>,
    /// Serializes snapshot writes. Always taken before a state lock.
    persist_lock: Mutex<()>,
    pub(crate) draining: AtomicBool,
    probing: AtomicBool,
    pub(crate) recovery_lock: Mutex<()>,
}

impl FallbackSystem {
    /// Builds the system and restores any persisted state.
    ///
    /// A store that cannot be read is logged and treated as empty, and is
    /// not written during `open`. Queue items left in `processing` by a
    /// previous run are returned to `pending` and the restored state is
    /// written back immediately.
    pub async fn open(
        settings: FallbackSettings,
        channels: ChannelSet,
        store: Arc<dyn StateStore>,
    ) -> Result<Self, ReactivError> {
        if channels.is_empty() {
            return Err(ReactivError::Config(
                "no delivery channels registered".to_string(),
            ));
        }

        let (persisted, loaded) = match store.load().await {
            Ok(persisted) => (persisted, true),
            Err(e) => {
                warn!(store = store.name(), error = %e, "could not load persisted state, starting fresh");
                (PersistedState::default(), false)
            }
        };

        let mut health = persisted.health.unwrap_or_default();
        health.started_at = Utc::now();
        health.reachability.retain(|kind, _| channels.contains(*kind));
        if !health.reachability.is_empty() {
            let reachable = health.reachability.values().filter(|up| **up).count();
            health.level = HealthLevel::from_reachability(reachable, health.reachability.len());
        }
        health.mode = derive_mode(health.level, health.primary_active);

        let queue = match persisted.queue {
            Some(snapshot) => DeliveryQueue::from_snapshot(
                snapshot,
                settings.queue_max_attempts,
                settings.history_limit,
            ),
            None => DeliveryQueue::new(settings.queue_max_attempts, settings.history_limit),
        };

        info!(
            store = store.name(),
            channels = ?channels.kinds(),
            level = %health.level,
            mode = %health.mode,
            pending = queue.stats().pending,
            "fallback system ready"
        );

        let store_name = store.name().to_string();
        let system = Self {
            breakers: Mutex::new(CircuitBreakers::new(
                settings.breaker_enabled,
                settings.breaker_threshold,
                settings.breaker_open_timeout,
            )),
            errors: Mutex::new(ErrorLog::new(
                settings.stats_window,
                settings.stats_max_events,
            )),
            executor: RetryExecutor::new(settings.retry.clone()),
            monitor: HealthMonitor::new(channels.clone(), settings.probe_timeout),
            settings,
            channels,
            health: Mutex::new(health),
            queue: Mutex::new(queue),
            store,
            persist_lock: Mutex::new(()),
            draining: AtomicBool::new(false),
            probing: AtomicBool::new(false),
            recovery_lock: Mutex::new(()),
        };
        if loaded {
            system.persist_all().await;
        } else {
            warn!(store = store_name, "store left untouched until the next state change");
        }
        Ok(system)
    }

    pub fn settings(&self) -> &FallbackSettings {
        &self.settings
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    pub async fn health(&self) -> SystemHealthState {
        self.health.lock().await.clone()
    }

    pub async fn queue_snapshot(&self) -> QueueSnapshot {
        self.queue.lock().await.snapshot()
    }

    pub async fn queue_stats(&self) -> QueueStats {
        self.queue.lock().await.stats()
    }

    /// Channels a dispatch would try right now, in order.
    pub async fn permitted_channels(&self) -> Vec<ChannelKind> {
        let health = self.health.lock().await;
        permitted_channels(health.level, health.mode, &self.channels)
    }

    pub async fn status(&self) -> SystemStatus {
        let health = self.health().await;
        let queue = self.queue_stats().await;
        let breakers = self.breakers.lock().await.statuses();
        let errors = self.errors.lock().await.stats();
        SystemStatus {
            permitted_channels: permitted_channels(health.level, health.mode, &self.channels),
            registered_channels: self.channels.kinds(),
            breakers,
            errors,
            uptime_secs: health.uptime_secs(),
            health,
            queue,
        }
    }

    /// Closes the breaker for one channel. Returns false if it was closed.
    pub async fn reset_breaker(&self, kind: ChannelKind) -> bool {
        let reset = self.breakers.lock().await.reset(kind);
        if reset {
            info!(channel = %kind, "breaker reset by operator");
        }
        reset
    }

    /// Runs one probe cycle and folds the results into the health state.
    ///
    /// Returns `None` when another probe cycle is already running.
    pub async fn run_health_check(&self) -> Option<HealthTransition> {
        if self
            .probing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("health check already running, skipping");
            return None;
        }
        let _running = RunningGuard(&self.probing);

        let results = self.monitor.probe_all().await;
        let transition = {
            let mut health = self.health.lock().await;
            apply_probe_results(&mut health, &results)
        };
        self.persist_health().await;

        debug!(
            level = %transition.current,
            reachable = transition.reachable,
            total = transition.total,
            "health check complete"
        );
        Some(transition)
    }

    /// Writes the health snapshot.
    pub(crate) async fn persist_health(&self) {
        let _writer = self.persist_lock.lock().await;
        let state = self.health.lock().await.clone();
        if let Err(e) = self.store.save_health(&state).await {
            warn!(store = self.store.name(), error = %e, "failed to persist health state");
        }
    }

    /// Writes the queue snapshot.
    pub(crate) async fn persist_queue(&self) {
        let _writer = self.persist_lock.lock().await;
        let snapshot = self.queue.lock().await.snapshot();
        if let Err(e) = self.store.save_queue(&snapshot).await {
            warn!(store = self.store.name(), error = %e, "failed to persist queue state");
        }
    }

    pub(crate) async fn persist_all(&self) {
        self.persist_health().await;
        self.persist_queue().await;
    }

    /// Final snapshot before the process exits.
    pub async fn shutdown(&self) {
        self.persist_all().await;
        info!("fallback system state saved");
    }
}

impl std::fmt::Debug for FallbackSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackSystem")
            .field("channels", &self.channels)
            .field("store", &self.store.name())
            .finish_non_exhaustive()
    }
}

/// Clears a skip-if-running flag when dropped.
pub(crate) struct RunningGuard<'a>(pub(crate) &'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactiv_core::{DeliveryRequest, OperatingMode, Priority, QueueItem, QueueStatus};
    use reactiv_test_utils::{MemoryStore, MockChannel};

    fn channels(mocks: &[&MockChannel]) -> ChannelSet {
        mocks
            .iter()
            .fold(ChannelSet::new(), |set, mock| set.with(mock.adapter()))
    }

    #[tokio::test]
    async fn open_rejects_empty_channel_set() {
        let result = FallbackSystem::open(
            FallbackSettings::default(),
            ChannelSet::new(),
            MemoryStore::new().as_store(),
        )
        .await;
        assert!(matches!(result, Err(ReactivError::Config(_))));
    }

    #[tokio::test]
    async fn unreadable_store_is_not_overwritten_on_open() {
        let store = MemoryStore::new();
        store.set_fail_loads(true);
        let local = MockChannel::succeeding(ChannelKind::Local);

        let system = FallbackSystem::open(
            FallbackSettings::default(),
            channels(&[&local]),
            store.as_store(),
        )
        .await
        .unwrap();

        assert_eq!(system.queue_stats().await.pending, 0);
        assert_eq!(store.health_saves(), 0);
        assert_eq!(store.queue_saves(), 0);
    }

    #[tokio::test]
    async fn open_restores_health_and_requeues_processing_items() {
        let store = MemoryStore::new();
        let mut health = SystemHealthState::default();
        health.primary_active = false;
        health.consecutive_failures = 4;
        health.reachability = ChannelKind::ALL
            .into_iter()
            .map(|kind| (kind, kind == ChannelKind::Local))
            .collect();

        let mut interrupted =
            QueueItem::new(DeliveryRequest::new("5511", "hi"), Priority::High, 3);
        interrupted.status = QueueStatus::Processing;
        store
            .seed(PersistedState {
                health: Some(health),
                queue: Some(QueueSnapshot {
                    processing: vec![interrupted.clone()],
                    ..QueueSnapshot::default()
                }),
            })
            .await;

        let local = MockChannel::succeeding(ChannelKind::Local);
        let primary = MockChannel::failing(ChannelKind::Primary);
        let system = FallbackSystem::open(
            FallbackSettings::default(),
            channels(&[&primary, &local]),
            store.as_store(),
        )
        .await
        .unwrap();

        let health = system.health().await;
        assert_eq!(health.consecutive_failures, 4);
        // only primary and local are registered now: 1 of 2 reachable
        assert_eq!(health.reachability.len(), 2);
        assert_eq!(health.level, HealthLevel::Critical);
        assert_eq!(health.mode, OperatingMode::Bridge);

        let stats = system.queue_stats().await;
        assert_eq!((stats.pending, stats.processing), (1, 0));

        let saved = store.queue().await.unwrap();
        assert_eq!(saved.pending[0].id, interrupted.id);
        assert_eq!(saved.pending[0].status, QueueStatus::Pending);
    }

    #[tokio::test]
    async fn unreadable_store_starts_fresh() {
        struct Broken;

        #[async_trait::async_trait]
        impl StateStore for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            async fn load(&self) -> Result<PersistedState, ReactivError> {
                Err(ReactivError::storage(std::io::Error::other("disk gone")))
            }
            async fn save_health(&self, _: &SystemHealthState) -> Result<(), ReactivError> {
                Err(ReactivError::storage(std::io::Error::other("disk gone")))
            }
            async fn save_queue(&self, _: &QueueSnapshot) -> Result<(), ReactivError> {
                Err(ReactivError::storage(std::io::Error::other("disk gone")))
            }
        }

        let local = MockChannel::succeeding(ChannelKind::Local);
        let system = FallbackSystem::open(
            FallbackSettings::default(),
            channels(&[&local]),
            Arc::new(Broken),
        )
        .await
        .unwrap();
        assert_eq!(system.health().await.level, HealthLevel::Healthy);
        assert_eq!(system.queue_stats().await, QueueStats::default());
    }

    #[tokio::test]
    async fn health_check_updates_and_persists_state() {
        let store = MemoryStore::new();
        let primary = MockChannel::failing(ChannelKind::Primary);
        let backup = MockChannel::failing(ChannelKind::Backup);
        let bridge = MockChannel::failing(ChannelKind::Bridge);
        let local = MockChannel::succeeding(ChannelKind::Local);
        let system = FallbackSystem::open(
            FallbackSettings::default(),
            channels(&[&primary, &backup, &bridge, &local]),
            store.as_store(),
        )
        .await
        .unwrap();

        let transition = system.run_health_check().await.unwrap();
        assert_eq!(transition.current, HealthLevel::Fallback);
        assert_eq!(system.permitted_channels().await, vec![ChannelKind::Local]);

        let saved = store.health().await.unwrap();
        assert_eq!(saved.level, HealthLevel::Fallback);
        assert_eq!(saved.mode, OperatingMode::LocalOnly);
        assert_eq!(saved.consecutive_failures, 1);
    }

    #[tokio::test]
    async fn status_reports_registered_and_permitted_channels() {
        let primary = MockChannel::succeeding(ChannelKind::Primary);
        let local = MockChannel::succeeding(ChannelKind::Local);
        let system = FallbackSystem::open(
            FallbackSettings::default(),
            channels(&[&primary, &local]),
            MemoryStore::new().as_store(),
        )
        .await
        .unwrap();

        let status = system.status().await;
        assert_eq!(
            status.registered_channels,
            vec![ChannelKind::Primary, ChannelKind::Local]
        );
        assert_eq!(status.permitted_channels, status.registered_channels);
        assert_eq!(status.queue, QueueStats::default());
    }

    #[tokio::test]
    async fn write_failures_do_not_stop_the_system() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        let local = MockChannel::succeeding(ChannelKind::Local);
        let system = FallbackSystem::open(
            FallbackSettings::default(),
            channels(&[&local]),
            store.as_store(),
        )
        .await
        .unwrap();
        assert!(system.run_health_check().await.is_some());
        assert_eq!(store.health_saves(), 0);
    }
}
