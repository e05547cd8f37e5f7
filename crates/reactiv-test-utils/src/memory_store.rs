// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`StateStore`] for tests.
//!
//! Clones share the same snapshots, so a test can hand one clone to a
//! `FallbackSystem`, drop the system, and build a new one from the same
//! store to simulate a restart.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use reactiv_core::{PersistedState, QueueSnapshot, ReactivError, StateStore, SystemHealthState};

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<PersistedState>,
    health_saves: AtomicU32,
    queue_saves: AtomicU32,
    fail_writes: AtomicBool,
    fail_loads: AtomicBool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates the store as if a previous process had saved `state`.
    pub async fn seed(&self, state: PersistedState) {
        *self.shared.state.lock().await = state;
    }

    /// Makes every subsequent save fail with a storage error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes `load` fail with a storage error, as an unreadable disk would.
    pub fn set_fail_loads(&self, fail: bool) {
        self.shared.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub async fn health(&self) -> Option<SystemHealthState> {
        self.shared.state.lock().await.health.clone()
    }

    pub async fn queue(&self) -> Option<QueueSnapshot> {
        self.shared.state.lock().await.queue.clone()
    }

    pub fn health_saves(&self) -> u32 {
        self.shared.health_saves.load(Ordering::SeqCst)
    }

    pub fn queue_saves(&self) -> u32 {
        self.shared.queue_saves.load(Ordering::SeqCst)
    }

    pub fn as_store(&self) -> Arc<dyn StateStore> {
        Arc::new(self.clone())
    }

    fn check_writable(&self) -> Result<(), ReactivError> {
        if self.shared.fail_writes.load(Ordering::SeqCst) {
            Err(ReactivError::storage(std::io::Error::other(
                "simulated write failure",
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self) -> Result<PersistedState, ReactivError> {
        if self.shared.fail_loads.load(Ordering::SeqCst) {
            return Err(ReactivError::storage(std::io::Error::other(
                "simulated read failure",
            )));
        }
        Ok(self.shared.state.lock().await.clone())
    }

    async fn save_health(&self, state: &SystemHealthState) -> Result<(), ReactivError> {
        self.check_writable()?;
        self.shared.state.lock().await.health = Some(state.clone());
        self.shared.health_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn save_queue(&self, snapshot: &QueueSnapshot) -> Result<(), ReactivError> {
        self.check_writable()?;
        self.shared.state.lock().await.queue = Some(snapshot.clone());
        self.shared.queue_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
