// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! State store trait for crash-recovery snapshots.

use async_trait::async_trait;

use crate::error::ReactivError;
use crate::types::{PersistedState, QueueSnapshot, SystemHealthState};

/// Durable home for the health snapshot and the queue snapshot.
///
/// Callers treat persistence as best-effort: a failed save is logged and the
/// process keeps running on in-memory state.
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// Short backend name used in logs and status output.
    fn name(&self) -> &str;

    /// Loads whatever snapshots exist. Missing snapshots are `None`, not errors.
    async fn load(&self) -> Result<PersistedState, ReactivError>;

    /// Replaces the stored health snapshot.
    async fn save_health(&self, state: &SystemHealthState) -> Result<(), ReactivError>;

    /// Replaces the stored queue snapshot.
    async fn save_queue(&self, snapshot: &QueueSnapshot) -> Result<(), ReactivError>;
}
