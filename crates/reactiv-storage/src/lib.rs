// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Snapshot persistence for the Reactiv fallback core.
//!
//! Two [`StateStore`] backends: plain JSON files (`system_state.json`,
//! `queue_state.json`) and a WAL-mode SQLite database with embedded
//! migrations and a single-writer connection via `tokio-rusqlite`.

pub mod database;
pub mod json;
pub mod migrations;
pub mod sqlite;

use std::sync::Arc;

use reactiv_config::model::{StorageBackend, StorageConfig};
use reactiv_core::{ReactivError, StateStore};
use tracing::info;

pub use database::Database;
pub use json::JsonFileStore;
pub use sqlite::SqliteStateStore;

/// Snapshot name for the health state.
pub const HEALTH_SNAPSHOT: &str = "health";

/// Snapshot name for the queue state.
pub const QUEUE_SNAPSHOT: &str = "queue";

/// Opens the backend selected by `storage.backend`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn StateStore>, ReactivError> {
    let store: Arc<dyn StateStore> = match config.backend {
        StorageBackend::Json => Arc::new(JsonFileStore::new(&config.state_dir)),
        StorageBackend::Sqlite => Arc::new(SqliteStateStore::open(&config.database_path).await?),
    };
    info!(backend = store.name(), "state store ready");
    Ok(store)
}
