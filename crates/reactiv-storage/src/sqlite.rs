// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`StateStore`] trait.
//!
//! Each snapshot is one row in `snapshots`, replaced wholesale on save. A
//! row that no longer decodes is copied to `<name>.corrupt-<timestamp>`
//! before it is treated as missing.

use async_trait::async_trait;
use chrono::Utc;
use reactiv_core::{
    PersistedState, QueueSnapshot, ReactivError, StateStore, SystemHealthState,
};
use rusqlite::{OptionalExtension, params};
use tracing::{debug, warn};

use crate::database::{Database, map_tr_err};
use crate::{HEALTH_SNAPSHOT, QUEUE_SNAPSHOT};

/// SQLite-backed snapshot store.
pub struct SqliteStateStore {
    db: Database,
}

impl SqliteStateStore {
    /// Opens the database at `path`, running migrations.
    pub async fn open(path: &str) -> Result<Self, ReactivError> {
        Ok(Self {
            db: Database::open(path).await?,
        })
    }

    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    async fn read(&self, name: &'static str) -> Result<Option<String>, ReactivError> {
        self.db
            .connection()
            .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
                conn.query_row(
                    "SELECT body FROM snapshots WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn write(&self, name: &'static str, body: String) -> Result<(), ReactivError> {
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO snapshots (name, body, updated_at)
                     VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                     ON CONFLICT(name) DO UPDATE SET
                        body = excluded.body,
                        updated_at = excluded.updated_at",
                    params![name, body],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!(snapshot = name, "snapshot row written");
        Ok(())
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        &self,
        name: &'static str,
        body: Option<String>,
    ) -> Result<Option<T>, ReactivError> {
        let Some(body) = body else {
            return Ok(None);
        };
        let err = match serde_json::from_str(&body) {
            Ok(value) => return Ok(Some(value)),
            Err(e) => e,
        };

        let aside = format!("{name}.corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%3f"));
        let target = aside.clone();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO snapshots (name, body, updated_at)
                     SELECT ?2, body, updated_at FROM snapshots WHERE name = ?1",
                    params![name, target],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        warn!(snapshot = name, moved_to = %aside, error = %err, "snapshot row could not be decoded, copied aside");
        Ok(None)
    }

    /// Checkpoints and closes the underlying database.
    pub async fn close(self) -> Result<(), ReactivError> {
        self.db.close().await
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn load(&self) -> Result<PersistedState, ReactivError> {
        let health = self
            .decode(HEALTH_SNAPSHOT, self.read(HEALTH_SNAPSHOT).await?)
            .await?;
        let queue = self
            .decode(QUEUE_SNAPSHOT, self.read(QUEUE_SNAPSHOT).await?)
            .await?;
        Ok(PersistedState { health, queue })
    }

    async fn save_health(&self, state: &SystemHealthState) -> Result<(), ReactivError> {
        let body = serde_json::to_string(state).map_err(ReactivError::storage)?;
        self.write(HEALTH_SNAPSHOT, body).await
    }

    async fn save_queue(&self, snapshot: &QueueSnapshot) -> Result<(), ReactivError> {
        let body = serde_json::to_string(snapshot).map_err(ReactivError::storage)?;
        self.write(QUEUE_SNAPSHOT, body).await
    }
}
