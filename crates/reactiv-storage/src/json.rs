// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON file implementation of the [`StateStore`] trait.
//!
//! Writes go to a sibling `.tmp` file which is then renamed over the target,
//! so a crash mid-write leaves the previous snapshot intact. A file that no
//! longer decodes is renamed to `<file>.corrupt-<timestamp>` before it is
//! treated as missing, so the next save cannot overwrite it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use reactiv_core::{
    PersistedState, QueueSnapshot, ReactivError, StateStore, SystemHealthState,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// File holding the health snapshot.
pub const SYSTEM_STATE_FILE: &str = "system_state.json";

/// File holding the queue snapshot (`{pending, processing, completed, failed}`).
pub const QUEUE_STATE_FILE: &str = "queue_state.json";

/// Snapshot store backed by two JSON documents in one directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn health_path(&self) -> PathBuf {
        self.dir.join(SYSTEM_STATE_FILE)
    }

    pub fn queue_path(&self) -> PathBuf {
        self.dir.join(QUEUE_STATE_FILE)
    }

    async fn read<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ReactivError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ReactivError::storage(e)),
        };
        match serde_json::from_str(&content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                let aside = corrupt_path(path);
                tokio::fs::rename(path, &aside)
                    .await
                    .map_err(ReactivError::storage)?;
                warn!(
                    path = %path.display(),
                    moved_to = %aside.display(),
                    error = %e,
                    "snapshot file could not be decoded, moved aside"
                );
                Ok(None)
            }
        }
    }

    async fn write<T: Serialize>(&self, path: PathBuf, value: &T) -> Result<(), ReactivError> {
        let body = serde_json::to_vec_pretty(value).map_err(ReactivError::storage)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(ReactivError::storage)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(ReactivError::storage)?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(ReactivError::storage)?;
        debug!(path = %path.display(), "snapshot file written");
        Ok(())
    }
}

/// `queue_state.json` -> `queue_state.json.corrupt-20261017T101500123`.
fn corrupt_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    path.with_file_name(format!(
        "{name}.corrupt-{}",
        Utc::now().format("%Y%m%dT%H%M%S%3f")
    ))
}

#[async_trait]
impl StateStore for JsonFileStore {
    fn name(&self) -> &str {
        "json"
    }

    async fn load(&self) -> Result<PersistedState, ReactivError> {
        Ok(PersistedState {
            health: Self::read(&self.health_path()).await?,
            queue: Self::read(&self.queue_path()).await?,
        })
    }

    async fn save_health(&self, state: &SystemHealthState) -> Result<(), ReactivError> {
        self.write(self.health_path(), state).await
    }

    async fn save_queue(&self, snapshot: &QueueSnapshot) -> Result<(), ReactivError> {
        self.write(self.queue_path(), snapshot).await
    }
}
