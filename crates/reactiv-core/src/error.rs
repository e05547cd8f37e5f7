// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Reactiv delivery core.

use thiserror::Error;

/// The primary error type used across Reactiv traits and core operations.
///
/// Channel and probe failures never surface through this type past the
/// dispatch boundary; they are folded into [`DeliveryOutcome`](crate::types::DeliveryOutcome)
/// values instead. This type covers construction, persistence and the
/// operational surface.
#[derive(Debug, Error)]
pub enum ReactivError {
    /// Configuration errors (invalid TOML, missing channel URLs, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// State store errors (file I/O, database failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel adapter construction or transport errors.
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A delivery request failed validation (empty recipient or body).
    #[error("invalid delivery request: {0}")]
    InvalidRequest(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Operational gateway errors (bind failure, server error).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ReactivError {
    /// Wraps any error as a storage error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }
}
