// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Reactiv delivery fallback system.
//!
//! This crate provides the foundational trait definitions, error types, and
//! delivery/health/queue types used throughout the Reactiv workspace. Channel
//! adapters and state stores implement the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ReactivError;
pub use types::{
    ChannelKind, DeliveryFailure, DeliveryOutcome, DeliveryRequest, DispatchResult, FailureKind,
    HealthLevel, OperatingMode, PersistedState, Priority, ProbeResult, QueueItem, QueueSnapshot,
    QueueStats, QueueStatus, SystemHealthState,
};

pub use traits::{ChannelAdapter, ChannelSet, StateStore};
