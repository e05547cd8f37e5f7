// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Reactiv integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockChannel`] - Scripted delivery channel with call counters
//! - [`MemoryStore`] - In-memory snapshot store shared across restarts
//! - [`TestHarness`] - Fallback system wired to both

pub mod harness;
pub mod memory_store;
pub mod mock_channel;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use memory_store::MemoryStore;
pub use mock_channel::MockChannel;
