// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fallback-and-recovery orchestration for outbound delivery.
//!
//! [`FallbackSystem`] owns the health state and the durable queue. It walks
//! each request through the channels the current health level permits,
//! retrying each one with exponential backoff, and parks the request in the
//! queue when every channel fails. A channel that keeps failing is skipped
//! behind its circuit breaker until a timeout or a recovery closes it.
//! Background loops re-probe the channels, drain the queue and run recovery
//! when failures cluster.

pub mod breaker;
pub mod dispatch;
pub mod drain;
pub mod health;
pub mod mode;
pub mod queue;
pub mod recovery;
pub mod retry;
pub mod scheduler;
pub mod settings;
pub mod stats;
pub mod system;

pub use breaker::{BreakerState, BreakerStatus, CircuitBreakers};
pub use drain::DrainReport;
pub use health::{HealthMonitor, HealthTransition, apply_probe_results};
pub use mode::{derive_mode, level_channels, mode_channels, permitted_channels};
pub use queue::DeliveryQueue;
pub use recovery::{RecoveryAction, RecoveryResult};
pub use retry::{RetryExecutor, RetryPolicy, RetryReport};
pub use scheduler::BackgroundTasks;
pub use settings::FallbackSettings;
pub use stats::{ErrorCount, ErrorStats};
pub use system::{FallbackSystem, SystemStatus};
