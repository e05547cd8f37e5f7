// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-channel circuit breakers.
//!
//! A breaker counts consecutive failed delivery walks through one channel.
//! Once the count reaches the threshold the breaker opens and the channel is
//! skipped by dispatch and drain. After the open timeout a single trial is let
//! through (half-open): success closes the breaker, failure reopens it.
//! Probes never touch breakers. Breaker state is in-memory only and starts
//! closed on every run.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reactiv_core::ChannelKind;
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BreakerState {
    #[default]
    Closed,
    Open,
    /// Open timeout elapsed; the next delivery is a trial.
    HalfOpen,
}

/// Status surface view of one breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerStatus {
    pub state: BreakerState,
    pub failure_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
struct Breaker {
    state: BreakerState,
    failure_count: u32,
    last_failure_at: Option<DateTime<Utc>>,
    opened_at: Option<Instant>,
}

/// Breakers for every channel that has seen a delivery.
#[derive(Debug)]
pub struct CircuitBreakers {
    enabled: bool,
    failure_threshold: u32,
    open_timeout: Duration,
    breakers: BTreeMap<ChannelKind, Breaker>,
}

impl CircuitBreakers {
    pub fn new(enabled: bool, failure_threshold: u32, open_timeout: Duration) -> Self {
        Self {
            enabled,
            failure_threshold: failure_threshold.max(1),
            open_timeout,
            breakers: BTreeMap::new(),
        }
    }

    /// Whether a delivery may go through `kind` now.
    ///
    /// Moves an open breaker to half-open once its timeout has elapsed.
    pub fn allows(&mut self, kind: ChannelKind) -> bool {
        if !self.enabled {
            return true;
        }
        let Some(breaker) = self.breakers.get_mut(&kind) else {
            return true;
        };
        if breaker.state == BreakerState::Open
            && breaker
                .opened_at
                .is_some_and(|at| at.elapsed() >= self.open_timeout)
        {
            breaker.state = BreakerState::HalfOpen;
            debug!(channel = %kind, "breaker half-open, allowing a trial delivery");
        }
        breaker.state != BreakerState::Open
    }

    pub fn record_success(&mut self, kind: ChannelKind) {
        if let Some(breaker) = self.breakers.get_mut(&kind) {
            if breaker.state != BreakerState::Closed {
                info!(channel = %kind, "breaker closed after successful delivery");
            }
            breaker.state = BreakerState::Closed;
            breaker.failure_count = 0;
            breaker.opened_at = None;
        }
    }

    /// Counts a failed walk through `kind`. Returns true when this failure
    /// opened the breaker.
    pub fn record_failure(&mut self, kind: ChannelKind) -> bool {
        let threshold = self.failure_threshold;
        let breaker = self.breakers.entry(kind).or_default();
        breaker.failure_count = breaker.failure_count.saturating_add(1);
        breaker.last_failure_at = Some(Utc::now());

        let trips = match breaker.state {
            BreakerState::HalfOpen => true,
            BreakerState::Closed => breaker.failure_count >= threshold,
            BreakerState::Open => false,
        };
        if trips && self.enabled {
            breaker.state = BreakerState::Open;
            breaker.opened_at = Some(Instant::now());
            warn!(
                channel = %kind,
                failures = breaker.failure_count,
                "breaker opened, channel skipped until timeout"
            );
            return true;
        }
        false
    }

    /// Closes the breaker for `kind`. Returns false if it was already closed.
    pub fn reset(&mut self, kind: ChannelKind) -> bool {
        match self.breakers.remove(&kind) {
            Some(breaker) => breaker.state != BreakerState::Closed || breaker.failure_count > 0,
            None => false,
        }
    }

    /// Closes every breaker, returning the channels that were not closed.
    pub fn reset_all(&mut self) -> Vec<ChannelKind> {
        let reopened = self
            .breakers
            .iter()
            .filter(|(_, b)| b.state != BreakerState::Closed)
            .map(|(kind, _)| *kind)
            .collect();
        self.breakers.clear();
        reopened
    }

    pub fn state(&self, kind: ChannelKind) -> BreakerState {
        self.breakers
            .get(&kind)
            .map(|b| b.state)
            .unwrap_or_default()
    }

    pub fn statuses(&self) -> BTreeMap<ChannelKind, BreakerStatus> {
        self.breakers
            .iter()
            .map(|(kind, b)| {
                (
                    *kind,
                    BreakerStatus {
                        state: b.state,
                        failure_count: b.failure_count,
                        last_failure_at: b.last_failure_at,
                    },
                )
            })
            .collect()
    }
}
