// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rolling delivery failure and recovery statistics.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reactiv_core::{ChannelKind, DeliveryFailure, FailureKind};
use serde::Serialize;

/// Most common error types reported in [`ErrorStats`].
const TOP_ERRORS: usize = 5;

#[derive(Debug, Clone)]
struct FailureEvent {
    at: DateTime<Utc>,
    channel: ChannelKind,
    kind: FailureKind,
    error_type: String,
}

#[derive(Debug, Clone, Copy)]
struct RecoveryEvent {
    at: DateTime<Utc>,
    restored: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorCount {
    pub error_type: String,
    pub count: usize,
}

/// Failures and recoveries inside the look-back window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorStats {
    pub window_secs: u64,
    /// Failed delivery walks, one per channel that gave up.
    pub total_failures: usize,
    pub failures_per_hour: f64,
    pub by_channel: BTreeMap<ChannelKind, usize>,
    /// Keyed by failure kind (`transient`, `permanent`).
    pub by_kind: BTreeMap<String, usize>,
    pub most_common: Vec<ErrorCount>,
    pub recoveries: usize,
    pub recoveries_restored: usize,
    /// `None` until a recovery has run inside the window.
    pub recovery_success_rate: Option<f64>,
}

/// Bounded event log behind [`ErrorStats`].
#[derive(Debug)]
pub struct ErrorLog {
    window: Duration,
    max_events: usize,
    failures: VecDeque<FailureEvent>,
    recoveries: VecDeque<RecoveryEvent>,
}

impl ErrorLog {
    pub fn new(window: Duration, max_events: usize) -> Self {
        Self {
            window,
            max_events: max_events.max(1),
            failures: VecDeque::new(),
            recoveries: VecDeque::new(),
        }
    }

    pub fn record_failure(&mut self, channel: ChannelKind, failure: &DeliveryFailure) {
        self.record_failure_at(Utc::now(), channel, failure);
    }

    fn record_failure_at(
        &mut self,
        at: DateTime<Utc>,
        channel: ChannelKind,
        failure: &DeliveryFailure,
    ) {
        self.failures.push_back(FailureEvent {
            at,
            channel,
            kind: failure.kind,
            error_type: error_type(failure),
        });
        while self.failures.len() > self.max_events {
            self.failures.pop_front();
        }
    }

    pub fn record_recovery(&mut self, restored: bool) {
        self.record_recovery_at(Utc::now(), restored);
    }

    fn record_recovery_at(&mut self, at: DateTime<Utc>, restored: bool) {
        self.recoveries.push_back(RecoveryEvent { at, restored });
        while self.recoveries.len() > self.max_events {
            self.recoveries.pop_front();
        }
    }

    pub fn stats(&self) -> ErrorStats {
        self.stats_at(Utc::now())
    }

    fn stats_at(&self, now: DateTime<Utc>) -> ErrorStats {
        let window = chrono::Duration::from_std(self.window).unwrap_or(chrono::Duration::MAX);
        let since = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut by_channel = BTreeMap::new();
        let mut by_kind = BTreeMap::new();
        let mut by_type: HashMap<&str, usize> = HashMap::new();
        let mut total_failures = 0;
        for event in self.failures.iter().filter(|e| e.at >= since) {
            total_failures += 1;
            *by_channel.entry(event.channel).or_insert(0) += 1;
            *by_kind.entry(event.kind.to_string()).or_insert(0) += 1;
            *by_type.entry(event.error_type.as_str()).or_insert(0) += 1;
        }

        let mut most_common: Vec<ErrorCount> = by_type
            .into_iter()
            .map(|(error_type, count)| ErrorCount {
                error_type: error_type.to_string(),
                count,
            })
            .collect();
        most_common.sort_by(|a, b| b.count.cmp(&a.count).then(a.error_type.cmp(&b.error_type)));
        most_common.truncate(TOP_ERRORS);

        let recent: Vec<_> = self.recoveries.iter().filter(|r| r.at >= since).collect();
        let recoveries = recent.len();
        let recoveries_restored = recent.iter().filter(|r| r.restored).count();

        let hours = self.window.as_secs_f64() / 3600.0;
        ErrorStats {
            window_secs: self.window.as_secs(),
            total_failures,
            failures_per_hour: if hours > 0.0 {
                total_failures as f64 / hours
            } else {
                0.0
            },
            by_channel,
            by_kind,
            most_common,
            recoveries,
            recoveries_restored,
            recovery_success_rate: (recoveries > 0)
                .then(|| recoveries_restored as f64 / recoveries as f64),
        }
    }
}

/// Groups failures: `http <status>` when the downstream answered, otherwise
/// the message up to its first colon.
fn error_type(failure: &DeliveryFailure) -> String {
    if let Some(status) = failure.status {
        return format!("http {status}");
    }
    let head = failure
        .message
        .split(':')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    if head.is_empty() {
        failure.kind.to_string()
    } else {
        head
    }
}
