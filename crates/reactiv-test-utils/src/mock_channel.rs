// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with a scripted sequence of
//! delivery results, a switchable probe result, and call counters for
//! assertions. Clones share state, so a test can register one clone in a
//! `ChannelSet` and keep another for inspection.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use reactiv_core::{
    ChannelAdapter, ChannelKind, DeliveryFailure, DeliveryOutcome, DeliveryRequest, ProbeResult,
};

#[derive(Debug)]
struct Shared {
    script: Mutex<VecDeque<Result<(), DeliveryFailure>>>,
    fallback: Mutex<Result<(), DeliveryFailure>>,
    delivered: Mutex<Vec<DeliveryRequest>>,
    calls: AtomicU32,
    probe_calls: AtomicU32,
    reachable: AtomicBool,
    latency: Mutex<Duration>,
}

/// A scripted delivery channel.
#[derive(Debug, Clone)]
pub struct MockChannel {
    kind: ChannelKind,
    shared: Arc<Shared>,
}

impl MockChannel {
    fn with_behaviour(
        kind: ChannelKind,
        script: VecDeque<Result<(), DeliveryFailure>>,
        fallback: Result<(), DeliveryFailure>,
        reachable: bool,
    ) -> Self {
        Self {
            kind,
            shared: Arc::new(Shared {
                script: Mutex::new(script),
                fallback: Mutex::new(fallback),
                delivered: Mutex::new(Vec::new()),
                calls: AtomicU32::new(0),
                probe_calls: AtomicU32::new(0),
                reachable: AtomicBool::new(reachable),
                latency: Mutex::new(Duration::ZERO),
            }),
        }
    }

    /// Every delivery succeeds and probes report reachable.
    pub fn succeeding(kind: ChannelKind) -> Self {
        Self::with_behaviour(kind, VecDeque::new(), Ok(()), true)
    }

    /// Every delivery fails with a transient HTTP 500 and probes report unreachable.
    pub fn failing(kind: ChannelKind) -> Self {
        Self::failing_with(kind, DeliveryFailure::from_status(500, "mock failure"))
    }

    /// Every delivery fails with `failure`; probes report unreachable.
    pub fn failing_with(kind: ChannelKind, failure: DeliveryFailure) -> Self {
        Self::with_behaviour(kind, VecDeque::new(), Err(failure), false)
    }

    /// Plays `results` in order (`true` = success); once exhausted the last
    /// result repeats.
    pub fn scripted(kind: ChannelKind, results: impl IntoIterator<Item = bool>) -> Self {
        let script: VecDeque<_> = results.into_iter().map(to_result).collect();
        let fallback = script.back().cloned().unwrap_or(Ok(()));
        let reachable = fallback.is_ok();
        Self::with_behaviour(kind, script, fallback, reachable)
    }

    /// Switches the steady-state delivery result (clears any remaining script).
    pub async fn set_succeeding(&self, succeeding: bool) {
        self.shared.script.lock().await.clear();
        *self.shared.fallback.lock().await = to_result(succeeding);
    }

    /// Switches what [`probe`](ChannelAdapter::probe) reports.
    pub fn set_reachable(&self, reachable: bool) {
        self.shared.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Adds an artificial delay to every delivery attempt.
    pub async fn set_latency(&self, latency: Duration) {
        *self.shared.latency.lock().await = latency;
    }

    /// Number of `attempt_deliver` calls so far.
    pub fn calls(&self) -> u32 {
        self.shared.calls.load(Ordering::SeqCst)
    }

    /// Number of `probe` calls so far.
    pub fn probe_calls(&self) -> u32 {
        self.shared.probe_calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.shared.calls.store(0, Ordering::SeqCst);
        self.shared.probe_calls.store(0, Ordering::SeqCst);
    }

    /// Requests that were accepted (successful attempts only).
    pub async fn delivered(&self) -> Vec<DeliveryRequest> {
        self.shared.delivered.lock().await.clone()
    }

    /// Shares this mock as a trait object for a `ChannelSet`.
    pub fn adapter(&self) -> Arc<dyn ChannelAdapter> {
        Arc::new(self.clone())
    }
}

fn to_result(success: bool) -> Result<(), DeliveryFailure> {
    if success {
        Ok(())
    } else {
        Err(DeliveryFailure::from_status(500, "mock failure"))
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn attempt_deliver(&self, request: &DeliveryRequest) -> DeliveryOutcome {
        self.shared.calls.fetch_add(1, Ordering::SeqCst);

        let latency = *self.shared.latency.lock().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let next = self.shared.script.lock().await.pop_front();
        let result = match next {
            Some(result) => result,
            None => self.shared.fallback.lock().await.clone(),
        };

        match result {
            Ok(()) => {
                self.shared.delivered.lock().await.push(request.clone());
                DeliveryOutcome::delivered(self.kind, Some("{\"success\":true}".to_string()))
            }
            Err(failure) => DeliveryOutcome::failed(self.kind, failure),
        }
    }

    async fn probe(&self) -> ProbeResult {
        self.shared.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.shared.reachable.load(Ordering::SeqCst) {
            ProbeResult::reachable(self.kind, 1)
        } else {
            ProbeResult::unreachable(self.kind, 1, "mock unreachable")
        }
    }
}
