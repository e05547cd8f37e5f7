// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Smart dispatch: try the permitted channels in order, queue on total failure.

use reactiv_core::types::AlertSeverity;
use reactiv_core::{ChannelKind, DeliveryRequest, DispatchResult, Priority};
use tracing::{debug, info, warn};

use crate::system::FallbackSystem;

/// Result of walking a request through a list of channels.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChannelWalk {
    /// Channel that accepted the request and the calls it took.
    pub delivered: Option<(ChannelKind, u32)>,
    /// Calls made across every channel tried.
    pub total_attempts: u32,
    pub last_error: Option<String>,
    /// Channels passed over because their breaker was open.
    pub skipped: Vec<ChannelKind>,
}

impl FallbackSystem {
    /// Delivers `request` through the first channel that accepts it.
    ///
    /// Invalid requests are rejected without being queued. When every
    /// permitted channel fails the request is queued with high priority and
    /// the dispatch failure is recorded in the health state. This never
    /// returns an error.
    pub async fn dispatch(&self, request: DeliveryRequest) -> DispatchResult {
        if let Err(e) = request.validate() {
            warn!(request_id = request.id(), error = %e, "rejected invalid delivery request");
            return DispatchResult::rejected(request.id(), e.to_string());
        }

        let permitted = self.permitted_channels().await;
        let walk = self.walk_channels(&request, &permitted).await;

        if let Some((channel, attempts)) = walk.delivered {
            info!(request_id = request.id(), %channel, attempts, "request dispatched");
            return DispatchResult::sent(request.id(), channel, attempts);
        }

        let error = walk
            .last_error
            .unwrap_or_else(|| "no delivery channel permitted".to_string());
        let queue_id = self.queue.lock().await.enqueue(request.clone(), Priority::High);
        self.persist_queue().await;

        {
            let mut health = self.health.lock().await;
            health.record_failure();
            health.push_alert(
                AlertSeverity::Warning,
                None,
                format!(
                    "all channels failed for request {}, queued as {queue_id}",
                    request.id()
                ),
            );
        }
        self.persist_health().await;

        warn!(
            request_id = request.id(),
            %queue_id,
            attempts = walk.total_attempts,
            error = %error,
            "all channels failed, request queued"
        );
        DispatchResult::queued(request.id(), queue_id, walk.total_attempts, Some(error))
    }

    /// Tries `channels` in order through the retry executor and stops at the
    /// first success. Channels behind an open breaker are skipped. Each
    /// channel's final outcome feeds its breaker and the error log. Does not
    /// queue anything.
    pub(crate) async fn walk_channels(
        &self,
        request: &DeliveryRequest,
        channels: &[ChannelKind],
    ) -> ChannelWalk {
        let mut walk = ChannelWalk::default();
        for kind in channels {
            let Some(adapter) = self.channels.get(*kind) else {
                continue;
            };
            if !self.breakers.lock().await.allows(*kind) {
                debug!(request_id = request.id(), channel = %kind, "breaker open, skipping channel");
                walk.skipped.push(*kind);
                continue;
            }
            let report = self.executor.execute(adapter.as_ref(), request).await;
            walk.total_attempts += report.attempts;
            if report.outcome.success {
                self.breakers.lock().await.record_success(*kind);
                walk.delivered = Some((*kind, report.attempts));
                if *kind == ChannelKind::Primary {
                    self.note_primary_success().await;
                }
                return walk;
            }
            if let Some(failure) = &report.outcome.error {
                self.errors.lock().await.record_failure(*kind, failure);
            }
            self.note_channel_failure(*kind).await;
            walk.last_error = report
                .outcome
                .error_message()
                .map(|message| format!("{kind}: {message}"));
        }
        if walk.last_error.is_none() && !walk.skipped.is_empty() {
            let names: Vec<String> = walk.skipped.iter().map(ToString::to_string).collect();
            walk.last_error = Some(format!("circuit breaker open for {}", names.join(", ")));
        }
        walk
    }

    /// Counts a failed walk against the channel's breaker and raises an
    /// alert when that opens it.
    async fn note_channel_failure(&self, kind: ChannelKind) {
        if !self.breakers.lock().await.record_failure(kind) {
            return;
        }
        self.health.lock().await.push_alert(
            AlertSeverity::Warning,
            Some(kind),
            format!("circuit breaker opened for {kind}, channel skipped until reset or timeout"),
        );
        self.persist_health().await;
    }

    /// A delivery through the primary proves it is back.
    async fn note_primary_success(&self) {
        let changed = {
            let mut health = self.health.lock().await;
            let changed = health.consecutive_failures != 0;
            health.consecutive_failures = 0;
            changed
        };
        if changed {
            self.persist_health().await;
        }
    }
}
