// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue drain cycles.

use std::sync::atomic::Ordering;

use reactiv_core::QueueStatus;
use serde::Serialize;
use tracing::{debug, info};

use crate::system::{FallbackSystem, RunningGuard};

/// What one drain cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub processed: usize,
    pub completed: usize,
    /// Failed this cycle but still under the attempt cap.
    pub requeued: usize,
    /// Moved to `failed` this cycle.
    pub failed: usize,
    /// Another cycle was already running, so this one did nothing.
    pub skipped: bool,
}

impl FallbackSystem {
    /// Drains up to the configured number of items.
    pub async fn drain_queue(&self) -> DrainReport {
        self.drain_cycle(self.settings.max_items_per_cycle).await
    }

    /// Takes at most `max_items` from the front of the queue and tries each
    /// through the channels permitted at that moment.
    ///
    /// The batch is fixed when the cycle starts, so an item re-queued here
    /// is not retried until the next cycle. Only one cycle runs at a time.
    pub async fn drain_cycle(&self, max_items: usize) -> DrainReport {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("drain cycle already running, skipping");
            return DrainReport {
                skipped: true,
                ..DrainReport::default()
            };
        }
        let _running = RunningGuard(&self.draining);

        let batch = self.queue.lock().await.take_batch(max_items);
        let mut report = DrainReport::default();
        if batch.is_empty() {
            return report;
        }
        self.persist_queue().await;

        for item in batch {
            let permitted = self.permitted_channels().await;
            let walk = self.walk_channels(&item.request, &permitted).await;

            {
                let mut queue = self.queue.lock().await;
                match walk.delivered {
                    Some((channel, _)) => {
                        if queue.complete(&item.id, channel) {
                            report.completed += 1;
                        }
                    }
                    None => {
                        let error = walk
                            .last_error
                            .unwrap_or_else(|| "no delivery channel permitted".to_string());
                        match queue.fail(&item.id, error) {
                            Some(QueueStatus::Failed) => report.failed += 1,
                            Some(_) => report.requeued += 1,
                            None => {}
                        }
                    }
                }
            }
            report.processed += 1;
            self.persist_queue().await;
        }

        info!(
            processed = report.processed,
            completed = report.completed,
            requeued = report.requeued,
            failed = report.failed,
            "drain cycle finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::FallbackSettings;
    use reactiv_core::{ChannelKind, ChannelSet, DeliveryRequest, Priority};
    use reactiv_test_utils::{MemoryStore, MockChannel};

    async fn local_only(local: &MockChannel, store: &MemoryStore) -> FallbackSystem {
        FallbackSystem::open(
            FallbackSettings::default(),
            ChannelSet::new().with(local.adapter()),
            store.as_store(),
        )
        .await
        .unwrap()
    }

    async fn enqueue(system: &FallbackSystem, count: usize) {
        let mut queue = system.queue.lock().await;
        for n in 0..count {
            queue.enqueue(DeliveryRequest::new("5511", format!("m{n}")), Priority::Normal);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn drains_at_most_the_cap() {
        let store = MemoryStore::new();
        let local = MockChannel::succeeding(ChannelKind::Local);
        let system = local_only(&local, &store).await;
        enqueue(&system, 15).await;

        let report = system.drain_queue().await;

        assert_eq!(report.processed, 10);
        assert_eq!(report.completed, 10);
        let stats = system.queue_stats().await;
        assert_eq!((stats.pending, stats.completed), (5, 10));
        assert_eq!(store.queue().await.unwrap().completed.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_items_are_not_retried_in_the_same_cycle() {
        let store = MemoryStore::new();
        let local = MockChannel::failing(ChannelKind::Local);
        let system = local_only(&local, &store).await;
        enqueue(&system, 1).await;

        let report = system.drain_queue().await;

        assert_eq!(report.requeued, 1);
        assert_eq!(report.processed, 1);
        // one retry budget on one channel, not two
        assert_eq!(local.calls(), system.settings().retry.max_attempts);
        assert_eq!(system.queue_stats().await.pending, 1);
    }

    #[tokio::test]
    async fn empty_queue_is_a_no_op() {
        let store = MemoryStore::new();
        let local = MockChannel::succeeding(ChannelKind::Local);
        let system = local_only(&local, &store).await;
        let saves = store.queue_saves();

        assert_eq!(system.drain_queue().await, DrainReport::default());
        assert_eq!(store.queue_saves(), saves);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_cycles_are_skipped() {
        let store = MemoryStore::new();
        let local = MockChannel::succeeding(ChannelKind::Local);
        local.set_latency(std::time::Duration::from_secs(2)).await;
        let system = local_only(&local, &store).await;
        enqueue(&system, 1).await;

        let (first, second) = tokio::join!(system.drain_queue(), async {
            tokio::task::yield_now().await;
            system.drain_queue().await
        });

        assert_eq!(first.completed, 1);
        assert!(second.skipped);
        assert_eq!(local.calls(), 1);
    }
}
