// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end behaviour of the fallback system over mock channels.

use std::time::Duration;

use reactiv_core::{
    ChannelKind, DeliveryRequest, HealthLevel, OperatingMode, PersistedState, Priority,
    QueueItem, QueueSnapshot, QueueStatus,
};
use reactiv_fallback::RecoveryAction;
use reactiv_test_utils::{MemoryStore, MockChannel, TestHarness};

const RECIPIENT: &str = "5511999999999";

fn mock(harness: &TestHarness, kind: ChannelKind) -> &MockChannel {
    harness.channel(kind).expect("channel registered")
}

async fn all_failing() -> TestHarness {
    ChannelKind::ALL
        .into_iter()
        .fold(TestHarness::builder(), |builder, kind| {
            builder.with_channel(MockChannel::failing(kind))
        })
        .build()
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn webhooks_down_bridge_delivers_on_first_attempt() {
    let harness = TestHarness::builder()
        .with_channel(MockChannel::failing(ChannelKind::Primary))
        .with_channel(MockChannel::failing(ChannelKind::Backup))
        .with_channel(MockChannel::succeeding(ChannelKind::Bridge))
        .with_channel(MockChannel::succeeding(ChannelKind::Local))
        .build()
        .await
        .unwrap();

    let started = tokio::time::Instant::now();
    let result = harness.dispatch(RECIPIENT, "Volta pra academia!").await;

    assert!(result.success);
    assert!(!result.queued);
    assert_eq!(result.channel, Some(ChannelKind::Bridge));
    assert_eq!(result.attempts, 1);
    assert_eq!(mock(&harness, ChannelKind::Primary).calls(), 5);
    assert_eq!(mock(&harness, ChannelKind::Backup).calls(), 5);
    assert_eq!(mock(&harness, ChannelKind::Bridge).calls(), 1);
    assert_eq!(mock(&harness, ChannelKind::Local).calls(), 0);
    // two full backoff sequences of 5 + 10 + 20 + 40 seconds
    assert_eq!(started.elapsed(), Duration::from_secs(150));
}

#[tokio::test(start_paused = true)]
async fn every_channel_down_queues_with_high_priority() {
    let harness = all_failing().await;

    let result = harness.dispatch(RECIPIENT, "Oi").await;

    assert!(!result.success);
    assert!(result.queued);
    assert_eq!(result.attempts, 20);
    let saved = harness.store.queue().await.expect("queue persisted");
    assert_eq!(saved.pending.len(), 1);
    assert_eq!(saved.pending[0].priority, Priority::High);
    assert_eq!(saved.pending[0].status, QueueStatus::Pending);
    assert_eq!(result.queue_id.as_deref(), Some(saved.pending[0].id.as_str()));
}

#[tokio::test(start_paused = true)]
async fn one_of_four_reachable_leaves_only_local() {
    let harness = TestHarness::builder()
        .with_channel(MockChannel::failing(ChannelKind::Primary))
        .with_channel(MockChannel::failing(ChannelKind::Backup))
        .with_channel(MockChannel::failing(ChannelKind::Bridge))
        .with_channel(MockChannel::succeeding(ChannelKind::Local))
        .build()
        .await
        .unwrap();

    harness.system.run_health_check().await;

    let health = harness.system.health().await;
    assert_eq!(health.level, HealthLevel::Fallback);
    assert_eq!(health.mode, OperatingMode::LocalOnly);
    assert_eq!(
        harness.system.permitted_channels().await,
        vec![ChannelKind::Local]
    );

    let result = harness.dispatch(RECIPIENT, "Oi").await;
    assert_eq!(result.channel, Some(ChannelKind::Local));
    assert_eq!(mock(&harness, ChannelKind::Primary).calls(), 0);
    assert_eq!(mock(&harness, ChannelKind::Backup).calls(), 0);
    assert_eq!(mock(&harness, ChannelKind::Bridge).calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn clustered_failures_trigger_primary_reactivation() {
    let harness = all_failing().await;
    for _ in 0..3 {
        harness.dispatch(RECIPIENT, "Oi").await;
    }
    assert_eq!(harness.system.health().await.consecutive_failures, 3);
    assert!(harness.system.needs_recovery().await);

    mock(&harness, ChannelKind::Primary).set_reachable(true);
    let result = harness
        .system
        .maybe_recover()
        .await
        .expect("threshold reached");

    assert_eq!(result.restored_by, Some(RecoveryAction::ReactivatePrimary));
    let health = harness.system.health().await;
    assert_eq!(health.consecutive_failures, 0);
    assert!(health.primary_active);
    assert_eq!(health.recovery_attempts, 1);
    assert!(!harness.system.needs_recovery().await);
}

#[tokio::test(start_paused = true)]
async fn queue_item_fails_after_three_cycles() {
    let harness = all_failing().await;
    let queued = harness.dispatch(RECIPIENT, "Oi").await;
    let queue_id = queued.queue_id.expect("queued");

    for cycle in 1..=3 {
        let report = harness.system.drain_queue().await;
        assert_eq!(report.processed, 1, "cycle {cycle}");
    }

    let snapshot = harness.system.queue_snapshot().await;
    assert!(snapshot.pending.is_empty());
    assert_eq!(snapshot.failed.len(), 1);
    assert_eq!(snapshot.failed[0].id, queue_id);
    assert_eq!(snapshot.failed[0].attempts, 3);

    let local = mock(&harness, ChannelKind::Local);
    let calls_before = local.calls();
    let report = harness.system.drain_queue().await;
    assert_eq!(report.processed, 0);
    assert_eq!(local.calls(), calls_before);
}

#[tokio::test(start_paused = true)]
async fn queue_survives_restart() {
    let store = MemoryStore::new();
    let backlog = QueueItem::new(
        DeliveryRequest::new(RECIPIENT, "backlog").with_campaign("winback-q4"),
        Priority::Normal,
        3,
    );
    store
        .seed(PersistedState {
            health: None,
            queue: Some(QueueSnapshot {
                pending: vec![backlog.clone()],
                ..QueueSnapshot::default()
            }),
        })
        .await;
    let harness = ChannelKind::ALL
        .into_iter()
        .fold(TestHarness::builder().with_store(store), |builder, kind| {
            builder.with_channel(MockChannel::failing(kind))
        })
        .build()
        .await
        .unwrap();

    let routine = harness.dispatch(RECIPIENT, "routine").await;
    let urgent = harness
        .system
        .dispatch(DeliveryRequest::new(RECIPIENT, "urgent").with_priority(Priority::High))
        .await;
    // only the front item, the urgent one, is tried and requeued
    let report = harness.system.drain_cycle(1).await;
    assert_eq!(report.requeued, 1);
    let before = harness.system.queue_snapshot().await;

    let restarted = harness.restart().await.unwrap();

    let after = restarted.system.queue_snapshot().await;
    assert_eq!(after, before);
    let ids: Vec<Option<&str>> = after.pending.iter().map(|i| Some(i.id.as_str())).collect();
    assert_eq!(
        ids,
        vec![
            routine.queue_id.as_deref(),
            Some(backlog.id.as_str()),
            urgent.queue_id.as_deref(),
        ]
    );

    let (first, second, third) = (&after.pending[0], &after.pending[1], &after.pending[2]);
    assert_eq!(first.priority, Priority::High);
    assert_eq!(first.request.priority(), Priority::Normal);
    assert_eq!(first.attempts, 0);
    assert!(first.last_error.is_none());

    assert_eq!(second.priority, Priority::Normal);
    assert_eq!(second.request.body(), "backlog");
    assert_eq!(
        second.request.metadata().campaign.as_deref(),
        Some("winback-q4")
    );
    assert_eq!(second.created_at, backlog.created_at);
    assert_eq!(second.attempts, 0);

    assert_eq!(third.priority, Priority::High);
    assert_eq!(third.request.priority(), Priority::High);
    assert_eq!(third.request.body(), "urgent");
    assert_eq!(third.attempts, 1);
    assert_eq!(third.max_attempts, 3);
    assert!(third.last_error.as_deref().is_some_and(|e| e.starts_with("local:")));
    assert!(after.pending.iter().all(|i| i.status == QueueStatus::Pending));

    let health = restarted.system.health().await;
    assert_eq!(health.total_failures, 2);
}

#[tokio::test]
async fn interrupted_items_resume_first_after_restart() {
    let store = MemoryStore::new();
    let mut interrupted =
        QueueItem::new(DeliveryRequest::new(RECIPIENT, "first"), Priority::Normal, 3);
    interrupted.status = QueueStatus::Processing;
    let waiting = QueueItem::new(DeliveryRequest::new(RECIPIENT, "second"), Priority::Normal, 3);
    store
        .seed(PersistedState {
            health: None,
            queue: Some(QueueSnapshot {
                pending: vec![waiting],
                processing: vec![interrupted],
                ..QueueSnapshot::default()
            }),
        })
        .await;

    let harness = TestHarness::builder()
        .with_channel(MockChannel::succeeding(ChannelKind::Local))
        .with_store(store)
        .build()
        .await
        .unwrap();

    let report = harness.system.drain_cycle(1).await;
    assert_eq!(report.completed, 1);
    let delivered = mock(&harness, ChannelKind::Local).delivered().await;
    assert_eq!(delivered[0].body(), "first");
}

#[tokio::test(start_paused = true)]
async fn concurrent_dispatches_each_deliver_once() {
    let harness = TestHarness::builder()
        .with_channel(MockChannel::succeeding(ChannelKind::Local))
        .build()
        .await
        .unwrap();

    let (a, b, c) = tokio::join!(
        harness.dispatch(RECIPIENT, "a"),
        harness.dispatch(RECIPIENT, "b"),
        harness.dispatch(RECIPIENT, "c"),
    );

    assert!(a.success && b.success && c.success);
    assert_eq!(mock(&harness, ChannelKind::Local).calls(), 3);
    assert_eq!(mock(&harness, ChannelKind::Local).delivered().await.len(), 3);
}
