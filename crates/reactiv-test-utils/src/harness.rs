// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end fallback testing.
//!
//! `TestHarness` assembles a [`FallbackSystem`] over scripted mock channels
//! and an in-memory store. It keeps handles to both so tests can steer
//! channel behaviour and inspect what was persisted.

use std::collections::BTreeMap;
use std::sync::Arc;

use reactiv_core::{ChannelKind, ChannelSet, DeliveryRequest, DispatchResult, ReactivError};
use reactiv_fallback::{FallbackSettings, FallbackSystem, RetryPolicy};

use crate::memory_store::MemoryStore;
use crate::mock_channel::MockChannel;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    channels: BTreeMap<ChannelKind, MockChannel>,
    settings: FallbackSettings,
    store: MemoryStore,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            channels: BTreeMap::new(),
            settings: FallbackSettings::default(),
            store: MemoryStore::new(),
        }
    }

    /// Registers a mock channel under its own kind.
    pub fn with_channel(mut self, channel: MockChannel) -> Self {
        use reactiv_core::ChannelAdapter;
        self.channels.insert(channel.kind(), channel);
        self
    }

    pub fn with_settings(mut self, settings: FallbackSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.settings.retry = retry;
        self
    }

    /// Starts from a store that already holds snapshots.
    pub fn with_store(mut self, store: MemoryStore) -> Self {
        self.store = store;
        self
    }

    /// Builds the system. With no channels registered, all four succeed.
    pub async fn build(mut self) -> Result<TestHarness, ReactivError> {
        if self.channels.is_empty() {
            for kind in ChannelKind::ALL {
                self.channels.insert(kind, MockChannel::succeeding(kind));
            }
        }
        let harness = TestHarness {
            system: Arc::new(open(&self.channels, &self.settings, &self.store).await?),
            channels: self.channels,
            settings: self.settings,
            store: self.store,
        };
        Ok(harness)
    }
}

async fn open(
    channels: &BTreeMap<ChannelKind, MockChannel>,
    settings: &FallbackSettings,
    store: &MemoryStore,
) -> Result<FallbackSystem, ReactivError> {
    let set = channels
        .values()
        .fold(ChannelSet::new(), |set, channel| set.with(channel.adapter()));
    FallbackSystem::open(settings.clone(), set, store.as_store()).await
}

/// A fallback system wired to mock channels and an in-memory store.
pub struct TestHarness {
    pub system: Arc<FallbackSystem>,
    pub store: MemoryStore,
    channels: BTreeMap<ChannelKind, MockChannel>,
    settings: FallbackSettings,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The mock registered for `kind`, if any.
    pub fn channel(&self, kind: ChannelKind) -> Option<&MockChannel> {
        self.channels.get(&kind)
    }

    /// Dispatches a plain request to `recipient`.
    pub async fn dispatch(&self, recipient: &str, body: &str) -> DispatchResult {
        self.system
            .dispatch(DeliveryRequest::new(recipient, body))
            .await
    }

    /// Builds a fresh system over the same channels and store, as a process
    /// restart would.
    pub async fn restart(&self) -> Result<TestHarness, ReactivError> {
        Ok(TestHarness {
            system: Arc::new(open(&self.channels, &self.settings, &self.store).await?),
            store: self.store.clone(),
            channels: self.channels.clone(),
            settings: self.settings.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_harness_delivers_through_primary() {
        let harness = TestHarness::builder().build().await.unwrap();
        let result = harness.dispatch("5511999999999", "Oi").await;
        assert!(result.success);
        assert_eq!(result.channel, Some(ChannelKind::Primary));
        assert_eq!(
            harness.channel(ChannelKind::Primary).unwrap().calls(),
            1
        );
    }

    #[tokio::test]
    async fn restart_shares_the_store() {
        let harness = TestHarness::builder()
            .with_channel(MockChannel::succeeding(ChannelKind::Local))
            .build()
            .await
            .unwrap();
        harness.system.health().await;
        let restarted = harness.restart().await.unwrap();
        assert!(restarted.store.health().await.is_some());
        assert!(restarted.channel(ChannelKind::Primary).is_none());
    }
}
