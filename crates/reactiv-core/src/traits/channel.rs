// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for downstream message transports.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{ChannelKind, DeliveryOutcome, DeliveryRequest, ProbeResult};

/// A single downstream transport able to deliver a WhatsApp message.
///
/// Adapters make exactly one network call per [`attempt_deliver`](Self::attempt_deliver)
/// and never touch shared state: retrying, health bookkeeping and
/// persistence belong to the caller. Transport errors are reported inside
/// the returned outcome, never as a panic or an `Err`.
#[async_trait]
pub trait ChannelAdapter: Send + Sync + 'static {
    /// Which channel this adapter implements.
    fn kind(&self) -> ChannelKind;

    /// Sends the request once, bounded by the adapter's own timeout.
    async fn attempt_deliver(&self, request: &DeliveryRequest) -> DeliveryOutcome;

    /// Issues a lightweight reachability check.
    async fn probe(&self) -> ProbeResult;
}

/// The registered channels, keyed by [`ChannelKind`].
///
/// Iteration follows preference order because `ChannelKind` orders that way.
#[derive(Clone, Default)]
pub struct ChannelSet {
    channels: BTreeMap<ChannelKind, Arc<dyn ChannelAdapter>>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under its own kind, replacing any previous one.
    pub fn insert(&mut self, adapter: Arc<dyn ChannelAdapter>) {
        self.channels.insert(adapter.kind(), adapter);
    }

    pub fn with(mut self, adapter: Arc<dyn ChannelAdapter>) -> Self {
        self.insert(adapter);
        self
    }

    pub fn get(&self, kind: ChannelKind) -> Option<&Arc<dyn ChannelAdapter>> {
        self.channels.get(&kind)
    }

    pub fn contains(&self, kind: ChannelKind) -> bool {
        self.channels.contains_key(&kind)
    }

    /// Registered kinds in preference order.
    pub fn kinds(&self) -> Vec<ChannelKind> {
        self.channels.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChannelKind, &Arc<dyn ChannelAdapter>)> {
        self.channels.iter().map(|(k, v)| (*k, v))
    }
}

impl std::fmt::Debug for ChannelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSet")
            .field("channels", &self.kinds())
            .finish()
    }
}
