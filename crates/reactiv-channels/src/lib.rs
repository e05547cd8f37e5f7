// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp delivery channels for Reactiv.
//!
//! Implements [`ChannelAdapter`] for the four downstream transports: the
//! primary and backup workflow webhooks, the local bridge and the local
//! direct-send client. Adapters make one HTTP call per attempt and leave
//! retries and health bookkeeping to the caller.

pub mod bridge;
mod http;
pub mod local;
pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use reactiv_config::model::ChannelsConfig;
use reactiv_core::{ChannelKind, ChannelSet, ReactivError};
use tracing::info;

pub use bridge::BridgeChannel;
pub use local::LocalChannel;
pub use webhook::WebhookChannel;

#[doc(no_inline)]
pub use reactiv_core::ChannelAdapter;

/// Builds the registered channel set from configuration.
///
/// Primary and local are always registered; backup and bridge only when
/// their URL is set.
pub fn build_channel_set(config: &ChannelsConfig) -> Result<ChannelSet, ReactivError> {
    let probe_timeout = Duration::from_secs(config.probe_timeout_secs);
    let mut set = ChannelSet::new();

    set.insert(Arc::new(WebhookChannel::new(
        ChannelKind::Primary,
        &config.primary,
        probe_timeout,
    )?));
    if config.backup.url.is_some() {
        set.insert(Arc::new(WebhookChannel::new(
            ChannelKind::Backup,
            &config.backup,
            probe_timeout,
        )?));
    }
    if config.bridge.url.is_some() {
        set.insert(Arc::new(BridgeChannel::new(&config.bridge, probe_timeout)?));
    }
    set.insert(Arc::new(LocalChannel::new(&config.local, probe_timeout)?));

    info!(channels = ?set.kinds(), "delivery channels registered");
    Ok(set)
}
