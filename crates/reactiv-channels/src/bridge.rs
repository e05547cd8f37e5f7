// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local bridge channel: injects the message as a lead into a bridge process
//! that owns its own WhatsApp session.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reactiv_config::model::BridgeConfig;
use reactiv_core::types::RequestMetadata;
use reactiv_core::{
    ChannelAdapter, ChannelKind, DeliveryOutcome, DeliveryRequest, ProbeResult, ReactivError,
};
use reqwest::header::HeaderMap;
use serde::Serialize;
use tracing::debug;

use crate::http;

/// Path of the lead injection endpoint.
pub const INJECT_PATH: &str = "/api/leads/inject";

/// Path probed for reachability.
pub const STATUS_PATH: &str = "/status";

#[derive(Debug, Serialize)]
struct InjectPayload<'a> {
    recipient: &'a str,
    text: &'a str,
    source: &'static str,
    timestamp: String,
    request_id: &'a str,
    metadata: &'a RequestMetadata,
}

/// Bridge process adapter.
#[derive(Debug, Clone)]
pub struct BridgeChannel {
    base_url: String,
    client: reqwest::Client,
    probe_timeout: Duration,
}

impl BridgeChannel {
    pub fn new(config: &BridgeConfig, probe_timeout: Duration) -> Result<Self, ReactivError> {
        let base_url = config.url.clone().ok_or_else(|| {
            ReactivError::Config("channels.bridge.url is required for the bridge channel".into())
        })?;
        let client = http::build_client(
            ChannelKind::Bridge,
            Duration::from_secs(config.timeout_secs),
            HeaderMap::new(),
        )?;
        Ok(Self {
            base_url,
            client,
            probe_timeout,
        })
    }
}

#[async_trait]
impl ChannelAdapter for BridgeChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Bridge
    }

    async fn attempt_deliver(&self, request: &DeliveryRequest) -> DeliveryOutcome {
        if let Some(rejected) = http::reject_invalid(ChannelKind::Bridge, request) {
            return rejected;
        }
        let payload = InjectPayload {
            recipient: request.recipient(),
            text: request.body(),
            source: "fallback_bridge",
            timestamp: Utc::now().to_rfc3339(),
            request_id: request.id(),
            metadata: request.metadata(),
        };
        let url = http::join_url(&self.base_url, INJECT_PATH);
        debug!(request_id = request.id(), %url, "injecting lead into bridge");

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) => http::interpret_response(ChannelKind::Bridge, response).await,
            Err(e) => DeliveryOutcome::failed(ChannelKind::Bridge, http::transport_failure(&e)),
        }
    }

    async fn probe(&self) -> ProbeResult {
        let request = self
            .client
            .get(http::join_url(&self.base_url, STATUS_PATH))
            .timeout(self.probe_timeout);
        http::run_probe(ChannelKind::Bridge, request).await
    }
}
