// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workflow webhook channel, used for both the primary and the backup slot.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reactiv_config::model::WebhookConfig;
use reactiv_core::{
    ChannelAdapter, ChannelKind, DeliveryOutcome, DeliveryRequest, ProbeResult, ReactivError,
};
use reqwest::header::HeaderMap;
use serde::Serialize;
use tracing::debug;

use crate::http;

/// JSON body posted to a workflow webhook.
///
/// Carries both `recipient`/`body` and the `phone`/`text` aliases so either
/// naming convention on the workflow side picks the values up.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    recipient: &'a str,
    phone: &'a str,
    body: &'a str,
    text: &'a str,
    timestamp: String,
    source: &'a str,
    campaign: Option<&'a str>,
    request_id: &'a str,
    metadata: &'a reactiv_core::types::RequestMetadata,
}

#[derive(Debug, Serialize)]
struct ProbePayload {
    test: bool,
    source: &'static str,
    message: &'static str,
    timestamp: String,
}

/// Cloud workflow webhook adapter.
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    kind: ChannelKind,
    url: String,
    client: reqwest::Client,
    probe_timeout: Duration,
}

impl WebhookChannel {
    /// Creates a webhook adapter for `kind` (primary or backup).
    ///
    /// Fails when `config.url` is unset.
    pub fn new(
        kind: ChannelKind,
        config: &WebhookConfig,
        probe_timeout: Duration,
    ) -> Result<Self, ReactivError> {
        let url = config.url.clone().ok_or_else(|| {
            ReactivError::Config(format!("channels.{kind}.url is required for the {kind} webhook"))
        })?;
        let client = http::build_client(
            kind,
            Duration::from_secs(config.timeout_secs),
            HeaderMap::new(),
        )?;
        Ok(Self {
            kind,
            url,
            client,
            probe_timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChannelAdapter for WebhookChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn attempt_deliver(&self, request: &DeliveryRequest) -> DeliveryOutcome {
        if let Some(rejected) = http::reject_invalid(self.kind, request) {
            return rejected;
        }
        let metadata = request.metadata();
        let payload = WebhookPayload {
            recipient: request.recipient(),
            phone: request.recipient(),
            body: request.body(),
            text: request.body(),
            timestamp: Utc::now().to_rfc3339(),
            source: metadata.source.as_deref().unwrap_or("reactiv"),
            campaign: metadata.campaign.as_deref(),
            request_id: request.id(),
            metadata,
        };
        debug!(channel = %self.kind, request_id = request.id(), "posting to webhook");

        match self.client.post(&self.url).json(&payload).send().await {
            Ok(response) => http::interpret_response(self.kind, response).await,
            Err(e) => DeliveryOutcome::failed(self.kind, http::transport_failure(&e)),
        }
    }

    async fn probe(&self) -> ProbeResult {
        let payload = ProbePayload {
            test: true,
            source: "health_check",
            message: "connectivity test",
            timestamp: Utc::now().to_rfc3339(),
        };
        let request = self
            .client
            .post(&self.url)
            .timeout(self.probe_timeout)
            .json(&payload);
        http::run_probe(self.kind, request).await
    }
}
