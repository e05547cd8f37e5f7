// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local direct-send channel backed by a WhatsApp HTTP API client.
//!
//! This is the last resort: it is the only channel permitted in fallback mode.

use std::time::Duration;

use async_trait::async_trait;
use reactiv_config::model::LocalConfig;
use reactiv_core::{
    ChannelAdapter, ChannelKind, DeliveryOutcome, DeliveryRequest, ProbeResult, ReactivError,
};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use tracing::debug;

use crate::http;

pub const SEND_TEXT_PATH: &str = "/api/sendText";
pub const HEALTH_PATH: &str = "/api/health";

#[derive(Debug, Serialize)]
struct SendTextPayload<'a> {
    session: &'a str,
    #[serde(rename = "chatId")]
    chat_id: String,
    text: &'a str,
}

/// Converts a bare phone number into a WhatsApp chat id.
///
/// Recipients that already carry a `@` suffix are passed through.
pub fn chat_id(recipient: &str) -> String {
    let recipient = recipient.trim();
    if recipient.contains('@') {
        recipient.to_string()
    } else {
        let digits: String = recipient.chars().filter(|c| c.is_ascii_digit()).collect();
        format!("{digits}@c.us")
    }
}

/// Direct-send adapter.
#[derive(Debug, Clone)]
pub struct LocalChannel {
    base_url: String,
    session: String,
    client: reqwest::Client,
    probe_timeout: Duration,
}

impl LocalChannel {
    pub fn new(config: &LocalConfig, probe_timeout: Duration) -> Result<Self, ReactivError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref() {
            headers.insert(
                "x-api-key",
                HeaderValue::from_str(key).map_err(|e| {
                    ReactivError::Config(format!("invalid channels.local.api_key header value: {e}"))
                })?,
            );
        }
        let client = http::build_client(
            ChannelKind::Local,
            Duration::from_secs(config.timeout_secs),
            headers,
        )?;
        Ok(Self {
            base_url: config.url.clone(),
            session: config.session.clone(),
            client,
            probe_timeout,
        })
    }
}

#[async_trait]
impl ChannelAdapter for LocalChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Local
    }

    async fn attempt_deliver(&self, request: &DeliveryRequest) -> DeliveryOutcome {
        if let Some(rejected) = http::reject_invalid(ChannelKind::Local, request) {
            return rejected;
        }
        let payload = SendTextPayload {
            session: &self.session,
            chat_id: chat_id(request.recipient()),
            text: request.body(),
        };
        debug!(request_id = request.id(), chat_id = %payload.chat_id, "sending directly");

        let url = http::join_url(&self.base_url, SEND_TEXT_PATH);
        match self.client.post(&url).json(&payload).send().await {
            Ok(response) => http::interpret_response(ChannelKind::Local, response).await,
            Err(e) => DeliveryOutcome::failed(ChannelKind::Local, http::transport_failure(&e)),
        }
    }

    async fn probe(&self) -> ProbeResult {
        let request = self
            .client
            .get(http::join_url(&self.base_url, HEALTH_PATH))
            .timeout(self.probe_timeout);
        http::run_probe(ChannelKind::Local, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_strips_formatting() {
        assert_eq!(chat_id("+55 (11) 99999-9999"), "5511999999999@c.us");
        assert_eq!(chat_id("5511999999999"), "5511999999999@c.us");
    }

    #[test]
    fn chat_id_keeps_existing_suffix() {
        assert_eq!(chat_id("120363025@g.us"), "120363025@g.us");
    }
}
