// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP-level tests for the channel adapters against wiremock servers.

use std::time::Duration;

use reactiv_channels::{BridgeChannel, ChannelAdapter, LocalChannel, WebhookChannel};
use reactiv_config::model::{BridgeConfig, LocalConfig, WebhookConfig};
use reactiv_core::{ChannelKind, DeliveryRequest};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

fn webhook(kind: ChannelKind, server: &MockServer) -> WebhookChannel {
    let config = WebhookConfig {
        url: Some(format!("{}/webhook/whatsapp-send", server.uri())),
        timeout_secs: 2,
    };
    WebhookChannel::new(kind, &config, PROBE_TIMEOUT).unwrap()
}

fn bridge(server: &MockServer) -> BridgeChannel {
    let config = BridgeConfig {
        url: Some(server.uri()),
        timeout_secs: 2,
    };
    BridgeChannel::new(&config, PROBE_TIMEOUT).unwrap()
}

fn local(server: &MockServer, api_key: Option<&str>) -> LocalChannel {
    let config = LocalConfig {
        url: server.uri(),
        session: "default".into(),
        api_key: api_key.map(str::to_string),
        timeout_secs: 2,
    };
    LocalChannel::new(&config, PROBE_TIMEOUT).unwrap()
}

fn request() -> DeliveryRequest {
    DeliveryRequest::new("5511999999999", "Oi! Sentimos sua falta.")
        .with_source("campaign_dispatcher")
        .with_campaign("reactivation-90d")
}

#[tokio::test]
async fn webhook_posts_payload_and_succeeds_on_2xx() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook/whatsapp-send"))
        .and(body_partial_json(serde_json::json!({
            "recipient": "5511999999999",
            "phone": "5511999999999",
            "text": "Oi! Sentimos sua falta.",
            "source": "campaign_dispatcher",
            "campaign": "reactivation-90d",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = webhook(ChannelKind::Primary, &server)
        .attempt_deliver(&request())
        .await;
    assert!(outcome.success, "{outcome:?}");
    assert_eq!(outcome.channel, ChannelKind::Primary);
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn webhook_5xx_is_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let outcome = webhook(ChannelKind::Backup, &server)
        .attempt_deliver(&request())
        .await;
    assert!(!outcome.success);
    assert_eq!(outcome.channel, ChannelKind::Backup);
    let error = outcome.error.unwrap();
    assert!(!error.is_permanent());
    assert_eq!(error.status, Some(502));
}

#[tokio::test]
async fn webhook_4xx_is_permanent_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid phone"))
        .mount(&server)
        .await;

    let outcome = webhook(ChannelKind::Primary, &server)
        .attempt_deliver(&request())
        .await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().is_permanent());
}

#[tokio::test]
async fn error_body_on_2xx_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"success": false, "message": "quota exceeded"})),
        )
        .mount(&server)
        .await;

    let outcome = webhook(ChannelKind::Primary, &server)
        .attempt_deliver(&request())
        .await;
    assert!(!outcome.success);
    assert_eq!(outcome.error_message(), Some("quota exceeded"));
}

#[tokio::test]
async fn slow_webhook_times_out_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = WebhookConfig {
        url: Some(server.uri()),
        timeout_secs: 1,
    };
    let channel = WebhookChannel::new(ChannelKind::Primary, &config, PROBE_TIMEOUT).unwrap();
    let outcome = channel.attempt_deliver(&request()).await;
    assert!(!outcome.success);
    assert!(!outcome.error.unwrap().is_permanent());
}

#[tokio::test]
async fn unreachable_host_is_failure_not_panic() {
    let config = WebhookConfig {
        url: Some("http://127.0.0.1:9/webhook".into()),
        timeout_secs: 1,
    };
    let channel = WebhookChannel::new(ChannelKind::Primary, &config, PROBE_TIMEOUT).unwrap();
    let outcome = channel.attempt_deliver(&request()).await;
    assert!(!outcome.success);
    assert!(outcome.error.is_some());

    let probe = channel.probe().await;
    assert!(!probe.reachable);
    assert!(probe.detail.is_some());
}

#[tokio::test]
async fn invalid_request_makes_no_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = webhook(ChannelKind::Primary, &server)
        .attempt_deliver(&DeliveryRequest::new("", "hello"))
        .await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().is_permanent());
}

#[tokio::test]
async fn webhook_probe_posts_synthetic_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({
            "test": true,
            "source": "health_check",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let probe = webhook(ChannelKind::Primary, &server).probe().await;
    assert!(probe.reachable, "{probe:?}");
    assert_eq!(probe.channel, ChannelKind::Primary);
}

#[tokio::test]
async fn bridge_injects_lead() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/leads/inject"))
        .and(body_partial_json(serde_json::json!({
            "recipient": "5511999999999",
            "text": "Oi! Sentimos sua falta.",
            "source": "fallback_bridge",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"queued": true})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = bridge(&server).attempt_deliver(&request()).await;
    assert!(outcome.success, "{outcome:?}");
    assert_eq!(outcome.channel, ChannelKind::Bridge);
}

#[tokio::test]
async fn bridge_probe_uses_status_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let probe = bridge(&server).probe().await;
    assert!(!probe.reachable);
    assert_eq!(probe.detail.as_deref(), Some("probe returned HTTP 503"));
}

#[tokio::test]
async fn local_sends_text_with_chat_id_and_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sendText"))
        .and(header("x-api-key", "local-secret"))
        .and(body_partial_json(serde_json::json!({
            "session": "default",
            "chatId": "5511999999999@c.us",
            "text": "Oi! Sentimos sua falta.",
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "true_5511999999999@c.us_ABC"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let outcome = local(&server, Some("local-secret"))
        .attempt_deliver(&request())
        .await;
    assert!(outcome.success, "{outcome:?}");
    assert!(outcome.response.unwrap().contains("ABC"));
}

#[tokio::test]
async fn local_probe_uses_health_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let probe = local(&server, None).probe().await;
    assert!(probe.reachable);
    assert_eq!(probe.channel, ChannelKind::Local);
}
