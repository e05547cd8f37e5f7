// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `reactiv send`, `reactiv recover` and `reactiv drain`.
//!
//! All three ask a running gateway to act, since the live health state and
//! queue belong to the serving process. `send --offline` instead dispatches
//! in this process against the configured channels and store, for hosts where
//! nothing is serving.

use reactiv_config::ReactivConfig;
use reactiv_core::{DeliveryRequest, DispatchResult, Priority, ReactivError};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::warn;

use crate::client::GatewayClient;
use crate::serve::build_system;

/// Arguments for `reactiv send`.
#[derive(Debug, Clone)]
pub struct SendArgs {
    pub to: String,
    pub body: String,
    pub campaign: Option<String>,
    pub high: bool,
    pub offline: bool,
    pub json: bool,
}

/// Body of `POST /v1/dispatch` as the CLI sends it.
#[derive(Debug, Serialize)]
struct DispatchPayload<'a> {
    recipient: &'a str,
    body: &'a str,
    source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    campaign: Option<&'a str>,
    priority: Priority,
}

impl SendArgs {
    fn priority(&self) -> Priority {
        if self.high {
            Priority::High
        } else {
            Priority::Normal
        }
    }

    fn payload(&self) -> DispatchPayload<'_> {
        DispatchPayload {
            recipient: &self.to,
            body: &self.body,
            source: "cli",
            campaign: self.campaign.as_deref(),
            priority: self.priority(),
        }
    }

    fn into_request(self) -> DeliveryRequest {
        let priority = self.priority();
        let mut request = DeliveryRequest::new(self.to, self.body)
            .with_priority(priority)
            .with_source("cli");
        if let Some(campaign) = self.campaign {
            request = request.with_campaign(campaign);
        }
        request
    }
}

/// Dispatches one message and prints the outcome.
///
/// Goes through the running gateway unless `--offline` was given. Returns an
/// error when the message was rejected so the process exits non-zero. A
/// queued message is not an error.
pub async fn run_send(config: &ReactivConfig, args: SendArgs) -> Result<(), ReactivError> {
    if !args.offline && !config.gateway.enabled {
        return Err(ReactivError::Config(
            "gateway is disabled; enable [gateway] and run `reactiv serve`, \
             or pass --offline to dispatch from this process"
                .to_string(),
        ));
    }
    crate::serve::init_tracing(&config.service.log_level);
    let json = args.json;
    let result = if args.offline {
        send_offline(config, args).await?
    } else {
        let client = GatewayClient::new(&config.gateway)?;
        send_via_gateway(&client, &args).await?
    };

    if json {
        print_json(&result);
    } else {
        println!("{}", describe_dispatch(&result));
    }

    match &result.error {
        Some(error) if !result.success && !result.queued => {
            Err(ReactivError::InvalidRequest(error.clone()))
        }
        _ => Ok(()),
    }
}

/// Dispatches through the serving process. 202 (queued) and 422 (rejected)
/// both carry a dispatch result.
async fn send_via_gateway(
    client: &GatewayClient,
    args: &SendArgs,
) -> Result<DispatchResult, ReactivError> {
    client
        .post_json(
            "/v1/dispatch",
            &args.payload(),
            &[StatusCode::UNPROCESSABLE_ENTITY],
        )
        .await
}

async fn send_offline(config: &ReactivConfig, args: SendArgs) -> Result<DispatchResult, ReactivError> {
    if config.gateway.enabled {
        warn!("dispatching in-process; a running `reactiv serve` on the same state will overwrite this run's snapshot");
    }
    let system = build_system(config).await?;
    let result = system.dispatch(args.into_request()).await;
    system.shutdown().await;
    Ok(result)
}

/// Triggers a manual recovery on the running service.
pub async fn run_recover(config: &ReactivConfig, json: bool) -> Result<(), ReactivError> {
    let client = GatewayClient::new(&config.gateway)?;
    let result: serde_json::Value = client.post("/v1/recovery").await?;

    if json {
        print_json(&result);
    } else {
        match result["restored_by"].as_str() {
            Some(action) => println!("recovery succeeded via {action}"),
            None => println!("recovery failed, manual intervention required"),
        }
        println!(
            "  level: {}, recovery attempts: {}",
            result["level"].as_str().unwrap_or("unknown"),
            result["recovery_attempts"]
        );
    }
    Ok(())
}

/// Runs one queue drain cycle on the running service.
pub async fn run_drain(
    config: &ReactivConfig,
    max_items: Option<usize>,
    json: bool,
) -> Result<(), ReactivError> {
    let client = GatewayClient::new(&config.gateway)?;
    let path = match max_items {
        Some(n) => format!("/v1/queue/process?max_items={n}"),
        None => "/v1/queue/process".to_string(),
    };
    let report: serde_json::Value = client.post(&path).await?;

    if json {
        print_json(&report);
    } else if report["skipped"].as_bool().unwrap_or(false) {
        println!("a drain cycle was already running; nothing done");
    } else {
        println!(
            "processed {}: {} completed, {} requeued, {} failed",
            report["processed"], report["completed"], report["requeued"], report["failed"]
        );
    }
    Ok(())
}

fn describe_dispatch(result: &DispatchResult) -> String {
    if result.success {
        let channel = result
            .channel
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "sent {} via {channel} after {} attempt(s)",
            result.request_id, result.attempts
        )
    } else if result.queued {
        format!(
            "all channels failed after {} attempt(s); queued as {} ({})",
            result.attempts,
            result.queue_id.as_deref().unwrap_or("-"),
            result.error.as_deref().unwrap_or("no error recorded")
        )
    } else {
        format!(
            "rejected {}: {}",
            result.request_id,
            result.error.as_deref().unwrap_or("invalid request")
        )
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactiv_core::ChannelKind;

    fn args(high: bool) -> SendArgs {
        SendArgs {
            to: "5511999999999".into(),
            body: "Oi".into(),
            campaign: Some("reactivation-q3".into()),
            high,
            offline: false,
            json: false,
        }
    }

    #[test]
    fn send_args_build_cli_request() {
        let request = args(true).into_request();
        assert_eq!(request.recipient(), "5511999999999");
        assert_eq!(request.priority(), Priority::High);
        assert_eq!(request.metadata().source.as_deref(), Some("cli"));
        assert_eq!(request.metadata().campaign.as_deref(), Some("reactivation-q3"));
        assert_eq!(args(false).into_request().priority(), Priority::Normal);
    }

    #[tokio::test]
    async fn send_goes_through_the_gateway_dispatch_route() {
        use wiremock::matchers::{body_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let queued = DispatchResult::queued("req-9", "q-1".into(), 4, Some("local: down".into()));
        Mock::given(method("POST"))
            .and(path("/v1/dispatch"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(serde_json::json!({
                "recipient": "5511999999999",
                "body": "Oi",
                "source": "cli",
                "campaign": "reactivation-q3",
                "priority": "high"
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(&queued))
            .expect(1)
            .mount(&server)
            .await;

        let client = GatewayClient::with_base_url(server.uri(), Some("tok".into())).unwrap();
        let result = send_via_gateway(&client, &args(true)).await.unwrap();
        assert!(result.queued);
        assert_eq!(result.queue_id.as_deref(), Some("q-1"));
    }

    #[tokio::test]
    async fn send_without_gateway_or_offline_is_refused() {
        let mut config = ReactivConfig::default();
        config.channels.primary.url = Some("http://127.0.0.1:1/send".into());
        let err = run_send(&config, args(false)).await.unwrap_err();
        assert!(matches!(&err, ReactivError::Config(msg) if msg.contains("--offline")));
    }

    #[test]
    fn describes_each_outcome() {
        let sent = DispatchResult::sent("req-1", ChannelKind::Bridge, 2);
        assert_eq!(describe_dispatch(&sent), "sent req-1 via bridge after 2 attempt(s)");

        let rejected = DispatchResult::rejected("req-2", "recipient is empty".into());
        assert!(describe_dispatch(&rejected).starts_with("rejected req-2"));
    }
}
