// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared HTTP plumbing for the channel adapters.
//!
//! Every adapter funnels its response through [`interpret_response`] so the
//! success rule is identical across channels: a 2xx status whose body does
//! not report an error.

use std::time::{Duration, Instant};

use reactiv_core::{
    ChannelKind, DeliveryFailure, DeliveryOutcome, DeliveryRequest, ProbeResult, ReactivError,
};
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use tracing::debug;

/// Builds the pooled client an adapter keeps for its lifetime.
///
/// `timeout` bounds delivery calls; probes override it per request.
pub(crate) fn build_client(
    kind: ChannelKind,
    timeout: Duration,
    headers: HeaderMap,
) -> Result<reqwest::Client, ReactivError> {
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| ReactivError::Channel {
            message: format!("failed to build HTTP client for {kind} channel: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Joins a base URL and an absolute path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Returns a failed outcome when the request breaks the channel input contract.
pub(crate) fn reject_invalid(kind: ChannelKind, request: &DeliveryRequest) -> Option<DeliveryOutcome> {
    request
        .validate()
        .err()
        .map(|e| DeliveryOutcome::failed(kind, DeliveryFailure::permanent(e.to_string())))
}

/// Classifies a transport error (no HTTP status received).
pub(crate) fn transport_failure(err: &reqwest::Error) -> DeliveryFailure {
    if err.is_timeout() {
        DeliveryFailure::transient(format!("request timed out: {err}"))
    } else if err.is_connect() {
        DeliveryFailure::transient(format!("connection failed: {err}"))
    } else if err.is_builder() {
        DeliveryFailure::permanent(format!("invalid request: {err}"))
    } else {
        DeliveryFailure::transient(format!("HTTP request failed: {err}"))
    }
}

/// Turns a completed HTTP exchange into a [`DeliveryOutcome`].
pub(crate) async fn interpret_response(
    kind: ChannelKind,
    response: reqwest::Response,
) -> DeliveryOutcome {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("json"));
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            return DeliveryOutcome::failed(
                kind,
                DeliveryFailure::transient(format!("failed to read response body: {e}")),
            );
        }
    };
    debug!(channel = %kind, status = %status, "channel response received");

    if !status.is_success() {
        return DeliveryOutcome::failed(kind, DeliveryFailure::from_status(status.as_u16(), &body))
            .with_response(body);
    }

    match body_error(&body, is_json) {
        Some(failure) => DeliveryOutcome::failed(kind, failure).with_response(body),
        None => {
            let response = (!body.trim().is_empty()).then_some(body);
            DeliveryOutcome::delivered(kind, response)
        }
    }
}

/// Looks for an error indicator inside a 2xx body.
///
/// Plain-text bodies are accepted as-is. A body labelled JSON that does not
/// parse is treated as malformed.
fn body_error(body: &str, is_json: bool) -> Option<DeliveryFailure> {
    if body.trim().is_empty() {
        return None;
    }
    let value = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value,
        Err(e) if is_json => {
            return Some(DeliveryFailure::transient(format!(
                "malformed JSON response: {e}"
            )));
        }
        Err(_) => return None,
    };
    let object = value.as_object()?;
    if object.get("success").and_then(|v| v.as_bool()) == Some(false) {
        let detail = object
            .get("message")
            .or_else(|| object.get("error"))
            .map(render_value)
            .unwrap_or_else(|| "downstream reported success=false".to_string());
        return Some(DeliveryFailure::transient(detail));
    }
    match object.get("error") {
        Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(false)) | None => None,
        Some(err) => Some(DeliveryFailure::transient(format!(
            "downstream reported error: {}",
            render_value(err)
        ))),
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Sends a probe request and maps it to a [`ProbeResult`]. Reachable iff 2xx.
pub(crate) async fn run_probe(
    kind: ChannelKind,
    request: reqwest::RequestBuilder,
) -> ProbeResult {
    let started = Instant::now();
    let result = request.send().await;
    let latency_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(response) if response.status().is_success() => ProbeResult::reachable(kind, latency_ms),
        Ok(response) => ProbeResult::unreachable(
            kind,
            latency_ms,
            format!("probe returned HTTP {}", response.status().as_u16()),
        ),
        Err(e) => ProbeResult::unreachable(kind, latency_ms, transport_failure(&e).message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_strips_trailing_slash() {
        assert_eq!(
            join_url("http://127.0.0.1:3000/", "/api/sendText"),
            "http://127.0.0.1:3000/api/sendText"
        );
        assert_eq!(join_url("http://bridge", "/status"), "http://bridge/status");
    }

    #[test]
    fn plain_text_body_is_not_an_error() {
        assert!(body_error("Workflow was started", false).is_none());
        assert!(body_error("", true).is_none());
    }

    #[test]
    fn success_false_is_an_error() {
        let failure = body_error(r#"{"success": false, "message": "session closed"}"#, true).unwrap();
        assert_eq!(failure.message, "session closed");
        assert!(!failure.is_permanent());
    }

    #[test]
    fn error_field_is_an_error() {
        assert!(body_error(r#"{"error": "not authorized"}"#, true).is_some());
        assert!(body_error(r#"{"error": null, "id": "true_123@c.us"}"#, true).is_none());
        assert!(body_error(r#"{"success": true}"#, true).is_none());
    }

    #[test]
    fn malformed_json_body_is_an_error() {
        assert!(body_error("{not json", true).is_some());
        assert!(body_error("{not json", false).is_none());
    }

    #[test]
    fn reject_invalid_catches_empty_body() {
        let req = DeliveryRequest::new("5511999999999", "");
        let outcome = reject_invalid(ChannelKind::Local, &req).unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().is_permanent());
        assert!(reject_invalid(ChannelKind::Local, &DeliveryRequest::new("1", "hi")).is_none());
    }
}
