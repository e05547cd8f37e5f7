// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the operational API.
//!
//! Handles GET /health, GET /v1/status, POST /v1/dispatch, POST /v1/recovery,
//! POST /v1/queue/process and POST /v1/breakers/{channel}/reset.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reactiv_core::{ChannelKind, DeliveryRequest, HealthLevel, OperatingMode, Priority};
use reactiv_fallback::{DrainReport, RecoveryResult, SystemStatus};
use serde::{Deserialize, Serialize};

use crate::server::GatewayState;

/// Request body for POST /v1/dispatch.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchBody {
    pub recipient: String,
    pub body: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub campaign: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl DispatchBody {
    fn into_request(self) -> DeliveryRequest {
        let mut request = DeliveryRequest::new(self.recipient, self.body)
            .with_priority(self.priority)
            .with_source(self.source.unwrap_or_else(|| "gateway".to_string()));
        if let Some(campaign) = self.campaign {
            request = request.with_campaign(campaign);
        }
        for (key, value) in self.metadata {
            request = request.with_extra(key, value);
        }
        request
    }
}

/// Response body for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthLevel,
    pub mode: OperatingMode,
    pub version: String,
    pub uptime_secs: u64,
}

/// Query for POST /v1/queue/process.
#[derive(Debug, Default, Deserialize)]
pub struct ProcessQuery {
    #[serde(default)]
    pub max_items: Option<usize>,
}

/// GET /health
///
/// Unauthenticated liveness probe. Answers 503 once only the local
/// direct-send channel is left.
pub async fn get_public_health(State(state): State<GatewayState>) -> Response {
    let health = state.system.health().await;
    let code = if health.level == HealthLevel::Fallback {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    let body = HealthResponse {
        status: health.level,
        mode: health.mode,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: health.uptime_secs(),
    };
    (code, Json(body)).into_response()
}

/// GET /v1/status
pub async fn get_status(State(state): State<GatewayState>) -> Json<SystemStatus> {
    Json(state.system.status().await)
}

/// POST /v1/dispatch
///
/// 200 when delivered, 202 when queued, 422 when the request is invalid.
pub async fn post_dispatch(
    State(state): State<GatewayState>,
    Json(body): Json<DispatchBody>,
) -> Response {
    let result = state.system.dispatch(body.into_request()).await;
    let code = if result.success {
        StatusCode::OK
    } else if result.queued {
        StatusCode::ACCEPTED
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (code, Json(result)).into_response()
}

/// POST /v1/recovery
pub async fn post_recovery(State(state): State<GatewayState>) -> Json<RecoveryResult> {
    tracing::info!("manual recovery requested");
    Json(state.system.recover().await)
}

/// POST /v1/queue/process
pub async fn post_process_queue(
    State(state): State<GatewayState>,
    Query(query): Query<ProcessQuery>,
) -> Json<DrainReport> {
    let max_items = query
        .max_items
        .unwrap_or(state.system.settings().max_items_per_cycle)
        .max(1);
    tracing::info!(max_items, "manual queue processing requested");
    Json(state.system.drain_cycle(max_items).await)
}

/// Response body for POST /v1/breakers/{channel}/reset.
#[derive(Debug, Serialize, Deserialize)]
pub struct BreakerResetResponse {
    pub channel: ChannelKind,
    /// False when the breaker was already closed.
    pub reset: bool,
}

/// POST /v1/breakers/{channel}/reset
///
/// 404 for a channel name that is not registered.
pub async fn post_reset_breaker(
    State(state): State<GatewayState>,
    Path(channel): Path<String>,
) -> Response {
    let kind = match channel.parse::<ChannelKind>() {
        Ok(kind) if state.system.channels().contains(kind) => kind,
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    let reset = state.system.reset_breaker(kind).await;
    Json(BreakerResetResponse {
        channel: kind,
        reset,
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_body_requires_recipient_and_body() {
        assert!(serde_json::from_str::<DispatchBody>(r#"{"body": "oi"}"#).is_err());
        assert!(serde_json::from_str::<DispatchBody>(r#"{"recipient": "5511"}"#).is_err());
    }

    #[test]
    fn dispatch_body_builds_request() {
        let json = r#"{
            "recipient": "5511999999999",
            "body": "Sentimos sua falta!",
            "campaign": "reactivation-oct",
            "priority": "high",
            "metadata": {"segment": "inactive_60d"}
        }"#;
        let body: DispatchBody = serde_json::from_str(json).unwrap();
        let request = body.into_request();
        assert_eq!(request.recipient(), "5511999999999");
        assert_eq!(request.priority(), Priority::High);
        assert_eq!(request.metadata().source.as_deref(), Some("gateway"));
        assert_eq!(
            request.metadata().campaign.as_deref(),
            Some("reactivation-oct")
        );
        assert_eq!(
            request.metadata().extra.get("segment").map(String::as_str),
            Some("inactive_60d")
        );
    }

    #[test]
    fn dispatch_body_rejects_unknown_fields() {
        let json = r#"{"recipient": "5511", "body": "oi", "phone": "5511"}"#;
        assert!(serde_json::from_str::<DispatchBody>(json).is_err());
    }
}
