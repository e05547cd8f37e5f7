// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by channel adapters, the fallback system and stores.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::ReactivError;

/// Maximum number of alerts retained in [`SystemHealthState::alerts`].
pub const MAX_ALERTS: usize = 50;

/// Identifies one of the downstream delivery channels.
///
/// Declaration order is preference order: the primary cloud webhook first,
/// the local direct-send client last.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChannelKind {
    /// Cloud-hosted workflow webhook.
    Primary,
    /// Secondary webhook with the same payload shape.
    Backup,
    /// Local bridge process exposing a lead injection endpoint.
    Bridge,
    /// Local WhatsApp HTTP client exposing a direct-send endpoint.
    Local,
}

impl ChannelKind {
    /// All channels in preference order.
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::Primary,
        ChannelKind::Backup,
        ChannelKind::Bridge,
        ChannelKind::Local,
    ];
}

/// Priority of a delivery request or queue item.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
    #[default]
    Normal,
    High,
}

/// Metadata attached to a delivery request by the producing collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// Producer tag (e.g. `campaign_dispatcher`, `response_handler`).
    #[serde(default)]
    pub source: Option<String>,
    /// Campaign the message belongs to.
    #[serde(default)]
    pub campaign: Option<String>,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// Free-form producer data, forwarded to webhook channels untouched.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self {
            source: None,
            campaign: None,
            created_at: Utc::now(),
            extra: BTreeMap::new(),
        }
    }
}

/// The unit of outbound work.
///
/// The identifier is assigned at construction. Recipient and body cannot be
/// changed once the request exists, so every retry and every fallback
/// channel sends the same payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRequest {
    id: String,
    recipient: String,
    body: String,
    #[serde(default)]
    metadata: RequestMetadata,
    #[serde(default)]
    priority: Priority,
}

impl DeliveryRequest {
    /// Creates a request with a fresh identifier and normal priority.
    pub fn new(recipient: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            recipient: recipient.into(),
            body: body.into(),
            metadata: RequestMetadata::default(),
            priority: Priority::Normal,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.metadata.source = Some(source.into());
        self
    }

    pub fn with_campaign(mut self, campaign: impl Into<String>) -> Self {
        self.metadata.campaign = Some(campaign.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.extra.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn metadata(&self) -> &RequestMetadata {
        &self.metadata
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Checks the channel input contract: recipient and body must be non-empty.
    pub fn validate(&self) -> Result<(), ReactivError> {
        if self.recipient.trim().is_empty() {
            return Err(ReactivError::InvalidRequest(format!(
                "request {} has an empty recipient",
                self.id
            )));
        }
        if self.body.trim().is_empty() {
            return Err(ReactivError::InvalidRequest(format!(
                "request {} has an empty body",
                self.id
            )));
        }
        Ok(())
    }
}

/// Whether a failed delivery is worth retrying on the same channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// Timeouts, connection errors, 5xx, 408, 429, malformed responses.
    Transient,
    /// Invalid requests and client errors that will fail identically again.
    Permanent,
}

/// Why a single delivery attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryFailure {
    pub kind: FailureKind,
    pub message: String,
    /// HTTP status returned by the downstream, when one was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl DeliveryFailure {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            message: message.into(),
            status: None,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Permanent,
            message: message.into(),
            status: None,
        }
    }

    /// Classifies a non-success HTTP status.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            408 | 429 => FailureKind::Transient,
            400..=499 => FailureKind::Permanent,
            _ => FailureKind::Transient,
        };
        let mut message = format!("downstream returned HTTP {status}");
        let body = body.trim();
        if !body.is_empty() {
            let snippet: String = body.chars().take(200).collect();
            message.push_str(": ");
            message.push_str(&snippet);
        }
        Self {
            kind,
            message,
            status: Some(status),
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.kind == FailureKind::Permanent
    }
}

impl std::fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

/// Result of delivering a request through one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub channel: ChannelKind,
    /// Calls made to the channel to reach this outcome.
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DeliveryFailure>,
    /// Raw downstream response body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(channel: ChannelKind, response: Option<String>) -> Self {
        Self {
            success: true,
            channel,
            attempts: 1,
            error: None,
            response,
        }
    }

    pub fn failed(channel: ChannelKind, failure: DeliveryFailure) -> Self {
        Self {
            success: false,
            channel,
            attempts: 1,
            error: Some(failure),
            response: None,
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }
}

/// Result of a reachability probe against one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub channel: ChannelKind,
    pub reachable: bool,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProbeResult {
    pub fn reachable(channel: ChannelKind, latency_ms: u64) -> Self {
        Self {
            channel,
            reachable: true,
            latency_ms,
            detail: None,
        }
    }

    pub fn unreachable(channel: ChannelKind, latency_ms: u64, detail: impl Into<String>) -> Self {
        Self {
            channel,
            reachable: false,
            latency_ms,
            detail: Some(detail.into()),
        }
    }
}

/// Discrete health classification of the whole system.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HealthLevel {
    #[default]
    Healthy,
    Degraded,
    Critical,
    Fallback,
}

impl HealthLevel {
    /// Maps the fraction of reachable dependencies to a level.
    ///
    /// 100% is healthy, at least 75% degraded, at least 50% critical,
    /// anything lower (including zero known dependencies) is fallback.
    pub fn from_reachability(reachable: usize, total: usize) -> Self {
        if total == 0 || reachable == 0 {
            return HealthLevel::Fallback;
        }
        let reachable = reachable.min(total);
        if reachable == total {
            HealthLevel::Healthy
        } else if reachable * 4 >= total * 3 {
            HealthLevel::Degraded
        } else if reachable * 2 >= total {
            HealthLevel::Critical
        } else {
            HealthLevel::Fallback
        }
    }

    /// True for the two levels recovery treats as "restored".
    pub fn is_operational(self) -> bool {
        matches!(self, HealthLevel::Healthy | HealthLevel::Degraded)
    }
}

/// Operating mode, which decides the channels the dispatcher may use.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperatingMode {
    /// Primary webhook first, everything else behind it.
    #[default]
    Normal,
    /// Primary bypassed; backup webhook leads.
    Backup,
    /// Remote webhooks bypassed; local bridge leads.
    Bridge,
    /// Last resort: local direct-send only.
    LocalOnly,
}

/// Severity of an entry in the alert log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

/// One entry in the health alert log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub at: DateTime<Utc>,
    pub severity: AlertSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelKind>,
    pub message: String,
}

/// Process-wide health state, persisted after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealthState {
    pub level: HealthLevel,
    pub mode: OperatingMode,
    /// Whether the last primary probe (or reactivation) succeeded.
    pub primary_active: bool,
    /// Reachability of each registered channel at the last probe.
    #[serde(default)]
    pub reachability: BTreeMap<ChannelKind, bool>,
    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default)]
    pub total_failures: u64,
    #[serde(default)]
    pub last_failure_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_check_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recovery_attempts: u32,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub alerts: VecDeque<Alert>,
}

impl Default for SystemHealthState {
    fn default() -> Self {
        Self {
            level: HealthLevel::Healthy,
            mode: OperatingMode::Normal,
            primary_active: true,
            reachability: BTreeMap::new(),
            consecutive_failures: 0,
            total_failures: 0,
            last_failure_at: None,
            last_check_at: None,
            recovery_attempts: 0,
            started_at: Utc::now(),
            alerts: VecDeque::new(),
        }
    }
}

impl SystemHealthState {
    /// Seconds since the process (re)started.
    pub fn uptime_secs(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }

    /// Appends to the alert log, dropping the oldest entries past [`MAX_ALERTS`].
    pub fn push_alert(
        &mut self,
        severity: AlertSeverity,
        channel: Option<ChannelKind>,
        message: impl Into<String>,
    ) {
        self.alerts.push_back(Alert {
            at: Utc::now(),
            severity,
            channel,
            message: message.into(),
        });
        while self.alerts.len() > MAX_ALERTS {
            self.alerts.pop_front();
        }
    }

    /// Records a failure observed outside of a probe (e.g. a dispatch that
    /// exhausted every channel).
    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.total_failures = self.total_failures.saturating_add(1);
        self.last_failure_at = Some(Utc::now());
    }
}

/// Lifecycle state of a queue item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A delivery request parked in the durable backlog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub request: DeliveryRequest,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Queue-level attempts; independent of per-channel retries.
    pub attempts: u32,
    pub max_attempts: u32,
    pub status: QueueStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_via: Option<ChannelKind>,
}

impl QueueItem {
    pub fn new(request: DeliveryRequest, priority: Priority, max_attempts: u32) -> Self {
        let now = Utc::now();
        Self {
            id: format!(
                "queue_{}_{:08x}",
                now.timestamp_millis(),
                rand::random::<u32>()
            ),
            request,
            priority,
            created_at: now,
            updated_at: now,
            attempts: 0,
            max_attempts,
            status: QueueStatus::Pending,
            last_error: None,
            delivered_via: None,
        }
    }

    /// Whether the queue-level retry budget is spent.
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

/// On-disk layout of the queue: one array per lifecycle state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    #[serde(default)]
    pub pending: Vec<QueueItem>,
    #[serde(default)]
    pub processing: Vec<QueueItem>,
    #[serde(default)]
    pub completed: Vec<QueueItem>,
    #[serde(default)]
    pub failed: Vec<QueueItem>,
}

/// Item counts per queue state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Everything a [`StateStore`](crate::traits::StateStore) hands back at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    pub health: Option<SystemHealthState>,
    pub queue: Option<QueueSnapshot>,
}

/// What `dispatch` returns to an external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub request_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelKind>,
    /// Calls made to the channel that delivered, or to all channels when queued.
    pub attempts: u32,
    pub queued: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchResult {
    pub fn sent(request_id: &str, channel: ChannelKind, attempts: u32) -> Self {
        Self {
            request_id: request_id.to_string(),
            success: true,
            channel: Some(channel),
            attempts,
            queued: false,
            queue_id: None,
            error: None,
        }
    }

    pub fn queued(
        request_id: &str,
        queue_id: String,
        attempts: u32,
        error: Option<String>,
    ) -> Self {
        Self {
            request_id: request_id.to_string(),
            success: false,
            channel: None,
            attempts,
            queued: true,
            queue_id: Some(queue_id),
            error,
        }
    }

    pub fn rejected(request_id: &str, error: String) -> Self {
        Self {
            request_id: request_id.to_string(),
            success: false,
            channel: None,
            attempts: 0,
            queued: false,
            queue_id: None,
            error: Some(error),
        }
    }
}
