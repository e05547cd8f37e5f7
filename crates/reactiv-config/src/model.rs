// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Reactiv delivery fallback core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Reactiv configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// Every section is optional; only `channels.primary.url` has no usable default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReactivConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Downstream delivery channels.
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Per-channel retry policy.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Periodic health probing.
    #[serde(default)]
    pub health: HealthConfig,

    /// Durable backlog and drain cycle.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Automatic recovery.
    #[serde(default)]
    pub recovery: RecoveryConfig,

    /// Per-channel circuit breakers and failure statistics.
    #[serde(default)]
    pub breaker: BreakerConfig,

    /// Snapshot persistence backend.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Operational HTTP surface.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name used in logs and status output.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "reactiv".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Downstream channel configuration.
///
/// Backup and bridge are optional: leaving their `url` unset removes the
/// channel from the registered set entirely.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelsConfig {
    /// Cloud workflow webhook, tried first in normal mode.
    #[serde(default)]
    pub primary: WebhookConfig,

    /// Secondary webhook with the same payload shape.
    #[serde(default)]
    pub backup: WebhookConfig,

    /// Local bridge process with a lead injection endpoint.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Local WhatsApp HTTP client used for direct sends.
    #[serde(default)]
    pub local: LocalConfig,

    /// Timeout applied to every reachability probe.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            primary: WebhookConfig::default(),
            backup: WebhookConfig::default(),
            bridge: BridgeConfig::default(),
            local: LocalConfig::default(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

fn default_probe_timeout_secs() -> u64 {
    5
}

/// Webhook channel configuration (primary and backup).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Webhook URL. Unset means the channel is not registered.
    #[serde(default)]
    pub url: Option<String>,

    /// Request timeout for a single delivery call.
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

fn default_webhook_timeout_secs() -> u64 {
    15
}

/// Bridge channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Base URL of the bridge process. Unset means the channel is not registered.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_bridge_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_bridge_timeout_secs(),
        }
    }
}

fn default_bridge_timeout_secs() -> u64 {
    20
}

/// Local direct-send client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LocalConfig {
    /// Base URL of the local WhatsApp HTTP client.
    #[serde(default = "default_local_url")]
    pub url: String,

    /// Session name passed with every send.
    #[serde(default = "default_local_session")]
    pub session: String,

    /// Optional API key, sent as `X-Api-Key`.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_local_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            url: default_local_url(),
            session: default_local_session(),
            api_key: None,
            timeout_secs: default_local_timeout_secs(),
        }
    }
}

fn default_local_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_local_session() -> String {
    "default".to_string()
}

fn default_local_timeout_secs() -> u64 {
    10
}

/// Per-channel retry policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total calls made to one channel before giving up on it.
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Growth factor applied to the delay after each failed attempt.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Upper bound on any single delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Keep retrying even after a failure classified as permanent.
    #[serde(default)]
    pub retry_permanent_errors: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            retry_permanent_errors: false,
        }
    }
}

fn default_retry_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    5_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    60_000
}

/// Health monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    /// Whether the periodic probe loop runs.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between probe cycles.
    #[serde(default = "default_health_interval_secs")]
    pub interval_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_health_interval_secs(),
        }
    }
}

fn default_health_interval_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Seconds between background drain cycles.
    #[serde(default = "default_drain_interval_secs")]
    pub drain_interval_secs: u64,

    /// Items taken from pending per drain cycle.
    #[serde(default = "default_max_items_per_cycle")]
    pub max_items_per_cycle: usize,

    /// Queue-level attempts before an item is marked failed.
    #[serde(default = "default_queue_max_attempts")]
    pub max_attempts: u32,

    /// Completed and failed items retained for inspection.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            drain_interval_secs: default_drain_interval_secs(),
            max_items_per_cycle: default_max_items_per_cycle(),
            max_attempts: default_queue_max_attempts(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_drain_interval_secs() -> u64 {
    60
}

fn default_max_items_per_cycle() -> usize {
    10
}

fn default_queue_max_attempts() -> u32 {
    3
}

fn default_history_limit() -> usize {
    200
}

/// Recovery controller configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecoveryConfig {
    /// Whether the health loop may trigger recovery on its own.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Consecutive failures that trigger an automatic recovery.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: default_failure_threshold(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    3
}

/// Circuit breaker and error statistics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BreakerConfig {
    /// When false, failing channels are never skipped.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Consecutive delivery failures on one channel that open its breaker.
    #[serde(default = "default_breaker_threshold")]
    pub failure_threshold: u32,

    /// How long an open breaker rejects deliveries before a trial is let through.
    #[serde(default = "default_open_timeout_secs")]
    pub open_timeout_secs: u64,

    /// Look-back window for the failure statistics in `status`.
    #[serde(default = "default_stats_window_secs")]
    pub stats_window_secs: u64,

    /// Upper bound on retained failure events.
    #[serde(default = "default_stats_max_events")]
    pub stats_max_events: usize,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: default_breaker_threshold(),
            open_timeout_secs: default_open_timeout_secs(),
            stats_window_secs: default_stats_window_secs(),
            stats_max_events: default_stats_max_events(),
        }
    }
}

fn default_breaker_threshold() -> u32 {
    5
}

fn default_open_timeout_secs() -> u64 {
    300
}

fn default_stats_window_secs() -> u64 {
    86_400
}

fn default_stats_max_events() -> usize {
    1_000
}

/// Which snapshot store backend holds snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Two JSON documents in `state_dir`.
    #[default]
    Json,
    /// A single SQLite database at `database_path`.
    Sqlite,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory holding `system_state.json` and `queue_state.json`.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    /// SQLite database file, used by the `sqlite` backend.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Json,
            state_dir: default_state_dir(),
            database_path: default_database_path(),
        }
    }
}

fn default_state_dir() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("reactiv").display().to_string())
        .unwrap_or_else(|| "./data".to_string())
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("reactiv").join("reactiv.db").display().to_string())
        .unwrap_or_else(|| "./data/reactiv.db".to_string())
}

/// Operational gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Whether `serve` starts the HTTP surface.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on every `/v1` route.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3030
}

impl GatewayConfig {
    /// Base URL the CLI uses to reach a running gateway.
    pub fn base_url(&self) -> String {
        let host = if self.host == "0.0.0.0" {
            "127.0.0.1"
        } else {
            self.host.as_str()
        };
        format!("http://{host}:{}", self.port)
    }
}
