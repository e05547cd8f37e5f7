// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `reactiv status` command implementation.
//!
//! Connects to the gateway to display health level, operating mode, uptime,
//! queue counts and any channel whose breaker is not closed. Falls back gracefully when the service is not running.

use std::collections::BTreeMap;
use std::io::IsTerminal;

use reactiv_config::ReactivConfig;
use reactiv_core::{QueueStats, ReactivError};
use serde::{Deserialize, Serialize};

use crate::client::GatewayClient;

/// Public health endpoint response from the gateway.
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    mode: String,
    uptime_secs: u64,
}

/// The part of `/v1/status` this command shows.
#[derive(Debug, Deserialize)]
struct StatusBody {
    queue: QueueStats,
    permitted_channels: Vec<String>,
    #[serde(default)]
    breakers: BTreeMap<String, BreakerView>,
    #[serde(default)]
    errors: Option<ErrorsView>,
}

#[derive(Debug, Deserialize)]
struct BreakerView {
    state: String,
}

#[derive(Debug, Deserialize)]
struct ErrorsView {
    total_failures: usize,
    window_secs: u64,
}

impl StatusBody {
    /// `channel (state)` for every breaker that is not closed.
    fn tripped_breakers(&self) -> Vec<String> {
        self.breakers
            .iter()
            .filter(|(_, b)| b.state != "closed")
            .map(|(channel, b)| format!("{channel} ({})", b.state))
            .collect()
    }
}

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub status: String,
    pub mode: Option<String>,
    pub uptime_secs: Option<u64>,
    pub uptime_human: Option<String>,
    pub permitted_channels: Option<Vec<String>>,
    pub queue: Option<QueueStats>,
    pub tripped_breakers: Option<Vec<String>>,
    /// Failed delivery walks inside the statistics window.
    pub recent_failures: Option<usize>,
    pub failure_window_secs: Option<u64>,
    pub gateway_url: String,
}

/// Format seconds into a human-readable duration string.
fn format_uptime(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Run the `reactiv status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(
    config: &ReactivConfig,
    json: bool,
    plain: bool,
) -> Result<(), ReactivError> {
    let client = GatewayClient::new(&config.gateway)?;

    // /health answers 503 in fallback; the body is still meaningful.
    let health = match client.get_public::<HealthResponse>("/health").await {
        Ok(health) => Some(health),
        Err(e) => {
            tracing::debug!(error = %e, "gateway health endpoint unreachable");
            None
        }
    };

    let details = if health.is_some() && client.has_token() {
        client.get::<StatusBody>("/v1/status").await.ok()
    } else {
        None
    };

    let response = match health {
        Some(health) => StatusResponse {
            running: true,
            uptime_human: Some(format_uptime(health.uptime_secs)),
            status: health.status,
            mode: Some(health.mode),
            uptime_secs: Some(health.uptime_secs),
            permitted_channels: details.as_ref().map(|d| d.permitted_channels.clone()),
            tripped_breakers: details.as_ref().map(StatusBody::tripped_breakers),
            recent_failures: details
                .as_ref()
                .and_then(|d| d.errors.as_ref())
                .map(|e| e.total_failures),
            failure_window_secs: details
                .as_ref()
                .and_then(|d| d.errors.as_ref())
                .map(|e| e.window_secs),
            queue: details.map(|d| d.queue),
            gateway_url: client.base_url().to_string(),
        },
        None => StatusResponse {
            running: false,
            status: "not running".to_string(),
            mode: None,
            uptime_secs: None,
            uptime_human: None,
            permitted_channels: None,
            queue: None,
            tripped_breakers: None,
            recent_failures: None,
            failure_window_secs: None,
            gateway_url: client.base_url().to_string(),
        },
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        if response.running {
            print_status_running(&response, use_color);
        } else {
            print_status_offline(&response.gateway_url, use_color);
        }
    }

    Ok(())
}

/// Print running status with optional colors.
fn print_status_running(status: &StatusResponse, use_color: bool) {
    let uptime = status.uptime_human.as_deref().unwrap_or("-");
    let mode = status.mode.as_deref().unwrap_or("-");
    let ok = status.status == "healthy" || status.status == "degraded";

    println!();
    println!("  reactiv status");
    println!("  {}", "-".repeat(35));

    if use_color {
        use colored::Colorize;
        let level = if ok {
            status.status.green()
        } else {
            status.status.red()
        };
        let mark = if ok { "✓".green() } else { "!".red() };
        println!("    Health:   {mark} {level} (uptime: {uptime})");
    } else {
        let mark = if ok { "[OK]" } else { "[WARN]" };
        println!("    Health:   {mark} {} (uptime: {uptime})", status.status);
    }
    println!("    Mode:     {mode}");

    if let Some(channels) = &status.permitted_channels {
        println!("    Channels: {}", channels.join(" -> "));
    }
    if let Some(queue) = &status.queue {
        println!(
            "    Queue:    {} pending, {} processing, {} completed, {} failed",
            queue.pending, queue.processing, queue.completed, queue.failed
        );
    }
    if let Some(tripped) = status.tripped_breakers.as_ref().filter(|t| !t.is_empty()) {
        println!("    Breakers: {}", tripped.join(", "));
    }
    if let (Some(failures), Some(window)) = (status.recent_failures, status.failure_window_secs) {
        println!("    Failures: {failures} in the last {}", format_uptime(window));
    }
    println!();
}

/// Print offline status with optional colors.
fn print_status_offline(url: &str, use_color: bool) {
    println!();
    println!("  reactiv status");
    println!("  {}", "-".repeat(35));

    if use_color {
        use colored::Colorize;
        println!("    State:    {} {}", "✗".red(), "not running".red());
    } else {
        println!("    State:    [FAIL] not running");
    }

    println!("    Endpoint: {url}/health");
    println!();
    println!("  Start with: reactiv serve (with [gateway] enabled = true)");
    println!();
}
