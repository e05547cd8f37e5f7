// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./reactiv.toml` > `~/.config/reactiv/reactiv.toml` > `/etc/reactiv/reactiv.toml`
//! with environment variable overrides via `REACTIV_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ReactivConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/reactiv/reactiv.toml";

/// Config file in the working directory.
pub const LOCAL_CONFIG_PATH: &str = "reactiv.toml";

/// Section prefixes recognised in `REACTIV_*` variable names, most specific first.
const ENV_SECTIONS: &[(&str, &str)] = &[
    ("channels_primary_", "channels.primary."),
    ("channels_backup_", "channels.backup."),
    ("channels_bridge_", "channels.bridge."),
    ("channels_local_", "channels.local."),
    ("channels_", "channels."),
    ("service_", "service."),
    ("retry_", "retry."),
    ("health_", "health."),
    ("queue_", "queue."),
    ("recovery_", "recovery."),
    ("breaker_", "breaker."),
    ("storage_", "storage."),
    ("gateway_", "gateway."),
];

/// Path of the per-user config file, if the platform has a config dir.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("reactiv/reactiv.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/reactiv/reactiv.toml` (system-wide)
/// 3. `~/.config/reactiv/reactiv.toml` (user XDG config)
/// 4. `./reactiv.toml` (local directory)
/// 5. `REACTIV_*` environment variables
pub fn load_config() -> Result<ReactivConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ReactivConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ReactivConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ReactivConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ReactivConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ReactivConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `REACTIV_CHANNELS_PRIMARY_TIMEOUT_SECS` must map to
/// `channels.primary.timeout_secs`, not `channels.primary.timeout.secs`.
fn env_provider() -> Env {
    Env::prefixed("REACTIV_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped variable name to a dotted config path.
pub fn map_env_key(key: &str) -> String {
    for (prefix, section) in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(prefix) {
            return format!("{section}{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_nested_sections() {
        assert_eq!(map_env_key("channels_primary_url"), "channels.primary.url");
        assert_eq!(
            map_env_key("channels_local_api_key"),
            "channels.local.api_key"
        );
        assert_eq!(
            map_env_key("channels_probe_timeout_secs"),
            "channels.probe_timeout_secs"
        );
        assert_eq!(map_env_key("retry_base_delay_ms"), "retry.base_delay_ms");
        assert_eq!(
            map_env_key("recovery_failure_threshold"),
            "recovery.failure_threshold"
        );
        assert_eq!(
            map_env_key("breaker_open_timeout_secs"),
            "breaker.open_timeout_secs"
        );
        assert_eq!(map_env_key("gateway_bearer_token"), "gateway.bearer_token");
        assert_eq!(map_env_key("unknown"), "unknown");
    }
}
