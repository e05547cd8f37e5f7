// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as parseable channel URLs, positive retry numbers, and gateway auth.

use crate::diagnostic::ConfigError;
use crate::model::ReactivConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ReactivConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let channels = &config.channels;

    match channels.primary.url.as_deref() {
        Some(url) => check_url("channels.primary.url", url, &mut errors),
        None => errors.push(ConfigError::MissingKey {
            key: "channels.primary.url".to_string(),
        }),
    }
    if let Some(url) = channels.backup.url.as_deref() {
        check_url("channels.backup.url", url, &mut errors);
    }
    if let Some(url) = channels.bridge.url.as_deref() {
        check_url("channels.bridge.url", url, &mut errors);
    }
    check_url("channels.local.url", &channels.local.url, &mut errors);

    if channels.local.session.trim().is_empty() {
        errors.push(validation("channels.local.session must not be empty"));
    }

    for (key, value) in [
        ("channels.primary.timeout_secs", channels.primary.timeout_secs),
        ("channels.backup.timeout_secs", channels.backup.timeout_secs),
        ("channels.bridge.timeout_secs", channels.bridge.timeout_secs),
        ("channels.local.timeout_secs", channels.local.timeout_secs),
        ("channels.probe_timeout_secs", channels.probe_timeout_secs),
        ("health.interval_secs", config.health.interval_secs),
        ("queue.drain_interval_secs", config.queue.drain_interval_secs),
    ] {
        if value == 0 {
            errors.push(validation(format!("{key} must be greater than 0")));
        }
    }

    let retry = &config.retry;
    if retry.max_attempts == 0 {
        errors.push(validation("retry.max_attempts must be at least 1"));
    }
    if !retry.multiplier.is_finite() || retry.multiplier < 1.0 {
        errors.push(validation(format!(
            "retry.multiplier must be at least 1.0, got {}",
            retry.multiplier
        )));
    }
    if retry.max_delay_ms < retry.base_delay_ms {
        errors.push(validation(format!(
            "retry.max_delay_ms ({}) must not be less than retry.base_delay_ms ({})",
            retry.max_delay_ms, retry.base_delay_ms
        )));
    }

    if config.queue.max_items_per_cycle == 0 {
        errors.push(validation("queue.max_items_per_cycle must be at least 1"));
    }
    if config.queue.max_attempts == 0 {
        errors.push(validation("queue.max_attempts must be at least 1"));
    }
    if config.recovery.failure_threshold == 0 {
        errors.push(validation("recovery.failure_threshold must be at least 1"));
    }
    if config.breaker.failure_threshold == 0 {
        errors.push(validation("breaker.failure_threshold must be at least 1"));
    }
    if config.breaker.open_timeout_secs == 0 {
        errors.push(validation("breaker.open_timeout_secs must be at least 1"));
    }
    if config.breaker.stats_window_secs == 0 || config.breaker.stats_max_events == 0 {
        errors.push(validation(
            "breaker.stats_window_secs and breaker.stats_max_events must be at least 1",
        ));
    }

    if config.storage.state_dir.trim().is_empty() {
        errors.push(validation("storage.state_dir must not be empty"));
    }
    if config.storage.database_path.trim().is_empty() {
        errors.push(validation("storage.database_path must not be empty"));
    }

    if config.gateway.enabled {
        let token_missing = config
            .gateway
            .bearer_token
            .as_deref()
            .is_none_or(|t| t.trim().is_empty());
        if token_missing {
            errors.push(validation(
                "gateway.bearer_token is required when gateway.enabled = true",
            ));
        }
        if config.gateway.host.parse::<std::net::IpAddr>().is_err()
            && config.gateway.host != "localhost"
        {
            errors.push(validation(format!(
                "gateway.host `{}` is not a valid IP address",
                config.gateway.host
            )));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

fn check_url(key: &str, raw: &str, errors: &mut Vec<ConfigError>) {
    match url::Url::parse(raw.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(parsed) => errors.push(ConfigError::InvalidUrl {
            key: key.to_string(),
            detail: format!("unsupported scheme `{}`", parsed.scheme()),
        }),
        Err(e) => errors.push(ConfigError::InvalidUrl {
            key: key.to_string(),
            detail: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> ReactivConfig {
        let mut config = ReactivConfig::default();
        config.channels.primary.url = Some("https://flows.example.com/webhook/send".into());
        config
    }

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn minimal_config_validates() {
        assert!(validate_config(&minimal()).is_ok());
    }

    #[test]
    fn missing_primary_url_fails_validation() {
        let errors = validate_config(&ReactivConfig::default()).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::MissingKey { key } if key == "channels.primary.url")
        ));
    }

    #[test]
    fn non_http_url_fails_validation() {
        let mut config = minimal();
        config.channels.bridge.url = Some("ftp://bridge.local".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::InvalidUrl { key, .. } if key == "channels.bridge.url")
        ));
    }

    #[test]
    fn unparseable_url_fails_validation() {
        let mut config = minimal();
        config.channels.local.url = "not a url".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::InvalidUrl { key, .. } if key == "channels.local.url")
        ));
    }

    #[test]
    fn multiplier_below_one_fails_validation() {
        let mut config = minimal();
        config.retry.multiplier = 0.5;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "retry.multiplier"));
    }

    #[test]
    fn zero_numbers_fail_validation() {
        let mut config = minimal();
        config.retry.max_attempts = 0;
        config.queue.max_items_per_cycle = 0;
        config.health.interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "retry.max_attempts"));
        assert!(has_message(&errors, "queue.max_items_per_cycle"));
        assert!(has_message(&errors, "health.interval_secs"));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn closed_breaker_window_fails_validation() {
        let mut config = minimal();
        config.breaker.failure_threshold = 0;
        config.breaker.open_timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "breaker.failure_threshold"));
        assert!(has_message(&errors, "breaker.open_timeout_secs"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn gateway_without_token_fails_validation() {
        let mut config = minimal();
        config.gateway.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "gateway.bearer_token"));

        config.gateway.bearer_token = Some("s3cret".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn max_delay_below_base_fails_validation() {
        let mut config = minimal();
        config.retry.base_delay_ms = 10_000;
        config.retry.max_delay_ms = 1_000;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "retry.max_delay_ms"));
    }
}
