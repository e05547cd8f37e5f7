// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential-backoff retry around a single channel.

use std::time::Duration;

use reactiv_config::model::RetryConfig;
use reactiv_core::{ChannelAdapter, DeliveryOutcome, DeliveryRequest};
use tracing::{debug, info, warn};

/// Backoff parameters for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total calls to the channel, first attempt included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Keep going after a permanent failure instead of moving on.
    pub retry_permanent_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            multiplier: config.multiplier.max(1.0),
            max_delay: Duration::from_millis(config.max_delay_ms),
            retry_permanent_errors: config.retry_permanent_errors,
        }
    }

    /// Delay slept before attempt number `attempt` (1-based).
    ///
    /// Zero for the first attempt, then `base * multiplier^(attempt - 2)`
    /// capped at `max_delay`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(64) as i32;
        let scaled = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(scaled)
        }
    }

    /// Sum of every delay a fully failing channel incurs.
    pub fn worst_case_delay(&self) -> Duration {
        (2..=self.max_attempts).map(|n| self.delay_before(n)).sum()
    }
}

/// What happened when one channel was driven through its retry budget.
#[derive(Debug, Clone)]
pub struct RetryReport {
    /// Final outcome; `outcome.attempts` equals `attempts`.
    pub outcome: DeliveryOutcome,
    pub attempts: u32,
    /// Time spent sleeping between attempts.
    pub total_delay: Duration,
}

/// Drives a [`ChannelAdapter`] through the retry policy.
///
/// Never touches health state; callers decide what a failed report means.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn execute(
        &self,
        channel: &dyn ChannelAdapter,
        request: &DeliveryRequest,
    ) -> RetryReport {
        let kind = channel.kind();
        let mut total_delay = Duration::ZERO;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let delay = self.policy.delay_before(attempt);
            if !delay.is_zero() {
                debug!(channel = %kind, attempt, delay_ms = delay.as_millis() as u64, "backing off");
                tokio::time::sleep(delay).await;
                total_delay += delay;
            }

            let mut outcome = channel.attempt_deliver(request).await;
            outcome.attempts = attempt;

            if outcome.success {
                info!(channel = %kind, request_id = request.id(), attempt, "delivery succeeded");
                return RetryReport {
                    outcome,
                    attempts: attempt,
                    total_delay,
                };
            }

            let permanent = outcome.error.as_ref().is_some_and(|e| e.is_permanent());
            warn!(
                channel = %kind,
                request_id = request.id(),
                attempt,
                max_attempts = self.policy.max_attempts,
                error = outcome.error_message().unwrap_or("unknown error"),
                permanent,
                "delivery attempt failed"
            );

            let give_up = attempt >= self.policy.max_attempts
                || (permanent && !self.policy.retry_permanent_errors);
            if give_up {
                return RetryReport {
                    outcome,
                    attempts: attempt,
                    total_delay,
                };
            }
        }
    }
}
