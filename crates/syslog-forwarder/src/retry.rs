// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;

// 2^10 * base is already far beyond any sensible pause between sends of one record
const MAX_BACKOFF_EXPONENT: u32 = 10;

/// How many times a record is attempted and how long to wait between attempts.
///
/// The first field is always the total number of attempts, so `Immediate(1)` (the default)
/// is the fail-fast policy: one attempt, no retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    Immediate(u64),
    /// attempts, delay in ms between attempts
    LinearBackoff(u64, u64),
    /// attempts, base delay in ms doubled after each failed attempt
    ExponentialBackoff(u64, u64),
}

impl Default for RetryStrategy {
    fn default() -> Self {
        RetryStrategy::Immediate(1)
    }
}

impl RetryStrategy {
    /// Total attempts per record, at least one.
    #[must_use]
    pub fn max_attempts(&self) -> u64 {
        let attempts = match self {
            RetryStrategy::Immediate(attempts)
            | RetryStrategy::LinearBackoff(attempts, _)
            | RetryStrategy::ExponentialBackoff(attempts, _) => *attempts,
        };
        attempts.max(1)
    }

    /// Wait before the next attempt, given how many attempts have already failed.
    #[must_use]
    pub fn backoff(&self, failed_attempts: u64) -> Duration {
        match self {
            RetryStrategy::Immediate(_) => Duration::ZERO,
            RetryStrategy::LinearBackoff(_, delay_ms) => Duration::from_millis(*delay_ms),
            RetryStrategy::ExponentialBackoff(_, base_ms) => {
                let exponent = u32::try_from(failed_attempts.saturating_sub(1))
                    .unwrap_or(MAX_BACKOFF_EXPONENT)
                    .min(MAX_BACKOFF_EXPONENT);
                Duration::from_millis(base_ms.saturating_mul(1 << exponent))
            }
        }
    }

    /// Builds a strategy from its name (`immediate`, `linear`, `exponential`), attempt count
    /// and delay.
    pub fn from_parts(name: &str, attempts: u64, delay_ms: u64) -> Result<Self, ConfigError> {
        match RetryKind::from_str(name)? {
            RetryKind::Immediate => Ok(RetryStrategy::Immediate(attempts)),
            RetryKind::Linear => Ok(RetryStrategy::LinearBackoff(attempts, delay_ms)),
            RetryKind::Exponential => Ok(RetryStrategy::ExponentialBackoff(attempts, delay_ms)),
        }
    }
}

enum RetryKind {
    Immediate,
    Linear,
    Exponential,
}

impl FromStr for RetryKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "immediate" => Ok(RetryKind::Immediate),
            "linear" => Ok(RetryKind::Linear),
            "exponential" => Ok(RetryKind::Exponential),
            _ => Err(ConfigError::InvalidValue {
                name: "retry backoff",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_fail_fast() {
        let strategy = RetryStrategy::default();
        assert_eq!(strategy.max_attempts(), 1);
        assert_eq!(strategy.backoff(1), Duration::ZERO);
    }

    #[test]
    fn test_zero_attempts_still_attempts_once() {
        assert_eq!(RetryStrategy::LinearBackoff(0, 10).max_attempts(), 1);
    }

    #[test]
    fn test_linear_backoff_is_constant() {
        let strategy = RetryStrategy::LinearBackoff(3, 200);
        assert_eq!(strategy.backoff(1), Duration::from_millis(200));
        assert_eq!(strategy.backoff(2), Duration::from_millis(200));
    }

    #[test]
    fn test_exponential_backoff_doubles_and_caps() {
        let strategy = RetryStrategy::ExponentialBackoff(5, 100);
        assert_eq!(strategy.backoff(1), Duration::from_millis(100));
        assert_eq!(strategy.backoff(2), Duration::from_millis(200));
        assert_eq!(strategy.backoff(4), Duration::from_millis(800));
        assert_eq!(strategy.backoff(500), Duration::from_millis(100 * 1024));
    }

    #[test]
    fn test_from_parts() {
        assert_eq!(
            RetryStrategy::from_parts("Exponential", 4, 50),
            Ok(RetryStrategy::ExponentialBackoff(4, 50))
        );
        assert_eq!(
            RetryStrategy::from_parts("linear", 2, 10),
            Ok(RetryStrategy::LinearBackoff(2, 10))
        );
        assert!(RetryStrategy::from_parts("jittered", 2, 10).is_err());
    }
}
