// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Fixed-window, count-based throttle.
//!
//! After every `batch_size`-th record successfully handed to the transport the pipeline
//! pauses for `delay`. Nothing else is measured: no collector health, no back-pressure.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateConfig {
    /// Records sent consecutively before pausing. 0 disables pausing.
    pub batch_size: u64,
    pub delay: Duration,
}

impl Default for RateConfig {
    fn default() -> Self {
        RateConfig {
            batch_size: 100,
            delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    config: RateConfig,
    batch_counter: u64,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateConfig) -> Self {
        RateLimiter {
            config,
            batch_counter: 0,
        }
    }

    /// Counts one successfully sent record and returns the pause owed, if this record closed a
    /// batch.
    pub fn record_sent(&mut self) -> Option<Duration> {
        self.batch_counter += 1;
        if self.config.batch_size == 0 || self.config.delay.is_zero() {
            return None;
        }
        if self.batch_counter % self.config.batch_size == 0 {
            Some(self.config.delay)
        } else {
            None
        }
    }

    /// Records successfully sent since the limiter was created.
    #[must_use]
    pub fn batch_counter(&self) -> u64 {
        self.batch_counter
    }
}
