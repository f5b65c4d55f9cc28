// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::destination::{Destination, TransportKind};
use crate::errors::ConfigError;
use crate::rate_limit::RateConfig;
use crate::retry::RetryStrategy;
use crate::transport::syslog::{Priority, SyslogFormat, TcpFraming};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 514;
const DEFAULT_BATCH_SIZE: u64 = 100;
const DEFAULT_DELAY_MS: u64 = 1000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
const DEFAULT_APP_NAME: &str = "syslog-forwarder";
const DEFAULT_RETRY_BACKOFF_MS: u64 = 100;
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Everything a forwarding run needs, passed to the forwarder at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderConfig {
    /// Newline-delimited file to read records from
    pub source_path: PathBuf,
    /// Collector host name or IP address
    pub host: String,
    /// Collector port
    pub port: u16,
    pub protocol: TransportKind,
    /// Records sent consecutively before pausing
    pub batch_size: u64,
    /// Pause after each batch
    pub delay: Duration,
    pub format: SyslogFormat,
    pub tcp_framing: TcpFraming,
    /// Syslog facility, 0-23
    pub facility: u8,
    /// Syslog severity, 0-7
    pub severity: u8,
    pub app_name: String,
    /// Overrides hostname detection for syslog headers
    pub hostname: Option<String>,
    /// Keep tailing the source after reaching its end
    pub follow: bool,
    /// How long to wait at the end of a followed source before checking it again
    pub poll_interval: Duration,
    /// State file recording how far each source has been forwarded
    pub checkpoint_path: Option<PathBuf>,
    pub retry_strategy: RetryStrategy,
    /// Records that exhaust their retries are appended here instead of aborting the run
    pub dead_letter_path: Option<PathBuf>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::new(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            protocol: TransportKind::Udp,
            batch_size: DEFAULT_BATCH_SIZE,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            format: SyslogFormat::Raw,
            tcp_framing: TcpFraming::OctetCounting,
            facility: 1,
            severity: 6,
            app_name: DEFAULT_APP_NAME.to_string(),
            hostname: None,
            follow: false,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            checkpoint_path: None,
            retry_strategy: RetryStrategy::default(),
            dead_letter_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl ForwarderConfig {
    /// Create configuration from `SYSLOG_FWD_*` environment variables.
    ///
    /// Unset variables take their defaults; set but unparseable ones are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let source_path = env::var("SYSLOG_FWD_SOURCE_PATH")
            .map(PathBuf::from)
            .map_err(|_| ConfigError::Missing("SYSLOG_FWD_SOURCE_PATH"))?;

        // without an attempt count the run stays fail-fast
        let retry_strategy = match parse_env("SYSLOG_FWD_RETRY_ATTEMPTS")? {
            Some(attempts) => RetryStrategy::from_parts(
                &env::var("SYSLOG_FWD_RETRY_BACKOFF").unwrap_or_else(|_| "linear".to_string()),
                attempts,
                parse_env("SYSLOG_FWD_RETRY_BACKOFF_MS")?.unwrap_or(DEFAULT_RETRY_BACKOFF_MS),
            )?,
            None => defaults.retry_strategy,
        };

        let config = Self {
            source_path,
            host: env::var("SYSLOG_FWD_HOST").unwrap_or(defaults.host),
            port: parse_env("SYSLOG_FWD_PORT")?.unwrap_or(defaults.port),
            protocol: parse_env("SYSLOG_FWD_PROTOCOL")?.unwrap_or(defaults.protocol),
            batch_size: parse_env("SYSLOG_FWD_BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            delay: parse_env("SYSLOG_FWD_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.delay),
            format: parse_env("SYSLOG_FWD_FORMAT")?.unwrap_or(defaults.format),
            tcp_framing: parse_env("SYSLOG_FWD_TCP_FRAMING")?.unwrap_or(defaults.tcp_framing),
            facility: parse_env("SYSLOG_FWD_FACILITY")?.unwrap_or(defaults.facility),
            severity: parse_env("SYSLOG_FWD_SEVERITY")?.unwrap_or(defaults.severity),
            app_name: env::var("SYSLOG_FWD_APP_NAME").unwrap_or(defaults.app_name),
            hostname: env::var("SYSLOG_FWD_HOSTNAME").ok(),
            follow: parse_env("SYSLOG_FWD_FOLLOW")?.unwrap_or(defaults.follow),
            poll_interval: parse_env("SYSLOG_FWD_POLL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            checkpoint_path: env::var("SYSLOG_FWD_CHECKPOINT_PATH").ok().map(PathBuf::from),
            retry_strategy,
            dead_letter_path: env::var("SYSLOG_FWD_DEAD_LETTER_PATH")
                .ok()
                .map(PathBuf::from),
            log_level: env::var("SYSLOG_FWD_LOG_LEVEL")
                .map(|val| val.to_lowercase())
                .unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "source path cannot be empty".to_string(),
            ));
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "destination host cannot be empty".to_string(),
            ));
        }

        if self.port == 0 {
            return Err(ConfigError::Invalid(
                "destination port must be greater than 0".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch size must be greater than 0".to_string(),
            ));
        }

        Priority::new(self.facility, self.severity)?;

        if self.app_name.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "app name '{}' cannot contain whitespace",
                self.app_name
            )));
        }

        if let Some(hostname) = &self.hostname {
            if hostname.is_empty() || hostname.chars().any(char::is_whitespace) {
                return Err(ConfigError::Invalid(format!(
                    "hostname '{hostname}' must be non-empty and cannot contain whitespace"
                )));
            }
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    #[must_use]
    pub fn destination(&self) -> Destination {
        Destination::new(self.host.clone(), self.port, self.protocol)
    }

    #[must_use]
    pub fn rate_config(&self) -> RateConfig {
        RateConfig {
            batch_size: self.batch_size,
            delay: self.delay,
        }
    }

    /// Syslog priority, falling back to user.info when facility or severity is out of range.
    /// [`validate`](Self::validate) rejects such values up front.
    #[must_use]
    pub fn priority(&self) -> Priority {
        Priority::new(self.facility, self.severity).unwrap_or_default()
    }
}

fn parse_env<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(None),
    }
}
