// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Syslog message encoding and stream framing.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::errors::ConfigError;
use crate::hostname::{get_hostname, NIL_HOSTNAME};

/// Header written in front of each record payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyslogFormat {
    /// The payload as-is. Collectors that parse the line themselves expect this.
    #[default]
    Raw,
    /// BSD syslog, `<PRI>Mmm dd hh:mm:ss HOST APP[PID]: MSG`
    Rfc3164,
    /// `<PRI>1 TIMESTAMP HOST APP PID - - MSG`
    Rfc5424,
}

impl FromStr for SyslogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raw" => Ok(SyslogFormat::Raw),
            "rfc3164" | "bsd" => Ok(SyslogFormat::Rfc3164),
            "rfc5424" => Ok(SyslogFormat::Rfc5424),
            _ => Err(ConfigError::InvalidValue {
                name: "syslog format",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SyslogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyslogFormat::Raw => write!(f, "raw"),
            SyslogFormat::Rfc3164 => write!(f, "rfc3164"),
            SyslogFormat::Rfc5424 => write!(f, "rfc5424"),
        }
    }
}

/// How messages are delimited on a stream transport (RFC 6587).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TcpFraming {
    /// `LEN SP MSG`
    #[default]
    OctetCounting,
    /// `MSG LF`
    NewlineDelimited,
}

impl TcpFraming {
    #[must_use]
    pub fn frame(&self, message: &[u8]) -> Vec<u8> {
        match self {
            TcpFraming::OctetCounting => {
                let prefix = format!("{} ", message.len());
                let mut framed = Vec::with_capacity(prefix.len() + message.len());
                framed.extend_from_slice(prefix.as_bytes());
                framed.extend_from_slice(message);
                framed
            }
            TcpFraming::NewlineDelimited => {
                let mut framed = Vec::with_capacity(message.len() + 1);
                framed.extend_from_slice(message);
                framed.push(b'\n');
                framed
            }
        }
    }
}

impl FromStr for TcpFraming {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "octet" | "octet-counting" => Ok(TcpFraming::OctetCounting),
            "newline" => Ok(TcpFraming::NewlineDelimited),
            _ => Err(ConfigError::InvalidValue {
                name: "tcp framing",
                value: s.to_string(),
            }),
        }
    }
}

/// Syslog PRI: facility * 8 + severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Priority {
    facility: u8,
    severity: u8,
}

impl Priority {
    pub const MAX_FACILITY: u8 = 23;
    pub const MAX_SEVERITY: u8 = 7;

    pub fn new(facility: u8, severity: u8) -> Result<Self, ConfigError> {
        if facility > Self::MAX_FACILITY {
            return Err(ConfigError::Invalid(format!(
                "facility must be between 0 and {}, got {}",
                Self::MAX_FACILITY,
                facility
            )));
        }
        if severity > Self::MAX_SEVERITY {
            return Err(ConfigError::Invalid(format!(
                "severity must be between 0 and {}, got {}",
                Self::MAX_SEVERITY,
                severity
            )));
        }
        Ok(Priority { facility, severity })
    }

    #[must_use]
    pub fn value(&self) -> u8 {
        self.facility * 8 + self.severity
    }
}

impl Default for Priority {
    /// user.info
    fn default() -> Self {
        Priority {
            facility: 1,
            severity: 6,
        }
    }
}

/// Turns a record payload into one syslog message. The payload bytes are copied verbatim
/// after the header; nothing in them is interpreted.
#[derive(Debug, Clone)]
pub struct SyslogEncoder {
    format: SyslogFormat,
    priority: Priority,
    hostname: String,
    app_name: String,
    pid: u32,
}

impl SyslogEncoder {
    #[must_use]
    pub fn new(format: SyslogFormat, priority: Priority, app_name: impl Into<String>) -> Self {
        let hostname = match format {
            SyslogFormat::Raw => NIL_HOSTNAME.to_string(),
            _ => get_hostname(),
        };
        SyslogEncoder {
            format,
            priority,
            hostname,
            app_name: app_name.into(),
            pid: std::process::id(),
        }
    }

    /// Encoder that sends payloads unchanged.
    #[must_use]
    pub fn raw() -> Self {
        Self::new(SyslogFormat::Raw, Priority::default(), "")
    }

    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    #[must_use]
    pub fn format(&self) -> SyslogFormat {
        self.format
    }

    #[must_use]
    pub fn encode(&self, payload: &[u8]) -> Vec<u8> {
        self.encode_at(payload, Utc::now())
    }

    fn encode_at(&self, payload: &[u8], now: DateTime<Utc>) -> Vec<u8> {
        let header = match self.format {
            SyslogFormat::Raw => return payload.to_vec(),
            SyslogFormat::Rfc3164 => format!(
                "<{}>{} {} {}[{}]: ",
                self.priority.value(),
                now.format("%b %e %H:%M:%S"),
                self.hostname,
                self.app_name_or_nil(),
                self.pid
            ),
            SyslogFormat::Rfc5424 => format!(
                "<{}>1 {} {} {} {} - - ",
                self.priority.value(),
                now.to_rfc3339_opts(SecondsFormat::Micros, true),
                self.hostname,
                self.app_name_or_nil(),
                self.pid
            ),
        };
        let mut message = Vec::with_capacity(header.len() + payload.len());
        message.extend_from_slice(header.as_bytes());
        message.extend_from_slice(payload);
        message
    }

    fn app_name_or_nil(&self) -> &str {
        if self.app_name.is_empty() {
            NIL_HOSTNAME
        } else {
            &self.app_name
        }
    }
}
