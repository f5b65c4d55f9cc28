// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigError;

/// Network transport used to reach the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    #[default]
    Udp,
    Tcp,
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "udp" => Ok(TransportKind::Udp),
            "tcp" => Ok(TransportKind::Tcp),
            _ => Err(ConfigError::InvalidValue {
                name: "protocol",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Udp => write!(f, "udp"),
            TransportKind::Tcp => write!(f, "tcp"),
        }
    }
}

/// The remote collector a run forwards to. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    host: String,
    port: u16,
    kind: TransportKind,
}

impl Destination {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, kind: TransportKind) -> Self {
        Destination {
            host: host.into(),
            port,
            kind,
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// `host:port`, bracketing IPv6 literals so the result can be handed to socket APIs.
    #[must_use]
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.kind, self.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duplicate::duplicate_item;

    #[duplicate_item(
        test_name                   input       expected;
        [test_parse_udp]            ["udp"]     [TransportKind::Udp];
        [test_parse_tcp]            ["tcp"]     [TransportKind::Tcp];
        [test_parse_uppercase]      ["TCP"]     [TransportKind::Tcp];
        [test_parse_padded]         [" udp "]   [TransportKind::Udp];
    )]
    #[test]
    fn test_name() {
        assert_eq!(input.parse::<TransportKind>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_protocol() {
        assert_eq!(
            "tls".parse::<TransportKind>(),
            Err(ConfigError::InvalidValue {
                name: "protocol",
                value: "tls".to_string()
            })
        );
    }

    #[test]
    fn test_address_brackets_ipv6() {
        let destination = Destination::new("::1", 514, TransportKind::Udp);
        assert_eq!(destination.address(), "[::1]:514");
        assert_eq!(destination.to_string(), "udp://[::1]:514");
    }

    #[test]
    fn test_address_hostname() {
        let destination = Destination::new("collector.internal", 55141, TransportKind::Tcp);
        assert_eq!(destination.address(), "collector.internal:55141");
        assert_eq!(destination.to_string(), "tcp://collector.internal:55141");
    }
}
