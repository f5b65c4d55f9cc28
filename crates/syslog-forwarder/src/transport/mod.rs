// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of one record to the collector.
//!
//! The forwarder only sees the [`Transport`] capability. Concrete strategies own the
//! syslog header ([`syslog::SyslogEncoder`]) and, for streams, the framing. Every strategy
//! writes the record payload into the socket as bytes, so a payload that looks like an
//! option flag (`-n`, `--help`) is delivered literally.

pub mod syslog;
pub mod tcp;
pub mod udp;

use async_trait::async_trait;

use crate::config::ForwarderConfig;
use crate::destination::{Destination, TransportKind};
use crate::errors::TransportError;
use crate::record::Record;

use self::syslog::SyslogEncoder;
use self::tcp::TcpSyslogTransport;
use self::udp::UdpSyslogTransport;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `record` to `destination` as exactly one message.
    ///
    /// `Ok` means the underlying primitive completed without error. What that guarantees
    /// depends on the strategy; see [`UdpSyslogTransport`] for the weakest case.
    async fn send(&mut self, destination: &Destination, record: &Record)
        -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(
        &mut self,
        destination: &Destination,
        record: &Record,
    ) -> Result<(), TransportError> {
        (**self).send(destination, record).await
    }
}

/// Builds the transport strategy matching the configured destination kind.
#[must_use]
pub fn from_config(config: &ForwarderConfig) -> Box<dyn Transport> {
    let encoder = SyslogEncoder::new(config.format, config.priority(), config.app_name.clone());
    let encoder = match &config.hostname {
        Some(hostname) => encoder.with_hostname(hostname.clone()),
        None => encoder,
    };
    match config.protocol {
        TransportKind::Udp => Box::new(UdpSyslogTransport::new(encoder)),
        TransportKind::Tcp => Box::new(TcpSyslogTransport::new(encoder, config.tcp_framing)),
    }
}
