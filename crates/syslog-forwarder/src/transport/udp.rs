// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tokio::net::{lookup_host, UdpSocket};
use tracing::{debug, trace};

use crate::destination::Destination;
use crate::errors::TransportError;
use crate::record::Record;
use crate::transport::syslog::SyslogEncoder;
use crate::transport::Transport;

/// Syslog over UDP, one datagram per record.
///
/// Success only means the local network stack accepted the datagram. UDP has no
/// acknowledgement, so a datagram can still be dropped on the way or by a collector that is
/// down. The one remote signal that does surface is an ICMP port-unreachable from an earlier
/// datagram, which the OS reports as an error on a later send.
pub struct UdpSyslogTransport {
    encoder: SyslogEncoder,
    socket: Option<(Destination, UdpSocket)>,
}

impl UdpSyslogTransport {
    #[must_use]
    pub fn new(encoder: SyslogEncoder) -> Self {
        UdpSyslogTransport {
            encoder,
            socket: None,
        }
    }

    async fn connect(destination: &Destination) -> Result<UdpSocket, TransportError> {
        let address = destination.address();
        let peer = resolve(&address).await?;
        let local: SocketAddr = if peer.is_ipv4() {
            SocketAddr::from(([0u8; 4], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };

        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| TransportError::Connect {
                address: address.clone(),
                source,
            })?;
        socket
            .connect(peer)
            .await
            .map_err(|source| TransportError::Connect {
                address: address.clone(),
                source,
            })?;
        debug!("UDP socket bound for {}", destination);
        Ok(socket)
    }
}

#[async_trait]
impl Transport for UdpSyslogTransport {
    async fn send(
        &mut self,
        destination: &Destination,
        record: &Record,
    ) -> Result<(), TransportError> {
        let socket = match self.socket.take() {
            Some((connected, socket)) if connected == *destination => socket,
            _ => Self::connect(destination).await?,
        };

        let message = self.encoder.encode(record.payload());
        let result = socket.send(&message).await;
        self.socket = Some((destination.clone(), socket));

        let sent = result.map_err(|source| TransportError::Send {
            address: destination.address(),
            source,
        })?;
        if sent != message.len() {
            return Err(TransportError::PartialWrite {
                address: destination.address(),
                sent,
                len: message.len(),
            });
        }
        trace!("Sent {} byte datagram to {}", sent, destination);
        Ok(())
    }
}

pub(crate) async fn resolve(address: &str) -> Result<SocketAddr, TransportError> {
    let mut addresses = lookup_host(address)
        .await
        .map_err(|source| TransportError::Resolve {
            address: address.to_string(),
            source,
        })?;
    addresses.next().ok_or_else(|| TransportError::Resolve {
        address: address.to_string(),
        source: io::Error::new(io::ErrorKind::NotFound, "no addresses found"),
    })
}
