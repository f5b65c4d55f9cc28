// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::destination::Destination;
use crate::errors::TransportError;
use crate::record::Record;
use crate::transport::syslog::{SyslogEncoder, TcpFraming};
use crate::transport::udp::resolve;
use crate::transport::Transport;

const TCP_TIMEOUT: Duration = Duration::from_secs(5);

/// Syslog over TCP with RFC 6587 framing.
///
/// Success means the framed message was fully written to the connection. The connection is
/// opened on the first send; after any failure it is dropped and the next send reconnects.
pub struct TcpSyslogTransport {
    encoder: SyslogEncoder,
    framing: TcpFraming,
    timeout: Duration,
    stream: Option<(Destination, TcpStream)>,
}

impl TcpSyslogTransport {
    #[must_use]
    pub fn new(encoder: SyslogEncoder, framing: TcpFraming) -> Self {
        TcpSyslogTransport {
            encoder,
            framing,
            timeout: TCP_TIMEOUT,
            stream: None,
        }
    }

    /// Bounds connecting and writing one message.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn connect(&self, destination: &Destination) -> Result<TcpStream, TransportError> {
        let address = destination.address();
        let peer = resolve(&address).await?;
        let stream = timeout(self.timeout, TcpStream::connect(peer))
            .await
            .map_err(|_| TransportError::Timeout {
                address: address.clone(),
                timeout_ms: self.timeout.as_millis(),
            })?
            .map_err(|source| TransportError::Connect {
                address: address.clone(),
                source,
            })?;
        // records are small and latency matters more than packing
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Unable to set TCP_NODELAY for {}: {}", destination, e);
        }
        debug!("Connected to {}", destination);
        Ok(stream)
    }
}

#[async_trait]
impl Transport for TcpSyslogTransport {
    async fn send(
        &mut self,
        destination: &Destination,
        record: &Record,
    ) -> Result<(), TransportError> {
        let mut stream = match self.stream.take() {
            Some((connected, stream)) if connected == *destination => stream,
            _ => self.connect(destination).await?,
        };

        let framed = self.framing.frame(&self.encoder.encode(record.payload()));
        let write = async {
            stream.write_all(&framed).await?;
            stream.flush().await
        };
        match timeout(self.timeout, write).await {
            Ok(Ok(())) => {
                trace!("Wrote {} bytes to {}", framed.len(), destination);
                self.stream = Some((destination.clone(), stream));
                Ok(())
            }
            Ok(Err(source)) => Err(TransportError::Send {
                address: destination.address(),
                source,
            }),
            Err(_) => Err(TransportError::Timeout {
                address: destination.address(),
                timeout_ms: self.timeout.as_millis(),
            }),
        }
    }
}
