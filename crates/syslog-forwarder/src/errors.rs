// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for reading sources, sending records and running the forwarder.

use std::io;
use std::path::PathBuf;

use crate::destination::Destination;
use crate::forwarder::RunSummary;
use crate::record::Record;

/// Errors raised while reading the source file.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("cannot open source {}: {source}", .path.display())]
    Unavailable { path: PathBuf, source: io::Error },

    #[error("failed reading source {} at offset {offset}: {source}", .path.display())]
    Read {
        path: PathBuf,
        offset: u64,
        source: io::Error,
    },
}

/// Errors raised by a [`Transport`](crate::transport::Transport) while delivering one record.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to resolve {address}: {source}")]
    Resolve { address: String, source: io::Error },

    #[error("failed to connect to {address}: {source}")]
    Connect { address: String, source: io::Error },

    #[error("timed out after {timeout_ms} ms talking to {address}")]
    Timeout { address: String, timeout_ms: u128 },

    #[error("failed to send to {address}: {source}")]
    Send { address: String, source: io::Error },

    #[error("datagram to {address} truncated: sent {sent} of {len} bytes")]
    PartialWrite {
        address: String,
        sent: usize,
        len: usize,
    },

    #[error("{0}")]
    Rejected(String),
}

/// Errors raised by the checkpoint store.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint file {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to serialize checkpoint state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while building or validating a [`ForwarderConfig`](crate::config::ForwarderConfig).
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Why a forwarding run stopped before exhausting its source.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),

    #[error(
        "failed to forward record {} (offset {}) to {destination}: {source}",
        .record.index(),
        .record.offset()
    )]
    TransportFailure {
        destination: Destination,
        record: Record,
        source: TransportError,
    },
}

/// What a run reports to its caller. There are exactly three outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionStatus {
    Success,
    SourceUnavailable,
    TransportFailure { index: u64, reason: String },
}

impl CompletionStatus {
    #[must_use]
    pub fn from_result(result: &Result<RunSummary, ForwardError>) -> Self {
        match result {
            Ok(_) => CompletionStatus::Success,
            Err(ForwardError::SourceUnavailable(_)) => CompletionStatus::SourceUnavailable,
            Err(ForwardError::TransportFailure { record, source, .. }) => {
                CompletionStatus::TransportFailure {
                    index: record.index(),
                    reason: source.to_string(),
                }
            }
        }
    }

    /// Process exit code for this status. Source and transport failures are kept distinct.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            CompletionStatus::Success => 0,
            CompletionStatus::SourceUnavailable => 1,
            CompletionStatus::TransportFailure { .. } => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::TransportKind;

    #[test]
    fn test_error_display() {
        let error = ConfigError::Invalid("batch size must be greater than 0".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid configuration: batch size must be greater than 0"
        );
    }

    #[test]
    fn test_transport_failure_display_names_record_and_destination() {
        let error = ForwardError::TransportFailure {
            destination: Destination::new("10.0.0.5", 55140, TransportKind::Udp),
            record: Record::new(3, 12, 18, b"hello".to_vec()),
            source: TransportError::Rejected("collector refused".to_string()),
        };
        assert_eq!(
            error.to_string(),
            "failed to forward record 3 (offset 12) to udp://10.0.0.5:55140: collector refused"
        );
    }

    #[test]
    fn test_completion_status_exit_codes_are_distinct() {
        let source = CompletionStatus::from_result(&Err(ForwardError::SourceUnavailable(
            SourceError::Unavailable {
                path: PathBuf::from("/nope"),
                source: io::Error::from(io::ErrorKind::NotFound),
            },
        )));
        let transport = CompletionStatus::from_result(&Err(ForwardError::TransportFailure {
            destination: Destination::new("localhost", 514, TransportKind::Tcp),
            record: Record::new(7, 0, 1, Vec::new()),
            source: TransportError::Rejected("nope".to_string()),
        }));
        let success = CompletionStatus::from_result(&Ok(RunSummary::default()));

        assert_eq!(success.exit_code(), 0);
        assert_eq!(source, CompletionStatus::SourceUnavailable);
        assert_eq!(source.exit_code(), 1);
        assert_eq!(
            transport,
            CompletionStatus::TransportFailure {
                index: 7,
                reason: "nope".to_string()
            }
        );
        assert_eq!(transport.exit_code(), 2);
    }
}
