// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The read-forward loop.
//!
//! A [`Forwarder`] validates its source, then drains it one record at a time: send the
//! record, count it, write the checkpoint, and pause whenever a batch completes. The first
//! record that cannot be delivered ends the run with [`ForwardError::TransportFailure`]
//! unless a dead-letter file is configured.
//!
//! ```text
//! Idle -> Validating -> Running -> Completed
//!             |            |
//!             v            v
//!          Aborted(SourceUnavailable | TransportFailure)
//! ```
//!
//! The loop watches a [`CancellationToken`] at every record boundary and races it against
//! every pause, so a shutdown request is honored within one record's latency.

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::checkpoint::{self, CheckpointStore};
use crate::config::ForwarderConfig;
use crate::dead_letter::DeadLetterFile;
use crate::destination::Destination;
use crate::errors::{ForwardError, SourceError, TransportError};
use crate::rate_limit::RateLimiter;
use crate::record::Record;
use crate::source::SourceReader;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    SourceUnavailable,
    TransportFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwarderState {
    Idle,
    Validating,
    Running,
    Completed,
    Aborted(AbortReason),
}

/// Counters reported by a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records successfully handed to the transport
    pub sent: u64,
    /// Records that exhausted their attempts and went to the dead-letter file
    pub dead_lettered: u64,
    /// Rate-limit pauses taken
    pub pauses: u64,
    /// Source offset after the last record handled
    pub cursor: u64,
    /// The run ended on a cancellation request rather than source exhaustion
    pub cancelled: bool,
}

struct Checkpoint {
    store: CheckpointStore,
    key: String,
}

/// Outcome of a delivery that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Sent,
    /// Cancellation arrived during a retry backoff, before the record was sent.
    Cancelled,
}

pub struct Forwarder<T> {
    config: ForwarderConfig,
    destination: Destination,
    transport: T,
    cancel_token: CancellationToken,
    state: ForwarderState,
}

impl<T: Transport> Forwarder<T> {
    #[must_use]
    pub fn new(config: ForwarderConfig, transport: T, cancel_token: CancellationToken) -> Self {
        let destination = config.destination();
        Forwarder {
            config,
            destination,
            transport,
            cancel_token,
            state: ForwarderState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> ForwarderState {
        self.state
    }

    #[must_use]
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Consumes the forwarder and hands back its transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Opens the configured source (resuming from the checkpoint if one is configured) and
    /// forwards it.
    pub async fn run(&mut self) -> Result<RunSummary, ForwardError> {
        self.state = ForwarderState::Validating;
        let (source, checkpoint) = match self.open_source().await {
            Ok(opened) => opened,
            Err(e) => {
                error!("{}", e);
                self.state = ForwarderState::Aborted(AbortReason::SourceUnavailable);
                return Err(ForwardError::SourceUnavailable(e));
            }
        };
        self.forward(source, checkpoint).await
    }

    async fn open_source(&self) -> Result<(SourceReader, Option<Checkpoint>), SourceError> {
        let path = &self.config.source_path;
        let checkpoint = match &self.config.checkpoint_path {
            Some(checkpoint_path) => {
                let key = checkpoint::source_key(path).await.map_err(|source| {
                    SourceError::Unavailable {
                        path: path.clone(),
                        source,
                    }
                })?;
                let store = CheckpointStore::load(checkpoint_path).await;
                Some(Checkpoint { store, key })
            }
            None => None,
        };

        let offset = checkpoint
            .as_ref()
            .map_or(0, |checkpoint| checkpoint.store.offset(&checkpoint.key));
        let source = SourceReader::open_at(path, offset)
            .await?
            .hold_partial_lines(self.config.follow);
        Ok((source, checkpoint))
    }

    async fn forward(
        &mut self,
        mut source: SourceReader,
        mut checkpoint: Option<Checkpoint>,
    ) -> Result<RunSummary, ForwardError> {
        self.state = ForwarderState::Running;
        info!(
            "Forwarding {} to {} from offset {}",
            source.path().display(),
            self.destination,
            source.cursor()
        );

        let mut dead_letters = self.config.dead_letter_path.as_ref().map(DeadLetterFile::new);
        let mut limiter = RateLimiter::new(self.config.rate_config());
        let mut summary = RunSummary {
            cursor: source.cursor(),
            ..Default::default()
        };

        loop {
            if self.cancel_token.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let record = match source.next().await {
                Ok(Some(record)) => record,
                Ok(None) if self.config.follow => {
                    if !self.pause(self.config.poll_interval).await {
                        summary.cancelled = true;
                        break;
                    }
                    if let Err(e) = source.refresh().await {
                        return Err(self.abort_source(e));
                    }
                    if let Some(checkpoint) = checkpoint.as_mut() {
                        refresh_key(checkpoint, source.path()).await;
                    }
                    continue;
                }
                Ok(None) => break,
                Err(e) => return Err(self.abort_source(e)),
            };

            trace!("Record {}: {}", record.index(), record);
            let delivered = match self.deliver(&record).await {
                // the record stays unsent and unrecorded so the next run retries it
                Ok(Delivery::Cancelled) => {
                    summary.cancelled = true;
                    break;
                }
                Ok(Delivery::Sent) => {
                    debug!(
                        "Forwarded record {} ({} bytes) to {}",
                        record.index(),
                        record.len(),
                        self.destination
                    );
                    true
                }
                Err(e) => {
                    let Some(dead_letters) = dead_letters.as_mut() else {
                        return Err(self.abort_transport(record, e));
                    };
                    if let Err(dl_err) = dead_letters.append(&record).await {
                        error!(
                            "Unable to write record {} to dead-letter file {}: {}",
                            record.index(),
                            dead_letters.path().display(),
                            dl_err
                        );
                        return Err(self.abort_transport(record, e));
                    }
                    warn!(
                        "Record {} moved to dead-letter file {}: {}",
                        record.index(),
                        dead_letters.path().display(),
                        e
                    );
                    false
                }
            };

            summary.cursor = record.next_offset();
            if let Some(checkpoint) = checkpoint.as_mut() {
                if let Err(e) = checkpoint
                    .store
                    .store(&checkpoint.key, record.next_offset())
                    .await
                {
                    error!("Failed to write checkpoint: {}", e);
                }
            }

            if !delivered {
                summary.dead_lettered += 1;
                continue;
            }
            summary.sent += 1;
            if let Some(delay) = limiter.record_sent() {
                summary.pauses += 1;
                debug!(
                    "Sent {} records, pausing for {} ms",
                    limiter.batch_counter(),
                    delay.as_millis()
                );
                if !self.pause(delay).await {
                    summary.cancelled = true;
                    break;
                }
            }
        }

        self.state = ForwarderState::Completed;
        if summary.cancelled {
            info!(
                "Forwarding cancelled after {} records, offset {}",
                summary.sent, summary.cursor
            );
        } else {
            info!(
                "Forwarded {} records to {} ({} dead-lettered)",
                summary.sent, self.destination, summary.dead_lettered
            );
        }
        Ok(summary)
    }

    /// Sends one record, retrying per the configured strategy.
    async fn deliver(&mut self, record: &Record) -> Result<Delivery, TransportError> {
        let strategy = self.config.retry_strategy;
        let max_attempts = strategy.max_attempts();
        let mut attempt = 1;
        loop {
            match self.transport.send(&self.destination, record).await {
                Ok(()) => return Ok(Delivery::Sent),
                Err(e) if attempt >= max_attempts => return Err(e),
                Err(e) => {
                    let backoff = strategy.backoff(attempt);
                    warn!(
                        "Attempt {}/{} to send record {} failed, retrying in {} ms: {}",
                        attempt,
                        max_attempts,
                        record.index(),
                        backoff.as_millis(),
                        e
                    );
                    if !self.pause(backoff).await {
                        debug!(
                            "Retry of record {} interrupted by cancellation",
                            record.index()
                        );
                        return Ok(Delivery::Cancelled);
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Sleeps for `duration`. Returns false if cancelled first.
    async fn pause(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.cancel_token.is_cancelled();
        }
        tokio::select! {
            _ = sleep(duration) => true,
            _ = self.cancel_token.cancelled() => false,
        }
    }

    fn abort_source(&mut self, e: SourceError) -> ForwardError {
        error!("{}", e);
        self.state = ForwarderState::Aborted(AbortReason::SourceUnavailable);
        ForwardError::SourceUnavailable(e)
    }

    fn abort_transport(&mut self, record: Record, source: TransportError) -> ForwardError {
        self.state = ForwarderState::Aborted(AbortReason::TransportFailure);
        let e = ForwardError::TransportFailure {
            destination: self.destination.clone(),
            record,
            source,
        };
        error!("{}", e);
        e
    }
}

/// Follows the checkpoint key to the new file after a rotation.
async fn refresh_key(checkpoint: &mut Checkpoint, path: &std::path::Path) {
    match checkpoint::source_key(path).await {
        Ok(key) if key != checkpoint.key => {
            debug!("Checkpoint key changed to {}", key);
            checkpoint.key = key;
        }
        Ok(_) => {}
        Err(e) => debug!("Unable to refresh checkpoint key: {}", e),
    }
}
