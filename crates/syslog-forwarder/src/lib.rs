// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Forwards newline-delimited log records from a local file to a remote syslog collector.
//!
//! The crate is layered the same way the data flows:
//!
//! - [`source::SourceReader`] extracts [`record::Record`]s from a file and tracks the cursor.
//! - [`forwarder::Forwarder`] drains the reader and hands each record to a
//!   [`transport::Transport`], metered by a [`rate_limit::RateLimiter`].
//! - [`transport`] owns syslog encoding and framing for UDP and TCP collectors.
//!
//! Everything runs as a single sequential pipeline: read one record, send it, maybe pause.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod checkpoint;
pub mod config;
pub mod dead_letter;
pub mod destination;
pub mod errors;
pub mod forwarder;
pub mod hostname;
pub mod rate_limit;
pub mod record;
pub mod retry;
pub mod source;
pub mod transport;
