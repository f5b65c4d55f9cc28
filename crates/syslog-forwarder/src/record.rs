// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// One newline-delimited line of the source, without its delimiter.
///
/// The payload is opaque: it is never trimmed, decoded or inspected. A zero-length
/// payload is a valid record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    index: u64,
    offset: u64,
    next_offset: u64,
    payload: Vec<u8>,
}

impl Record {
    /// `index` is the 1-based position of the record within the run, `offset` the byte at which
    /// it starts in the source and `next_offset` the byte at which the following record starts.
    #[must_use]
    pub fn new(index: u64, offset: u64, next_offset: u64, payload: Vec<u8>) -> Self {
        Record {
            index,
            offset,
            next_offset,
            payload,
        }
    }

    #[must_use]
    pub fn index(&self) -> u64 {
        self.index
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Cursor value once this record is consumed.
    #[must_use]
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.payload))
    }
}
