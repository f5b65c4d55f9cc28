// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::record::Record;

/// Append-only file collecting records that exhausted their send attempts, one per line,
/// in the same newline-delimited form as the source so it can be forwarded again later.
pub struct DeadLetterFile {
    path: PathBuf,
    file: Option<File>,
}

impl DeadLetterFile {
    /// The file is created on the first append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DeadLetterFile {
            path: path.into(),
            file: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&mut self, record: &Record) -> io::Result<()> {
        // a handle that failed a write is dropped and reopened on the next append
        let mut file = match self.file.take() {
            Some(file) => file,
            None => {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)
                    .await?
            }
        };

        let mut line = Vec::with_capacity(record.len() + 1);
        line.extend_from_slice(record.payload());
        line.push(b'\n');
        file.write_all(&line).await?;
        file.flush().await?;
        self.file = Some(file);
        Ok(())
    }
}
