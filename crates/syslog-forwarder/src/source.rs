// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Newline-delimited record reader over a local file.
//!
//! The reader returns the exact bytes between `\n` delimiters: no trimming, no `\r`
//! stripping and no splitting on any other byte. It owns the cursor, the byte offset at
//! which the next record starts.
//!
//! In follow mode a trailing line that has no delimiter yet is held back (the cursor
//! does not move past it) until a writer completes it, and [`SourceReader::refresh`]
//! reopens the file from the start when it was truncated or replaced by rotation.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tracing::{debug, warn};

use crate::errors::SourceError;
use crate::record::Record;

const RECORD_DELIMITER: u8 = b'\n';

pub struct SourceReader {
    path: PathBuf,
    reader: BufReader<File>,
    cursor: u64,
    file_id: Option<u64>,
    records_read: u64,
    hold_partial_lines: bool,
}

impl SourceReader {
    /// Opens `path` at its first byte.
    ///
    /// Fails with [`SourceError::Unavailable`] before any record is produced when the path does
    /// not exist, is not readable, or is a directory.
    pub async fn open(path: impl AsRef<Path>) -> Result<SourceReader, SourceError> {
        Self::open_at(path, 0).await
    }

    /// Opens `path` with the cursor at `offset`.
    ///
    /// An offset past the end of the file means the file was truncated since the offset was
    /// recorded, so reading restarts at 0.
    pub async fn open_at(path: impl AsRef<Path>, offset: u64) -> Result<SourceReader, SourceError> {
        let path = path.as_ref().to_path_buf();
        let (reader, cursor, file_id) = open_file(&path, offset).await?;
        debug!("Opened source {} at offset {}", path.display(), cursor);
        Ok(SourceReader {
            path,
            reader,
            cursor,
            file_id,
            records_read: 0,
            hold_partial_lines: false,
        })
    }

    /// Holds back a trailing line without a delimiter instead of returning it. Used when
    /// tailing a file that a writer is still appending to.
    #[must_use]
    pub fn hold_partial_lines(mut self, hold: bool) -> Self {
        self.hold_partial_lines = hold;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset at which the next record begins.
    #[must_use]
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Number of records produced so far.
    #[must_use]
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Returns the next record, or `None` at the current end of the stream.
    pub async fn next(&mut self) -> Result<Option<Record>, SourceError> {
        let mut line = Vec::new();
        let read = self
            .reader
            .read_until(RECORD_DELIMITER, &mut line)
            .await
            .map_err(|source| self.read_error(source))?;
        if read == 0 {
            return Ok(None);
        }

        let terminated = line.last() == Some(&RECORD_DELIMITER);
        if !terminated && self.hold_partial_lines {
            // seeking discards the buffered partial line so it is read again once complete
            self.reader
                .seek(SeekFrom::Start(self.cursor))
                .await
                .map_err(|source| self.read_error(source))?;
            return Ok(None);
        }

        let offset = self.cursor;
        self.cursor += read as u64;
        if terminated {
            line.pop();
        }
        self.records_read += 1;
        Ok(Some(Record::new(
            self.records_read,
            offset,
            self.cursor,
            line,
        )))
    }

    /// Re-checks the file behind `path` after reaching the end of the stream.
    ///
    /// Returns `true` when the file was reopened from offset 0 because it was truncated below
    /// the cursor or the path now refers to a different file. A path that has vanished (the
    /// gap between a rotation's rename and re-create) is not an error; the current handle is
    /// kept until a new file appears.
    pub async fn refresh(&mut self) -> Result<bool, SourceError> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Source {} is missing, waiting for it to reappear", self.path.display());
                return Ok(false);
            }
            Err(source) => {
                return Err(SourceError::Unavailable {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let rotated = file_id(&metadata) != self.file_id;
        let truncated = metadata.len() < self.cursor;
        if !rotated && !truncated {
            return Ok(false);
        }

        if rotated {
            warn!("Source {} was rotated, reading new file from the start", self.path.display());
        } else {
            warn!(
                "Source {} was truncated to {} bytes below offset {}, reading from the start",
                self.path.display(),
                metadata.len(),
                self.cursor
            );
        }
        let (reader, cursor, file_id) = open_file(&self.path, 0).await?;
        self.reader = reader;
        self.cursor = cursor;
        self.file_id = file_id;
        Ok(true)
    }

    fn read_error(&self, source: io::Error) -> SourceError {
        SourceError::Read {
            path: self.path.clone(),
            offset: self.cursor,
            source,
        }
    }
}

async fn open_file(
    path: &Path,
    offset: u64,
) -> Result<(BufReader<File>, u64, Option<u64>), SourceError> {
    let unavailable = |source: io::Error| SourceError::Unavailable {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).await.map_err(unavailable)?;
    let metadata = file.metadata().await.map_err(unavailable)?;
    if metadata.is_dir() {
        return Err(unavailable(io::Error::new(
            io::ErrorKind::InvalidInput,
            "source is a directory",
        )));
    }

    let cursor = if offset > metadata.len() {
        warn!(
            "Offset {} is past the end of {} ({} bytes), reading from the start",
            offset,
            path.display(),
            metadata.len()
        );
        0
    } else {
        offset
    };
    if cursor > 0 {
        file.seek(SeekFrom::Start(cursor))
            .await
            .map_err(unavailable)?;
    }

    Ok((BufReader::new(file), cursor, file_id(&metadata)))
}

/// Identity of the file behind a path, used to notice rotation.
#[cfg(unix)]
pub(crate) fn file_id(metadata: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.ino())
}

#[cfg(not(unix))]
pub(crate) fn file_id(_metadata: &std::fs::Metadata) -> Option<u64> {
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn source_with(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    async fn read_all(reader: &mut SourceReader) -> Vec<Record> {
        let mut records = Vec::new();
        while let Some(record) = reader.next().await.unwrap() {
            records.push(record);
        }
        records
    }

    #[tokio::test]
    async fn test_open_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.log");
        let err = SourceReader::open(&missing).await.err().unwrap();
        match err {
            SourceError::Unavailable { path, source } => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_open_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = SourceReader::open(dir.path()).await.err().unwrap();
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_records_keep_exact_bytes() {
        let file = source_with(b"A\n\n  \nC\r\n-n flag\n");
        let mut reader = SourceReader::open(file.path()).await.unwrap();
        let records = read_all(&mut reader).await;

        let payloads: Vec<&[u8]> = records.iter().map(Record::payload).collect();
        assert_eq!(
            payloads,
            vec![&b"A"[..], &b""[..], &b"  "[..], &b"C\r"[..], &b"-n flag"[..]]
        );
        assert_eq!(
            records.iter().map(Record::index).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
        assert_eq!(records[1].offset(), 2);
        assert_eq!(records[1].next_offset(), 3);
        assert_eq!(reader.cursor(), 18);
        assert_eq!(reader.records_read(), 5);
    }

    #[tokio::test]
    async fn test_final_line_without_newline_is_a_record() {
        let file = source_with(b"first\nlast");
        let mut reader = SourceReader::open(file.path()).await.unwrap();
        let records = read_all(&mut reader).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].payload(), b"last");
        assert_eq!(reader.cursor(), 10);
    }

    #[tokio::test]
    async fn test_empty_source_has_no_records() {
        let file = source_with(b"");
        let mut reader = SourceReader::open(file.path()).await.unwrap();
        assert!(reader.next().await.unwrap().is_none());
        assert_eq!(reader.cursor(), 0);
    }

    #[tokio::test]
    async fn test_open_at_resumes_from_offset() {
        let file = source_with(b"one\ntwo\nthree\n");
        let mut reader = SourceReader::open_at(file.path(), 4).await.unwrap();
        let records = read_all(&mut reader).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].payload(), b"two");
        assert_eq!(records[0].offset(), 4);
        assert_eq!(records[0].index(), 1);
    }

    #[tokio::test]
    async fn test_open_at_past_end_restarts() {
        let file = source_with(b"short\n");
        let reader = SourceReader::open_at(file.path(), 4096).await.unwrap();
        assert_eq!(reader.cursor(), 0);
    }

    #[tokio::test]
    async fn test_partial_line_held_until_complete() {
        let mut file = source_with(b"done\npart");
        let mut reader = SourceReader::open(file.path())
            .await
            .unwrap()
            .hold_partial_lines(true);

        assert_eq!(reader.next().await.unwrap().unwrap().payload(), b"done");
        assert!(reader.next().await.unwrap().is_none());
        assert_eq!(reader.cursor(), 5);

        file.write_all(b"ial\n").unwrap();
        file.flush().unwrap();

        let record = reader.next().await.unwrap().unwrap();
        assert_eq!(record.payload(), b"partial");
        assert_eq!(record.offset(), 5);
        assert_eq!(reader.cursor(), 13);
    }

    #[tokio::test]
    async fn test_refresh_after_truncation() {
        let file = source_with(b"old line one\nold line two\n");
        let mut reader = SourceReader::open(file.path()).await.unwrap();
        assert_eq!(read_all(&mut reader).await.len(), 2);
        assert!(!reader.refresh().await.unwrap());

        std::fs::write(file.path(), b"new\n").unwrap();
        assert!(reader.refresh().await.unwrap());
        assert_eq!(reader.cursor(), 0);

        let records = read_all(&mut reader).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload(), b"new");
        assert_eq!(records[0].index(), 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_refresh_after_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, b"before rotation\n").unwrap();

        let mut reader = SourceReader::open(&path).await.unwrap();
        assert_eq!(read_all(&mut reader).await.len(), 1);

        std::fs::rename(&path, dir.path().join("app.log.1")).unwrap();
        assert!(!reader.refresh().await.unwrap());

        std::fs::write(&path, b"after rotation, which is longer\n").unwrap();
        assert!(reader.refresh().await.unwrap());
        let records = read_all(&mut reader).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload(), b"after rotation, which is longer");
    }

    proptest! {
        #[test]
        fn test_lines_round_trip_through_reader(
            lines in proptest::collection::vec(
                proptest::collection::vec(any::<u8>().prop_filter("no delimiter", |b| *b != b'\n'), 0..40),
                0..20,
            )
        ) {
            let mut content = Vec::new();
            for line in &lines {
                content.extend_from_slice(line);
                content.push(b'\n');
            }
            let file = source_with(&content);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let records = runtime.block_on(async {
                let mut reader = SourceReader::open(file.path()).await.unwrap();
                read_all(&mut reader).await
            });

            let payloads: Vec<Vec<u8>> = records.into_iter().map(Record::into_payload).collect();
            prop_assert_eq!(payloads, lines);
        }
    }
}
