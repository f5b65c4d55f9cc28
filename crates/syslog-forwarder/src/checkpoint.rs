// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Persisted cursor positions.
//!
//! The state file is a JSON object mapping `"<absolute path>:<inode>"` to the byte offset of
//! the next unsent record. Keying by inode as well as path lets several sources share one
//! state file and makes a rotated file (new inode, same path) start from zero instead of
//! inheriting the old file's offset.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::CheckpointError;
use crate::source::file_id;

pub struct CheckpointStore {
    path: PathBuf,
    offsets: HashMap<String, u64>,
}

impl CheckpointStore {
    /// Loads the state file at `path`. A missing or unparseable file yields an empty store so
    /// forwarding starts from the beginning of each source.
    pub async fn load(path: impl Into<PathBuf>) -> CheckpointStore {
        let path = path.into();
        let offsets = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, u64>>(&bytes) {
                Ok(offsets) => offsets,
                Err(e) => {
                    warn!(
                        "Ignoring corrupt checkpoint file {}: {}",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!("Unable to read checkpoint file {}: {}", path.display(), e);
                HashMap::new()
            }
        };
        CheckpointStore { path, offsets }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored offset for `key`, or 0.
    #[must_use]
    pub fn offset(&self, key: &str) -> u64 {
        self.offsets.get(key).copied().unwrap_or(0)
    }

    /// Records `offset` for `key` and rewrites the state file atomically.
    pub async fn store(&mut self, key: &str, offset: u64) -> Result<(), CheckpointError> {
        self.offsets.insert(key.to_string(), offset);
        let serialized = serde_json::to_vec(&self.offsets)?;

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, serialized)
            .await
            .map_err(|source| CheckpointError::Io {
                path: tmp_path.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|source| CheckpointError::Io {
                path: self.path.clone(),
                source,
            })?;
        debug!("Checkpointed {} at offset {}", key, offset);
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Checkpoint key for the file currently behind `source`.
pub async fn source_key(source: &Path) -> io::Result<String> {
    let absolute = tokio::fs::canonicalize(source).await?;
    let metadata = tokio::fs::metadata(&absolute).await?;
    Ok(match file_id(&metadata) {
        Some(id) => format!("{}:{}", absolute.display(), id),
        None => absolute.display().to_string(),
    })
}
