//! Local JSON snapshot of crawler results
//!
//! Purely a debugging aid: the pagination crawler dumps its result list here
//! when an output path is configured.

use crate::sink::traits::SinkResult;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Writes pretty-printed JSON to a fixed path
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes `value` and replaces the snapshot file, creating parent
    /// directories as needed
    pub async fn write<T>(&self, value: &T) -> SinkResult<()>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_vec_pretty(value)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(&self.path, json).await?;
        tracing::debug!("Wrote snapshot to {}", self.path.display());
        Ok(())
    }
}
