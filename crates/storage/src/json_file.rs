use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use workout_core::progress::ProgressMap;

use crate::codec::{decode_progress, encode_progress};
use crate::repository::{ProgressPersistence, StorageError};

/// Progress persistence backed by a single JSON file on device storage.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write `data` through a tempfile in the same directory, then rename, so a
/// crash mid-write never leaves a truncated file behind.
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn read_progress(path: &Path) -> Result<ProgressMap, StorageError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => decode_progress(&raw),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(ProgressMap::new()),
        Err(err) => Err(err.into()),
    }
}

fn join_error(err: tokio::task::JoinError) -> StorageError {
    StorageError::Io(std::io::Error::other(err))
}

// File I/O runs on the blocking pool so the executor threads stay free.
#[async_trait]
impl ProgressPersistence for JsonFileStore {
    async fn load_progress(&self) -> Result<ProgressMap, StorageError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_progress(&path))
            .await
            .map_err(join_error)?
    }

    async fn save_progress(&self, map: &ProgressMap) -> Result<(), StorageError> {
        let raw = encode_progress(map)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || atomic_write(&path, raw.as_bytes()))
            .await
            .map_err(join_error)?
    }
}
