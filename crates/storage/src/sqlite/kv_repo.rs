use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use workout_core::progress::ProgressMap;

use crate::codec::{PROGRESS_NAMESPACE, decode_progress, encode_progress};
use crate::repository::{ProgressPersistence, StorageError};

use super::SqliteRepository;

#[async_trait]
impl ProgressPersistence for SqliteRepository {
    async fn load_progress(&self) -> Result<ProgressMap, StorageError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?1")
            .bind(PROGRESS_NAMESPACE)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(ProgressMap::new());
        };

        let raw: String = row
            .try_get("value")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        decode_progress(&raw)
    }

    async fn save_progress(&self, map: &ProgressMap) -> Result<(), StorageError> {
        let raw = encode_progress(map)?;
        sqlx::query(
            r"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(PROGRESS_NAMESPACE)
        .bind(raw)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}
