use async_trait::async_trait;
use workout_core::model::{Workout, WorkoutId};

use crate::repository::{StorageError, WorkoutRepository};

use super::SqliteRepository;
use super::mapping::map_workout_row;

#[async_trait]
impl WorkoutRepository for SqliteRepository {
    async fn upsert_workout(&self, workout: &Workout) -> Result<(), StorageError> {
        let body = workout.shape().to_json().to_string();
        sqlx::query(
            r"
            INSERT INTO workouts (id, title, body)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                body = excluded.body
            ",
        )
        .bind(workout.id().as_str())
        .bind(workout.title())
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn get_workout(&self, id: &WorkoutId) -> Result<Option<Workout>, StorageError> {
        let row = sqlx::query("SELECT id, title, body FROM workouts WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        row.as_ref().map(map_workout_row).transpose()
    }

    async fn list_workouts(&self) -> Result<Vec<Workout>, StorageError> {
        let rows = sqlx::query("SELECT id, title, body FROM workouts ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        rows.iter().map(map_workout_row).collect()
    }
}
