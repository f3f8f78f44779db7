use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use workout_core::model::{Assignment, AssignmentStatus, AthleteId, WorkoutId};

use crate::repository::{AssignmentRepository, StorageError};

use super::SqliteRepository;
use super::mapping::{encode_indices, map_assignment_row, parse_status};

impl SqliteRepository {
    /// Insert or replace an assignment row, as the coach-facing side would.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be written (including a
    /// missing workout).
    pub async fn upsert_assignment(&self, assignment: &Assignment) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO workout_assignments (
                athlete_id,
                workout_id,
                status,
                completed_exercises,
                updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(athlete_id, workout_id) DO UPDATE SET
                status = excluded.status,
                completed_exercises = excluded.completed_exercises,
                updated_at = excluded.updated_at
            ",
        )
        .bind(assignment.athlete_id.to_string())
        .bind(assignment.workout_id.as_str())
        .bind(assignment.status.as_str())
        .bind(encode_indices(&assignment.completed_exercises)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl AssignmentRepository for SqliteRepository {
    async fn assignments_for_athlete(
        &self,
        athlete_id: AthleteId,
    ) -> Result<Vec<Assignment>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT athlete_id, workout_id, status, completed_exercises
            FROM workout_assignments
            WHERE athlete_id = ?1
            ORDER BY workout_id ASC
            ",
        )
        .bind(athlete_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        rows.iter().map(map_assignment_row).collect()
    }

    async fn update_assignment_status(
        &self,
        athlete_id: AthleteId,
        workout_id: &WorkoutId,
        status: AssignmentStatus,
    ) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let row = sqlx::query(
            "SELECT status FROM workout_assignments WHERE athlete_id = ?1 AND workout_id = ?2",
        )
        .bind(athlete_id.to_string())
        .bind(workout_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?
        .ok_or(StorageError::NotFound)?;

        let current: String = row
            .try_get("status")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let next = parse_status(&current)?
            .transition(status)
            .map_err(|_| StorageError::Conflict)?;

        // Reset also clears the exercise-level history.
        let sql = if next == AssignmentStatus::Assigned {
            r"
            UPDATE workout_assignments
            SET status = ?3, completed_exercises = '[]', updated_at = ?4
            WHERE athlete_id = ?1 AND workout_id = ?2
            "
        } else {
            r"
            UPDATE workout_assignments
            SET status = ?3, updated_at = ?4
            WHERE athlete_id = ?1 AND workout_id = ?2
            "
        };

        sqlx::query(sql)
            .bind(athlete_id.to_string())
            .bind(workout_id.as_str())
            .bind(next.as_str())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        tx.commit()
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}
