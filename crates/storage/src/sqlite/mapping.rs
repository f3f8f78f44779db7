use sqlx::Row;
use workout_core::model::{
    Assignment, AssignmentStatus, AthleteId, Workout, WorkoutId, WorkoutShape,
};

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn workout_id_from_str(raw: &str) -> Result<WorkoutId, StorageError> {
    WorkoutId::parse(raw).ok_or_else(|| StorageError::Serialization("empty workout_id".into()))
}

pub(crate) fn athlete_id_from_str(raw: &str) -> Result<AthleteId, StorageError> {
    raw.parse::<AthleteId>().map_err(ser)
}

pub(crate) fn parse_status(raw: &str) -> Result<AssignmentStatus, StorageError> {
    raw.parse::<AssignmentStatus>().map_err(ser)
}

/// Completed indices are stored as a JSON array in a TEXT column.
pub(crate) fn encode_indices(indices: &[u32]) -> Result<String, StorageError> {
    serde_json::to_string(indices).map_err(ser)
}

pub(crate) fn decode_indices(raw: &str) -> Result<Vec<u32>, StorageError> {
    let mut indices: Vec<u32> = serde_json::from_str(raw).map_err(ser)?;
    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}

pub(crate) fn map_workout_row(row: &sqlx::sqlite::SqliteRow) -> Result<Workout, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let title: String = row.try_get("title").map_err(ser)?;
    let body: String = row.try_get("body").map_err(ser)?;

    let value: serde_json::Value = serde_json::from_str(&body).map_err(ser)?;
    let shape = WorkoutShape::from_json(&value).map_err(ser)?;

    Workout::new(workout_id_from_str(&id)?, title, shape).map_err(ser)
}

pub(crate) fn map_assignment_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<Assignment, StorageError> {
    let athlete_id: String = row.try_get("athlete_id").map_err(ser)?;
    let workout_id: String = row.try_get("workout_id").map_err(ser)?;
    let status: String = row.try_get("status").map_err(ser)?;
    let completed: String = row.try_get("completed_exercises").map_err(ser)?;

    Ok(Assignment::new(
        athlete_id_from_str(&athlete_id)?,
        workout_id_from_str(&workout_id)?,
        parse_status(&status)?,
    )
    .with_completed_exercises(decode_indices(&completed)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_decode_sorted_and_unique() {
        assert_eq!(decode_indices("[3,1,3]").unwrap(), vec![1, 3]);
        assert_eq!(encode_indices(&[0, 2]).unwrap(), "[0,2]");
    }

    #[test]
    fn unknown_status_is_a_serialization_error() {
        assert!(matches!(
            parse_status("finished"),
            Err(StorageError::Serialization(_))
        ));
    }
}
