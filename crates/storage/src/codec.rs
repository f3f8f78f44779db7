//! JSON layout of the persisted progress map.
//!
//! `{ "<workoutId>": { currentExerciseIndex, totalExercises, lastUpdated, completed: [..] } }`

use workout_core::model::WorkoutId;
use workout_core::progress::ProgressMap;

use crate::repository::StorageError;

/// Fixed namespace key the map is stored under.
pub const PROGRESS_NAMESPACE: &str = "workout-progress";

/// Serialize the whole map.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_progress(map: &ProgressMap) -> Result<String, StorageError> {
    serde_json::to_string(map).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Deserialize a stored map. Blank input is an empty map.
///
/// Records under blank keys are dropped; duplicate completed indices collapse.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if `raw` is not a valid map.
pub fn decode_progress(raw: &str) -> Result<ProgressMap, StorageError> {
    if raw.trim().is_empty() {
        return Ok(ProgressMap::new());
    }
    let decoded: ProgressMap =
        serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(decoded
        .into_iter()
        .filter_map(|(id, progress)| WorkoutId::parse(id.as_str()).map(|id| (id, progress)))
        .collect())
}
