use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Completion state of a single workout in the local cache.
///
/// `completed` should only hold indices in `[0, total_exercises)`, but the
/// record does not enforce it: the caller owns `total_exercises`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutProgress {
    pub current_exercise_index: u32,
    pub total_exercises: u32,
    #[serde(default)]
    pub last_updated: i64,
    #[serde(default)]
    pub completed: BTreeSet<u32>,
}

impl WorkoutProgress {
    /// Fresh record seeded at the first exercise with nothing completed.
    #[must_use]
    pub fn new(total_exercises: u32, now_ms: i64) -> Self {
        Self {
            current_exercise_index: 0,
            total_exercises,
            last_updated: now_ms,
            completed: BTreeSet::new(),
        }
    }

    /// True iff every exercise is completed and the workout is non-empty.
    #[must_use]
    pub fn is_fully_complete(&self) -> bool {
        self.total_exercises > 0 && self.completed_count() == self.total_exercises as usize
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Read-only projection handed to callers.
    #[must_use]
    pub fn view(&self) -> ProgressView {
        ProgressView {
            current_exercise_index: self.current_exercise_index,
            total_exercises: self.total_exercises,
            completion_percentage: completion_percentage(
                self.current_exercise_index,
                self.total_exercises,
            ),
            completed_exercises: self.completed.iter().copied().collect(),
            is_fully_complete: self.is_fully_complete(),
        }
    }
}

/// Snapshot returned by progress queries.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub current_exercise_index: u32,
    pub total_exercises: u32,
    /// Derived from the resume pointer, not from the completed count.
    pub completion_percentage: f64,
    /// Ascending list of completed indices.
    pub completed_exercises: Vec<u32>,
    pub is_fully_complete: bool,
}

/// `current / total * 100`, or 0 for an empty workout.
#[must_use]
pub fn completion_percentage(current: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(current) / f64::from(total) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_guards_zero_total() {
        let pct = completion_percentage(3, 0);
        assert_eq!(pct, 0.0);
        assert!(pct.is_finite());
    }

    #[test]
    fn percentage_follows_pointer() {
        let mut progress = WorkoutProgress::new(4, 0);
        progress.current_exercise_index = 1;
        progress.completed.extend([0, 1, 2]);

        let view = progress.view();
        assert_eq!(view.completion_percentage, 25.0);
        assert_eq!(view.completed_exercises, vec![0, 1, 2]);
        assert!(!view.is_fully_complete);
    }

    #[test]
    fn empty_workout_is_never_complete() {
        let progress = WorkoutProgress::new(0, 0);
        assert!(!progress.is_fully_complete());
    }

    #[test]
    fn deserialize_collapses_duplicate_indices() {
        let raw = r#"{"currentExerciseIndex":1,"totalExercises":3,"lastUpdated":5,"completed":[2,0,2,0]}"#;
        let progress: WorkoutProgress = serde_json::from_str(raw).unwrap();
        assert_eq!(progress.completed.len(), 2);
        assert!(progress.completed.contains(&0));
        assert!(progress.completed.contains(&2));
    }
}
