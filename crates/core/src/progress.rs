//! Pure state transitions over the progress map.
//!
//! Nothing here touches storage or the clock; callers pass `now_ms` in and
//! decide whether to persist based on the returned change flag.

use std::collections::BTreeMap;

use crate::model::{WorkoutId, WorkoutProgress};

/// Every tracked workout, keyed by id.
pub type ProgressMap = BTreeMap<WorkoutId, WorkoutProgress>;

/// A single mutation of one workout's record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressAction {
    /// Move the resume pointer, refresh the total and optionally mark the
    /// exercise done. Creates the record when missing.
    Update {
        exercise_index: u32,
        total_exercises: u32,
        completed: bool,
    },
    /// Mark one exercise done on an existing record.
    MarkCompleted { exercise_index: u32 },
    /// Rewind the pointer and clear completions, keeping the total.
    Reset,
    /// Mark `[0, total)` done and park the pointer at `total`.
    ForceComplete { total_exercises: u32 },
    /// Union remote completions into the record and set the pointer to the
    /// remote list length.
    MergeCompleted {
        indices: Vec<u32>,
        total_exercises: u32,
    },
}

/// Applies `action` to the record for `id`.
///
/// Returns `true` when the map changed and should be persisted.
pub fn apply(map: &mut ProgressMap, id: &WorkoutId, action: ProgressAction, now_ms: i64) -> bool {
    match action {
        ProgressAction::Update {
            exercise_index,
            total_exercises,
            completed,
        } => {
            let record = map
                .entry(id.clone())
                .or_insert_with(|| WorkoutProgress::new(total_exercises, now_ms));
            record.current_exercise_index = exercise_index;
            record.total_exercises = total_exercises;
            if completed {
                record.completed.insert(exercise_index);
            }
            record.last_updated = now_ms;
            true
        }
        ProgressAction::MarkCompleted { exercise_index } => {
            let Some(record) = map.get_mut(id) else {
                return false;
            };
            if !record.completed.insert(exercise_index) {
                return false;
            }
            record.last_updated = now_ms;
            true
        }
        ProgressAction::Reset => {
            let Some(record) = map.get_mut(id) else {
                return false;
            };
            record.current_exercise_index = 0;
            record.completed.clear();
            record.last_updated = now_ms;
            true
        }
        ProgressAction::ForceComplete { total_exercises } => {
            let record = map
                .entry(id.clone())
                .or_insert_with(|| WorkoutProgress::new(total_exercises, now_ms));
            record.total_exercises = total_exercises;
            record.completed.extend(0..total_exercises);
            record.current_exercise_index = total_exercises;
            record.last_updated = now_ms;
            true
        }
        ProgressAction::MergeCompleted {
            indices,
            total_exercises,
        } => {
            if indices.is_empty() {
                return false;
            }
            let pointer = u32::try_from(indices.len()).unwrap_or(u32::MAX);
            let record = map
                .entry(id.clone())
                .or_insert_with(|| WorkoutProgress::new(total_exercises, now_ms));
            record.total_exercises = total_exercises;
            record.completed.extend(indices);
            record.current_exercise_index = pointer;
            record.last_updated = now_ms;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> WorkoutId {
        WorkoutId::parse(raw).unwrap()
    }

    fn update(index: u32, total: u32, completed: bool) -> ProgressAction {
        ProgressAction::Update {
            exercise_index: index,
            total_exercises: total,
            completed,
        }
    }

    #[test]
    fn update_creates_record_lazily() {
        let mut map = ProgressMap::new();
        assert!(apply(&mut map, &id("w1"), update(2, 5, false), 10));

        let record = &map[&id("w1")];
        assert_eq!(record.current_exercise_index, 2);
        assert_eq!(record.total_exercises, 5);
        assert!(record.completed.is_empty());
        assert_eq!(record.last_updated, 10);
    }

    #[test]
    fn update_with_completion_does_not_duplicate() {
        let mut map = ProgressMap::new();
        apply(&mut map, &id("w1"), update(1, 3, true), 1);
        apply(&mut map, &id("w1"), update(1, 3, true), 2);
        assert_eq!(map[&id("w1")].completed.len(), 1);
    }

    #[test]
    fn mark_completed_needs_existing_record() {
        let mut map = ProgressMap::new();
        let changed = apply(
            &mut map,
            &id("w1"),
            ProgressAction::MarkCompleted { exercise_index: 0 },
            1,
        );
        assert!(!changed);
        assert!(map.is_empty());
    }

    #[test]
    fn mark_completed_is_idempotent() {
        let mut map = ProgressMap::new();
        apply(&mut map, &id("w1"), update(0, 3, false), 1);
        let mark = ProgressAction::MarkCompleted { exercise_index: 0 };

        assert!(apply(&mut map, &id("w1"), mark.clone(), 2));
        let once = map.clone();
        assert!(!apply(&mut map, &id("w1"), mark, 3));
        assert_eq!(map, once);
    }

    #[test]
    fn reset_keeps_total() {
        let mut map = ProgressMap::new();
        apply(&mut map, &id("w1"), update(3, 5, true), 1);
        assert!(apply(&mut map, &id("w1"), ProgressAction::Reset, 2));

        let view = map[&id("w1")].view();
        assert_eq!(view.current_exercise_index, 0);
        assert!(view.completed_exercises.is_empty());
        assert_eq!(view.total_exercises, 5);
    }

    #[test]
    fn reset_of_unknown_workout_is_a_no_op() {
        let mut map = ProgressMap::new();
        assert!(!apply(&mut map, &id("ghost"), ProgressAction::Reset, 1));
        assert!(map.is_empty());
    }

    #[test]
    fn force_complete_fills_every_index() {
        let mut map = ProgressMap::new();
        apply(&mut map, &id("w1"), update(0, 5, true), 1);
        apply(
            &mut map,
            &id("w1"),
            ProgressAction::ForceComplete { total_exercises: 5 },
            2,
        );

        let view = map[&id("w1")].view();
        assert_eq!(view.completed_exercises, vec![0, 1, 2, 3, 4]);
        assert_eq!(view.current_exercise_index, 5);
        assert_eq!(view.completion_percentage, 100.0);
    }

    #[test]
    fn merge_is_a_union() {
        let mut map = ProgressMap::new();
        apply(&mut map, &id("w1"), update(0, 5, true), 1);
        apply(
            &mut map,
            &id("w1"),
            ProgressAction::MergeCompleted {
                indices: vec![2],
                total_exercises: 5,
            },
            2,
        );

        let record = &map[&id("w1")];
        assert_eq!(record.completed.iter().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(record.current_exercise_index, 1);
    }

    #[test]
    fn empty_merge_changes_nothing() {
        let mut map = ProgressMap::new();
        let changed = apply(
            &mut map,
            &id("w1"),
            ProgressAction::MergeCompleted {
                indices: vec![],
                total_exercises: 5,
            },
            1,
        );
        assert!(!changed);
        assert!(map.is_empty());
    }

    #[test]
    fn sequential_session_reaches_full_completion() {
        let mut map = ProgressMap::new();
        let w = id("w1");
        for index in 0..4 {
            apply(&mut map, &w, update(index, 4, false), 1);
            apply(
                &mut map,
                &w,
                ProgressAction::MarkCompleted {
                    exercise_index: index,
                },
                1,
            );
        }
        apply(&mut map, &w, update(4, 4, false), 2);

        let view = map[&w].view();
        assert_eq!(view.completed_exercises, vec![0, 1, 2, 3]);
        assert!(view.is_fully_complete);
        assert_eq!(view.completion_percentage, 100.0);
    }
}
