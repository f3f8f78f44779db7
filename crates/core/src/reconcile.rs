//! Folding authoritative assignment status into the local progress map.
//!
//! The fold is one-way: remote state is read and merged into local records,
//! never the other way around.

use std::collections::HashMap;

use crate::model::{Assignment, AssignmentStatus, Workout, WorkoutId};
use crate::progress::{ProgressAction, ProgressMap, apply};

/// What happened to a single workout during a fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    /// Remote said `completed`; every index was marked locally.
    ForcedComplete,
    /// Remote listed completed exercises; they were unioned in.
    Merged,
    /// Nothing to fold; local state preserved.
    Untouched,
}

/// Tally of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub forced_complete: usize,
    pub merged: usize,
    pub untouched: usize,
    /// Assignments for workouts the local session does not know about.
    pub unknown: usize,
}

impl ReconcileReport {
    #[must_use]
    pub fn changed(&self) -> usize {
        self.forced_complete + self.merged
    }

    fn record(&mut self, outcome: FoldOutcome) {
        match outcome {
            FoldOutcome::ForcedComplete => self.forced_complete += 1,
            FoldOutcome::Merged => self.merged += 1,
            FoldOutcome::Untouched => self.untouched += 1,
        }
    }
}

/// Folds one assignment for `workout` into `map`.
///
/// Remote completion always wins. Partial remote progress is additive:
/// local-only completions are kept.
pub fn fold_assignment(
    map: &mut ProgressMap,
    workout: &Workout,
    assignment: &Assignment,
    now_ms: i64,
) -> FoldOutcome {
    let total = workout.exercise_count();

    if assignment.status == AssignmentStatus::Completed {
        apply(
            map,
            workout.id(),
            ProgressAction::ForceComplete {
                total_exercises: total,
            },
            now_ms,
        );
        return FoldOutcome::ForcedComplete;
    }

    if !assignment.completed_exercises.is_empty() {
        apply(
            map,
            workout.id(),
            ProgressAction::MergeCompleted {
                indices: assignment.completed_exercises.clone(),
                total_exercises: total,
            },
            now_ms,
        );
        return FoldOutcome::Merged;
    }

    FoldOutcome::Untouched
}

/// Folds every assignment whose workout is in `workouts`.
pub fn fold_all(
    map: &mut ProgressMap,
    workouts: &[Workout],
    assignments: &[Assignment],
    now_ms: i64,
) -> ReconcileReport {
    let known: HashMap<&WorkoutId, &Workout> = workouts.iter().map(|w| (w.id(), w)).collect();
    let mut report = ReconcileReport::default();

    for assignment in assignments {
        match known.get(&assignment.workout_id) {
            Some(workout) => {
                report.record(fold_assignment(map, workout, assignment, now_ms));
            }
            None => report.unknown += 1,
        }
    }

    report
}
