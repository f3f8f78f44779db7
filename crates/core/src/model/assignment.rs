use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AthleteId, WorkoutId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssignmentError {
    #[error("invalid assignment status: {0}")]
    InvalidStatus(String),

    #[error("cannot move assignment from {from} to {to}")]
    InvalidTransition {
        from: AssignmentStatus,
        to: AssignmentStatus,
    },
}

/// Server-side completion status of an assigned workout.
///
/// `Assigned -> InProgress -> Completed`, with a reset path back to
/// `Assigned`. `Assigned -> Completed` only happens when the very first
/// completion also finishes the workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    InProgress,
    Completed,
}

impl AssignmentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::InProgress => "in_progress",
            AssignmentStatus::Completed => "completed",
        }
    }

    /// Whether the hosted state machine accepts `self -> next`.
    ///
    /// Re-sending the current status is accepted.
    #[must_use]
    pub fn can_transition_to(self, next: AssignmentStatus) -> bool {
        use AssignmentStatus::{Assigned, Completed, InProgress};
        match (self, next) {
            (a, b) if a == b => true,
            (Assigned, InProgress | Completed) => true,
            (InProgress, Completed | Assigned) => true,
            (Completed, Assigned) => true,
            _ => false,
        }
    }

    /// Validates `self -> next`.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError::InvalidTransition` when the move is not allowed.
    pub fn transition(self, next: AssignmentStatus) -> Result<AssignmentStatus, AssignmentError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AssignmentError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = AssignmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigned" => Ok(Self::Assigned),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(AssignmentError::InvalidStatus(other.to_owned())),
        }
    }
}

/// Authoritative assignment record read from the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub athlete_id: AthleteId,
    pub workout_id: WorkoutId,
    pub status: AssignmentStatus,
    /// Exercise indices the backend already knows are done. May be empty.
    pub completed_exercises: Vec<u32>,
}

impl Assignment {
    #[must_use]
    pub fn new(athlete_id: AthleteId, workout_id: WorkoutId, status: AssignmentStatus) -> Self {
        Self {
            athlete_id,
            workout_id,
            status,
            completed_exercises: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_completed_exercises(mut self, completed: Vec<u32>) -> Self {
        self.completed_exercises = completed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AssignmentStatus::{Assigned, Completed, InProgress};

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(Assigned.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Assigned.can_transition_to(Completed));
    }

    #[test]
    fn reset_returns_to_assigned() {
        assert_eq!(Completed.transition(Assigned), Ok(Assigned));
        assert_eq!(InProgress.transition(Assigned), Ok(Assigned));
    }

    #[test]
    fn completed_cannot_fall_back_to_in_progress() {
        assert_eq!(
            Completed.transition(InProgress),
            Err(AssignmentError::InvalidTransition {
                from: Completed,
                to: InProgress,
            })
        );
    }

    #[test]
    fn status_parses_wire_names() {
        for status in [Assigned, InProgress, Completed] {
            assert_eq!(status.as_str().parse::<AssignmentStatus>(), Ok(status));
        }
        assert!("done".parse::<AssignmentStatus>().is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        let raw = serde_json::to_string(&InProgress).unwrap();
        assert_eq!(raw, "\"in_progress\"");
    }
}
