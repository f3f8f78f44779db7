use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use storage::repository::AssignmentRepository;
use workout_core::model::{AssignmentStatus, AthleteId, Workout, WorkoutId};

use crate::notice::{Notice, NoticeSink};
use crate::progress_store::ProgressStore;

/// Result of the remote half of an execution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No status transition was needed.
    LocalOnly,
    /// The server accepted the new status.
    Synced(AssignmentStatus),
    /// The server call failed; local state was kept and a notice was raised.
    Failed(AssignmentStatus),
    /// The session closed before the call resolved; the result was dropped.
    Discarded,
}

/// One open run of a workout. Closing it makes late server results inert.
#[derive(Debug)]
pub struct ExecutionSession {
    athlete_id: AthleteId,
    workout_id: WorkoutId,
    total_exercises: u32,
    open: Arc<AtomicBool>,
}

impl ExecutionSession {
    #[must_use]
    pub fn athlete_id(&self) -> AthleteId {
        self.athlete_id
    }

    #[must_use]
    pub fn workout_id(&self) -> &WorkoutId {
        &self.workout_id
    }

    #[must_use]
    pub fn total_exercises(&self) -> u32 {
        self.total_exercises
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Handle that can close the session from elsewhere (e.g. a view teardown).
    #[must_use]
    pub fn closer(&self) -> SessionCloser {
        SessionCloser {
            open: Arc::clone(&self.open),
        }
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

/// Detached close switch for an [`ExecutionSession`].
#[derive(Debug, Clone)]
pub struct SessionCloser {
    open: Arc<AtomicBool>,
}

impl SessionCloser {
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

/// The athlete-facing execution flow: advance through exercises, mark them
/// done, finish or reset, with server status transitions alongside.
///
/// Local progress is always written first. Server calls are best effort: a
/// failure is logged and surfaced as a notice, never rolled back and never
/// retried here.
#[derive(Clone)]
pub struct WorkoutExecution {
    store: Arc<ProgressStore>,
    assignments: Arc<dyn AssignmentRepository>,
    notices: Arc<dyn NoticeSink>,
}

impl WorkoutExecution {
    #[must_use]
    pub fn new(
        store: Arc<ProgressStore>,
        assignments: Arc<dyn AssignmentRepository>,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self {
            store,
            assignments,
            notices,
        }
    }

    /// Open a session. The exercise count is taken from the workout's shape.
    #[must_use]
    pub fn open(&self, athlete_id: AthleteId, workout: &Workout) -> ExecutionSession {
        self.open_by_id(athlete_id, workout.id().clone(), workout.exercise_count())
    }

    /// Open a session for a workout known only by id and count, such as a
    /// `daily-<id>` view.
    #[must_use]
    pub fn open_by_id(
        &self,
        athlete_id: AthleteId,
        workout_id: WorkoutId,
        total_exercises: u32,
    ) -> ExecutionSession {
        ExecutionSession {
            athlete_id,
            workout_id,
            total_exercises,
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Exercise to resume at: the stored pointer, or 0 for a fresh workout.
    #[must_use]
    pub fn resume_index(&self, session: &ExecutionSession) -> u32 {
        self.store
            .get_progress(session.workout_id.as_str())
            .map_or(0, |view| view.current_exercise_index)
    }

    /// Move to `exercise_index` without completing anything.
    pub async fn advance(&self, session: &ExecutionSession, exercise_index: u32) {
        self.store
            .update_progress(
                session.workout_id.as_str(),
                exercise_index,
                session.total_exercises,
                false,
            )
            .await;
    }

    /// Mark one exercise done. Every completion that does not finish the
    /// workout re-sends `in_progress`, so an earlier failed call is repaired
    /// by the next one.
    pub async fn complete_exercise(
        &self,
        session: &ExecutionSession,
        exercise_index: u32,
    ) -> Outcome {
        let id = session.workout_id.as_str();
        if self.store.get_progress(id).is_none() {
            self.store
                .update_progress(id, exercise_index, session.total_exercises, false)
                .await;
        }

        self.store.mark_exercise_completed(id, exercise_index).await;

        let after = self
            .store
            .get_progress(id)
            .map_or(0, |view| view.completed_exercises.len());
        if after < session.total_exercises as usize {
            return self.push_status(session, AssignmentStatus::InProgress).await;
        }
        Outcome::LocalOnly
    }

    /// Finish at `exercise_index`: mark it done, then report `completed` if
    /// every exercise is done or `in_progress` for a partial finish.
    pub async fn finish(&self, session: &ExecutionSession, exercise_index: u32) -> Outcome {
        let id = session.workout_id.as_str();
        self.store
            .update_progress(id, exercise_index, session.total_exercises, true)
            .await;

        let done = self
            .store
            .get_progress(id)
            .is_some_and(|view| view.is_fully_complete);
        let status = if done {
            AssignmentStatus::Completed
        } else {
            AssignmentStatus::InProgress
        };
        tracing::info!(workout_id = %session.workout_id, %status, "finishing workout");
        self.push_status(session, status).await
    }

    /// Clear local progress and move the assignment back to `assigned`.
    pub async fn reset(&self, session: &ExecutionSession) -> Outcome {
        self.store.reset_progress(session.workout_id.as_str()).await;
        self.push_status(session, AssignmentStatus::Assigned).await
    }

    async fn push_status(&self, session: &ExecutionSession, status: AssignmentStatus) -> Outcome {
        let result = self
            .assignments
            .update_assignment_status(session.athlete_id, &session.workout_id, status)
            .await;

        if let Err(err) = &result {
            tracing::warn!(
                workout_id = %session.workout_id,
                %status,
                error = %err,
                "assignment status update failed"
            );
        }

        if !session.is_open() {
            tracing::debug!(
                workout_id = %session.workout_id,
                "session closed, dropping status result"
            );
            return Outcome::Discarded;
        }

        match result {
            Ok(()) => Outcome::Synced(status),
            Err(_) => {
                self.notices.push(Notice::remote_update_failed());
                Outcome::Failed(status)
            }
        }
    }
}
