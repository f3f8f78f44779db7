use std::sync::Arc;

use storage::repository::{AssignmentRepository, WorkoutRepository};
use workout_core::model::{AthleteId, Workout};
use workout_core::reconcile::{ReconcileReport, fold_all};

use crate::error::ReconcileError;
use crate::notice::{Notice, NoticeSink};
use crate::progress_store::ProgressStore;

/// Brings the local progress cache in line with server-side assignment status.
///
/// Runs on load and on manual refresh. Remote state flows into the cache only;
/// local progress reaches the server through the execution flow's status
/// transitions.
#[derive(Clone)]
pub struct ReconciliationService {
    store: Arc<ProgressStore>,
    assignments: Arc<dyn AssignmentRepository>,
    workouts: Arc<dyn WorkoutRepository>,
}

impl ReconciliationService {
    #[must_use]
    pub fn new(
        store: Arc<ProgressStore>,
        assignments: Arc<dyn AssignmentRepository>,
        workouts: Arc<dyn WorkoutRepository>,
    ) -> Self {
        Self {
            store,
            assignments,
            workouts,
        }
    }

    /// Reconcile against every workout in the local catalogue.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Catalogue` if workouts cannot be listed.
    /// Returns `ReconcileError::Remote` if assignments cannot be fetched.
    pub async fn sync(&self, athlete_id: AthleteId) -> Result<ReconcileReport, ReconcileError> {
        let known = self
            .workouts
            .list_workouts()
            .await
            .map_err(ReconcileError::Catalogue)?;
        self.sync_with(athlete_id, &known).await
    }

    /// Reconcile against an explicit set of known workouts.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Remote` if assignments cannot be fetched.
    pub async fn sync_with(
        &self,
        athlete_id: AthleteId,
        known: &[Workout],
    ) -> Result<ReconcileReport, ReconcileError> {
        let assignments = self
            .assignments
            .assignments_for_athlete(athlete_id)
            .await
            .map_err(ReconcileError::Remote)?;

        let report = self
            .store
            .apply_batch(|map, now| {
                let report = fold_all(map, known, &assignments, now);
                let changed = report.changed() > 0;
                (report, changed)
            })
            .await;

        tracing::info!(
            athlete = %athlete_id,
            forced_complete = report.forced_complete,
            merged = report.merged,
            untouched = report.untouched,
            unknown = report.unknown,
            "reconciled workout progress"
        );
        Ok(report)
    }

    /// Like [`sync`](Self::sync), but failures become a notice instead of an
    /// error. Local state is left as it was.
    pub async fn sync_or_notify(
        &self,
        athlete_id: AthleteId,
        notices: &dyn NoticeSink,
    ) -> Option<ReconcileReport> {
        match self.sync(athlete_id).await {
            Ok(report) => Some(report),
            Err(err) => {
                tracing::warn!(athlete = %athlete_id, error = %err, "reconciliation failed");
                notices.push(Notice::sync_failed());
                None
            }
        }
    }
}
