use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use workout_core::model::{Assignment, AssignmentStatus, AthleteId, Workout, WorkoutId};
use workout_core::progress::ProgressMap;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key-value persistence for the whole progress map.
///
/// The map is always read and written as one value under a fixed namespace.
#[async_trait]
pub trait ProgressPersistence: Send + Sync {
    /// Load the persisted map. A missing value yields an empty map.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored value is corrupt,
    /// or other storage errors.
    async fn load_progress(&self) -> Result<ProgressMap, StorageError>;

    /// Replace the persisted map.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the map cannot be stored.
    async fn save_progress(&self, map: &ProgressMap) -> Result<(), StorageError>;
}

/// Contract of the hosted assignment table, consumed by reconciliation and
/// by the execution flow's status-transition calls.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// All assignments of an athlete.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached or decoded.
    async fn assignments_for_athlete(
        &self,
        athlete_id: AthleteId,
    ) -> Result<Vec<Assignment>, StorageError>;

    /// Set the status of one assignment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the athlete has no such assignment.
    async fn update_assignment_status(
        &self,
        athlete_id: AthleteId,
        workout_id: &WorkoutId,
        status: AssignmentStatus,
    ) -> Result<(), StorageError>;
}

/// Catalogue of workouts known to the local session.
#[async_trait]
pub trait WorkoutRepository: Send + Sync {
    /// Persist or update a workout.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the workout cannot be stored.
    async fn upsert_workout(&self, workout: &Workout) -> Result<(), StorageError>;

    /// Fetch a workout by ID.
    ///
    /// # Errors
    ///
    /// Returns storage errors; a missing workout is `Ok(None)`.
    async fn get_workout(&self, id: &WorkoutId) -> Result<Option<Workout>, StorageError>;

    /// List workouts ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalogue cannot be read.
    async fn list_workouts(&self) -> Result<Vec<Workout>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<ProgressMap>>,
    workouts: Arc<Mutex<HashMap<WorkoutId, Workout>>>,
    assignments: Arc<Mutex<HashMap<(AthleteId, WorkoutId), Assignment>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an assignment, as a coach or another device would.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn put_assignment(&self, assignment: Assignment) -> Result<(), StorageError> {
        let mut guard = self
            .assignments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(
            (assignment.athlete_id, assignment.workout_id.clone()),
            assignment,
        );
        Ok(())
    }
}

#[async_trait]
impl ProgressPersistence for InMemoryRepository {
    async fn load_progress(&self) -> Result<ProgressMap, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_progress(&self, map: &ProgressMap) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.clone_from(map);
        Ok(())
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryRepository {
    async fn assignments_for_athlete(
        &self,
        athlete_id: AthleteId,
    ) -> Result<Vec<Assignment>, StorageError> {
        let guard = self
            .assignments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut found: Vec<Assignment> = guard
            .values()
            .filter(|a| a.athlete_id == athlete_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.workout_id.cmp(&b.workout_id));
        Ok(found)
    }

    async fn update_assignment_status(
        &self,
        athlete_id: AthleteId,
        workout_id: &WorkoutId,
        status: AssignmentStatus,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .assignments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let assignment = guard
            .get_mut(&(athlete_id, workout_id.clone()))
            .ok_or(StorageError::NotFound)?;
        assignment.status = assignment
            .status
            .transition(status)
            .map_err(|_| StorageError::Conflict)?;
        if status == AssignmentStatus::Assigned {
            assignment.completed_exercises.clear();
        }
        Ok(())
    }
}

#[async_trait]
impl WorkoutRepository for InMemoryRepository {
    async fn upsert_workout(&self, workout: &Workout) -> Result<(), StorageError> {
        let mut guard = self
            .workouts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(workout.id().clone(), workout.clone());
        Ok(())
    }

    async fn get_workout(&self, id: &WorkoutId) -> Result<Option<Workout>, StorageError> {
        let guard = self
            .workouts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(id).cloned())
    }

    async fn list_workouts(&self) -> Result<Vec<Workout>, StorageError> {
        let guard = self
            .workouts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut all: Vec<Workout> = guard.values().cloned().collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(all)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressPersistence>,
    pub workouts: Arc<dyn WorkoutRepository>,
    pub assignments: Arc<dyn AssignmentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self::from_in_memory(&repo)
    }

    /// Wrap an existing in-memory repository so tests can keep a handle to it.
    #[must_use]
    pub fn from_in_memory(repo: &InMemoryRepository) -> Self {
        let progress: Arc<dyn ProgressPersistence> = Arc::new(repo.clone());
        let workouts: Arc<dyn WorkoutRepository> = Arc::new(repo.clone());
        let assignments: Arc<dyn AssignmentRepository> = Arc::new(repo.clone());
        Self {
            progress,
            workouts,
            assignments,
        }
    }

    /// Swap the progress backend, keeping the rest.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressPersistence>) -> Self {
        self.progress = progress;
        self
    }

    /// Swap the assignment backend, keeping the rest.
    #[must_use]
    pub fn with_assignments(mut self, assignments: Arc<dyn AssignmentRepository>) -> Self {
        self.assignments = assignments;
        self
    }
}
