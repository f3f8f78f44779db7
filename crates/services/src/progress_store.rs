use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use storage::repository::ProgressPersistence;
use workout_core::model::{ProgressView, WorkoutId};
use workout_core::progress::{ProgressAction, ProgressMap, apply};

use crate::Clock;

struct StoreState {
    map: ProgressMap,
    revision: u64,
}

/// Per-workout completion cache, persisted as a whole on every change.
///
/// Each call finishes its read-modify-write under the state lock before it
/// awaits persistence, so a concurrent reconciliation never sees a half
/// applied record. Persistence failures are logged and never touch the
/// in-memory map.
pub struct ProgressStore {
    clock: Clock,
    state: Mutex<StoreState>,
    persistence: Arc<dyn ProgressPersistence>,
    // Highest revision written so far; older snapshots are dropped.
    persisted: tokio::sync::Mutex<u64>,
}

impl ProgressStore {
    /// Load the persisted map, falling back to an empty cache when the stored
    /// value is missing or unreadable.
    pub async fn load(clock: Clock, persistence: Arc<dyn ProgressPersistence>) -> Self {
        let map = match persistence.load_progress().await {
            Ok(map) => map,
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable workout progress");
                ProgressMap::new()
            }
        };
        tracing::debug!(workouts = map.len(), "workout progress loaded");
        Self::with_map(clock, persistence, map)
    }

    /// Build a store over an already-loaded map.
    #[must_use]
    pub fn with_map(
        clock: Clock,
        persistence: Arc<dyn ProgressPersistence>,
        map: ProgressMap,
    ) -> Self {
        Self {
            clock,
            state: Mutex::new(StoreState { map, revision: 0 }),
            persistence,
            persisted: tokio::sync::Mutex::new(0),
        }
    }

    /// Move the resume pointer and refresh the total, creating the record
    /// if needed. With `is_completed` the exercise is also marked done.
    ///
    /// Empty ids are ignored.
    pub async fn update_progress(
        &self,
        workout_id: &str,
        exercise_index: u32,
        total_exercises: u32,
        is_completed: bool,
    ) {
        let Some(id) = WorkoutId::parse(workout_id) else {
            return;
        };
        self.commit(
            &id,
            ProgressAction::Update {
                exercise_index,
                total_exercises,
                completed: is_completed,
            },
        )
        .await;
    }

    /// Mark one exercise done. Ignored for empty ids, unknown workouts and
    /// exercises that are already done.
    pub async fn mark_exercise_completed(&self, workout_id: &str, exercise_index: u32) {
        let Some(id) = WorkoutId::parse(workout_id) else {
            return;
        };
        self.commit(&id, ProgressAction::MarkCompleted { exercise_index })
            .await;
    }

    #[must_use]
    pub fn is_exercise_completed(&self, workout_id: &str, exercise_index: u32) -> bool {
        let Some(id) = WorkoutId::parse(workout_id) else {
            return false;
        };
        self.lock_state()
            .map
            .get(&id)
            .is_some_and(|p| p.completed.contains(&exercise_index))
    }

    #[must_use]
    pub fn get_progress(&self, workout_id: &str) -> Option<ProgressView> {
        let id = WorkoutId::parse(workout_id)?;
        self.lock_state().map.get(&id).map(|p| p.view())
    }

    /// Rewind to the first exercise and clear completions. The total is kept.
    pub async fn reset_progress(&self, workout_id: &str) {
        let Some(id) = WorkoutId::parse(workout_id) else {
            return;
        };
        self.commit(&id, ProgressAction::Reset).await;
    }

    /// Copy of the whole cache.
    #[must_use]
    pub fn snapshot(&self) -> ProgressMap {
        self.lock_state().map.clone()
    }

    #[must_use]
    pub fn workout_ids(&self) -> Vec<WorkoutId> {
        self.lock_state().map.keys().cloned().collect()
    }

    /// Run `f` over the map as a single mutation and persist if it reports a
    /// change. Used for bulk folds such as reconciliation.
    pub(crate) async fn apply_batch<R>(
        &self,
        f: impl FnOnce(&mut ProgressMap, i64) -> (R, bool),
    ) -> R {
        let (result, pending) = {
            let mut state = self.lock_state();
            let now = self.clock.now_millis();
            let (result, changed) = f(&mut state.map, now);
            (result, changed.then(|| bump(&mut state)))
        };
        if let Some((revision, snapshot)) = pending {
            self.persist(revision, snapshot).await;
        }
        result
    }

    async fn commit(&self, id: &WorkoutId, action: ProgressAction) {
        let pending = {
            let mut state = self.lock_state();
            let now = self.clock.now_millis();
            apply(&mut state.map, id, action, now).then(|| bump(&mut state))
        };
        if let Some((revision, snapshot)) = pending {
            self.persist(revision, snapshot).await;
        }
    }

    async fn persist(&self, revision: u64, snapshot: ProgressMap) {
        let mut persisted = self.persisted.lock().await;
        if *persisted >= revision {
            return;
        }
        match self.persistence.save_progress(&snapshot).await {
            Ok(()) => *persisted = revision,
            Err(err) => {
                tracing::warn!(error = %err, revision, "failed to persist workout progress");
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn bump(state: &mut StoreState) -> (u64, ProgressMap) {
    state.revision += 1;
    (state.revision, state.map.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use storage::repository::{InMemoryRepository, StorageError};
    use workout_core::time::fixed_clock;

    async fn store_over(repo: &InMemoryRepository) -> ProgressStore {
        ProgressStore::load(fixed_clock(), Arc::new(repo.clone())).await
    }

    struct FailingPersistence;

    /// Records every saved map; each save yields once so concurrent commits
    /// interleave.
    #[derive(Default)]
    struct RecordingPersistence {
        saves: Mutex<Vec<ProgressMap>>,
    }

    impl RecordingPersistence {
        fn saves(&self) -> Vec<ProgressMap> {
            self.saves.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProgressPersistence for RecordingPersistence {
        async fn load_progress(&self) -> Result<ProgressMap, StorageError> {
            Ok(ProgressMap::new())
        }

        async fn save_progress(&self, map: &ProgressMap) -> Result<(), StorageError> {
            tokio::task::yield_now().await;
            self.saves.lock().unwrap().push(map.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl ProgressPersistence for FailingPersistence {
        async fn load_progress(&self) -> Result<ProgressMap, StorageError> {
            Err(StorageError::Serialization("corrupt".into()))
        }

        async fn save_progress(&self, _map: &ProgressMap) -> Result<(), StorageError> {
            Err(StorageError::Connection("quota exceeded".into()))
        }
    }

    #[tokio::test]
    async fn empty_ids_are_silent_no_ops() {
        let repo = InMemoryRepository::new();
        let store = store_over(&repo).await;

        store.update_progress("", 1, 3, true).await;
        store.mark_exercise_completed("", 0).await;
        store.reset_progress("").await;

        assert!(store.snapshot().is_empty());
        assert!(!store.is_exercise_completed("", 0));
        assert!(store.get_progress("").is_none());
        assert!(repo.load_progress().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_completed_twice_equals_once() {
        let store = store_over(&InMemoryRepository::new()).await;
        store.update_progress("w1", 0, 3, false).await;

        store.mark_exercise_completed("w1", 1).await;
        let once = store.get_progress("w1").unwrap();
        store.mark_exercise_completed("w1", 1).await;

        assert_eq!(store.get_progress("w1").unwrap(), once);
        assert!(store.is_exercise_completed("w1", 1));
        assert!(!store.is_exercise_completed("w1", 0));
    }

    #[tokio::test]
    async fn mark_completed_without_record_is_ignored() {
        let store = store_over(&InMemoryRepository::new()).await;
        store.mark_exercise_completed("w1", 0).await;
        assert!(store.get_progress("w1").is_none());
    }

    #[tokio::test]
    async fn zero_total_reports_zero_percent() {
        let store = store_over(&InMemoryRepository::new()).await;
        store.update_progress("w1", 0, 0, false).await;

        let view = store.get_progress("w1").unwrap();
        assert_eq!(view.completion_percentage, 0.0);
        assert!(view.completion_percentage.is_finite());
    }

    #[tokio::test]
    async fn reset_clears_but_preserves_total() {
        let store = store_over(&InMemoryRepository::new()).await;
        store.update_progress("w", 3, 5, true).await;
        store.reset_progress("w").await;

        let view = store.get_progress("w").unwrap();
        assert_eq!(view.current_exercise_index, 0);
        assert!(view.completed_exercises.is_empty());
        assert_eq!(view.total_exercises, 5);
    }

    #[tokio::test]
    async fn in_order_session_reaches_one_hundred_percent() {
        let store = store_over(&InMemoryRepository::new()).await;
        for index in 0..4 {
            store.update_progress("w1", index, 4, false).await;
            store.mark_exercise_completed("w1", index).await;
        }
        // finishing parks the pointer past the last exercise
        store.update_progress("w1", 4, 4, false).await;

        let view = store.get_progress("w1").unwrap();
        assert_eq!(view.completed_exercises, vec![0, 1, 2, 3]);
        assert_eq!(view.completion_percentage, 100.0);
        assert!(view.is_fully_complete);
    }

    #[tokio::test]
    async fn percentage_tracks_pointer_not_completions() {
        let store = store_over(&InMemoryRepository::new()).await;
        store.update_progress("w1", 0, 3, false).await;
        store.mark_exercise_completed("w1", 0).await;
        store.update_progress("w1", 1, 3, false).await;
        store.mark_exercise_completed("w1", 1).await;
        store.update_progress("w1", 2, 3, false).await;
        store.mark_exercise_completed("w1", 2).await;

        let view = store.get_progress("w1").unwrap();
        assert_eq!(view.completed_exercises, vec![0, 1, 2]);
        assert_eq!(view.current_exercise_index, 2);
        assert!((view.completion_percentage - 200.0 / 3.0).abs() < 1e-9);
        assert!(view.is_fully_complete);
    }

    #[tokio::test]
    async fn every_mutation_is_written_through() {
        let repo = InMemoryRepository::new();
        let store = store_over(&repo).await;
        store.update_progress("w1", 2, 4, true).await;

        let reopened = store_over(&repo).await;
        assert_eq!(reopened.snapshot(), store.snapshot());
        assert_eq!(reopened.workout_ids(), vec![WorkoutId::parse("w1").unwrap()]);
    }

    #[tokio::test]
    async fn persistence_failure_keeps_memory_state() {
        let store = ProgressStore::load(fixed_clock(), Arc::new(FailingPersistence)).await;
        assert!(store.snapshot().is_empty());

        store.update_progress("w1", 1, 2, true).await;

        let view = store.get_progress("w1").unwrap();
        assert_eq!(view.current_exercise_index, 1);
        assert_eq!(view.completed_exercises, vec![1]);
    }

    #[tokio::test]
    async fn ids_are_opaque_keys() {
        let store = store_over(&InMemoryRepository::new()).await;
        store.update_progress("w1", 0, 3, true).await;
        store.update_progress("w1 ", 2, 7, false).await;
        store.update_progress(" ", 1, 2, true).await;

        assert_eq!(store.workout_ids().len(), 3);
        let plain = store.get_progress("w1").unwrap();
        assert_eq!(plain.current_exercise_index, 0);
        assert_eq!(plain.total_exercises, 3);
        assert_eq!(store.get_progress("w1 ").unwrap().total_exercises, 7);
        assert!(store.is_exercise_completed(" ", 1));
    }

    #[tokio::test]
    async fn concurrent_commits_leave_the_newest_map_persisted() {
        let persistence = Arc::new(RecordingPersistence::default());
        let store = ProgressStore::with_map(
            fixed_clock(),
            Arc::clone(&persistence) as Arc<dyn ProgressPersistence>,
            ProgressMap::new(),
        );

        tokio::join!(
            store.update_progress("w1", 0, 2, true),
            store.update_progress("w2", 1, 4, true),
        );

        let saves = persistence.saves();
        assert_eq!(saves.len(), 2);
        assert_eq!(saves[0].len(), 1);
        assert_eq!(saves.last(), Some(&store.snapshot()));
        assert_eq!(store.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn stale_snapshot_is_not_written_over_a_newer_one() {
        let persistence = Arc::new(RecordingPersistence::default());
        let store = ProgressStore::with_map(
            fixed_clock(),
            Arc::clone(&persistence) as Arc<dyn ProgressPersistence>,
            ProgressMap::new(),
        );
        store.update_progress("w1", 0, 2, false).await;
        let older = store.snapshot();
        store.update_progress("w1", 1, 2, true).await;
        let newer = store.snapshot();

        // Revisions 1 and 2 are already written; replaying 1 must be a no-op.
        store.persist(1, older).await;

        let saves = persistence.saves();
        assert_eq!(saves.len(), 2);
        assert_eq!(saves.last(), Some(&newer));
    }
}
