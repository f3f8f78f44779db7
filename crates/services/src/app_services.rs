use std::path::PathBuf;
use std::sync::Arc;

use storage::repository::{Storage, WorkoutRepository};
use storage::JsonFileStore;

use crate::error::AppServicesError;
use crate::execution::WorkoutExecution;
use crate::notice::{NoticeSink, VecNoticeSink};
use crate::progress_store::ProgressStore;
use crate::reconcile::ReconciliationService;
use crate::remote::RestAssignmentClient;
use crate::Clock;

/// Where app services read and write their state.
#[derive(Clone, Debug, Default)]
pub struct AppServicesConfig {
    /// `SQLite` URL for the workout catalogue, assignments and (by default)
    /// the progress cache.
    pub db_url: String,
    /// Keep the progress cache in this JSON file instead of the database.
    pub progress_file: Option<PathBuf>,
    /// Use the hosted assignment table when `WORKOUT_API_URL` is set.
    pub use_remote: bool,
}

/// Assembles app-facing services over one shared progress store.
#[derive(Clone)]
pub struct AppServices {
    store: Arc<ProgressStore>,
    reconciliation: Arc<ReconciliationService>,
    execution: Arc<WorkoutExecution>,
    workouts: Arc<dyn WorkoutRepository>,
    notices: Arc<VecNoticeSink>,
}

impl AppServices {
    /// Build services from the configured backends.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn from_config(
        config: &AppServicesConfig,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let mut storage = Storage::sqlite(&config.db_url).await?;
        if let Some(path) = &config.progress_file {
            storage = storage.with_progress(Arc::new(JsonFileStore::new(path.clone())));
        }
        if config.use_remote {
            match RestAssignmentClient::from_env() {
                Some(client) => storage = storage.with_assignments(Arc::new(client)),
                None => tracing::warn!("remote assignments requested but WORKOUT_API_URL is unset"),
            }
        }
        Ok(Self::new(storage, clock).await)
    }

    /// Build services over already-constructed storage.
    pub async fn new(storage: Storage, clock: Clock) -> Self {
        let store = Arc::new(ProgressStore::load(clock, Arc::clone(&storage.progress)).await);
        let notices = Arc::new(VecNoticeSink::new());
        let sink: Arc<dyn NoticeSink> = notices.clone();

        let reconciliation = Arc::new(ReconciliationService::new(
            Arc::clone(&store),
            Arc::clone(&storage.assignments),
            Arc::clone(&storage.workouts),
        ));
        let execution = Arc::new(WorkoutExecution::new(
            Arc::clone(&store),
            Arc::clone(&storage.assignments),
            sink,
        ));

        Self {
            store,
            reconciliation,
            execution,
            workouts: storage.workouts,
            notices,
        }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.store)
    }

    #[must_use]
    pub fn reconciliation(&self) -> Arc<ReconciliationService> {
        Arc::clone(&self.reconciliation)
    }

    #[must_use]
    pub fn execution(&self) -> Arc<WorkoutExecution> {
        Arc::clone(&self.execution)
    }

    #[must_use]
    pub fn workouts(&self) -> Arc<dyn WorkoutRepository> {
        Arc::clone(&self.workouts)
    }

    #[must_use]
    pub fn notices(&self) -> Arc<VecNoticeSink> {
        Arc::clone(&self.notices)
    }
}
