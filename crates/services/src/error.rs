//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ReconciliationService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReconcileError {
    #[error("failed to fetch assignments: {0}")]
    Remote(#[source] StorageError),
    #[error("failed to load workouts: {0}")]
    Catalogue(#[source] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
