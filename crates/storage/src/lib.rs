#![forbid(unsafe_code)]

pub mod codec;
pub mod json_file;
pub mod repository;
pub mod sqlite;

pub use codec::PROGRESS_NAMESPACE;
pub use json_file::JsonFileStore;
pub use repository::{
    AssignmentRepository, InMemoryRepository, ProgressPersistence, Storage, StorageError,
    WorkoutRepository,
};
