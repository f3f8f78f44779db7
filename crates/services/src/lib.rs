#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod execution;
pub mod notice;
pub mod progress_store;
pub mod reconcile;
pub mod remote;

pub use workout_core::Clock;

pub use app_services::{AppServices, AppServicesConfig};
pub use error::{AppServicesError, ReconcileError};
pub use execution::{ExecutionSession, Outcome, SessionCloser, WorkoutExecution};
pub use notice::{Notice, NoticeLevel, NoticeSink, VecNoticeSink};
pub use progress_store::ProgressStore;
pub use reconcile::ReconciliationService;
pub use remote::{RemoteConfig, RestAssignmentClient};
