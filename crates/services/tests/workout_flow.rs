use std::path::PathBuf;
use std::sync::Arc;

use services::{AppServices, AppServicesConfig, Clock, NoticeLevel, Outcome};
use storage::JsonFileStore;
use storage::repository::{
    AssignmentRepository, InMemoryRepository, Storage, WorkoutRepository,
};
use workout_core::model::{
    Assignment, AssignmentStatus, AthleteId, Exercise, Workout, WorkoutId, WorkoutShape,
};
use workout_core::time::fixed_now;

fn wid(raw: &str) -> WorkoutId {
    WorkoutId::parse(raw).unwrap()
}

fn circuit() -> Workout {
    Workout::new(
        wid("circuit"),
        "Circuit",
        WorkoutShape::Flat {
            exercises: vec![
                Exercise::named("Squats"),
                Exercise::named("Push-ups"),
                Exercise::named("Rows"),
            ],
        },
    )
    .unwrap()
}

async fn seeded(athlete: AthleteId) -> InMemoryRepository {
    let repo = InMemoryRepository::new();
    repo.upsert_workout(&circuit()).await.unwrap();
    repo.put_assignment(Assignment::new(
        athlete,
        wid("circuit"),
        AssignmentStatus::Assigned,
    ))
    .unwrap();
    repo
}

async fn remote_status(repo: &InMemoryRepository, athlete: AthleteId) -> AssignmentStatus {
    repo.assignments_for_athlete(athlete).await.unwrap()[0].status
}

#[tokio::test]
async fn full_session_is_cached_on_disk_and_reported_upstream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("progress.json");
    let athlete = AthleteId::random();
    let repo = seeded(athlete).await;

    let storage = Storage::from_in_memory(&repo)
        .with_progress(Arc::new(JsonFileStore::new(path.clone())));
    let app = AppServices::new(storage, Clock::fixed(fixed_now())).await;
    let execution = app.execution();
    let session = execution.open(athlete, &circuit());

    assert_eq!(
        execution.complete_exercise(&session, 0).await,
        Outcome::Synced(AssignmentStatus::InProgress)
    );
    assert_eq!(remote_status(&repo, athlete).await, AssignmentStatus::InProgress);

    assert_eq!(
        execution.complete_exercise(&session, 1).await,
        Outcome::Synced(AssignmentStatus::InProgress)
    );
    assert_eq!(
        execution.finish(&session, 2).await,
        Outcome::Synced(AssignmentStatus::Completed)
    );
    assert_eq!(remote_status(&repo, athlete).await, AssignmentStatus::Completed);
    assert!(app.notices().drain().is_empty());

    let reopened = AppServices::new(
        Storage::from_in_memory(&repo).with_progress(Arc::new(JsonFileStore::new(path))),
        Clock::fixed(fixed_now()),
    )
    .await;
    let view = reopened.progress().get_progress("circuit").unwrap();
    assert!(view.is_fully_complete);
    assert_eq!(view.completed_exercises, vec![0, 1, 2]);
}

#[tokio::test]
async fn reset_clears_local_and_remote_then_sync_leaves_it_alone() {
    let athlete = AthleteId::random();
    let repo = seeded(athlete).await;
    let app = AppServices::new(Storage::from_in_memory(&repo), Clock::fixed(fixed_now())).await;
    let execution = app.execution();
    let session = execution.open(athlete, &circuit());

    execution.complete_exercise(&session, 0).await;
    assert_eq!(
        execution.reset(&session).await,
        Outcome::Synced(AssignmentStatus::Assigned)
    );

    let report = app.reconciliation().sync(athlete).await.unwrap();
    assert_eq!(report.untouched, 1);

    let view = app.progress().get_progress("circuit").unwrap();
    assert_eq!(view.current_exercise_index, 0);
    assert!(view.completed_exercises.is_empty());
    assert_eq!(view.total_exercises, 3);
}

#[tokio::test]
async fn closed_session_discards_late_status_result() {
    let athlete = AthleteId::random();
    let repo = seeded(athlete).await;
    let app = AppServices::new(Storage::from_in_memory(&repo), Clock::fixed(fixed_now())).await;
    let execution = app.execution();
    let session = execution.open(athlete, &circuit());

    session.close();
    assert_eq!(execution.complete_exercise(&session, 0).await, Outcome::Discarded);
    assert!(app.progress().is_exercise_completed("circuit", 0));
}

#[tokio::test]
async fn missing_assignment_raises_an_error_notice() {
    let athlete = AthleteId::random();
    let repo = InMemoryRepository::new();
    repo.upsert_workout(&circuit()).await.unwrap();
    let app = AppServices::new(Storage::from_in_memory(&repo), Clock::fixed(fixed_now())).await;
    let execution = app.execution();
    let session = execution.open(athlete, &circuit());

    assert_eq!(
        execution.finish(&session, 2).await,
        Outcome::Failed(AssignmentStatus::InProgress)
    );
    let notices = app.notices().drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert!(app.progress().is_exercise_completed("circuit", 2));
}

#[tokio::test]
async fn sqlite_backed_services_keep_progress_in_a_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let progress_file: PathBuf = dir.path().join("cache.json");
    let config = AppServicesConfig {
        db_url: "sqlite:file:services_config_test?mode=memory&cache=shared".to_string(),
        progress_file: Some(progress_file.clone()),
        use_remote: false,
    };

    let app = AppServices::from_config(&config, Clock::fixed(fixed_now()))
        .await
        .unwrap();
    app.workouts().upsert_workout(&circuit()).await.unwrap();
    app.progress().update_progress("circuit", 1, 3, true).await;

    let raw = std::fs::read_to_string(&progress_file).unwrap();
    assert!(raw.contains("\"circuit\""));
    assert!(raw.contains("\"currentExerciseIndex\":1"));
    assert_eq!(app.workouts().list_workouts().await.unwrap().len(), 1);
}
