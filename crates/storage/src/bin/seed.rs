use std::fmt;

use storage::repository::WorkoutRepository;
use storage::sqlite::SqliteRepository;
use workout_core::model::{
    Assignment, AssignmentStatus, AthleteId, Block, Exercise, TrainingDay, Workout, WorkoutId,
    WorkoutShape,
};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    athlete_id: AthleteId,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidAthleteId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidAthleteId { raw } => {
                write!(f, "invalid --athlete value (expected UUID): {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("WORKOUT_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3?mode=rwc".into());
        let mut athlete_id = std::env::var("WORKOUT_ATHLETE_ID")
            .ok()
            .and_then(|value| value.parse::<AthleteId>().ok());

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--athlete" => {
                    let value = require_value(&mut args, "--athlete")?;
                    let parsed = value
                        .parse::<AthleteId>()
                        .map_err(|_| ArgsError::InvalidAthleteId { raw: value.clone() })?;
                    athlete_id = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            athlete_id: athlete_id.unwrap_or_else(AthleteId::random),
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3?mode=rwc)");
    eprintln!("  --athlete <uuid>          Athlete to assign workouts to (default: random)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  WORKOUT_DB_URL, WORKOUT_ATHLETE_ID");
}

fn sample_workouts() -> Result<Vec<Workout>, Box<dyn std::error::Error>> {
    let id = |raw: &str| {
        WorkoutId::parse(raw).ok_or_else(|| format!("invalid sample workout id: {raw}"))
    };
    let exercises = |names: &[&str]| -> Vec<Exercise> {
        names.iter().map(|n| Exercise::named(*n)).collect()
    };

    Ok(vec![
        Workout::new(
            id("sprint-intervals")?,
            "Sprint intervals",
            WorkoutShape::Flat {
                exercises: exercises(&["warmup jog", "6x60m sprint", "cooldown"]),
            },
        )?,
        Workout::new(
            id("strength-a")?,
            "Strength A",
            WorkoutShape::Blocks {
                blocks: vec![
                    Block {
                        name: Some("activation".into()),
                        exercises: exercises(&["band walk", "glute bridge"]),
                    },
                    Block {
                        name: Some("main lifts".into()),
                        exercises: exercises(&["back squat", "romanian deadlift", "push press"]),
                    },
                ],
            },
        )?,
        Workout::new(
            id("base-week")?,
            "Base week",
            WorkoutShape::WeeklyTemplate {
                days: vec![
                    TrainingDay {
                        day: "monday".into(),
                        exercises: exercises(&["easy run", "mobility"]),
                        is_rest_day: false,
                    },
                    TrainingDay {
                        day: "tuesday".into(),
                        exercises: Vec::new(),
                        is_rest_day: true,
                    },
                    TrainingDay {
                        day: "wednesday".into(),
                        exercises: exercises(&["tempo run", "core circuit", "stretch"]),
                        is_rest_day: false,
                    },
                ],
            },
        )?,
    ])
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let repo = SqliteRepository::connect(&args.db_url).await?;
    repo.migrate().await?;

    let workouts = sample_workouts()?;
    for workout in &workouts {
        repo.upsert_workout(workout).await?;
    }

    let statuses = [
        (AssignmentStatus::Assigned, Vec::new()),
        (AssignmentStatus::InProgress, vec![0, 1]),
        (AssignmentStatus::Completed, Vec::new()),
    ];
    for (workout, (status, completed)) in workouts.iter().zip(statuses) {
        let assignment = Assignment::new(args.athlete_id, workout.id().clone(), status)
            .with_completed_exercises(completed);
        repo.upsert_assignment(&assignment).await?;
    }

    println!(
        "Seeded {} workouts assigned to athlete {} into {}",
        workouts.len(),
        args.athlete_id,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
