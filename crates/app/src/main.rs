use std::fmt;
use std::path::PathBuf;

use services::{AppServices, AppServicesConfig, Clock, ExecutionSession, NoticeLevel, Outcome};
use tracing_subscriber::EnvFilter;
use workout_core::model::{AthleteId, ProgressView, WorkoutId};

#[derive(Debug, PartialEq, Eq)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { command: &'static str, name: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidAthleteId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidWorkoutId { raw: String },
    InvalidIndex { raw: String },
    MissingAthlete,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { command, name } => {
                write!(f, "{command} requires <{name}>")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::InvalidAthleteId { raw } => {
                write!(f, "invalid --athlete value (expected UUID): {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidWorkoutId { raw } => write!(f, "invalid workout id: {raw:?}"),
            ArgsError::InvalidIndex { raw } => write!(f, "invalid exercise index: {raw}"),
            ArgsError::MissingAthlete => {
                write!(f, "this command needs --athlete or WORKOUT_ATHLETE_ID")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug)]
enum RunError {
    UnknownWorkout(WorkoutId),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::UnknownWorkout(id) => {
                write!(f, "workout {id} is not in the local catalogue")
            }
        }
    }
}

impl std::error::Error for RunError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Show(Option<WorkoutId>),
    Sync,
    Advance(WorkoutId, u32),
    Complete(WorkoutId, u32),
    Finish(WorkoutId, u32),
    Reset(WorkoutId),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Show(_) => "show",
            Command::Sync => "sync",
            Command::Advance(..) => "advance",
            Command::Complete(..) => "complete",
            Command::Finish(..) => "finish",
            Command::Reset(_) => "reset",
        }
    }

    fn from_positionals(positionals: &[String]) -> Result<Self, ArgsError> {
        let Some((first, rest)) = positionals.split_first() else {
            return Ok(Command::Show(None));
        };

        let workout = |command: &'static str| -> Result<WorkoutId, ArgsError> {
            let raw = rest.first().ok_or(ArgsError::MissingArgument {
                command,
                name: "workout-id",
            })?;
            WorkoutId::parse(raw).ok_or_else(|| ArgsError::InvalidWorkoutId { raw: raw.clone() })
        };
        let index = |command: &'static str| -> Result<u32, ArgsError> {
            let raw = rest.get(1).ok_or(ArgsError::MissingArgument {
                command,
                name: "exercise-index",
            })?;
            raw.parse()
                .map_err(|_| ArgsError::InvalidIndex { raw: raw.clone() })
        };

        let command = match first.as_str() {
            "show" => match rest.first() {
                Some(_) => Command::Show(Some(workout("show")?)),
                None => Command::Show(None),
            },
            "sync" => Command::Sync,
            "advance" => Command::Advance(workout("advance")?, index("advance")?),
            "complete" => Command::Complete(workout("complete")?, index("complete")?),
            "finish" => Command::Finish(workout("finish")?, index("finish")?),
            "reset" => Command::Reset(workout("reset")?),
            other => return Err(ArgsError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }

    fn needs_athlete(&self) -> bool {
        !matches!(self, Command::Show(_))
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    progress_file: Option<PathBuf>,
    athlete_id: Option<AthleteId>,
    remote: bool,
    verbose: bool,
    command: Command,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  workout-progress [options] show [<workout-id>]");
    eprintln!("  workout-progress [options] sync");
    eprintln!("  workout-progress [options] advance <workout-id> <exercise-index>");
    eprintln!("  workout-progress [options] complete <workout-id> <exercise-index>");
    eprintln!("  workout-progress [options] finish <workout-id> <exercise-index>");
    eprintln!("  workout-progress [options] reset <workout-id>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --progress-file <path>    Keep the progress cache in a JSON file");
    eprintln!("  --athlete <uuid>          Athlete whose assignments are used");
    eprintln!("  --remote                  Use the hosted assignment table");
    eprintln!("  -v, --verbose             Log at debug level");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  WORKOUT_DB_URL, WORKOUT_PROGRESS_PATH, WORKOUT_ATHLETE_ID");
    eprintln!("  WORKOUT_API_URL, WORKOUT_API_KEY (with --remote), RUST_LOG");
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let env_var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        let mut db_url = env_var("WORKOUT_DB_URL")
            .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url);
        let mut progress_file = env_var("WORKOUT_PROGRESS_PATH").map(PathBuf::from);
        let mut athlete_id = env_var("WORKOUT_ATHLETE_ID")
            .and_then(|value| value.parse::<AthleteId>().ok());
        let mut remote = false;
        let mut verbose = false;
        let mut positionals = Vec::new();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--progress-file" => {
                    progress_file = Some(PathBuf::from(require_value(
                        &mut args,
                        "--progress-file",
                    )?));
                }
                "--athlete" => {
                    let value = require_value(&mut args, "--athlete")?;
                    let parsed = value
                        .parse::<AthleteId>()
                        .map_err(|_| ArgsError::InvalidAthleteId { raw: value.clone() })?;
                    athlete_id = Some(parsed);
                }
                "--remote" => remote = true,
                "--verbose" | "-v" => verbose = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if flag.starts_with('-') => return Err(ArgsError::UnknownArg(arg)),
                _ => positionals.push(arg),
            }
        }

        let command = Command::from_positionals(&positionals)?;
        if command.needs_athlete() && athlete_id.is_none() {
            return Err(ArgsError::MissingAthlete);
        }

        Ok(Self {
            db_url,
            progress_file,
            athlete_id,
            remote,
            verbose,
            command,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw.starts_with("sqlite::memory:") || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url.starts_with("sqlite::memory:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_view(id: &WorkoutId, title: Option<&str>, view: Option<&ProgressView>) {
    let label = title.map_or_else(|| id.to_string(), |t| format!("{id} ({t})"));
    match view {
        Some(view) => println!(
            "{label}: {:.1}% ({}/{} done, next exercise {}){}",
            view.completion_percentage,
            view.completed_exercises.len(),
            view.total_exercises,
            view.current_exercise_index,
            if view.is_fully_complete { " complete" } else { "" }
        ),
        None => println!("{label}: not started"),
    }
}

fn print_outcome(outcome: Outcome) {
    match outcome {
        Outcome::LocalOnly => println!("saved locally"),
        Outcome::Synced(status) => println!("saved; assignment is now {status}"),
        Outcome::Failed(status) => println!("saved locally; could not mark assignment {status}"),
        Outcome::Discarded => println!("saved locally; session closed before the server replied"),
    }
}

fn flush_notices(app: &AppServices) {
    for notice in app.notices().drain() {
        match notice.level {
            NoticeLevel::Info => eprintln!("{}", notice.message),
            NoticeLevel::Error => eprintln!("error: {}", notice.message),
        }
    }
}

async fn open_session(
    app: &AppServices,
    athlete_id: AthleteId,
    workout_id: WorkoutId,
) -> Result<ExecutionSession, Box<dyn std::error::Error>> {
    let workouts = app.workouts();
    let execution = app.execution();
    if let Some(workout) = workouts.get_workout(&workout_id).await? {
        return Ok(execution.open(athlete_id, &workout));
    }
    // Daily views track their own record but borrow the exercise count.
    if let Some(base) = workout_id.daily_base()
        && let Some(workout) = workouts.get_workout(&base).await?
    {
        return Ok(execution.open_by_id(athlete_id, workout_id, workout.exercise_count()));
    }
    Err(RunError::UnknownWorkout(workout_id).into())
}

async fn show(
    app: &AppServices,
    only: Option<WorkoutId>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = app.progress();
    if let Some(id) = only {
        let title = app.workouts().get_workout(&id).await?;
        print_view(
            &id,
            title.as_ref().map(|w| w.title()),
            store.get_progress(id.as_str()).as_ref(),
        );
        return Ok(());
    }

    let catalogue = app.workouts().list_workouts().await?;
    for workout in &catalogue {
        print_view(
            workout.id(),
            Some(workout.title()),
            store.get_progress(workout.id().as_str()).as_ref(),
        );
    }
    for id in store.workout_ids() {
        if catalogue.iter().all(|w| w.id() != &id) {
            print_view(&id, None, store.get_progress(id.as_str()).as_ref());
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    init_tracing(parsed.verbose);

    prepare_sqlite_file(&parsed.db_url)?;
    let config = AppServicesConfig {
        db_url: parsed.db_url.clone(),
        progress_file: parsed.progress_file.clone(),
        use_remote: parsed.remote,
    };
    let app = AppServices::from_config(&config, Clock::default_clock()).await?;
    tracing::debug!(db = %parsed.db_url, command = parsed.command.name(), "services ready");

    let athlete = parsed.athlete_id.ok_or(ArgsError::MissingAthlete);
    let result = match parsed.command {
        Command::Show(only) => show(&app, only).await,
        Command::Sync => {
            if let Some(report) = app
                .reconciliation()
                .sync_or_notify(athlete?, app.notices().as_ref())
                .await
            {
                println!(
                    "synced: {} completed remotely, {} merged, {} unchanged, {} unknown",
                    report.forced_complete, report.merged, report.untouched, report.unknown
                );
            }
            Ok(())
        }
        Command::Advance(id, index) => {
            let session = open_session(&app, athlete?, id).await?;
            app.execution().advance(&session, index).await;
            println!("moved to exercise {index}");
            Ok(())
        }
        Command::Complete(id, index) => {
            let session = open_session(&app, athlete?, id).await?;
            print_outcome(app.execution().complete_exercise(&session, index).await);
            Ok(())
        }
        Command::Finish(id, index) => {
            let session = open_session(&app, athlete?, id).await?;
            print_outcome(app.execution().finish(&session, index).await);
            Ok(())
        }
        Command::Reset(id) => {
            let session = open_session(&app, athlete?, id).await?;
            print_outcome(app.execution().reset(&session).await);
            Ok(())
        }
    };

    flush_notices(&app);
    result
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    const ATHLETE: &str = "6f1c2b9e-3d4a-4c5b-8e7f-0a1b2c3d4e5f";

    #[test]
    fn no_command_shows_everything() {
        let args = Args::parse(argv(&["--db", "sqlite::memory:"])).unwrap();
        assert_eq!(args.command, Command::Show(None));
        assert_eq!(args.db_url, "sqlite::memory:");
    }

    #[test]
    fn flags_may_follow_the_command() {
        let args =
            Args::parse(argv(&["complete", "w1", "2", "--athlete", ATHLETE, "--remote"])).unwrap();
        assert_eq!(
            args.command,
            Command::Complete(WorkoutId::parse("w1").unwrap(), 2)
        );
        assert!(args.remote);
        assert_eq!(args.athlete_id.unwrap().to_string(), ATHLETE);
    }

    #[test]
    fn session_commands_need_an_athlete() {
        if std::env::var("WORKOUT_ATHLETE_ID").is_ok() {
            return;
        }
        let err = Args::parse(argv(&["reset", "w1"])).unwrap_err();
        assert_eq!(err, ArgsError::MissingAthlete);
    }

    #[test]
    fn bad_positionals_are_rejected() {
        let err = Args::parse(argv(&["finish", "w1", "--athlete", ATHLETE])).unwrap_err();
        assert_eq!(
            err,
            ArgsError::MissingArgument {
                command: "finish",
                name: "exercise-index"
            }
        );

        let err = Args::parse(argv(&["advance", "w1", "two", "--athlete", ATHLETE])).unwrap_err();
        assert_eq!(err, ArgsError::InvalidIndex { raw: "two".into() });

        let err = Args::parse(argv(&["jump"])).unwrap_err();
        assert_eq!(err, ArgsError::UnknownCommand("jump".into()));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/dev.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/dev.sqlite3"));
    }
}
