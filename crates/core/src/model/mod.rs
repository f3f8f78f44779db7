mod assignment;
mod ids;
mod progress;
mod workout;

pub use ids::{AthleteId, DAILY_PREFIX, ParseIdError, WorkoutId};

pub use assignment::{Assignment, AssignmentError, AssignmentStatus};
pub use progress::{ProgressView, WorkoutProgress, completion_percentage};
pub use workout::{Block, Exercise, TrainingDay, Workout, WorkoutShape, WorkoutShapeError};
