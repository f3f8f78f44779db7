use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::model::ids::WorkoutId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WorkoutShapeError {
    #[error("workout body must be a JSON object")]
    NotAnObject,

    #[error("workout title cannot be empty")]
    EmptyTitle,
}

//
// ─── EXERCISES ────────────────────────────────────────────────────────────────
//

/// A single exercise entry. Only the name is interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exercise {
    pub name: String,
}

impl Exercise {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn from_json(value: &Value) -> Self {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        Self { name }
    }

    fn to_json(&self) -> Value {
        json!({ "name": self.name })
    }
}

/// A group of exercises in a block-based workout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    pub name: Option<String>,
    pub exercises: Vec<Exercise>,
}

/// One day of a weekly template.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrainingDay {
    pub day: String,
    pub exercises: Vec<Exercise>,
    pub is_rest_day: bool,
}

//
// ─── SHAPE ────────────────────────────────────────────────────────────────────
//

/// The three workout layouts the hosted backend stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkoutShape {
    /// `{ is_block_based: true, blocks: [{ exercises: [...] }] }`
    Blocks { blocks: Vec<Block> },
    /// `{ exercises: [{ day, exercises: [...], isRestDay }] }`
    WeeklyTemplate { days: Vec<TrainingDay> },
    /// `{ exercises: [...] }`
    Flat { exercises: Vec<Exercise> },
}

impl WorkoutShape {
    /// Number of exercises the progress cache tracks for this workout.
    ///
    /// Weekly templates count the first day only, whatever day is current.
    #[must_use]
    pub fn exercise_count(&self) -> u32 {
        let count = match self {
            WorkoutShape::Blocks { blocks } => blocks.iter().map(|b| b.exercises.len()).sum(),
            WorkoutShape::WeeklyTemplate { days } => {
                days.first().map_or(0, |day| day.exercises.len())
            }
            WorkoutShape::Flat { exercises } => exercises.len(),
        };
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Decodes the hosted JSON layout.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutShapeError::NotAnObject` if `value` is not an object.
    pub fn from_json(value: &Value) -> Result<Self, WorkoutShapeError> {
        let obj = value.as_object().ok_or(WorkoutShapeError::NotAnObject)?;

        let block_based = obj
            .get("is_block_based")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if block_based {
            let blocks = array(obj, "blocks")
                .iter()
                .map(|block| Block {
                    name: block
                        .get("name")
                        .and_then(Value::as_str)
                        .map(str::to_owned),
                    exercises: exercises_of(block),
                })
                .collect();
            return Ok(WorkoutShape::Blocks { blocks });
        }

        let entries = array(obj, "exercises");
        if entries.first().is_some_and(is_training_day) {
            let days = entries
                .iter()
                .map(|day| TrainingDay {
                    day: day
                        .get("day")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_owned(),
                    exercises: exercises_of(day),
                    is_rest_day: day
                        .get("isRestDay")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                })
                .collect();
            return Ok(WorkoutShape::WeeklyTemplate { days });
        }

        Ok(WorkoutShape::Flat {
            exercises: entries.iter().map(Exercise::from_json).collect(),
        })
    }

    /// Encodes back into the hosted JSON layout.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            WorkoutShape::Blocks { blocks } => json!({
                "is_block_based": true,
                "blocks": blocks
                    .iter()
                    .map(|b| json!({
                        "name": b.name,
                        "exercises": b.exercises.iter().map(Exercise::to_json).collect::<Vec<_>>(),
                    }))
                    .collect::<Vec<_>>(),
            }),
            WorkoutShape::WeeklyTemplate { days } => json!({
                "exercises": days
                    .iter()
                    .map(|d| json!({
                        "day": d.day,
                        "exercises": d.exercises.iter().map(Exercise::to_json).collect::<Vec<_>>(),
                        "isRestDay": d.is_rest_day,
                    }))
                    .collect::<Vec<_>>(),
            }),
            WorkoutShape::Flat { exercises } => json!({
                "exercises": exercises.iter().map(Exercise::to_json).collect::<Vec<_>>(),
            }),
        }
    }
}

fn array<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    obj.get(key)
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice)
}

fn exercises_of(value: &Value) -> Vec<Exercise> {
    value
        .get("exercises")
        .and_then(Value::as_array)
        .map(|list| list.iter().map(Exercise::from_json).collect())
        .unwrap_or_default()
}

fn is_training_day(value: &Value) -> bool {
    value.get("day").is_some() && value.get("exercises").is_some_and(Value::is_array)
}

//
// ─── WORKOUT ──────────────────────────────────────────────────────────────────
//

/// A workout known to the local session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workout {
    id: WorkoutId,
    title: String,
    shape: WorkoutShape,
}

impl Workout {
    /// Creates a workout.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutShapeError::EmptyTitle` if the title is blank.
    pub fn new(
        id: WorkoutId,
        title: impl Into<String>,
        shape: WorkoutShape,
    ) -> Result<Self, WorkoutShapeError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(WorkoutShapeError::EmptyTitle);
        }
        Ok(Self { id, title, shape })
    }

    #[must_use]
    pub fn id(&self) -> &WorkoutId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn shape(&self) -> &WorkoutShape {
        &self.shape
    }

    #[must_use]
    pub fn exercise_count(&self) -> u32 {
        self.shape.exercise_count()
    }
}
