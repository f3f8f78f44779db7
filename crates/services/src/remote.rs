use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use storage::repository::{AssignmentRepository, StorageError};
use workout_core::model::{Assignment, AssignmentStatus, AthleteId, WorkoutId};

const ASSIGNMENTS_TABLE: &str = "workout_assignments";

#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
}

impl RemoteConfig {
    /// Read `WORKOUT_API_URL` / `WORKOUT_API_KEY`. Both must be non-empty.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("WORKOUT_API_URL").ok()?;
        let api_key = env::var("WORKOUT_API_KEY").ok()?;
        if base_url.trim().is_empty() || api_key.trim().is_empty() {
            return None;
        }
        Some(Self { base_url, api_key })
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{ASSIGNMENTS_TABLE}",
            self.base_url.trim_end_matches('/')
        )
    }
}

/// Assignment table of the hosted backend, reached over its REST interface.
#[derive(Clone)]
pub struct RestAssignmentClient {
    client: Client,
    config: RemoteConfig,
}

impl RestAssignmentClient {
    #[must_use]
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Client built from the environment, or `None` when not configured.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        RemoteConfig::from_env().map(Self::new)
    }
}

#[derive(Debug, Deserialize)]
struct AssignmentRow {
    workout_id: String,
    status: AssignmentStatus,
    #[serde(default)]
    completed_exercises: Option<Vec<u32>>,
}

#[derive(Debug, Serialize)]
struct StatusPatch {
    status: AssignmentStatus,
}

fn connection(err: impl std::fmt::Display) -> StorageError {
    StorageError::Connection(err.to_string())
}

fn row_into_assignment(athlete_id: AthleteId, row: AssignmentRow) -> Option<Assignment> {
    let workout_id = WorkoutId::parse(&row.workout_id)?;
    let mut completed = row.completed_exercises.unwrap_or_default();
    completed.sort_unstable();
    completed.dedup();
    Some(Assignment::new(athlete_id, workout_id, row.status).with_completed_exercises(completed))
}

#[async_trait]
impl AssignmentRepository for RestAssignmentClient {
    async fn assignments_for_athlete(
        &self,
        athlete_id: AthleteId,
    ) -> Result<Vec<Assignment>, StorageError> {
        let response = self
            .client
            .get(self.config.table_url())
            .query(&[
                ("athlete_id", format!("eq.{athlete_id}")),
                ("select", "workout_id,status,completed_exercises".to_string()),
            ])
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(connection)?;

        if !response.status().is_success() {
            return Err(StorageError::Connection(format!(
                "assignments request failed with status {}",
                response.status()
            )));
        }

        let rows: Vec<AssignmentRow> = response
            .json()
            .await
            .map_err(|err| StorageError::Serialization(err.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row_into_assignment(athlete_id, row))
            .collect())
    }

    async fn update_assignment_status(
        &self,
        athlete_id: AthleteId,
        workout_id: &WorkoutId,
        status: AssignmentStatus,
    ) -> Result<(), StorageError> {
        let response = self
            .client
            .patch(self.config.table_url())
            .query(&[
                ("athlete_id", format!("eq.{athlete_id}")),
                ("workout_id", format!("eq.{workout_id}")),
            ])
            .header("apikey", &self.config.api_key)
            .header("Prefer", "return=representation")
            .bearer_auth(&self.config.api_key)
            .json(&StatusPatch { status })
            .send()
            .await
            .map_err(connection)?;

        if !response.status().is_success() {
            return Err(StorageError::Connection(format!(
                "status update failed with status {}",
                response.status()
            )));
        }

        let updated: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        if updated.is_empty() {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_url_ignores_trailing_slash() {
        let config = RemoteConfig {
            base_url: "https://example.test/".into(),
            api_key: "key".into(),
        };
        assert_eq!(
            config.table_url(),
            "https://example.test/rest/v1/workout_assignments"
        );
    }

    #[test]
    fn rows_decode_into_assignments() {
        let athlete = AthleteId::random();
        let rows: Vec<AssignmentRow> = serde_json::from_str(
            r#"[
                {"workout_id":"w1","status":"completed","completed_exercises":null},
                {"workout_id":"w2","status":"in_progress","completed_exercises":[3,1,3]},
                {"workout_id":"","status":"assigned"}
            ]"#,
        )
        .unwrap();

        let assignments: Vec<Assignment> = rows
            .into_iter()
            .filter_map(|row| row_into_assignment(athlete, row))
            .collect();

        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[0].status, AssignmentStatus::Completed);
        assert!(assignments[0].completed_exercises.is_empty());
        assert_eq!(assignments[1].completed_exercises, vec![1, 3]);
    }

    #[test]
    fn status_patch_uses_wire_name() {
        let body = serde_json::to_string(&StatusPatch {
            status: AssignmentStatus::InProgress,
        })
        .unwrap();
        assert_eq!(body, r#"{"status":"in_progress"}"#);
    }
}
