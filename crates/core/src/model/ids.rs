use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Prefix used for derived daily views of a weekly or monthly plan.
pub const DAILY_PREFIX: &str = "daily-";

/// Opaque key of a workout in the progress cache.
///
/// Never empty. Composite keys such as `daily-<id>` are allowed.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkoutId(String);

impl WorkoutId {
    /// Wraps a raw key unchanged, returning `None` only for the empty string.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        Some(Self(raw.to_owned()))
    }

    /// Builds the composite key for the daily view of `base`.
    #[must_use]
    pub fn daily(base: &WorkoutId) -> Self {
        Self(format!("{DAILY_PREFIX}{}", base.0))
    }

    /// Returns the underlying plan id when this is a daily composite key.
    #[must_use]
    pub fn daily_base(&self) -> Option<WorkoutId> {
        self.0
            .strip_prefix(DAILY_PREFIX)
            .and_then(WorkoutId::parse)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Unique identifier for an athlete (the hosted auth user id).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AthleteId(Uuid);

impl AthleteId {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a fresh random id.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl fmt::Debug for WorkoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorkoutId({})", self.0)
    }
}

impl fmt::Debug for AthleteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AthleteId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for WorkoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AthleteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for WorkoutId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkoutId::parse(s).ok_or_else(|| ParseIdError {
            kind: "WorkoutId".to_string(),
        })
    }
}

impl FromStr for AthleteId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(AthleteId::new)
            .map_err(|_| ParseIdError {
                kind: "AthleteId".to_string(),
            })
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workout_id_rejects_only_empty() {
        assert!(WorkoutId::parse("").is_none());
        assert!("".parse::<WorkoutId>().is_err());
        assert_eq!(WorkoutId::parse(" ").unwrap().as_str(), " ");
    }

    #[test]
    fn workout_id_keeps_surrounding_whitespace() {
        let padded = WorkoutId::parse("w1 ").unwrap();
        assert_eq!(padded.as_str(), "w1 ");
        assert_ne!(padded, WorkoutId::parse("w1").unwrap());
    }

    #[test]
    fn daily_key_round_trips_base() {
        let base = WorkoutId::parse("plan-7").unwrap();
        let daily = WorkoutId::daily(&base);
        assert_eq!(daily.as_str(), "daily-plan-7");
        assert_eq!(daily.daily_base(), Some(base));
    }

    #[test]
    fn plain_key_has_no_daily_base() {
        let id = WorkoutId::parse("w1").unwrap();
        assert!(id.daily_base().is_none());
    }

    #[test]
    fn athlete_id_from_str() {
        let raw = "6f1c1f4e-2d3b-4c5a-9e8f-0a1b2c3d4e5f";
        let id: AthleteId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn athlete_id_from_str_invalid() {
        assert!("not-a-uuid".parse::<AthleteId>().is_err());
    }
}
