use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Bad input. Always raised before any write reaches the repository.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no pairs to schedule")]
    EmptyPairs,
    #[error("team {team_id} cannot be paired with itself")]
    SelfPairing { team_id: String },
    #[error("team {team_id} appears in more than one pair")]
    DuplicateTeam { team_id: String },
    #[error("unknown team {team_id}")]
    UnknownTeam { team_id: String },
    #[error("match duration must be positive, got {0} minutes")]
    NonPositiveDuration(i64),
    #[error("match duration of {0} minutes is out of range")]
    DurationOutOfRange(i64),
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid start time {0:?}, expected HH:MM")]
    InvalidTime(String),
    #[error("court {court_id} is still occupied by unfinished match {match_id}")]
    CourtBusy { court_id: String, match_id: String },
}

/// Failures of the storage collaborator.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("court {court_id} changed underneath us (expected v{expected}, found v{found})")]
    VersionConflict {
        court_id: String,
        expected: u64,
        found: u64,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// Some matches may already have been written. Re-query before retrying.
    #[error("service failure: {0}")]
    Service(#[from] RepositoryError),
}

impl IntoResponse for SchedulerError {
    fn into_response(self) -> Response {
        let status = match &self {
            SchedulerError::Validation(ValidationError::CourtBusy { .. }) => StatusCode::CONFLICT,
            SchedulerError::Validation(_) => StatusCode::BAD_REQUEST,
            SchedulerError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
