//! # repository
//!
//! Storage seam consumed by the scheduler. The bundled implementation is
//! [`crate::persistence::MemoryStore`]; a hosted backend (Supabase, Appwrite)
//! plugs in by implementing [`TournamentRepository`].

use async_trait::async_trait;
use court_types::{Court, CourtStatus, Match, MatchStatus, Team};

use crate::error::RepositoryError;

/// Partial update of a match. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchPatch {
    pub status: Option<MatchStatus>,
    /// `Some(None)` clears the court reference
    pub court_id: Option<Option<String>>,
}

/// Court status write guarded by the version the caller last read.
/// Status and occupant always travel together.
#[derive(Debug, Clone, PartialEq)]
pub struct CourtPatch {
    pub expected_version: u64,
    pub status: CourtStatus,
    pub current_match_id: Option<String>,
}

impl CourtPatch {
    pub fn occupy(expected_version: u64, match_id: &str) -> Self {
        Self {
            expected_version,
            status: CourtStatus::InUse,
            current_match_id: Some(match_id.to_string()),
        }
    }
}

#[async_trait]
pub trait TournamentRepository: Send + Sync {
    async fn list_teams(&self, tournament_id: &str) -> Result<Vec<Team>, RepositoryError>;

    async fn list_courts(&self, tournament_id: &str) -> Result<Vec<Court>, RepositoryError>;

    async fn list_matches(&self, tournament_id: &str) -> Result<Vec<Match>, RepositoryError>;

    async fn create_match(&self, m: Match) -> Result<Match, RepositoryError>;

    async fn update_match(
        &self,
        tournament_id: &str,
        match_id: &str,
        patch: MatchPatch,
    ) -> Result<Match, RepositoryError>;

    /// Compare-and-swap: fails with [`RepositoryError::VersionConflict`]
    /// when the stored version differs from `patch.expected_version`.
    async fn update_court(
        &self,
        tournament_id: &str,
        court_id: &str,
        patch: CourtPatch,
    ) -> Result<Court, RepositoryError>;
}
