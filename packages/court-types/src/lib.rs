//! # court-types
//!
//! Shared tournament structures for the CourtMaster scheduling backend.
//!
//! These types are used by:
//! - `backend-rust`: pairing, court allocation and the HTTP surface
//! - `schedule-simulator`: synthetic rosters and court pools
//!
//! ## Wire Conventions
//!
//! - All structs serialize camelCase, status enums SCREAMING_SNAKE_CASE
//! - Scheduled kickoffs are tournament-local wall-clock times (`NaiveDateTime`)
//! - `created_at` stamps are UTC

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

// ── Division ──────────────────────────────────────────────────────────────────

/// Label partitioning teams into independent scheduling pools
/// (e.g. "Men's Singles", or a stage such as "INITIAL").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DivisionTag(pub String);

impl DivisionTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DivisionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DivisionTag {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

impl From<String> for DivisionTag {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

// ── Teams ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub players: Vec<Player>,
    /// Seed position, lower = stronger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_ranking: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<DivisionTag>,
}

impl Team {
    /// Untagged teams may be drawn into any pool.
    pub fn is_eligible_for(&self, division: &DivisionTag) -> bool {
        self.division.as_ref().map_or(true, |d| d == division)
    }
}

// ── Courts ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourtStatus {
    #[default]
    Available,
    InUse,
    Maintenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Court {
    pub id: String,
    pub tournament_id: String,
    pub name: String,
    #[serde(default)]
    pub status: CourtStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_match_id: Option<String>,
    /// Compare-and-swap stamp. Bumped on every accepted status write.
    #[serde(default)]
    pub version: u64,
}

impl Court {
    pub fn is_available(&self) -> bool {
        self.status == CourtStatus::Available
    }
}

// ── Matches ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl MatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetScore {
    pub team1: u32,
    pub team2: u32,
}

/// A fixture between two teams. Singles entries are one-player teams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub tournament_id: String,
    pub team1_id: String,
    pub team2_id: String,
    pub division: DivisionTag,
    pub round: String,
    pub status: MatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court_id: Option<String>,
    #[serde(default)]
    pub scores: Vec<SetScore>,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn involves(&self, team_id: &str) -> bool {
        self.team1_id == team_id || self.team2_id == team_id
    }
}

// ── Scheduling Inputs ─────────────────────────────────────────────────────────

/// Two teams proposed for a future match. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePair {
    pub team1: Team,
    pub team2: Team,
}

impl CandidatePair {
    pub fn new(team1: Team, team2: Team) -> Self {
        Self { team1, team2 }
    }

    pub fn is_self_pair(&self) -> bool {
        self.team1.id == self.team2.id
    }

    pub fn involves(&self, team_id: &str) -> bool {
        self.team1.id == team_id || self.team2.id == team_id
    }
}

/// Fully resolved options for one scheduling run. Defaults are applied
/// before this struct is built, never inside the algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingOptions {
    pub base_date: NaiveDate,
    pub start_time: NaiveTime,
    pub match_duration_minutes: u32,
    pub division: DivisionTag,
    pub round: String,
    pub assign_courts: bool,
    pub auto_start_matches: bool,
}

impl SchedulingOptions {
    pub fn base_datetime(&self) -> NaiveDateTime {
        self.base_date.and_time(self.start_time)
    }
}
