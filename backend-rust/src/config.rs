use std::env;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use court_types::SchedulingOptions;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Longest match the scheduler accepts, in minutes.
pub const MAX_MATCH_DURATION_MINUTES: i64 = 24 * 60;

// ─── Scheduling Defaults ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDefaults {
    pub match_duration_minutes: u32,
    pub start_time: NaiveTime,
    pub division: String,
    pub round: String,
    pub assign_courts: bool,
    pub auto_start_matches: bool,
}

impl Default for ScheduleDefaults {
    fn default() -> Self {
        Self {
            match_duration_minutes: 30,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            division: "INITIAL".to_string(),
            round: "INITIAL".to_string(),
            assign_courts: true,
            auto_start_matches: false,
        }
    }
}

// ─── App Config ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub state_file: PathBuf,
    /// Chained audit log; disabled when unset
    pub audit_log_path: Option<PathBuf>,
    pub defaults: ScheduleDefaults,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            state_file: PathBuf::from("state.json"),
            audit_log_path: None,
            defaults: ScheduleDefaults::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(port) = env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        if let Ok(path) = env::var("COURTMASTER_STATE_FILE") {
            config.state_file = PathBuf::from(path);
        }
        if let Ok(path) = env::var("COURTMASTER_AUDIT_LOG") {
            config.audit_log_path = Some(PathBuf::from(path));
        }
        if let Some(minutes) = env::var("COURTMASTER_MATCH_DURATION_MIN")
            .ok()
            .and_then(|m| m.parse::<u32>().ok())
            .filter(|m| *m > 0)
        {
            config.defaults.match_duration_minutes = minutes;
        }
        if let Some(time) = env::var("COURTMASTER_START_TIME")
            .ok()
            .and_then(|t| parse_time(&t).ok())
        {
            config.defaults.start_time = time;
        }

        config
    }
}

// ─── Request Boundary ────────────────────────────────────────────────────────

/// Options as they arrive from a client: every field optional, loosely typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub match_duration: Option<i64>,
    pub division: Option<String>,
    pub round: Option<String>,
    pub assign_courts: Option<bool>,
    pub auto_start_matches: Option<bool>,
}

impl ScheduleRequest {
    pub fn resolve(
        &self,
        defaults: &ScheduleDefaults,
        today: NaiveDate,
    ) -> Result<SchedulingOptions, ValidationError> {
        let base_date = match &self.date {
            Some(d) => NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
                .map_err(|_| ValidationError::InvalidDate(d.clone()))?,
            None => today,
        };
        let start_time = match &self.start_time {
            Some(t) => parse_time(t)?,
            None => defaults.start_time,
        };
        let match_duration_minutes = match self.match_duration {
            Some(m) if m <= 0 => return Err(ValidationError::NonPositiveDuration(m)),
            Some(m) if m > MAX_MATCH_DURATION_MINUTES => {
                return Err(ValidationError::DurationOutOfRange(m))
            }
            Some(m) => m as u32,
            None => defaults.match_duration_minutes,
        };
        let division = self
            .division
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(&defaults.division);
        let round = self
            .round
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(&defaults.round);

        Ok(SchedulingOptions {
            base_date,
            start_time,
            match_duration_minutes,
            division: division.into(),
            round: round.to_string(),
            assign_courts: self.assign_courts.unwrap_or(defaults.assign_courts),
            auto_start_matches: self.auto_start_matches.unwrap_or(defaults.auto_start_matches),
        })
    }
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Result<NaiveTime, ValidationError> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| ValidationError::InvalidTime(raw.to_string()))
}
