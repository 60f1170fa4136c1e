use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use court_types::{CandidatePair, Court, CourtStatus, Match, MatchStatus, SchedulingOptions};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::MAX_MATCH_DURATION_MINUTES;
use crate::court_allocator::CourtAllocator;
use crate::error::{RepositoryError, SchedulerError, ValidationError};
use crate::events::ScheduleEvent;
use crate::repository::{CourtPatch, MatchPatch, TournamentRepository};

/// Counts shown to the operator after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSummary {
    pub scheduled_matches: usize,
    pub assigned_courts: usize,
    pub started_matches: usize,
}

#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    /// Matches as persisted at the end of the run, in kickoff order
    pub matches: Vec<Match>,
    /// For notification fan-out after the run
    pub events: Vec<ScheduleEvent>,
    pub summary: ScheduleSummary,
}

/// Turns candidate pairs into persisted matches.
///
/// Runs for the same tournament are serialized through a per-tournament lock,
/// and court occupation goes through a version-checked write, so two
/// operators pressing "auto schedule" together cannot double-book a court.
pub struct Scheduler<R> {
    repo: Arc<R>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<R: TournamentRepository> Scheduler<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    async fn tournament_lock(&self, tournament_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(tournament_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn schedule_matches(
        &self,
        tournament_id: &str,
        pairs: &[CandidatePair],
        options: &SchedulingOptions,
    ) -> Result<ScheduleOutcome, SchedulerError> {
        validate(pairs, options)?;

        let lock = self.tournament_lock(tournament_id).await;
        let _guard = lock.lock().await;

        let existing = self.repo.list_matches(tournament_id).await?;
        let courts = unclaimed_courts(self.repo.list_courts(tournament_id).await?, &existing);
        let allocation = CourtAllocator::allocate(tournament_id, pairs, &courts, options, Utc::now());

        let mut events = Vec::with_capacity(allocation.scheduled_matches.len());
        let mut matches = Vec::with_capacity(allocation.scheduled_matches.len());
        for m in allocation.scheduled_matches {
            let saved = self.repo.create_match(m).await?;
            events.push(ScheduleEvent::MatchCreated {
                fixture: saved.clone(),
            });
            matches.push(saved);
        }

        let mut started = 0;
        let mut conflicts = 0;
        if options.auto_start_matches && options.assign_courts {
            for m in matches.iter_mut() {
                let Some(court_id) = m.court_id.clone() else {
                    continue;
                };
                let Some(court) = courts.iter().find(|c| c.id == court_id) else {
                    continue;
                };

                let claim = CourtPatch::occupy(court.version, &m.id);
                match self.repo.update_court(tournament_id, &court_id, claim).await {
                    Ok(_) => {
                        let patch = MatchPatch {
                            status: Some(MatchStatus::InProgress),
                            ..Default::default()
                        };
                        *m = self.repo.update_match(tournament_id, &m.id, patch).await?;
                        started += 1;
                        events.push(ScheduleEvent::MatchStarted {
                            match_id: m.id.clone(),
                            court_id,
                        });
                    }
                    Err(RepositoryError::VersionConflict { found, .. }) => {
                        warn!(
                            "Court {court_id} changed to v{found} during scheduling; match {} stays queued",
                            m.id
                        );
                        let patch = MatchPatch {
                            court_id: Some(None),
                            ..Default::default()
                        };
                        *m = self.repo.update_match(tournament_id, &m.id, patch).await?;
                        conflicts += 1;
                        events.push(ScheduleEvent::CourtConflict {
                            match_id: m.id.clone(),
                            court_id,
                        });
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        let summary = ScheduleSummary {
            scheduled_matches: matches.len(),
            assigned_courts: allocation.assigned_court_count - conflicts,
            started_matches: started,
        };
        info!(
            "Tournament {tournament_id}: scheduled {} match(es) in {}, {} on court, {} started",
            summary.scheduled_matches, options.division, summary.assigned_courts, summary.started_matches
        );

        Ok(ScheduleOutcome {
            matches,
            events,
            summary,
        })
    }

    /// Hands a court back once its match is over. The scoring side owns the
    /// match status; this only clears the court.
    pub async fn release_court(
        &self,
        tournament_id: &str,
        court_id: &str,
    ) -> Result<Court, SchedulerError> {
        let lock = self.tournament_lock(tournament_id).await;
        let _guard = lock.lock().await;

        let courts = self.repo.list_courts(tournament_id).await?;
        let court = courts
            .iter()
            .find(|c| c.id == court_id)
            .ok_or_else(|| RepositoryError::NotFound {
                kind: "court",
                id: court_id.to_string(),
            })?;
        if let Some(occupant) = &court.current_match_id {
            let matches = self.repo.list_matches(tournament_id).await?;
            let unfinished = matches
                .iter()
                .any(|m| &m.id == occupant && !m.status.is_terminal());
            if unfinished {
                return Err(ValidationError::CourtBusy {
                    court_id: court_id.to_string(),
                    match_id: occupant.clone(),
                }
                .into());
            }
        }
        let patch = CourtPatch {
            expected_version: court.version,
            status: CourtStatus::Available,
            current_match_id: None,
        };
        let released = self.repo.update_court(tournament_id, court_id, patch).await?;
        info!("Court {} released in {tournament_id}", released.name);
        Ok(released)
    }

    /// Starts queued matches on whatever courts are free, earliest kickoff first.
    pub async fn promote_queued(&self, tournament_id: &str) -> Result<ScheduleOutcome, SchedulerError> {
        let lock = self.tournament_lock(tournament_id).await;
        let _guard = lock.lock().await;

        let matches = self.repo.list_matches(tournament_id).await?;
        let courts = unclaimed_courts(self.repo.list_courts(tournament_id).await?, &matches);
        let mut queue: Vec<Match> = matches
            .into_iter()
            .filter(|m| m.status == MatchStatus::Scheduled && m.court_id.is_none())
            .collect();
        queue.sort_by_key(|m| (m.scheduled_at.is_none(), m.scheduled_at));
        let mut queue = queue.into_iter().peekable();

        let mut matches = Vec::new();
        let mut events = Vec::new();
        for court in courts.iter().filter(|c| c.is_available()) {
            let Some(next) = queue.peek() else {
                break;
            };
            let claim = CourtPatch::occupy(court.version, &next.id);
            match self.repo.update_court(tournament_id, &court.id, claim).await {
                Ok(_) => {}
                Err(RepositoryError::VersionConflict { .. }) => {
                    warn!("Court {} was taken while promoting the queue", court.id);
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            let Some(next) = queue.next() else {
                break;
            };
            let patch = MatchPatch {
                status: Some(MatchStatus::InProgress),
                court_id: Some(Some(court.id.clone())),
            };
            let started = self.repo.update_match(tournament_id, &next.id, patch).await?;
            events.push(ScheduleEvent::MatchStarted {
                match_id: started.id.clone(),
                court_id: court.id.clone(),
            });
            matches.push(started);
        }

        let summary = ScheduleSummary {
            scheduled_matches: 0,
            assigned_courts: matches.len(),
            started_matches: matches.len(),
        };
        if !matches.is_empty() {
            info!(
                "Tournament {tournament_id}: promoted {} queued match(es), {} still waiting",
                matches.len(),
                queue.len()
            );
        }
        Ok(ScheduleOutcome {
            matches,
            events,
            summary,
        })
    }
}

/// Drops courts that an unfinished match already points at, started or not.
fn unclaimed_courts(courts: Vec<Court>, matches: &[Match]) -> Vec<Court> {
    let held: HashSet<&str> = matches
        .iter()
        .filter(|m| !m.status.is_terminal())
        .filter_map(|m| m.court_id.as_deref())
        .collect();
    courts
        .into_iter()
        .filter(|c| !held.contains(c.id.as_str()))
        .collect()
}

fn validate(pairs: &[CandidatePair], options: &SchedulingOptions) -> Result<(), ValidationError> {
    if pairs.is_empty() {
        return Err(ValidationError::EmptyPairs);
    }
    let duration = i64::from(options.match_duration_minutes);
    if duration == 0 {
        return Err(ValidationError::NonPositiveDuration(0));
    }
    if duration > MAX_MATCH_DURATION_MINUTES {
        return Err(ValidationError::DurationOutOfRange(duration));
    }
    let mut used = HashSet::new();
    for pair in pairs {
        if pair.is_self_pair() {
            return Err(ValidationError::SelfPairing {
                team_id: pair.team1.id.clone(),
            });
        }
        for team in [&pair.team1, &pair.team2] {
            if !used.insert(team.id.as_str()) {
                return Err(ValidationError::DuplicateTeam {
                    team_id: team.id.clone(),
                });
            }
        }
    }
    Ok(())
}
