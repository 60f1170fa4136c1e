use std::path::{Path, PathBuf};

use async_trait::async_trait;
use court_types::{Court, Match, Team};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::RepositoryError;
use crate::repository::{CourtPatch, MatchPatch, TournamentRepository};
use crate::state::{StoreState, TournamentState};

/// Load a persisted snapshot. Returns an empty store if the file is missing or corrupt.
pub async fn load_state(path: &Path) -> StoreState {
    if !path.exists() {
        info!("No {} found, starting with an empty store", path.display());
        return StoreState::default();
    }

    match fs::read_to_string(path).await {
        Ok(data) => match serde_json::from_str::<StoreState>(&data) {
            Ok(state) => {
                info!(
                    "Loaded {} tournament(s) from {}",
                    state.tournaments.len(),
                    path.display()
                );
                state
            }
            Err(e) => {
                warn!("Failed to parse {}: {e}, starting empty", path.display());
                StoreState::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {e}, starting empty", path.display());
            StoreState::default()
        }
    }
}

pub async fn save_state(path: &Path, state: &StoreState) -> Result<(), RepositoryError> {
    let json = serde_json::to_string_pretty(state)?;
    fs::write(path, json).await?;
    Ok(())
}

/// In-process store behind one lock, optionally mirrored to a JSON file
/// after every write.
pub struct MemoryStore {
    state: RwLock<StoreState>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            snapshot_path: None,
        }
    }

    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = load_state(&path).await;
        Self {
            state: RwLock::new(state),
            snapshot_path: Some(path),
        }
    }

    pub async fn snapshot(&self, tournament_id: &str) -> TournamentState {
        let state = self.state.read().await;
        state
            .tournaments
            .get(tournament_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn upsert_team(&self, tournament_id: &str, team: Team) -> Result<(), RepositoryError> {
        self.write(tournament_id, |t| {
            t.upsert_team(team);
            Ok(())
        })
        .await
    }

    pub async fn upsert_court(&self, court: Court) -> Result<(), RepositoryError> {
        let tournament_id = court.tournament_id.clone();
        self.write(&tournament_id, |t| {
            t.upsert_court(court);
            Ok(())
        })
        .await
    }

    /// Runs `f` under the write lock. With a snapshot file the change is
    /// staged on a copy and only becomes visible once the file is written.
    async fn write<T>(
        &self,
        tournament_id: &str,
        f: impl FnOnce(&mut TournamentState) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(path) = &self.snapshot_path else {
            return f(state.tournaments.entry(tournament_id.to_string()).or_default());
        };

        let mut staged = state.clone();
        let out = f(staged.tournaments.entry(tournament_id.to_string()).or_default())?;
        save_state(path, &staged).await?;
        *state = staged;
        Ok(out)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TournamentRepository for MemoryStore {
    async fn list_teams(&self, tournament_id: &str) -> Result<Vec<Team>, RepositoryError> {
        Ok(self.snapshot(tournament_id).await.teams)
    }

    async fn list_courts(&self, tournament_id: &str) -> Result<Vec<Court>, RepositoryError> {
        Ok(self.snapshot(tournament_id).await.courts)
    }

    async fn list_matches(&self, tournament_id: &str) -> Result<Vec<Match>, RepositoryError> {
        Ok(self.snapshot(tournament_id).await.matches)
    }

    async fn create_match(&self, m: Match) -> Result<Match, RepositoryError> {
        let tournament_id = m.tournament_id.clone();
        self.write(&tournament_id, |t| {
            if t.matches.iter().any(|existing| existing.id == m.id) {
                return Err(RepositoryError::Backend(format!("match {} already exists", m.id)));
            }
            t.matches.push(m.clone());
            Ok(m)
        })
        .await
    }

    async fn update_match(
        &self,
        tournament_id: &str,
        match_id: &str,
        patch: MatchPatch,
    ) -> Result<Match, RepositoryError> {
        self.write(tournament_id, |t| {
            let m = t
                .matches
                .iter_mut()
                .find(|m| m.id == match_id)
                .ok_or_else(|| RepositoryError::NotFound {
                    kind: "match",
                    id: match_id.to_string(),
                })?;
            if let Some(status) = patch.status {
                m.status = status;
            }
            if let Some(court_id) = patch.court_id {
                m.court_id = court_id;
            }
            Ok(m.clone())
        })
        .await
    }

    async fn update_court(
        &self,
        tournament_id: &str,
        court_id: &str,
        patch: CourtPatch,
    ) -> Result<Court, RepositoryError> {
        self.write(tournament_id, |t| {
            let court = t
                .courts
                .iter_mut()
                .find(|c| c.id == court_id)
                .ok_or_else(|| RepositoryError::NotFound {
                    kind: "court",
                    id: court_id.to_string(),
                })?;
            if court.version != patch.expected_version {
                return Err(RepositoryError::VersionConflict {
                    court_id: court_id.to_string(),
                    expected: patch.expected_version,
                    found: court.version,
                });
            }
            court.status = patch.status;
            court.current_match_id = patch.current_match_id;
            court.version += 1;
            debug!("Court {} now {:?} (v{})", court.id, court.status, court.version);
            Ok(court.clone())
        })
        .await
    }
}
