use std::collections::BTreeMap;

use court_types::{Court, Match, Team};
use serde::{Deserialize, Serialize};

// ─── Per-Tournament Snapshot ─────────────────────────────────────────────────

/// Everything the scheduler reads for one tournament. Vectors keep
/// registration order, which the pairing engine relies on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TournamentState {
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub courts: Vec<Court>,
    #[serde(default)]
    pub matches: Vec<Match>,
}

impl TournamentState {
    /// Replaces a team with the same id in place, otherwise appends.
    pub fn upsert_team(&mut self, team: Team) {
        match self.teams.iter_mut().find(|t| t.id == team.id) {
            Some(slot) => *slot = team,
            None => self.teams.push(team),
        }
    }

    pub fn upsert_court(&mut self, court: Court) {
        match self.courts.iter_mut().find(|c| c.id == court.id) {
            Some(slot) => *slot = court,
            None => self.courts.push(court),
        }
    }

    pub fn team(&self, team_id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == team_id)
    }
}

// ─── Whole Store ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    #[serde(default)]
    pub tournaments: BTreeMap<String, TournamentState>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use court_types::CourtStatus;
    use pretty_assertions::assert_eq;

    fn team(id: &str, name: &str) -> Team {
        Team {
            id: id.into(),
            name: name.into(),
            players: vec![],
            initial_ranking: None,
            division: None,
        }
    }

    #[test]
    fn upsert_team_keeps_registration_order() {
        let mut state = TournamentState::default();
        state.upsert_team(team("a", "Aces"));
        state.upsert_team(team("b", "Blockers"));
        state.upsert_team(team("a", "Aces Renamed"));

        let names: Vec<&str> = state.teams.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Aces Renamed", "Blockers"]);
        assert_eq!(state.team("b").map(|t| t.name.as_str()), Some("Blockers"));
        assert!(state.team("zz").is_none());
    }

    #[test]
    fn upsert_court_replaces_in_place() {
        let mut state = TournamentState::default();
        let mut court = Court {
            id: "c1".into(),
            tournament_id: "t".into(),
            name: "One".into(),
            status: CourtStatus::Available,
            current_match_id: None,
            version: 0,
        };
        state.upsert_court(court.clone());
        court.status = CourtStatus::Maintenance;
        state.upsert_court(court);
        assert_eq!(state.courts.len(), 1);
        assert_eq!(state.courts[0].status, CourtStatus::Maintenance);
    }
}
