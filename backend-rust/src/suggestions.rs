use std::sync::Arc;

use court_types::{CandidatePair, DivisionTag};
use tracing::debug;

use crate::error::RepositoryError;
use crate::pairing_engine::PairingEngine;
use crate::repository::TournamentRepository;

/// Re-pairs on demand from the latest roster and fixtures. Read-only.
pub struct SuggestionService<R> {
    repo: Arc<R>,
}

impl<R: TournamentRepository> SuggestionService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn refresh_suggestions(
        &self,
        tournament_id: &str,
        division: &DivisionTag,
    ) -> Result<Vec<CandidatePair>, RepositoryError> {
        let teams = self.repo.list_teams(tournament_id).await?;
        let matches = self.repo.list_matches(tournament_id).await?;
        let pairs = PairingEngine::generate_pairs(&teams, &matches, division);
        debug!(
            "Refreshed suggestions for {tournament_id}/{division}: {} pair(s) from {} team(s)",
            pairs.len(),
            teams.len()
        );
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::scheduler::Scheduler;
    use chrono::{NaiveDate, NaiveTime};
    use court_types::{SchedulingOptions, Team};
    use pretty_assertions::assert_eq;

    fn team(id: &str) -> Team {
        Team {
            id: id.to_string(),
            name: id.to_uppercase(),
            players: vec![],
            initial_ranking: None,
            division: None,
        }
    }

    async fn seeded_store(ids: &[&str]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for id in ids {
            store.upsert_team("t1", team(id)).await.unwrap();
        }
        store
    }

    fn ids(pairs: &[CandidatePair]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|p| (p.team1.id.clone(), p.team2.id.clone()))
            .collect()
    }

    #[tokio::test]
    async fn refresh_is_stable_without_intervening_runs() {
        let store = seeded_store(&["a", "b", "c", "d", "e"]).await;
        let service = SuggestionService::new(store);
        let division = DivisionTag::from("INITIAL");

        let first = service.refresh_suggestions("t1", &division).await.unwrap();
        let second = service.refresh_suggestions("t1", &division).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            ids(&first),
            vec![("a".into(), "b".into()), ("c".into(), "d".into())]
        );
    }

    #[tokio::test]
    async fn scheduled_teams_drop_to_the_second_bucket() {
        let store = seeded_store(&["a", "b", "c", "d", "e"]).await;
        let service = SuggestionService::new(store.clone());
        let scheduler = Scheduler::new(store.clone());
        let division = DivisionTag::from("INITIAL");

        let first = service.refresh_suggestions("t1", &division).await.unwrap();
        let options = SchedulingOptions {
            base_date: NaiveDate::from_ymd_opt(2026, 6, 13).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            match_duration_minutes: 20,
            division: division.clone(),
            round: "INITIAL".into(),
            assign_courts: false,
            auto_start_matches: false,
        };
        scheduler
            .schedule_matches("t1", &first[..1], &options)
            .await
            .unwrap();

        // a and b now have a live fixture; e is the only fresh team left over
        let next = service.refresh_suggestions("t1", &division).await.unwrap();
        assert_eq!(
            ids(&next),
            vec![("c".into(), "d".into()), ("e".into(), "a".into())]
        );
    }

    #[tokio::test]
    async fn unknown_tournament_yields_no_suggestions() {
        let service = SuggestionService::new(Arc::new(MemoryStore::new()));
        let pairs = service
            .refresh_suggestions("nowhere", &"INITIAL".into())
            .await
            .unwrap();
        assert!(pairs.is_empty());
    }
}
