use std::collections::HashSet;

use court_types::{CandidatePair, DivisionTag, Match, Team};
use tracing::debug;

pub struct PairingEngine;

impl PairingEngine {
    /// Proposes team-vs-team pairs for one division.
    ///
    /// Teams without a live (non-terminal) match in the division are paired
    /// first. When any of them carries a seed, the bucket is ordered by seed
    /// and folded over so the strongest unpaired team meets the weakest. An
    /// odd team out is matched against the first team that already has a
    /// fixture, and the remaining busy teams pair up among themselves.
    ///
    /// Every team is used at most once. Fewer than two eligible teams yields
    /// an empty list.
    pub fn generate_pairs(
        teams: &[Team],
        existing_matches: &[Match],
        division: &DivisionTag,
    ) -> Vec<CandidatePair> {
        let busy: HashSet<&str> = existing_matches
            .iter()
            .filter(|m| !m.status.is_terminal() && &m.division == division)
            .flat_map(|m| [m.team1_id.as_str(), m.team2_id.as_str()])
            .collect();

        let mut seen = HashSet::new();
        let mut unscheduled: Vec<&Team> = Vec::new();
        let mut scheduled: Vec<&Team> = Vec::new();

        for team in teams.iter().filter(|t| t.is_eligible_for(division)) {
            // Roster snapshots occasionally carry the same team twice
            if !seen.insert(team.id.as_str()) {
                continue;
            }
            if busy.contains(team.id.as_str()) {
                scheduled.push(team);
            } else {
                unscheduled.push(team);
            }
        }

        if unscheduled.len() + scheduled.len() < 2 {
            return Vec::new();
        }

        let ranked = unscheduled.iter().any(|t| t.initial_ranking.is_some());
        let (mut pairs, leftover) = if ranked {
            // Stable: unranked teams sink to the end, ties keep roster order
            unscheduled.sort_by_key(|t| (t.initial_ranking.is_none(), t.initial_ranking));
            fold_over(&unscheduled)
        } else {
            consecutive(&unscheduled)
        };

        let mut rest: &[&Team] = &scheduled;
        if let Some(odd) = leftover {
            match scheduled.split_first() {
                Some((partner, tail)) => {
                    pairs.push(CandidatePair::new(odd.clone(), (*partner).clone()));
                    rest = tail;
                }
                None => debug!("{} left unpaired in {division}: no partner available", odd.name),
            }
        }

        let (busy_pairs, straggler) = consecutive(rest);
        pairs.extend(busy_pairs);
        if let Some(team) = straggler {
            debug!("{} left unpaired in {division}: odd scheduled bucket", team.name);
        }

        debug!(
            "Generated {} pairs for {division} ({} unscheduled, {} already scheduled)",
            pairs.len(),
            unscheduled.len(),
            scheduled.len()
        );
        pairs
    }
}

/// (0,1), (2,3), ... with the trailing odd team returned separately.
fn consecutive<'a>(teams: &[&'a Team]) -> (Vec<CandidatePair>, Option<&'a Team>) {
    let mut chunks = teams.chunks_exact(2);
    let pairs = chunks
        .by_ref()
        .map(|c| CandidatePair::new(c[0].clone(), c[1].clone()))
        .collect();
    let leftover = chunks.remainder().first().copied();
    (pairs, leftover)
}

/// (0,n-1), (1,n-2), ... with the middle team returned separately on odd n.
fn fold_over<'a>(teams: &[&'a Team]) -> (Vec<CandidatePair>, Option<&'a Team>) {
    let n = teams.len();
    let pairs = (0..n / 2)
        .map(|i| CandidatePair::new(teams[i].clone(), teams[n - 1 - i].clone()))
        .collect();
    let leftover = if n % 2 == 1 { Some(teams[n / 2]) } else { None };
    (pairs, leftover)
}
