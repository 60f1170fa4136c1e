use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use court_types::{CandidatePair, Court, Match, MatchStatus, SchedulingOptions};
use tracing::debug;
use uuid::Uuid;

/// Fixed gap between consecutive kickoffs so no two matches tie.
pub const STAGGER_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
pub struct Allocation {
    pub scheduled_matches: Vec<Match>,
    pub assigned_court_count: usize,
}

pub struct CourtAllocator;

impl CourtAllocator {
    /// Gives every pair a kickoff time and, while free courts last, a court.
    ///
    /// The first `C` pairs (C = available courts) start `i * 5` minutes after
    /// the base time on court `i`. Overflow pairs get no court and are grouped
    /// into waves one match-duration long: `floor(i / max(C, 1)) * duration
    /// + i * 5`. With `assign_courts` off every pair takes the overflow path.
    pub fn allocate(
        tournament_id: &str,
        pairs: &[CandidatePair],
        courts: &[Court],
        options: &SchedulingOptions,
        now: DateTime<Utc>,
    ) -> Allocation {
        let free_courts: Vec<&Court> = if options.assign_courts {
            courts.iter().filter(|c| c.is_available()).collect()
        } else {
            Vec::new()
        };
        let capacity = free_courts.len();
        let base = options.base_datetime();
        let duration = i64::from(options.match_duration_minutes);

        let mut assigned_court_count = 0;
        let scheduled_matches = pairs
            .iter()
            .enumerate()
            .map(|(i, pair)| {
                let (court_id, start) = match free_courts.get(i) {
                    Some(court) => {
                        assigned_court_count += 1;
                        (Some(court.id.clone()), stagger(base, i))
                    }
                    None => {
                        let wave = (i / capacity.max(1)) as i64;
                        (None, stagger(base, i) + Duration::minutes(wave * duration))
                    }
                };
                debug!(
                    "{} vs {} @ {start} on {}",
                    pair.team1.name,
                    pair.team2.name,
                    court_id.as_deref().unwrap_or("(queued)")
                );

                Match {
                    id: Uuid::new_v4().to_string(),
                    tournament_id: tournament_id.to_string(),
                    team1_id: pair.team1.id.clone(),
                    team2_id: pair.team2.id.clone(),
                    division: options.division.clone(),
                    round: options.round.clone(),
                    status: MatchStatus::Scheduled,
                    scheduled_at: Some(start),
                    court_id,
                    scores: Vec::new(),
                    created_at: now,
                }
            })
            .collect();

        Allocation {
            scheduled_matches,
            assigned_court_count,
        }
    }
}

fn stagger(base: NaiveDateTime, index: usize) -> NaiveDateTime {
    base + Duration::minutes(index as i64 * STAGGER_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use court_types::{CourtStatus, Team};
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn team(id: &str) -> Team {
        Team {
            id: id.to_string(),
            name: id.to_uppercase(),
            players: vec![],
            initial_ranking: None,
            division: None,
        }
    }

    fn pairs(n: usize) -> Vec<CandidatePair> {
        (0..n)
            .map(|i| CandidatePair::new(team(&format!("h{i}")), team(&format!("a{i}"))))
            .collect()
    }

    fn court(id: &str, status: CourtStatus) -> Court {
        Court {
            id: id.to_string(),
            tournament_id: "t".into(),
            name: format!("Court {id}"),
            status,
            current_match_id: None,
            version: 0,
        }
    }

    fn options(assign_courts: bool) -> SchedulingOptions {
        SchedulingOptions {
            base_date: NaiveDate::from_ymd_opt(2026, 6, 13).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            match_duration_minutes: 30,
            division: "INITIAL".into(),
            round: "GROUP".into(),
            assign_courts,
            auto_start_matches: false,
        }
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, 13)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn overflow_pair_waits_one_wave() {
        let courts = vec![court("c1", CourtStatus::Available), court("c2", CourtStatus::Available)];
        let out = CourtAllocator::allocate("t", &pairs(3), &courts, &options(true), Utc::now());

        let got: Vec<(Option<String>, Option<NaiveDateTime>)> = out
            .scheduled_matches
            .iter()
            .map(|m| (m.court_id.clone(), m.scheduled_at))
            .collect();
        assert_eq!(
            got,
            vec![
                (Some("c1".into()), Some(at(9, 0))),
                (Some("c2".into()), Some(at(9, 5))),
                (None, Some(at(9, 40))),
            ]
        );
        assert_eq!(out.assigned_court_count, 2);
    }

    #[test]
    fn court_assignment_disabled_queues_everything() {
        let courts = vec![court("c1", CourtStatus::Available), court("c2", CourtStatus::Available)];
        let out = CourtAllocator::allocate("t", &pairs(3), &courts, &options(false), Utc::now());

        assert_eq!(out.assigned_court_count, 0);
        assert!(out.scheduled_matches.iter().all(|m| m.court_id.is_none()));
        let starts: Vec<_> = out.scheduled_matches.iter().map(|m| m.scheduled_at).collect();
        assert_eq!(starts, vec![Some(at(9, 0)), Some(at(9, 35)), Some(at(10, 10))]);
    }

    #[test]
    fn busy_and_maintenance_courts_are_skipped() {
        let courts = vec![
            court("busy", CourtStatus::InUse),
            court("free", CourtStatus::Available),
            court("broken", CourtStatus::Maintenance),
        ];
        let out = CourtAllocator::allocate("t", &pairs(2), &courts, &options(true), Utc::now());
        assert_eq!(out.scheduled_matches[0].court_id.as_deref(), Some("free"));
        assert_eq!(out.scheduled_matches[1].court_id, None);
        assert_eq!(out.assigned_court_count, 1);
    }

    #[test]
    fn no_court_is_shared_and_kickoffs_never_go_backwards() {
        let courts: Vec<Court> = (0..4)
            .map(|i| court(&format!("c{i}"), CourtStatus::Available))
            .collect();
        let out = CourtAllocator::allocate("t", &pairs(11), &courts, &options(true), Utc::now());

        let mut seen = HashSet::new();
        for m in out.scheduled_matches.iter().filter_map(|m| m.court_id.as_ref()) {
            assert!(seen.insert(m.clone()), "court {m} double booked");
        }
        for w in out.scheduled_matches.windows(2) {
            assert!(w[0].scheduled_at <= w[1].scheduled_at);
        }
        assert!(out.scheduled_matches[4..].iter().all(|m| m.court_id.is_none()));
    }

    #[test]
    fn matches_carry_run_metadata() {
        let courts = vec![court("c1", CourtStatus::Available)];
        let now = Utc::now();
        let out = CourtAllocator::allocate("tour-9", &pairs(1), &courts, &options(true), now);
        let m = &out.scheduled_matches[0];
        assert_eq!(m.tournament_id, "tour-9");
        assert_eq!(m.team1_id, "h0");
        assert_eq!(m.team2_id, "a0");
        assert_eq!(m.division.as_str(), "INITIAL");
        assert_eq!(m.round, "GROUP");
        assert_eq!(m.status, MatchStatus::Scheduled);
        assert_eq!(m.created_at, now);
        assert!(m.scores.is_empty());
    }

    #[test]
    fn empty_input_produces_nothing() {
        let out = CourtAllocator::allocate("t", &[], &[], &options(true), Utc::now());
        assert!(out.scheduled_matches.is_empty());
        assert_eq!(out.assigned_court_count, 0);
    }
}
