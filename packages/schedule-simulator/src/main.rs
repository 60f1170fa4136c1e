//! main.rs — CourtMaster schedule simulator entry point
//!
//! Builds a synthetic tournament in an in-memory store and plays it forward
//! round by round:
//!   1. Ask the suggestion service for the next pairs
//!   2. Schedule them (courts, kickoffs, optional auto-start)
//!   3. Finish a random share of the running matches
//!   4. Release their courts and promote queued matches onto them
//!
//! Every scheduling event is printed as the player notification it would
//! become, and optionally chained into a hash-linked audit log.

mod scenarios;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::{info, warn};

use court_types::{
    Court, CourtStatus, DivisionTag, Match, MatchStatus, Player, SchedulingOptions, Team,
};
use courtmaster_backend::audit::AuditLogger;
use courtmaster_backend::config::parse_time;
use courtmaster_backend::events::{dispatch_all, EventDispatcher, ScheduleEvent};
use courtmaster_backend::persistence::MemoryStore;
use courtmaster_backend::repository::{CourtPatch, MatchPatch, TournamentRepository};
use courtmaster_backend::scheduler::Scheduler;
use courtmaster_backend::suggestions::SuggestionService;

use scenarios::{ScenarioConfig, ScenarioType};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "court-sim", about = "CourtMaster tournament-day simulator")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    /// Scenario preset applied on top of the config
    #[arg(long, value_enum, default_value = "balanced")]
    preset: ScenarioType,
    /// RNG seed (overrides [simulation].seed)
    #[arg(long)]
    seed: Option<u64>,
    /// Number of rounds (overrides [simulation].rounds)
    #[arg(long)]
    rounds: Option<u32>,
    /// Persist the store to this JSON snapshot
    #[arg(long)]
    state_file: Option<PathBuf>,
    /// Chain every event into this JSONL audit log
    #[arg(long)]
    audit_log: Option<PathBuf>,
}

// ── Config structs ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FullConfig {
    tournament: TournamentConfig,
    roster: RosterConfig,
    courts: CourtsConfig,
    simulation: SimulationConfig,
}

#[derive(Debug, Deserialize)]
struct TournamentConfig {
    id: String,
    division: String,
    round: String,
    date: NaiveDate,
    start_time: String,
    match_duration_minutes: u32,
}

#[derive(Debug, Deserialize)]
struct RosterConfig {
    teams: u32,
    seeded: u32,
    players_per_team: u32,
}

#[derive(Debug, Deserialize)]
struct CourtsConfig {
    available: u32,
    in_use: u32,
    maintenance: u32,
}

#[derive(Debug, Deserialize)]
struct SimulationConfig {
    rounds: u32,
    seed: u64,
    assign_courts: bool,
    auto_start: bool,
    completion_rate: f64,
}

// ── Notifications ─────────────────────────────────────────────────────────────

/// Prints what each player would receive.
struct ConsoleDispatcher;

#[async_trait]
impl EventDispatcher for ConsoleDispatcher {
    async fn dispatch(&self, tournament_id: &str, events: &[ScheduleEvent]) -> anyhow::Result<()> {
        for event in events {
            info!("📣 [{tournament_id}] {}", event.notification_text());
        }
        Ok(())
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "court_sim=info,courtmaster_backend=info".into()),
        )
        .init();

    let args = Args::parse();

    // Load config
    let config_str = std::fs::read_to_string(&args.config)
        .unwrap_or_else(|_| include_str!("../config.toml").to_string());
    let cfg: FullConfig = toml::from_str(&config_str).context("invalid config.toml")?;

    let scenario = ScenarioConfig::for_type(args.preset, cfg.courts.available);
    let seed = args.seed.unwrap_or(cfg.simulation.seed);
    let rounds = args.rounds.unwrap_or(cfg.simulation.rounds);
    let mut rng = StdRng::seed_from_u64(seed);

    info!(
        "🎾 Court simulator starting: {:?}, {} teams, {} courts, {rounds} round(s), seed {seed}",
        scenario.kind,
        scenario.roster_size(cfg.roster.teams),
        scenario.court_pool(cfg.courts.available),
    );

    let store = Arc::new(match &args.state_file {
        Some(path) => MemoryStore::open(path).await,
        None => MemoryStore::new(),
    });
    seed_tournament(&store, &cfg, &scenario, &mut rng).await?;

    let mut dispatchers: Vec<Arc<dyn EventDispatcher>> = vec![Arc::new(ConsoleDispatcher)];
    if let Some(path) = &args.audit_log {
        let audit = AuditLogger::open(path)
            .await
            .with_context(|| format!("opening audit log {}", path.display()))?;
        dispatchers.push(Arc::new(audit));
    }

    let scheduler = Scheduler::new(store.clone());
    let suggestions = SuggestionService::new(store.clone());
    let tid = cfg.tournament.id.as_str();
    let division = DivisionTag::new(cfg.tournament.division.clone());
    let start_time = parse_time(&cfg.tournament.start_time)?;

    for round in 1..=rounds {
        let round_label = if round == 1 {
            cfg.tournament.round.clone()
        } else {
            format!("R{round}")
        };
        // Each round opens one slot after the previous one
        let offset = Duration::minutes(i64::from(cfg.tournament.match_duration_minutes) * i64::from(round - 1));
        let options = SchedulingOptions {
            base_date: cfg.tournament.date,
            start_time: start_time + offset,
            match_duration_minutes: cfg.tournament.match_duration_minutes,
            division: division.clone(),
            round: round_label.clone(),
            assign_courts: cfg.simulation.assign_courts,
            auto_start_matches: cfg.simulation.auto_start,
        };

        let pairs = suggestions.refresh_suggestions(tid, &division).await?;
        if pairs.is_empty() {
            info!("⏹ Round {round}: every team is busy or eliminated, stopping");
            break;
        }

        let outcome = scheduler.schedule_matches(tid, &pairs, &options).await?;
        dispatch_all(&dispatchers, tid, &outcome.events).await;
        info!(
            "🗓 Round {round_label}: {} scheduled, {} on court, {} started",
            outcome.summary.scheduled_matches,
            outcome.summary.assigned_courts,
            outcome.summary.started_matches,
        );
        log_matches(&store, tid, &outcome.matches).await;

        if scenario.pulls_courts_after(round) {
            pull_for_maintenance(store.as_ref(), tid, scenario.maintenance_courts).await?;
        }

        // Matches finish, courts turn over
        let finished = finish_matches(store.as_ref(), tid, cfg.simulation.completion_rate, &mut rng).await?;
        for court_id in &finished {
            scheduler.release_court(tid, court_id).await?;
        }
        let promoted = scheduler.promote_queued(tid).await?;
        dispatch_all(&dispatchers, tid, &promoted.events).await;
        info!(
            "🔁 Round {round_label}: {} finished, {} promoted from the queue",
            finished.len(),
            promoted.summary.started_matches
        );
    }

    report(&store, tid).await;
    Ok(())
}

// ── Tournament setup ──────────────────────────────────────────────────────────

async fn seed_tournament(
    store: &MemoryStore,
    cfg: &FullConfig,
    scenario: &ScenarioConfig,
    rng: &mut StdRng,
) -> anyhow::Result<()> {
    let tid = cfg.tournament.id.as_str();
    let n_teams = scenario.roster_size(cfg.roster.teams);

    // Seeds are spread over random teams, the rest stay unranked
    let mut ranks: Vec<Option<i32>> = (0..n_teams)
        .map(|i| (i < cfg.roster.seeded).then(|| i as i32 + 1))
        .collect();
    ranks.shuffle(rng);

    for (i, initial_ranking) in ranks.into_iter().enumerate() {
        let id = format!("team-{:02}", i + 1);
        let players = (1..=cfg.roster.players_per_team)
            .map(|p| Player {
                id: format!("{id}-p{p}"),
                name: format!("Player {}.{p}", i + 1),
            })
            .collect();
        let team = Team {
            name: format!("Team {}", i + 1),
            id,
            players,
            initial_ranking,
            division: Some(DivisionTag::new(cfg.tournament.division.clone())),
        };
        store.upsert_team(tid, team).await?;
    }

    let pool = [
        (scenario.court_pool(cfg.courts.available), CourtStatus::Available),
        (cfg.courts.in_use, CourtStatus::InUse),
        (cfg.courts.maintenance, CourtStatus::Maintenance),
    ];
    let mut n = 0;
    for (count, status) in pool {
        for _ in 0..count {
            n += 1;
            store
                .upsert_court(Court {
                    id: format!("court-{n}"),
                    tournament_id: tid.to_string(),
                    name: format!("Court {n}"),
                    status,
                    current_match_id: None,
                    version: 0,
                })
                .await?;
        }
    }
    Ok(())
}

// ── Round helpers ─────────────────────────────────────────────────────────────

/// Completes a random share of running matches. Returns the courts they held.
async fn finish_matches(
    repo: &impl TournamentRepository,
    tid: &str,
    completion_rate: f64,
    rng: &mut StdRng,
) -> anyhow::Result<Vec<String>> {
    let rate = completion_rate.clamp(0.0, 1.0);
    let mut freed = Vec::new();
    for m in repo.list_matches(tid).await? {
        if m.status != MatchStatus::InProgress || !rng.gen_bool(rate) {
            continue;
        }
        let patch = MatchPatch {
            status: Some(MatchStatus::Completed),
            court_id: None,
        };
        repo.update_match(tid, &m.id, patch).await?;
        if let Some(court_id) = m.court_id {
            freed.push(court_id);
        }
    }
    Ok(freed)
}

async fn pull_for_maintenance(
    repo: &impl TournamentRepository,
    tid: &str,
    count: u32,
) -> anyhow::Result<()> {
    let free: Vec<Court> = repo
        .list_courts(tid)
        .await?
        .into_iter()
        .filter(Court::is_available)
        .take(count as usize)
        .collect();
    if free.is_empty() {
        warn!("🔧 No free court to pull for maintenance");
    }
    for court in free {
        let patch = CourtPatch {
            expected_version: court.version,
            status: CourtStatus::Maintenance,
            current_match_id: None,
        };
        repo.update_court(tid, &court.id, patch).await?;
        info!("🔧 {} pulled for maintenance", court.name);
    }
    Ok(())
}

async fn log_matches(store: &MemoryStore, tid: &str, matches: &[Match]) {
    let snapshot = store.snapshot(tid).await;
    let name = |id: &str| snapshot.team(id).map_or_else(|| id.to_string(), |t| t.name.clone());
    for m in matches {
        let kickoff = m
            .scheduled_at
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_default();
        info!(
            "   {kickoff} {} vs {} on {} [{:?}]",
            name(&m.team1_id),
            name(&m.team2_id),
            m.court_id.as_deref().unwrap_or("queue"),
            m.status,
        );
    }
}

async fn report(store: &MemoryStore, tid: &str) {
    let snapshot = store.snapshot(tid).await;
    let count = |s: MatchStatus| snapshot.matches.iter().filter(|m| m.status == s).count();
    info!(
        "🏁 {} matches: {} completed, {} in progress, {} waiting",
        snapshot.matches.len(),
        count(MatchStatus::Completed),
        count(MatchStatus::InProgress),
        count(MatchStatus::Scheduled),
    );
    for court in &snapshot.courts {
        info!(
            "   {} {:?} {}",
            court.name,
            court.status,
            court.current_match_id.as_deref().unwrap_or("-")
        );
    }
}
