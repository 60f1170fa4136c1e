use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Local;
use court_types::{CandidatePair, Court, DivisionTag, Team};
use serde::Deserialize;
use serde_json::{json, Value};
use socketioxide::extract::{Data, SocketRef};
use tracing::{info, warn};

use crate::config::{ScheduleDefaults, ScheduleRequest};
use crate::error::{SchedulerError, ValidationError};
use crate::events::{dispatch_all, tournament_room, EventDispatcher};
use crate::persistence::MemoryStore;
use crate::scheduler::{ScheduleSummary, Scheduler};
use crate::state::TournamentState;
use crate::suggestions::SuggestionService;

// ─── Shared State Types ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub scheduler: Arc<Scheduler<MemoryStore>>,
    pub suggestions: Arc<SuggestionService<MemoryStore>>,
    pub dispatchers: Arc<Vec<Arc<dyn EventDispatcher>>>,
    pub defaults: Arc<ScheduleDefaults>,
}

impl AppState {
    pub fn new(
        store: Arc<MemoryStore>,
        dispatchers: Vec<Arc<dyn EventDispatcher>>,
        defaults: ScheduleDefaults,
    ) -> Self {
        Self {
            scheduler: Arc::new(Scheduler::new(store.clone())),
            suggestions: Arc::new(SuggestionService::new(store.clone())),
            store,
            dispatchers: Arc::new(dispatchers),
            defaults: Arc::new(defaults),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "courtmaster ok" }))
        .route("/tournaments/:id/state", get(tournament_state))
        .route("/tournaments/:id/teams", post(register_team))
        .route("/tournaments/:id/courts", post(register_court))
        .route("/tournaments/:id/suggestions", get(suggestions))
        .route("/tournaments/:id/schedule", post(schedule))
        .route("/tournaments/:id/courts/:court_id/release", post(release_court))
        .with_state(state)
}

// ─── REST Handlers ────────────────────────────────────────────────────────────

async fn tournament_state(
    State(app): State<AppState>,
    Path(tournament_id): Path<String>,
) -> Json<TournamentState> {
    Json(app.store.snapshot(&tournament_id).await)
}

async fn register_team(
    State(app): State<AppState>,
    Path(tournament_id): Path<String>,
    Json(team): Json<Team>,
) -> Result<StatusCode, SchedulerError> {
    info!("Registering team {} ({}) in {tournament_id}", team.name, team.id);
    app.store.upsert_team(&tournament_id, team).await?;
    Ok(StatusCode::CREATED)
}

async fn register_court(
    State(app): State<AppState>,
    Path(tournament_id): Path<String>,
    Json(mut court): Json<Court>,
) -> Result<StatusCode, SchedulerError> {
    court.tournament_id = tournament_id;
    info!("Registering court {} in {}", court.name, court.tournament_id);
    app.store.upsert_court(court).await?;
    Ok(StatusCode::CREATED)
}

#[derive(Debug, Deserialize)]
struct SuggestionQuery {
    division: Option<String>,
}

async fn suggestions(
    State(app): State<AppState>,
    Path(tournament_id): Path<String>,
    Query(query): Query<SuggestionQuery>,
) -> Result<Json<Vec<CandidatePair>>, SchedulerError> {
    let division = query
        .division
        .map(DivisionTag::from)
        .unwrap_or_else(|| DivisionTag::new(app.defaults.division.clone()));
    let pairs = app
        .suggestions
        .refresh_suggestions(&tournament_id, &division)
        .await?;
    Ok(Json(pairs))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairRef {
    pub team1_id: String,
    pub team2_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleBody {
    /// Omitted: schedule the current suggestions
    pub pairs: Option<Vec<PairRef>>,
    #[serde(default)]
    pub options: ScheduleRequest,
}

async fn schedule(
    State(app): State<AppState>,
    Path(tournament_id): Path<String>,
    Json(body): Json<ScheduleBody>,
) -> Result<Json<ScheduleSummary>, SchedulerError> {
    let options = body
        .options
        .resolve(&app.defaults, Local::now().date_naive())?;

    let pairs = match body.pairs {
        Some(refs) => {
            let snapshot = app.store.snapshot(&tournament_id).await;
            resolve_pairs(&snapshot, &refs)?
        }
        None => {
            app.suggestions
                .refresh_suggestions(&tournament_id, &options.division)
                .await?
        }
    };

    let outcome = app
        .scheduler
        .schedule_matches(&tournament_id, &pairs, &options)
        .await?;
    dispatch_all(&app.dispatchers, &tournament_id, &outcome.events).await;

    Ok(Json(outcome.summary))
}

/// Frees a court and immediately hands free courts to queued matches.
async fn release_court(
    State(app): State<AppState>,
    Path((tournament_id, court_id)): Path<(String, String)>,
) -> Result<Json<ScheduleSummary>, SchedulerError> {
    app.scheduler.release_court(&tournament_id, &court_id).await?;
    let outcome = app.scheduler.promote_queued(&tournament_id).await?;
    dispatch_all(&app.dispatchers, &tournament_id, &outcome.events).await;
    Ok(Json(outcome.summary))
}

fn resolve_pairs(
    snapshot: &TournamentState,
    refs: &[PairRef],
) -> Result<Vec<CandidatePair>, ValidationError> {
    let lookup = |id: &str| {
        snapshot
            .team(id)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownTeam {
                team_id: id.to_string(),
            })
    };
    refs.iter()
        .map(|r| -> Result<CandidatePair, ValidationError> {
            Ok(CandidatePair::new(lookup(&r.team1_id)?, lookup(&r.team2_id)?))
        })
        .collect()
}

// ─── Socket.IO ────────────────────────────────────────────────────────────────

pub async fn on_connect(socket: SocketRef) {
    let socket_id = socket.id.to_string();
    info!("Client connected: {socket_id}");

    socket.on_disconnect(|s: SocketRef| async move {
        info!("Client disconnected: {}", s.id);
    });

    // ── join-tournament ───────────────────────────────────────────────────────
    socket.on("join-tournament", |s: SocketRef, Data::<Value>(data)| async move {
        match data.as_str().filter(|id| !id.is_empty()) {
            Some(tournament_id) => {
                let room = tournament_room(tournament_id);
                let _ = s.join(room.clone());
                info!("Client {} joined {room}", s.id);
                let _ = s.emit("joined", &json!({ "room": room }));
            }
            None => warn!("Client {}: join-tournament without a tournament id", s.id),
        }
    });

    // ── leave-tournament ──────────────────────────────────────────────────────
    socket.on("leave-tournament", |s: SocketRef, Data::<Value>(data)| async move {
        if let Some(tournament_id) = data.as_str() {
            let _ = s.leave(tournament_room(tournament_id));
        }
    });
}
