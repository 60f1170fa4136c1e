//! # events
//!
//! Facts produced by a scheduling run. The scheduler only returns them;
//! notification fan-out happens afterwards through [`EventDispatcher`]s so a
//! failed broadcast never touches persisted matches and can be retried alone.

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use court_types::Match;
use serde::{Deserialize, Serialize};
use socketioxide::SocketIo;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum ScheduleEvent {
    MatchCreated {
        #[serde(rename = "match")]
        fixture: Match,
    },
    MatchStarted {
        match_id: String,
        court_id: String,
    },
    /// Another writer occupied the court first; the match stays queued.
    CourtConflict {
        match_id: String,
        court_id: String,
    },
}

impl ScheduleEvent {
    pub fn match_id(&self) -> &str {
        match self {
            ScheduleEvent::MatchCreated { fixture } => &fixture.id,
            ScheduleEvent::MatchStarted { match_id, .. }
            | ScheduleEvent::CourtConflict { match_id, .. } => match_id,
        }
    }

    /// Participant-facing message for this event.
    pub fn notification_text(&self) -> String {
        match self {
            ScheduleEvent::MatchCreated { fixture } => {
                let when = fixture
                    .scheduled_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "a time to be announced".to_string());
                match &fixture.court_id {
                    Some(court) => format!("Your {} match is scheduled for {when} on court {court}.", fixture.round),
                    None => format!(
                        "Your {} match is scheduled for {when}. A court will be assigned when one frees up.",
                        fixture.round
                    ),
                }
            }
            ScheduleEvent::MatchStarted { court_id, .. } => {
                format!("Your match is starting now on court {court_id}.")
            }
            ScheduleEvent::CourtConflict { .. } => {
                "Your court was taken by another match. You will be reassigned shortly.".to_string()
            }
        }
    }
}

#[async_trait]
pub trait EventDispatcher: Send + Sync {
    async fn dispatch(&self, tournament_id: &str, events: &[ScheduleEvent]) -> anyhow::Result<()>;
}

/// Socket.IO room name for a tournament.
pub fn tournament_room(tournament_id: &str) -> String {
    format!("tournament:{tournament_id}")
}

/// Broadcasts every event to the tournament's room.
pub struct SocketDispatcher {
    io: SocketIo,
}

impl SocketDispatcher {
    pub fn new(io: SocketIo) -> Self {
        Self { io }
    }
}

#[async_trait]
impl EventDispatcher for SocketDispatcher {
    async fn dispatch(&self, tournament_id: &str, events: &[ScheduleEvent]) -> anyhow::Result<()> {
        let room = tournament_room(tournament_id);
        for event in events {
            self.io
                .to(room.clone())
                .emit("schedule-event", event)
                .map_err(|e| anyhow!("broadcast of {} failed: {e}", event.match_id()))?;
        }
        debug!("Broadcast {} event(s) to {room}", events.len());
        Ok(())
    }
}

/// Runs every dispatcher. Failures are logged, never propagated.
pub async fn dispatch_all(
    dispatchers: &[Arc<dyn EventDispatcher>],
    tournament_id: &str,
    events: &[ScheduleEvent],
) {
    if events.is_empty() {
        return;
    }
    for dispatcher in dispatchers {
        if let Err(e) = dispatcher.dispatch(tournament_id, events).await {
            warn!("Event dispatch for tournament {tournament_id} failed: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use court_types::MatchStatus;
    use pretty_assertions::assert_eq;
    use tokio::sync::Mutex;

    fn fixture(court: Option<&str>) -> Match {
        Match {
            id: "m1".into(),
            tournament_id: "t1".into(),
            team1_id: "a".into(),
            team2_id: "b".into(),
            division: "INITIAL".into(),
            round: "Quarter-final".into(),
            status: MatchStatus::Scheduled,
            scheduled_at: NaiveDate::from_ymd_opt(2026, 6, 13)
                .unwrap()
                .and_hms_opt(9, 5, 0),
            court_id: court.map(String::from),
            scores: vec![],
            created_at: Utc::now(),
        }
    }

    struct Recorder(Mutex<Vec<String>>);

    #[async_trait]
    impl EventDispatcher for Recorder {
        async fn dispatch(&self, tournament_id: &str, events: &[ScheduleEvent]) -> anyhow::Result<()> {
            let mut seen = self.0.lock().await;
            seen.extend(events.iter().map(|e| format!("{tournament_id}/{}", e.match_id())));
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl EventDispatcher for Failing {
        async fn dispatch(&self, _: &str, _: &[ScheduleEvent]) -> anyhow::Result<()> {
            Err(anyhow!("notification backend down"))
        }
    }

    #[test]
    fn created_event_mentions_court_and_time() {
        let text = ScheduleEvent::MatchCreated { fixture: fixture(Some("c2")) }.notification_text();
        assert_eq!(
            text,
            "Your Quarter-final match is scheduled for 2026-06-13 09:05 on court c2."
        );
        let queued = ScheduleEvent::MatchCreated { fixture: fixture(None) }.notification_text();
        assert!(queued.contains("A court will be assigned"));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(ScheduleEvent::MatchStarted {
            match_id: "m1".into(),
            court_id: "c1".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "MATCH_STARTED");
        assert_eq!(json["matchId"], "m1");
        assert_eq!(json["courtId"], "c1");
    }

    #[tokio::test]
    async fn a_failing_dispatcher_does_not_stop_the_others() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let dispatchers: Vec<Arc<dyn EventDispatcher>> = vec![Arc::new(Failing), recorder.clone()];
        let events = vec![ScheduleEvent::MatchCreated { fixture: fixture(None) }];

        dispatch_all(&dispatchers, "t1", &events).await;
        assert_eq!(*recorder.0.lock().await, vec!["t1/m1".to_string()]);
    }
}
