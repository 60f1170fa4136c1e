//! # audit
//!
//! SHA-256 chained scheduling log.
//!
//! Every scheduling fact (match created, match started, court conflict) is
//! appended as a block whose hash covers the previous block's hash. Editing
//! any block after the fact breaks the chain, which [`verify_chain`] reports.
//! Disputes over "who was given the court first" are settled from this file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::events::{EventDispatcher, ScheduleEvent};

// ── Audit Event Types ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    MatchCreated,
    MatchStarted,
    CourtConflict,
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_string(self).unwrap_or_default();
        write!(f, "{}", s.trim_matches('"'))
    }
}

impl From<&ScheduleEvent> for AuditEventType {
    fn from(event: &ScheduleEvent) -> Self {
        match event {
            ScheduleEvent::MatchCreated { .. } => Self::MatchCreated,
            ScheduleEvent::MatchStarted { .. } => Self::MatchStarted,
            ScheduleEvent::CourtConflict { .. } => Self::CourtConflict,
        }
    }
}

// ── Audit Block ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditBlock {
    /// Position in the chain, starting at 0
    pub block_seq: u64,
    pub tournament_id: String,
    pub timestamp_ms: i64,
    /// Genesis block: 64 zeros
    pub prev_hash: String,
    pub event_type: AuditEventType,
    pub payload_json: String,
    /// SHA-256 of (prev_hash || timestamp_ms || event_type || payload_json)
    pub block_hash: String,
}

impl AuditBlock {
    fn compute_hash(
        prev_hash: &str,
        timestamp_ms: i64,
        event_type: AuditEventType,
        payload_json: &str,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(prev_hash.as_bytes());
        hasher.update(timestamp_ms.to_le_bytes());
        hasher.update(event_type.to_string().as_bytes());
        hasher.update(payload_json.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn new(
        block_seq: u64,
        tournament_id: String,
        timestamp_ms: i64,
        prev_hash: String,
        event_type: AuditEventType,
        payload_json: String,
    ) -> Self {
        let block_hash = Self::compute_hash(&prev_hash, timestamp_ms, event_type, &payload_json);
        Self {
            block_seq,
            tournament_id,
            timestamp_ms,
            prev_hash,
            event_type,
            payload_json,
            block_hash,
        }
    }

    pub fn verify(&self) -> bool {
        Self::compute_hash(
            &self.prev_hash,
            self.timestamp_ms,
            self.event_type,
            &self.payload_json,
        ) == self.block_hash
    }
}

pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Returns the sequence number of the first broken block, if any.
pub fn verify_chain(blocks: &[AuditBlock]) -> Result<(), u64> {
    let mut prev = GENESIS_HASH;
    for block in blocks {
        if block.prev_hash != prev || !block.verify() {
            return Err(block.block_seq);
        }
        prev = block.block_hash.as_str();
    }
    Ok(())
}

pub async fn read_log(path: &Path) -> anyhow::Result<Vec<AuditBlock>> {
    let data = fs::read_to_string(path).await?;
    data.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str::<AuditBlock>(l).map_err(anyhow::Error::from))
        .collect()
}

// ── Audit Logger ──────────────────────────────────────────────────────────────

struct AuditState {
    block_seq: u64,
    last_hash: String,
}

/// Append-only chained logger writing one JSON line per block.
#[derive(Clone)]
pub struct AuditLogger {
    state: Arc<Mutex<AuditState>>,
    path: PathBuf,
}

impl AuditLogger {
    /// Continues the chain found at `path`, or starts a new one.
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let (block_seq, last_hash) = if path.exists() {
            let blocks = read_log(&path).await?;
            match blocks.last() {
                Some(last) => (last.block_seq + 1, last.block_hash.clone()),
                None => (0, GENESIS_HASH.to_string()),
            }
        } else {
            (0, GENESIS_HASH.to_string())
        };
        info!("Audit chain at {} resumes at block {block_seq}", path.display());
        Ok(Self {
            state: Arc::new(Mutex::new(AuditState { block_seq, last_hash })),
            path,
        })
    }

    /// Append one block. The state lock is held across the write so
    /// concurrent appends cannot interleave out of order on disk.
    pub async fn append(
        &self,
        tournament_id: &str,
        event_type: AuditEventType,
        payload: &impl Serialize,
    ) -> anyhow::Result<AuditBlock> {
        let payload_json = serde_json::to_string(payload)?;
        let timestamp_ms = chrono::Utc::now().timestamp_millis();

        let mut state = self.state.lock().await;
        let block = AuditBlock::new(
            state.block_seq,
            tournament_id.to_string(),
            timestamp_ms,
            state.last_hash.clone(),
            event_type,
            payload_json,
        );

        let line = format!("{}\n", serde_json::to_string(&block)?);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;

        state.last_hash = block.block_hash.clone();
        state.block_seq += 1;
        Ok(block)
    }
}

#[async_trait]
impl EventDispatcher for AuditLogger {
    async fn dispatch(&self, tournament_id: &str, events: &[ScheduleEvent]) -> anyhow::Result<()> {
        for event in events {
            self.append(tournament_id, AuditEventType::from(event), event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn started(id: &str) -> ScheduleEvent {
        ScheduleEvent::MatchStarted {
            match_id: id.into(),
            court_id: "c1".into(),
        }
    }

    #[tokio::test]
    async fn dispatched_events_form_a_valid_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let logger = AuditLogger::open(&path).await.unwrap();

        logger
            .dispatch("t1", &[started("m1"), started("m2")])
            .await
            .unwrap();

        let blocks = read_log(&path).await.unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].prev_hash, GENESIS_HASH);
        assert_eq!(blocks[1].prev_hash, blocks[0].block_hash);
        assert_eq!(blocks[1].event_type, AuditEventType::MatchStarted);
        assert_eq!(verify_chain(&blocks), Ok(()));
    }

    #[tokio::test]
    async fn reopening_continues_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        AuditLogger::open(&path)
            .await
            .unwrap()
            .dispatch("t1", &[started("m1")])
            .await
            .unwrap();
        AuditLogger::open(&path)
            .await
            .unwrap()
            .dispatch("t1", &[started("m2")])
            .await
            .unwrap();

        let blocks = read_log(&path).await.unwrap();
        assert_eq!(blocks.iter().map(|b| b.block_seq).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(verify_chain(&blocks), Ok(()));
    }

    #[tokio::test]
    async fn tampering_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let logger = AuditLogger::open(&path).await.unwrap();
        logger
            .dispatch("t1", &[started("m1"), started("m2"), started("m3")])
            .await
            .unwrap();

        let mut blocks = read_log(&path).await.unwrap();
        blocks[1].payload_json = blocks[1].payload_json.replace("m2", "m9");
        assert_eq!(verify_chain(&blocks), Err(1));
    }
}
