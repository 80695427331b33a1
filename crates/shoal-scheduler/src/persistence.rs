use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::io::AsyncWriteExt;

use crate::{SchedulerState, SessionRunRecord};

/// Latest scheduler state, one JSON file.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("state.json"),
        }
    }

    pub fn load(&self) -> Result<SchedulerState> {
        if !self.path.exists() {
            return Ok(SchedulerState::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub async fn persist(&self, state: &SchedulerState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

/// Append-only session run history, one JSON line per run.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("runs").join("sessions.jsonl"),
        }
    }

    pub async fn append(&self, record: &SessionRunRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }

    /// Most recent runs, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<SessionRunRecord>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        let records: Vec<SessionRunRecord> = content
            .lines()
            .rev()
            .take(limit)
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RunStatus;
    use chrono::Utc;

    fn record(session_id: &str, status: RunStatus) -> SessionRunRecord {
        SessionRunRecord {
            session_id: session_id.into(),
            started_at: Utc::now(),
            ended_at: Utc::now(),
            status,
            error: None,
            comments_made: 2,
            likes_made: 1,
            errors: 0,
        }
    }

    #[test]
    fn state_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        assert_eq!(store.load().unwrap(), SchedulerState::default());
    }

    #[tokio::test]
    async fn state_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let state = SchedulerState {
            next_run_at_ms: Some(1234),
            last_run_at_ms: Some(1000),
            last_status: Some(RunStatus::Ok),
            consecutive_errors: 0,
        };
        store.persist(&state).await.unwrap();
        assert_eq!(store.load().unwrap(), state);
    }

    #[tokio::test]
    async fn history_appends_and_reads_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());
        store.append(&record("s1", RunStatus::Ok)).await.unwrap();
        store.append(&record("s2", RunStatus::Error)).await.unwrap();
        store.append(&record("s3", RunStatus::Ok)).await.unwrap();

        let recent = store.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].session_id, "s3");
        assert_eq!(recent[1].session_id, "s2");
    }

    #[tokio::test]
    async fn history_recent_on_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());
        assert!(store.recent(5).await.unwrap().is_empty());
    }
}
