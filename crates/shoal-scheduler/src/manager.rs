//! Scheduler loop plumbing.
//!
//! The scheduler waits for the next posting window and hands a session id
//! to the caller; the caller runs the session and reports back with a
//! [`SessionRunRecord`]. One session at a time: the wait does not resume
//! until the previous record lands.

use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{HistoryStore, PostingSchedule, RunStatus, SchedulerState, SessionRunRecord, StateStore};

#[derive(Debug, Clone)]
pub struct ScheduledFire {
    pub session_id: String,
    pub scheduled_for: DateTime<Utc>,
}

pub struct SessionScheduler {
    schedule: PostingSchedule,
    state: SchedulerState,
    state_store: StateStore,
    history: HistoryStore,
}

impl SessionScheduler {
    pub fn new(schedule: PostingSchedule, data_dir: &Path) -> Result<Self> {
        let state_store = StateStore::new(data_dir);
        let state = state_store.load()?;
        Ok(Self {
            schedule,
            state,
            state_store,
            history: HistoryStore::new(data_dir),
        })
    }

    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        self.schedule.next_occurrence(Utc::now())
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Sleep until the next posting window. Returns `None` when cancelled.
    pub async fn wait_for_next(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<ScheduledFire>> {
        let next = self
            .schedule
            .next_occurrence(Utc::now())
            .ok_or_else(|| anyhow!("schedule has no upcoming occurrence"))?;

        self.state.next_run_at_ms = Some(next.timestamp_millis());
        self.state_store.persist(&self.state).await?;

        let wait_ms = (next - Utc::now()).num_milliseconds().max(0) as u64;
        tracing::info!(next_run = %next, "waiting for next session window");
        tokio::select! {
            _ = cancel.cancelled() => return Ok(None),
            _ = tokio::time::sleep(Duration::from_millis(wait_ms)) => {}
        }

        Ok(Some(ScheduledFire {
            session_id: format!("session_{}", next.format("%Y%m%d_%H%M%S")),
            scheduled_for: next,
        }))
    }

    /// Record a finished session and update the persisted state.
    pub async fn record_run(&mut self, record: SessionRunRecord) -> Result<()> {
        self.state.next_run_at_ms = None;
        self.state.last_run_at_ms = Some(record.ended_at.timestamp_millis());
        self.state.last_status = Some(record.status.clone());
        match record.status {
            RunStatus::Ok => self.state.consecutive_errors = 0,
            RunStatus::Error => self.state.consecutive_errors += 1,
            RunStatus::Cancelled => {}
        }
        self.history.append(&record).await?;
        self.state_store.persist(&self.state).await?;
        Ok(())
    }

    pub async fn recent_runs(&self, limit: usize) -> Result<Vec<SessionRunRecord>> {
        self.history.recent(limit).await
    }
}
