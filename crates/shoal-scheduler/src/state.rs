use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum RunStatus {
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "cancelled")]
    Cancelled,
}

/// One completed automation session, appended to the run history.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionRunRecord {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub status: RunStatus,
    pub error: Option<String>,
    pub comments_made: u32,
    pub likes_made: u32,
    pub errors: u32,
}

impl SessionRunRecord {
    /// Build a record from engagement session stats. Missing timestamps
    /// fall back to now.
    pub fn from_stats(
        session_id: impl Into<String>,
        status: RunStatus,
        error: Option<String>,
        stats: &shoal_schema::SessionStats,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            started_at: stats.started_at.unwrap_or(now),
            ended_at: stats.ended_at.unwrap_or(now),
            status,
            error,
            comments_made: stats.comments_made,
            likes_made: stats.likes_made,
            errors: stats.errors,
        }
    }
}

/// Scheduler bookkeeping persisted between runs.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct SchedulerState {
    pub next_run_at_ms: Option<i64>,
    pub last_run_at_ms: Option<i64>,
    pub last_status: Option<RunStatus>,
    pub consecutive_errors: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_serde_uses_lowercase() {
        assert_eq!(serde_json::to_string(&RunStatus::Ok).unwrap(), r#""ok""#);
        let status: RunStatus = serde_json::from_str(r#""cancelled""#).unwrap();
        assert_eq!(status, RunStatus::Cancelled);
    }

    #[test]
    fn default_state_is_empty() {
        let state = SchedulerState::default();
        assert_eq!(state.next_run_at_ms, None);
        assert_eq!(state.consecutive_errors, 0);
    }
}
