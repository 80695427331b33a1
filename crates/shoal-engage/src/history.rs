//! Process-lifetime record of past engagements.
//!
//! Append-only while a session runs; used to exclude already-engaged
//! posts from future prioritization. Growth is bounded by explicit
//! pruning; nothing prunes automatically, callers must reset
//! periodically.

use std::collections::HashSet;

use chrono::{Duration, Utc};

use shoal_schema::EngagementRecord;

pub const DEFAULT_RETENTION_DAYS: i64 = 7;

#[derive(Debug, Default)]
pub struct EngagementHistory {
    records: Vec<EngagementRecord>,
}

impl EngagementHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from previously persisted records. Persistence around
    /// session boundaries is the caller's responsibility.
    pub fn from_records(records: Vec<EngagementRecord>) -> Self {
        Self { records }
    }

    pub fn append(&mut self, record: EngagementRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EngagementRecord] {
        &self.records
    }

    /// The most recent `n` records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<EngagementRecord> {
        let start = self.records.len().saturating_sub(n);
        self.records[start..].to_vec()
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.records.iter().any(|r| r.post_id == post_id)
    }

    /// Post identifiers already engaged with, for the planner's filter.
    pub fn recorded_ids(&self) -> HashSet<String> {
        self.records.iter().map(|r| r.post_id.clone()).collect()
    }

    /// Drop records older than the retention window.
    pub fn prune(&mut self, retention_days: i64) {
        let cutoff = Utc::now() - Duration::days(retention_days);
        let before = self.records.len();
        self.records.retain(|r| r.at > cutoff);
        let dropped = before - self.records.len();
        if dropped > 0 {
            tracing::debug!(dropped, retained = self.records.len(), "pruned engagement history");
        }
    }
}
