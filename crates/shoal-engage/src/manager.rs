//! Session-level engagement management.
//!
//! Sequences one session (collect, prioritize, plan, execute) and
//! tracks statistics and history across sessions. Faults inside a
//! session are absorbed into the stats; a failed session completes with
//! partial counts rather than erroring past its boundary.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

use shoal_linkedin::LinkedInApi;
use shoal_provider::ContentProvider;
use shoal_schema::{CandidatePost, Connection, EngagementRecord, SessionStats};

use crate::executor::EngagementExecutor;
use crate::history::EngagementHistory;
use crate::planner;
use crate::rng::{RandomSource, ThreadRngSource};
use crate::EngagementConfig;

/// Session caps, reported alongside stats.
#[derive(Debug, Clone)]
pub struct DailyLimits {
    pub comments: u32,
    pub likes: u32,
}

#[derive(Debug, Clone)]
pub struct EngagementStatsReport {
    pub session: SessionStats,
    pub historical_count: usize,
    pub recent_records: Vec<EngagementRecord>,
    pub daily_limits: DailyLimits,
}

pub struct EngagementManager {
    linkedin: Arc<dyn LinkedInApi>,
    provider: Arc<dyn ContentProvider>,
    rng: Arc<dyn RandomSource>,
    config: EngagementConfig,
    history: EngagementHistory,
    session_stats: SessionStats,
}

impl EngagementManager {
    pub fn new(
        linkedin: Arc<dyn LinkedInApi>,
        provider: Arc<dyn ContentProvider>,
        config: EngagementConfig,
    ) -> Self {
        Self {
            linkedin,
            provider,
            rng: Arc::new(ThreadRngSource),
            config,
            history: EngagementHistory::new(),
            session_stats: SessionStats::default(),
        }
    }

    /// Swap in a deterministic random source.
    pub fn with_random_source(mut self, rng: Arc<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    /// Run one engagement session over the given window.
    ///
    /// `phase` is an opaque label used for logging and partitioning
    /// only. Takes `&mut self`: sessions on one manager cannot overlap,
    /// which is what the rate-limit model requires.
    pub async fn run_engagement_session(
        &mut self,
        phase: &str,
        duration_minutes: u64,
        cancel: &CancellationToken,
    ) -> SessionStats {
        tracing::info!(phase, duration_minutes, "starting engagement session");
        let session_started = Utc::now();
        self.session_stats = SessionStats {
            started_at: Some(session_started),
            ..Default::default()
        };

        let connections = match self
            .linkedin
            .fetch_connections(self.config.top_connections)
            .await
        {
            Ok(connections) => connections,
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch connections");
                self.session_stats.errors += 1;
                return self.finish_session(phase);
            }
        };
        if connections.is_empty() {
            tracing::warn!("no connections found");
            return self.finish_session(phase);
        }

        let profile = match self.linkedin.fetch_user_profile().await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch user profile");
                self.session_stats.errors += 1;
                return self.finish_session(phase);
            }
        };

        let candidates = self.collect_candidates(&connections, cancel).await;
        if candidates.is_empty() {
            tracing::warn!("no posts found from connections");
            return self.finish_session(phase);
        }

        let now_ms = Utc::now().timestamp_millis();
        let ranked = planner::prioritize(candidates, &self.history, self.config.plan_cap(), now_ms);
        let plan = planner::plan(ranked, duration_minutes, self.rng.as_ref());
        if plan.is_empty() {
            tracing::warn!("engagement plan is empty, nothing to do");
            return self.finish_session(phase);
        }

        let executor = EngagementExecutor::new(
            self.linkedin.as_ref(),
            self.provider.as_ref(),
            self.rng.as_ref(),
            &self.config,
        );
        let mut stats = executor
            .execute(&plan, &profile, &mut self.history, cancel)
            .await;
        stats.started_at = Some(session_started);
        self.session_stats = stats;

        self.finish_session(phase)
    }

    /// Fetch recent posts from each connection, joining author info.
    /// Per-connection failures are logged and skipped; a short random
    /// pause between fetches keeps the request pattern irregular.
    async fn collect_candidates(
        &self,
        connections: &[Connection],
        cancel: &CancellationToken,
    ) -> Vec<CandidatePost> {
        let mut all = Vec::new();
        for connection in connections {
            if cancel.is_cancelled() {
                break;
            }
            match self
                .linkedin
                .fetch_recent_posts(&connection.id, self.config.lookback_days)
                .await
            {
                Ok(posts) => {
                    all.extend(posts.into_iter().map(|post| CandidatePost {
                        post,
                        author: connection.clone(),
                    }));
                }
                Err(e) => {
                    tracing::error!(
                        connection_id = %connection.id,
                        error = %e,
                        "failed to collect posts from connection"
                    );
                    continue;
                }
            }

            let pause = self.rng.uniform(1.0, 3.0);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(Duration::from_secs_f64(pause)) => {}
            }
        }
        tracing::info!(
            posts = all.len(),
            connections = connections.len(),
            "collected candidate posts"
        );
        all
    }

    fn finish_session(&mut self, phase: &str) -> SessionStats {
        self.session_stats.ended_at = Some(Utc::now());
        let stats = &self.session_stats;
        tracing::info!(
            phase,
            comments = stats.comments_made,
            likes = stats.likes_made,
            errors = stats.errors,
            total = stats.total(),
            duration_secs = stats.duration_secs().unwrap_or(0),
            "engagement session summary"
        );
        stats.clone()
    }

    pub fn get_stats(&self) -> EngagementStatsReport {
        EngagementStatsReport {
            session: self.session_stats.clone(),
            historical_count: self.history.len(),
            recent_records: self.history.recent(10),
            daily_limits: DailyLimits {
                comments: self.config.session_comment_limit,
                likes: self.config.daily_like_limit(),
            },
        }
    }

    /// Zero the session counters and drop history older than the
    /// retention window.
    pub fn reset_daily_stats(&mut self, retention_days: i64) {
        self.session_stats = SessionStats::default();
        self.history.prune(retention_days);
        tracing::info!(retention_days, "daily engagement stats reset");
    }

    pub fn session_stats(&self) -> &SessionStats {
        &self.session_stats
    }

    pub fn history(&self) -> &EngagementHistory {
        &self.history
    }

    /// Seed history from records the caller persisted earlier.
    pub fn load_history(&mut self, records: Vec<EngagementRecord>) {
        self.history = EngagementHistory::from_records(records);
    }
}
