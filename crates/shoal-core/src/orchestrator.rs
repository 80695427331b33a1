//! Session orchestration.
//!
//! A full automation session runs three phases back to back: engagement
//! before posting, the posting slot itself, then engagement after. The
//! posting slot is held until the full pre-posting window has elapsed so
//! the cadence stays predictable regardless of how quickly the first
//! phase drained its plan.

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;

use shoal_engage::{EngagementManager, EngagementStatsReport, DEFAULT_RETENTION_DAYS};
use shoal_linkedin::LinkedInApi;
use shoal_provider::ContentProvider;
use shoal_scheduler::{RunStatus, SessionRunRecord, SessionScheduler};
use shoal_schema::SessionStats;

use crate::config::AppConfig;
use crate::topics::{image_urls, select_topic};

/// Outcome of one full (engage → post → engage) session.
#[derive(Debug, Clone)]
pub struct FullSessionSummary {
    /// Engagement counters merged across both phases.
    pub stats: SessionStats,
    pub posted: bool,
    pub post_error: Option<String>,
}

pub struct AutomationAgent {
    config: AppConfig,
    linkedin: Arc<dyn LinkedInApi>,
    provider: Arc<dyn ContentProvider>,
    engagement: EngagementManager,
    last_reset_day: Option<NaiveDate>,
}

impl AutomationAgent {
    pub fn new(
        config: AppConfig,
        linkedin: Arc<dyn LinkedInApi>,
        provider: Arc<dyn ContentProvider>,
    ) -> Self {
        let engagement = EngagementManager::new(
            linkedin.clone(),
            provider.clone(),
            config.engagement_config(),
        );
        Self {
            config,
            linkedin,
            provider,
            engagement,
            last_reset_day: None,
        }
    }

    pub fn stats_report(&self) -> EngagementStatsReport {
        self.engagement.get_stats()
    }

    /// One engagement phase. Sessions are serialized through `&mut self`.
    pub async fn run_engagement_phase(
        &mut self,
        phase: &str,
        duration_minutes: u64,
        cancel: &CancellationToken,
    ) -> SessionStats {
        self.engagement
            .run_engagement_session(phase, duration_minutes, cancel)
            .await
    }

    /// Generate and publish one post using the configured weekly topics.
    pub async fn run_posting_session(&self) -> Result<()> {
        self.post_topic(None).await
    }

    /// Same, with an explicit topic override.
    pub async fn post_topic(&self, override_topic: Option<&str>) -> Result<()> {
        let topic = match override_topic {
            Some(t) => t.to_string(),
            None => {
                if self.config.topics.is_empty() {
                    bail!("no weekly topics configured for content generation");
                }
                let tz: Tz = self
                    .config
                    .schedule
                    .timezone
                    .parse()
                    .unwrap_or(chrono_tz::UTC);
                let today = Utc::now().with_timezone(&tz).weekday();
                select_topic(&self.config.topics, today)
            }
        };

        tracing::info!(topic, "generating post content");
        let context = "Write ~500 words (450-550) in a professional, warm tone. \
                       Open with a strong hook, include concrete examples and practical tips, \
                       add a brief CTA, include 3-5 relevant hashtags, and end with a thoughtful question.";
        let content = self.provider.generate_post(&topic, context).await?;
        if content.trim().is_empty() {
            bail!("content generation returned an empty post");
        }

        let images = image_urls(&topic);
        tracing::info!(
            content_length = content.len(),
            images = images.len(),
            "publishing post"
        );
        let published = match self
            .linkedin
            .publish_post_with_images(&content, &images)
            .await
        {
            Ok(ok) => ok,
            Err(e) => {
                // Image pipeline failures fall back to a plain text share.
                tracing::warn!(error = %e, "image publish failed, retrying as text post");
                self.linkedin.publish_post(&content).await?
            }
        };
        if !published {
            bail!("post was rejected by the publishing API");
        }

        let preview: String = content.chars().take(100).collect();
        tracing::info!(topic, preview, "post published");
        Ok(())
    }

    /// Pre-posting engagement, posting, post-posting engagement.
    pub async fn run_full_session(&mut self, cancel: &CancellationToken) -> FullSessionSummary {
        let phase_window = self.config.schedule.engagement_minutes;
        let session_started = Instant::now();
        self.maybe_reset_daily();

        let pre = self
            .run_engagement_phase("pre_posting", phase_window, cancel)
            .await;
        if cancel.is_cancelled() {
            return FullSessionSummary {
                stats: pre,
                posted: false,
                post_error: None,
            };
        }

        // Hold the posting slot until the configured offset.
        let window = Duration::from_secs(phase_window * 60);
        let elapsed = session_started.elapsed();
        if elapsed < window {
            let remaining = window - elapsed;
            tracing::info!(wait_secs = remaining.as_secs(), "waiting for posting slot");
            tokio::select! {
                _ = cancel.cancelled() => {
                    return FullSessionSummary { stats: pre, posted: false, post_error: None };
                }
                _ = sleep(remaining) => {}
            }
        }

        let (posted, post_error) = match self.run_posting_session().await {
            Ok(()) => (true, None),
            Err(e) => {
                tracing::error!(error = %e, "posting session failed");
                (false, Some(e.to_string()))
            }
        };

        let post = self
            .run_engagement_phase("post_posting", phase_window, cancel)
            .await;

        let mut stats = pre;
        stats.merge(&post);
        FullSessionSummary {
            stats,
            posted,
            post_error,
        }
    }

    /// Drive scheduled sessions until cancelled.
    pub async fn run_scheduled(
        &mut self,
        scheduler: &mut SessionScheduler,
        cancel: &CancellationToken,
    ) -> Result<()> {
        loop {
            let Some(fire) = scheduler.wait_for_next(cancel).await? else {
                tracing::info!("scheduler loop cancelled");
                return Ok(());
            };
            tracing::info!(session_id = %fire.session_id, "starting automation session");

            let summary = self.run_full_session(cancel).await;
            let status = if cancel.is_cancelled() {
                RunStatus::Cancelled
            } else if summary.post_error.is_some() {
                RunStatus::Error
            } else {
                RunStatus::Ok
            };
            let record = SessionRunRecord::from_stats(
                &fire.session_id,
                status,
                summary.post_error.clone(),
                &summary.stats,
            );
            scheduler.record_run(record).await?;

            if cancel.is_cancelled() {
                return Ok(());
            }
        }
    }

    /// Reset session counters and prune history once per calendar day.
    fn maybe_reset_daily(&mut self) {
        let today = Utc::now().date_naive();
        match self.last_reset_day {
            Some(last) if last != today => {
                self.engagement.reset_daily_stats(DEFAULT_RETENTION_DAYS);
                self.last_reset_day = Some(today);
            }
            Some(_) => {}
            None => self.last_reset_day = Some(today),
        }
    }
}
