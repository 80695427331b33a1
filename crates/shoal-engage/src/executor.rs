//! Plan execution with time distribution and pacing.
//!
//! Walks a plan in scheduled order as one logical task: wait for each
//! slot, perform the action through the collaborators, then pause for a
//! randomized delay. Collaborator calls are strictly serialized; rate
//! limit avoidance depends on it.

use chrono::Utc;
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;

use shoal_linkedin::LinkedInApi;
use shoal_provider::ContentProvider;
use shoal_schema::{ActionKind, EngagementRecord, PlannedAction, Profile, SessionStats};

use crate::history::EngagementHistory;
use crate::rng::RandomSource;
use crate::EngagementConfig;

pub struct EngagementExecutor<'a> {
    linkedin: &'a dyn LinkedInApi,
    provider: &'a dyn ContentProvider,
    rng: &'a dyn RandomSource,
    min_delay_secs: f64,
    max_delay_secs: f64,
}

impl<'a> EngagementExecutor<'a> {
    pub fn new(
        linkedin: &'a dyn LinkedInApi,
        provider: &'a dyn ContentProvider,
        rng: &'a dyn RandomSource,
        config: &EngagementConfig,
    ) -> Self {
        Self {
            linkedin,
            provider,
            rng,
            min_delay_secs: config.min_action_delay_secs,
            max_delay_secs: config.max_action_delay_secs,
        }
    }

    /// Execute the plan. Returns stats spanning the execution.
    ///
    /// Per-action faults are absorbed: collaborator errors count toward
    /// `errors` and the walk continues. Cancellation takes effect at the
    /// next suspension point; abandoned actions are not failures.
    pub async fn execute(
        &self,
        plan: &[PlannedAction],
        profile: &Profile,
        history: &mut EngagementHistory,
        cancel: &CancellationToken,
    ) -> SessionStats {
        let mut stats = SessionStats::begin();
        let started = Instant::now();
        tracing::debug!(
            actions = plan.len(),
            user = %profile.display_name,
            "executing engagement plan"
        );

        for action in plan {
            if cancel.is_cancelled() {
                tracing::info!("engagement plan cancelled, abandoning remaining actions");
                break;
            }

            let wait = action.offset_secs - started.elapsed().as_secs_f64();
            if wait > 0.0 {
                tracing::debug!(wait_secs = wait, "waiting for next slot");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(Duration::from_secs_f64(wait)) => {}
                }
            }

            // Engagement needs a post id; without one there is nothing to
            // act on and no delay is owed.
            let Some(post_id) = action.candidate.post.id.as_deref() else {
                tracing::warn!("post id missing, skipping engagement");
                continue;
            };

            match self.perform(action, post_id).await {
                Ok(Some(record)) => {
                    match record.kind {
                        ActionKind::Comment => stats.comments_made += 1,
                        ActionKind::Like => stats.likes_made += 1,
                    }
                    history.append(record);
                }
                Ok(None) => {}
                Err(e) => {
                    stats.errors += 1;
                    tracing::error!(post_id, kind = %action.kind, error = %e, "engagement action failed");
                }
            }

            let delay = self.rng.uniform(self.min_delay_secs, self.max_delay_secs);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(Duration::from_secs_f64(delay)) => {}
            }
        }

        stats.ended_at = Some(Utc::now());
        stats
    }

    /// One action against one post. `Ok(None)` means nothing was
    /// submitted (empty generation or API rejection), which is not an error.
    async fn perform(
        &self,
        action: &PlannedAction,
        post_id: &str,
    ) -> anyhow::Result<Option<EngagementRecord>> {
        let author = &action.candidate.author;
        match action.kind {
            ActionKind::Comment => {
                let comment = self
                    .provider
                    .generate_comment(&action.candidate.post.body, &author.display_name)
                    .await?;
                if comment.trim().is_empty() {
                    tracing::warn!(post_id, "comment generation returned empty content");
                    return Ok(None);
                }
                if self.linkedin.submit_comment(post_id, &comment).await? {
                    tracing::info!(author = %author.display_name, "commented on post");
                    Ok(Some(self.record(post_id, ActionKind::Comment, author.display_name.clone())))
                } else {
                    Ok(None)
                }
            }
            ActionKind::Like => {
                if self.linkedin.submit_like(post_id).await? {
                    tracing::info!(author = %author.display_name, "liked post");
                    Ok(Some(self.record(post_id, ActionKind::Like, author.display_name.clone())))
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn record(&self, post_id: &str, kind: ActionKind, connection_name: String) -> EngagementRecord {
        EngagementRecord {
            post_id: post_id.to_string(),
            kind,
            at: Utc::now(),
            connection_name,
        }
    }
}
