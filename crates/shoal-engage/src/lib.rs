//! Engagement scheduling and prioritization engine.
//!
//! One session: collect candidate posts from connections, score and rank
//! them, spread a bounded set of actions across the session window with
//! jitter, then execute them serially with randomized pacing.

pub mod executor;
pub mod history;
pub mod manager;
pub mod planner;
pub mod rng;
pub mod scoring;

pub use executor::EngagementExecutor;
pub use history::{EngagementHistory, DEFAULT_RETENTION_DAYS};
pub use manager::{DailyLimits, EngagementManager, EngagementStatsReport};
pub use rng::{FixedRandom, RandomSource, SeededRandom, ThreadRngSource};

/// Tunables for one engagement manager. Passed in explicitly; no ambient
/// global settings.
#[derive(Debug, Clone)]
pub struct EngagementConfig {
    /// How many top connections to source posts from.
    pub top_connections: usize,
    /// Lookback window for candidate posts, in days.
    pub lookback_days: i64,
    /// Comment budget per session; the plan cap derives from this.
    pub session_comment_limit: u32,
    /// Bounds for the randomized pause after each action, in seconds.
    pub min_action_delay_secs: f64,
    pub max_action_delay_secs: f64,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            top_connections: 50,
            lookback_days: 7,
            session_comment_limit: 25,
            min_action_delay_secs: 30.0,
            max_action_delay_secs: 120.0,
        }
    }
}

impl EngagementConfig {
    /// Maximum plan entries per session. The same cap applies to every
    /// phase.
    pub fn plan_cap(&self) -> usize {
        (self.session_comment_limit / 2) as usize
    }

    /// Likes are allowed at twice the comment budget.
    pub fn daily_like_limit(&self) -> u32 {
        self.session_comment_limit * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_cap_is_half_the_comment_limit() {
        let config = EngagementConfig {
            session_comment_limit: 25,
            ..Default::default()
        };
        assert_eq!(config.plan_cap(), 12);

        let config = EngagementConfig {
            session_comment_limit: 5,
            ..Default::default()
        };
        assert_eq!(config.plan_cap(), 2);
    }

    #[test]
    fn defaults_match_documented_limits() {
        let config = EngagementConfig::default();
        assert_eq!(config.top_connections, 50);
        assert_eq!(config.lookback_days, 7);
        assert_eq!(config.daily_like_limit(), 50);
        assert!(config.min_action_delay_secs <= config.max_action_delay_secs);
    }
}
