//! Application configuration.
//!
//! Loaded from `<config_root>/config.yaml`. Every section has defaults;
//! credentials may come from the environment instead of the file.
//! Components receive their slice of this config explicitly; there is
//! no ambient global settings object.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use shoal_engage::EngagementConfig;
use shoal_scheduler::PostingSchedule;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub linkedin: LinkedInSettings,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub engagement: EngagementSettings,
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedInSettings {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Set directly, or left empty to use the token saved by `auth login`.
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_linkedin_rph")]
    pub requests_per_hour: u32,
}

impl Default for LinkedInSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            access_token: String::new(),
            requests_per_hour: default_linkedin_rph(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_provider_base")]
    pub base_url: String,
    #[serde(default = "default_provider_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_provider_rph")]
    pub requests_per_hour: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_provider_base(),
            model: default_provider_model(),
            api_key: None,
            requests_per_hour: default_provider_rph(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSettings {
    #[serde(default = "default_post_days")]
    pub post_days: Vec<String>,
    #[serde(default = "default_post_time")]
    pub post_time: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Length of each engagement phase around the posting slot.
    #[serde(default = "default_engagement_minutes")]
    pub engagement_minutes: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            post_days: default_post_days(),
            post_time: default_post_time(),
            timezone: default_timezone(),
            engagement_minutes: default_engagement_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementSettings {
    #[serde(default = "default_top_connections")]
    pub top_connections: usize,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    #[serde(default = "default_comment_limit")]
    pub session_comment_limit: u32,
    #[serde(default = "default_min_delay")]
    pub min_action_delay_secs: f64,
    #[serde(default = "default_max_delay")]
    pub max_action_delay_secs: f64,
}

impl Default for EngagementSettings {
    fn default() -> Self {
        Self {
            top_connections: default_top_connections(),
            lookback_days: default_lookback_days(),
            session_comment_limit: default_comment_limit(),
            min_action_delay_secs: default_min_delay(),
            max_action_delay_secs: default_max_delay(),
        }
    }
}

fn default_linkedin_rph() -> u32 {
    100
}
fn default_provider_base() -> String {
    "http://localhost:11434/v1".into()
}
fn default_provider_model() -> String {
    "mistral:7b-instruct-v0.3-q4_0".into()
}
fn default_provider_rph() -> u32 {
    600
}
fn default_post_days() -> Vec<String> {
    vec!["wednesday".into(), "saturday".into()]
}
fn default_post_time() -> String {
    "09:30".into()
}
fn default_timezone() -> String {
    "UTC".into()
}
fn default_engagement_minutes() -> u64 {
    30
}
fn default_top_connections() -> usize {
    50
}
fn default_lookback_days() -> i64 {
    7
}
fn default_comment_limit() -> u32 {
    25
}
fn default_min_delay() -> f64 {
    30.0
}
fn default_max_delay() -> f64 {
    120.0
}

/// Load config from `<config_root>/config.yaml` and apply environment
/// overrides for credentials.
pub fn load_config(config_root: &Path) -> Result<AppConfig> {
    let path = config_root.join("config.yaml");
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let mut config: AppConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut AppConfig) {
    let overrides = [
        ("LINKEDIN_CLIENT_ID", &mut config.linkedin.client_id),
        ("LINKEDIN_CLIENT_SECRET", &mut config.linkedin.client_secret),
        ("LINKEDIN_ACCESS_TOKEN", &mut config.linkedin.access_token),
        ("OLLAMA_BASE_URL", &mut config.provider.base_url),
        ("OLLAMA_MODEL", &mut config.provider.model),
    ];
    for (var, slot) in overrides {
        if let Ok(value) = std::env::var(var) {
            if !value.is_empty() {
                *slot = value;
            }
        }
    }
}

impl AppConfig {
    /// Fatal-to-start checks. Per-session faults are handled elsewhere;
    /// anything failing here should stop the process before a session
    /// begins.
    pub fn validate(&self) -> Result<()> {
        let has_token = !self.linkedin.access_token.is_empty();
        let has_oauth_app =
            !self.linkedin.client_id.is_empty() && !self.linkedin.client_secret.is_empty();
        if !has_token && !has_oauth_app {
            bail!(
                "missing LinkedIn credentials: set linkedin.access_token, or \
                 linkedin.client_id and linkedin.client_secret for the oauth flow"
            );
        }

        // Compiling the schedule validates days, time, and timezone.
        self.posting_schedule()?;

        if self.engagement.min_action_delay_secs > self.engagement.max_action_delay_secs {
            bail!("engagement.min_action_delay_secs exceeds max_action_delay_secs");
        }
        if self.schedule.engagement_minutes == 0 {
            bail!("schedule.engagement_minutes must be at least 1");
        }
        if self.topics.is_empty() {
            tracing::warn!("no weekly topics configured; posting sessions will be skipped");
        }
        Ok(())
    }

    pub fn posting_schedule(&self) -> Result<PostingSchedule> {
        PostingSchedule::new(
            &self.schedule.post_days,
            &self.schedule.post_time,
            &self.schedule.timezone,
        )
    }

    pub fn engagement_config(&self) -> EngagementConfig {
        EngagementConfig {
            top_connections: self.engagement.top_connections,
            lookback_days: self.engagement.lookback_days,
            session_comment_limit: self.engagement.session_comment_limit,
            min_action_delay_secs: self.engagement.min_action_delay_secs,
            max_action_delay_secs: self.engagement.max_action_delay_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = r#"
linkedin:
  access_token: "tok-1"
topics:
  - "AI in business"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.linkedin.access_token, "tok-1");
        assert_eq!(config.linkedin.requests_per_hour, 100);
        assert_eq!(config.provider.base_url, "http://localhost:11434/v1");
        assert_eq!(config.schedule.post_days, vec!["wednesday", "saturday"]);
        assert_eq!(config.engagement.top_connections, 50);
        assert_eq!(config.topics.len(), 1);
    }

    #[test]
    fn validate_requires_credentials() {
        let config = AppConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("credentials"));
    }

    #[test]
    fn validate_accepts_token_only() {
        let mut config = AppConfig::default();
        config.linkedin.access_token = "tok".into();
        config.topics = vec!["Leadership".into()];
        config.validate().unwrap();
    }

    #[test]
    fn validate_accepts_oauth_app_only() {
        let mut config = AppConfig::default();
        config.linkedin.client_id = "id".into();
        config.linkedin.client_secret = "secret".into();
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_schedule_and_delays() {
        let mut config = AppConfig::default();
        config.linkedin.access_token = "tok".into();
        config.schedule.post_time = "25:99".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.linkedin.access_token = "tok".into();
        config.engagement.min_action_delay_secs = 200.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_reads_yaml_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "linkedin:\n  access_token: from-file\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.linkedin.access_token, "from-file");
    }

    #[test]
    fn load_config_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(dir.path()).is_err());
    }
}
