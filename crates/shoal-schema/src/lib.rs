use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A first-degree connection, as returned by the network API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub headline: Option<String>,
}

impl Connection {
    pub fn has_headline(&self) -> bool {
        self.headline.as_deref().is_some_and(|h| !h.is_empty())
    }
}

/// A feed post fetched from a connection. Transient: fetched fresh each
/// session, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Platform post identifier. Posts without one cannot be engaged with.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub body: String,
    /// Publish time in epoch milliseconds, when the API supplies one.
    #[serde(default)]
    pub published_at_ms: Option<i64>,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub comment_count: u32,
}

/// The authenticated user's own profile, passed through for
/// personalization context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub headline: Option<String>,
}

/// A post joined to the connection it was collected from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatePost {
    pub post: Post,
    pub author: Connection,
}

/// A candidate with its priority score. Lives only for one
/// prioritization pass.
#[derive(Debug, Clone)]
pub struct ScoredPost {
    pub candidate: CandidatePost,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Like,
    Comment,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::Like => write!(f, "like"),
            ActionKind::Comment => write!(f, "comment"),
        }
    }
}

/// One slot in an engagement plan: which post, when (seconds from session
/// start), and what to do.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    pub candidate: CandidatePost,
    pub offset_secs: f64,
    pub kind: ActionKind,
}

/// A completed engagement, kept for cross-session de-duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementRecord {
    pub post_id: String,
    pub kind: ActionKind,
    pub at: DateTime<Utc>,
    pub connection_name: String,
}

/// Counters for one engagement session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub comments_made: u32,
    pub likes_made: u32,
    pub errors: u32,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionStats {
    /// Fresh stats with the start timestamp set to now.
    pub fn begin() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn total(&self) -> u32 {
        self.comments_made + self.likes_made
    }

    pub fn duration_secs(&self) -> Option<i64> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        }
    }

    /// Fold another session's counters into this one. Timestamps widen to
    /// cover both sessions.
    pub fn merge(&mut self, other: &SessionStats) {
        self.comments_made += other.comments_made;
        self.likes_made += other.likes_made;
        self.errors += other.errors;
        self.started_at = match (self.started_at, other.started_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.ended_at = match (self.ended_at, other.ended_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
}
