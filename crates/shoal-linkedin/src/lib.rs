pub mod rest;

use anyhow::Result;
use async_trait::async_trait;

use shoal_schema::{Connection, Post, Profile};

pub use rest::RestLinkedIn;

/// Network API surface the engagement core consumes.
///
/// Implementations own their request throttling; calls may block while a
/// rate budget refills. All methods are issued serially by the core.
#[async_trait]
pub trait LinkedInApi: Send + Sync {
    /// Top first-degree connections, most relevant first.
    async fn fetch_connections(&self, limit: usize) -> Result<Vec<Connection>>;

    /// Recent posts from one connection, restricted to the lookback window.
    async fn fetch_recent_posts(&self, connection_id: &str, days_back: i64) -> Result<Vec<Post>>;

    /// The authenticated user's own profile.
    async fn fetch_user_profile(&self) -> Result<Profile>;

    /// Returns false when the API rejects the action without erroring.
    async fn submit_like(&self, post_id: &str) -> Result<bool>;

    async fn submit_comment(&self, post_id: &str, text: &str) -> Result<bool>;

    /// Publish a text share on the user's feed.
    async fn publish_post(&self, text: &str) -> Result<bool>;

    /// Publish a share with images downloaded from the given URLs.
    async fn publish_post_with_images(&self, text: &str, image_urls: &[String]) -> Result<bool>;
}
