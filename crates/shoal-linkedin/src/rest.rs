//! REST client for the LinkedIn v2 API.
//!
//! Bearer-token auth throughout. Member identity comes from the OIDC
//! `/userinfo` endpoint with a fallback to the legacy `/me` shape for
//! tokens without OpenID scopes.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;

use shoal_schema::{Connection, Post, Profile};
use shoal_throttle::Throttle;

use crate::LinkedInApi;

const DEFAULT_API_BASE: &str = "https://api.linkedin.com/v2";
const RESTLI_VERSION: &str = "2.0.0";

#[derive(Clone)]
pub struct RestLinkedIn {
    client: reqwest::Client,
    api_base: String,
    access_token: String,
    throttle: Arc<Throttle>,
}

impl RestLinkedIn {
    pub fn new(access_token: impl Into<String>, requests_per_hour: u32) -> Self {
        Self::with_base(access_token, DEFAULT_API_BASE, requests_per_hour)
    }

    pub fn with_base(
        access_token: impl Into<String>,
        api_base: impl Into<String>,
        requests_per_hour: u32,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            throttle: Arc::new(Throttle::per_hour(requests_per_hour)),
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{path}", self.api_base))
            .header("authorization", format!("Bearer {}", self.access_token))
            .header("x-restli-protocol-version", RESTLI_VERSION)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{path}", self.api_base))
            .header("authorization", format!("Bearer {}", self.access_token))
            .header("x-restli-protocol-version", RESTLI_VERSION)
            .header("content-type", "application/json")
    }

    async fn person_urn(&self) -> Result<String> {
        let profile = self.fetch_user_profile().await?;
        Ok(format!("urn:li:person:{}", profile.id))
    }

    /// Register an image upload slot; returns (asset urn, upload url).
    async fn register_image_upload(&self, owner_urn: &str) -> Result<(String, String)> {
        self.throttle.acquire().await;
        let payload = serde_json::json!({
            "registerUploadRequest": {
                "recipes": ["urn:li:digitalmediaRecipe:feedshare-image"],
                "owner": owner_urn,
                "serviceRelationships": [{
                    "relationshipType": "OWNER",
                    "identifier": "urn:li:userGeneratedContent"
                }]
            }
        });
        let resp = self
            .post("/assets?action=registerUpload")
            .json(&payload)
            .send()
            .await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(anyhow!(
                "register upload failed ({status}): {}",
                resp.text().await.unwrap_or_default()
            ));
        }
        let body: serde_json::Value = resp.json().await?;
        let value = &body["value"];
        let asset = value["asset"]
            .as_str()
            .ok_or_else(|| anyhow!("register upload response missing asset urn"))?
            .to_string();
        let upload_url = value["uploadMechanism"]
            ["com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest"]["uploadUrl"]
            .as_str()
            .ok_or_else(|| anyhow!("register upload response missing upload url"))?
            .to_string();
        Ok((asset, upload_url))
    }

    /// Download one image and push its bytes to the registered upload URL.
    async fn upload_image(&self, source_url: &str, upload_url: &str) -> Result<()> {
        let img = self.client.get(source_url).send().await?;
        if !img.status().is_success() {
            return Err(anyhow!("image download failed ({}): {source_url}", img.status()));
        }
        let content_type = img
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = img.bytes().await?;

        let resp = self
            .client
            .put(upload_url)
            .header("authorization", format!("Bearer {}", self.access_token))
            .header("content-type", content_type)
            .body(bytes)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(anyhow!("image upload failed ({})", resp.status()));
        }
        Ok(())
    }

    async fn post_share(&self, payload: &serde_json::Value) -> Result<bool> {
        self.throttle.acquire().await;
        let resp = self.post("/ugcPosts").json(payload).send().await?;
        let status = resp.status();
        if status == StatusCode::CREATED {
            tracing::info!("published share on the user's feed");
            Ok(true)
        } else {
            tracing::error!(
                status = %status,
                body = %resp.text().await.unwrap_or_default(),
                "failed to publish share"
            );
            Ok(false)
        }
    }
}

#[async_trait]
impl LinkedInApi for RestLinkedIn {
    async fn fetch_connections(&self, limit: usize) -> Result<Vec<Connection>> {
        self.throttle.acquire().await;
        let resp = self
            .get(&format!("/connections?count={limit}"))
            .send()
            .await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(anyhow!(
                "connections fetch failed ({status}): {}",
                resp.text().await.unwrap_or_default()
            ));
        }
        let body: Elements<ApiConnection> = resp.json().await?;
        let connections: Vec<Connection> = body
            .elements
            .into_iter()
            .take(limit)
            .map(ApiConnection::into_connection)
            .collect();
        tracing::info!(count = connections.len(), "retrieved top connections");
        Ok(connections)
    }

    async fn fetch_recent_posts(&self, connection_id: &str, days_back: i64) -> Result<Vec<Post>> {
        self.throttle.acquire().await;
        let resp = self
            .get(&format!(
                "/people/{}/posts?count=10",
                urlencoding::encode(connection_id)
            ))
            .send()
            .await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(anyhow!(
                "posts fetch failed for {connection_id} ({status}): {}",
                resp.text().await.unwrap_or_default()
            ));
        }
        let body: Elements<ApiPost> = resp.json().await?;
        let now_ms = Utc::now().timestamp_millis();
        let window_start_ms = now_ms - days_back * 24 * 3600 * 1000;

        // Posts carrying a timestamp outside the lookback window are
        // dropped here; undated posts pass through and simply earn no
        // recency score.
        let posts: Vec<Post> = body
            .elements
            .into_iter()
            .filter(|p| match p.time {
                Some(t) => t >= window_start_ms && t <= now_ms,
                None => true,
            })
            .map(ApiPost::into_post)
            .collect();
        tracing::debug!(
            connection_id,
            count = posts.len(),
            "retrieved recent posts from connection"
        );
        Ok(posts)
    }

    async fn fetch_user_profile(&self) -> Result<Profile> {
        self.throttle.acquire().await;
        let resp = self.get("/userinfo").send().await?;
        if resp.status() == StatusCode::OK {
            let info: OidcUserInfo = resp.json().await?;
            return Ok(info.into_profile());
        }

        // Legacy tokens without OpenID scopes only work against /me.
        let resp = self.get("/me").send().await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(anyhow!(
                "profile fetch failed ({status}): {}",
                resp.text().await.unwrap_or_default()
            ));
        }
        let me: LegacyMe = resp.json().await?;
        Ok(me.into_profile())
    }

    async fn submit_like(&self, post_id: &str) -> Result<bool> {
        self.throttle.acquire().await;
        let resp = self
            .post(&format!(
                "/socialActions/{}/likes",
                urlencoding::encode(post_id)
            ))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::CREATED || status == StatusCode::OK {
            tracing::info!(post_id, "liked post");
            Ok(true)
        } else {
            tracing::warn!(post_id, status = %status, "like rejected");
            Ok(false)
        }
    }

    async fn submit_comment(&self, post_id: &str, text: &str) -> Result<bool> {
        self.throttle.acquire().await;
        let resp = self
            .post(&format!(
                "/socialActions/{}/comments",
                urlencoding::encode(post_id)
            ))
            .json(&serde_json::json!({ "message": { "text": text } }))
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::CREATED || status == StatusCode::OK {
            tracing::info!(post_id, "commented on post");
            Ok(true)
        } else {
            tracing::warn!(post_id, status = %status, "comment rejected");
            Ok(false)
        }
    }

    async fn publish_post(&self, text: &str) -> Result<bool> {
        let author = self.person_urn().await?;
        let payload = serde_json::json!({
            "author": author,
            "lifecycleState": "PUBLISHED",
            "specificContent": {
                "com.linkedin.ugc.ShareContent": {
                    "shareCommentary": { "text": text },
                    "shareMediaCategory": "NONE"
                }
            },
            "visibility": { "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC" }
        });
        self.post_share(&payload).await
    }

    async fn publish_post_with_images(&self, text: &str, image_urls: &[String]) -> Result<bool> {
        if image_urls.is_empty() {
            return self.publish_post(text).await;
        }
        let author = self.person_urn().await?;

        let mut media = Vec::with_capacity(image_urls.len());
        for (idx, url) in image_urls.iter().enumerate() {
            let (asset, upload_url) = self.register_image_upload(&author).await?;
            self.upload_image(url, &upload_url).await?;
            media.push(serde_json::json!({
                "status": "READY",
                "description": { "text": "" },
                "media": asset,
                "title": { "text": format!("Image {}", idx + 1) }
            }));
        }

        let payload = serde_json::json!({
            "author": author,
            "lifecycleState": "PUBLISHED",
            "specificContent": {
                "com.linkedin.ugc.ShareContent": {
                    "shareCommentary": { "text": text },
                    "shareMediaCategory": "IMAGE",
                    "media": media
                }
            },
            "visibility": { "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC" }
        });
        self.post_share(&payload).await
    }
}

#[derive(Debug, Deserialize)]
struct Elements<T> {
    #[serde(default = "Vec::new")]
    elements: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ApiConnection {
    id: String,
    #[serde(rename = "firstName", default)]
    first_name: String,
    #[serde(rename = "lastName", default)]
    last_name: String,
    #[serde(default)]
    headline: Option<String>,
}

impl ApiConnection {
    fn into_connection(self) -> Connection {
        let display_name = format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string();
        Connection {
            id: self.id,
            display_name,
            headline: self.headline,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiPost {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    time: Option<i64>,
    #[serde(rename = "numLikes", default)]
    num_likes: u32,
    #[serde(rename = "numComments", default)]
    num_comments: u32,
}

impl ApiPost {
    fn into_post(self) -> Post {
        Post {
            id: self.id,
            body: self.text,
            published_at_ms: self.time,
            like_count: self.num_likes,
            comment_count: self.num_comments,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OidcUserInfo {
    sub: String,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
    #[serde(default)]
    headline: Option<String>,
}

impl OidcUserInfo {
    fn into_profile(self) -> Profile {
        let display_name = format!("{} {}", self.given_name, self.family_name)
            .trim()
            .to_string();
        Profile {
            id: self.sub,
            display_name,
            headline: self.headline,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LegacyMe {
    id: String,
    #[serde(rename = "localizedFirstName", default)]
    first_name: String,
    #[serde(rename = "localizedLastName", default)]
    last_name: String,
    #[serde(rename = "localizedHeadline", default)]
    headline: Option<String>,
}

impl LegacyMe {
    fn into_profile(self) -> Profile {
        let display_name = format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string();
        Profile {
            id: self.id,
            display_name,
            headline: self.headline,
        }
    }
}
