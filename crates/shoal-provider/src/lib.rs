pub mod openai_compat;

use anyhow::Result;
use async_trait::async_trait;

pub use openai_compat::{ollama, OpenAiCompatProvider, ProviderErrorKind};

/// Text generation backend for posts and comments.
///
/// An empty returned string signals generation failure; callers must not
/// submit empty content downstream.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn generate_post(&self, topic: &str, context: &str) -> Result<String>;
    async fn generate_comment(&self, post_body: &str, author_name: &str) -> Result<String>;
    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

/// Deterministic provider for tests and dry runs.
pub struct StubProvider;

#[async_trait]
impl ContentProvider for StubProvider {
    async fn generate_post(&self, topic: &str, context: &str) -> Result<String> {
        let _ = context;
        Ok(format!(
            "[stub:post] Some thoughts on {topic} and where the field is heading. \
             What has your experience been? #stub"
        ))
    }

    async fn generate_comment(&self, post_body: &str, author_name: &str) -> Result<String> {
        let preview: String = post_body.chars().take(40).collect();
        Ok(format!("[stub:comment:{author_name}] {preview}"))
    }
}
