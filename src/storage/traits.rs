use crate::error::Result;
use async_trait::async_trait;

/// Object storage for generated artifacts. Uploaded objects are public and
/// addressed by the URL returned from `upload`.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, key: &str, content_type: &str) -> Result<String>;
}
