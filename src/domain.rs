use crate::errors::{RepoError, StorageError};
use crate::models::{Meme, Tag};
use async_trait::async_trait;
use uuid::Uuid;

/// Trait defining operations for storing and retrieving memes and their tags.
#[async_trait]
pub trait MemeRepository: Send + Sync + 'static { // Send+Sync+'static required for Arc<dyn>
    /// Persists a meme together with its initial tags in a single transaction.
    async fn create_with_tags(&self, meme: &Meme, tags: &[Tag]) -> Result<(), RepoError>;

    /// Lists every meme. No pagination.
    async fn list_all(&self) -> Result<Vec<Meme>, RepoError>;

    /// Memes whose description or uploader contains `needle`.
    async fn find_by_text(&self, needle: &str) -> Result<Vec<Meme>, RepoError>;

    /// Memes owning at least one tag whose label contains `needle`.
    async fn find_by_tag_label(&self, needle: &str) -> Result<Vec<Meme>, RepoError>;

    /// Up to `limit` tags of a meme, in creation order.
    async fn tags_for(&self, meme_id: Uuid, limit: usize) -> Result<Vec<Tag>, RepoError>;
}

/// Trait defining operations for storing file data (meme images).
#[async_trait]
pub trait FileStorage: Send + Sync + 'static {
    /// Uploads file data under `key` in `bucket` with public-read visibility.
    async fn upload_public(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;
}

/// Trait for services that suggest descriptive tags for an image URL.
///
/// Implementations never fail: any problem is logged and yields no tags.
#[async_trait]
pub trait TagSuggester: Send + Sync + 'static {
    async fn suggest_tags(&self, image_url: &str) -> Vec<String>;
}
