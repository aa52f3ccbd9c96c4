use crate::{
    domain::{MemeRepository, TagSuggester},
    errors::{IngestError, RepoError},
    models::{Meme, SearchHit, Tag, UploadedMeme, SEARCH_TAG_LIMIT},
    upload::MemeUploader,
};
use std::{collections::HashMap, sync::Arc};
use tracing;
use uuid::Uuid;

/// An image received from the upload form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub description: String,
    pub uploader: String,
    pub file: Option<UploadedFile>,
    /// Comma separated, as typed by the user.
    pub manual_tags: Option<String>,
}

#[derive(Debug)]
pub enum IngestOutcome {
    /// Nothing was uploaded; the form should be shown again.
    ShowForm,
    Created(UploadedMeme),
}

/// Splits user-typed tags on commas, trimming each and dropping empty ones.
pub fn split_manual_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Upload and search workflows over the injected adapters and repository.
#[derive(Clone)]
pub struct MemeService {
    repo: Arc<dyn MemeRepository>,
    uploader: MemeUploader,
    tagger: Arc<dyn TagSuggester>,
}

impl MemeService {
    pub fn new(repo: Arc<dyn MemeRepository>, uploader: MemeUploader, tagger: Arc<dyn TagSuggester>) -> Self {
        Self { repo, uploader, tagger }
    }

    /// Stores the image, asks for automatic tags and persists the meme with all of its tags.
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome, IngestError> {
        let Some(file) = request.file else {
            tracing::debug!("Ingest: no image supplied, showing the form again");
            return Ok(IngestOutcome::ShowForm);
        };
        if request.description.trim().is_empty() {
            return Err(IngestError::InvalidInput("description cannot be empty".to_string()));
        }
        if request.uploader.trim().is_empty() {
            return Err(IngestError::InvalidInput("user cannot be empty".to_string()));
        }

        let content_type = file.content_type.as_deref();
        let Some(path) = self.uploader.upload(Some(file.data), &file.filename, content_type).await else {
            return Err(IngestError::UploadFailed);
        };

        // Cosmetic: an empty answer just means no automatic tags
        let automatic = self.tagger.suggest_tags(&path).await;

        let mut labels = request.manual_tags.as_deref().map(split_manual_tags).unwrap_or_default();
        labels.extend(automatic);

        let meme = Meme::new(request.description, path, request.uploader);
        let tags = Tag::for_meme(meme.id, &labels);
        self.repo.create_with_tags(&meme, &tags).await?;

        tracing::info!(meme_id = %meme.id, tag_count = labels.len(), "Ingest: meme created");
        Ok(IngestOutcome::Created(UploadedMeme { meme, tags: labels }))
    }

    /// Memes matching `query` in their text or tags (all memes without a query),
    /// newest first, each with up to `SEARCH_TAG_LIMIT` tag labels.
    pub async fn search(&self, query: Option<&str>) -> Result<Vec<SearchHit>, RepoError> {
        let memes = match query.filter(|q| !q.is_empty()) {
            None => self.repo.list_all().await?,
            Some(needle) => {
                let by_text = self.repo.find_by_text(needle).await?;
                let by_tag = self.repo.find_by_tag_label(needle).await?;

                let mut merged: HashMap<Uuid, Meme> = HashMap::new();
                for meme in by_text.into_iter().chain(by_tag) {
                    merged.entry(meme.id).or_insert(meme);
                }
                let mut memes: Vec<Meme> = merged.into_values().collect();
                memes.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then_with(|| a.id.cmp(&b.id)));
                memes
            }
        };

        let mut hits = Vec::with_capacity(memes.len());
        for meme in memes {
            let tags = self
                .repo
                .tags_for(meme.id, SEARCH_TAG_LIMIT)
                .await?
                .into_iter()
                .map(|tag| tag.label)
                .collect();
            hits.push(SearchHit { meme, tags });
        }

        tracing::debug!(query = ?query, hits = hits.len(), "Search complete");
        Ok(hits)
    }
}
