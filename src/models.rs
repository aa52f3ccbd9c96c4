use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Confidence recorded for every tag attached at ingestion time.
pub const DEFAULT_TAG_CONFIDENCE: f64 = 0.95;

/// Maximum number of tags shown next to each search hit.
pub const SEARCH_TAG_LIMIT: usize = 5;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Meme {
    pub id: Uuid,
    pub description: String,
    /// Public URL of the stored image.
    pub path: String,
    pub uploader: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Meme {
    /// New meme with a fresh id, stamped now (microsecond precision, as stored).
    pub fn new(description: String, path: String, uploader: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            description,
            path,
            uploader,
            uploaded_at: Utc::now().trunc_subsecs(6),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: Uuid,
    pub meme_id: Uuid,
    pub label: String,
    pub confidence: f64,
    /// Index of the tag in the list it was created from; manual tags come first.
    pub position: i64,
}

impl Tag {
    /// Builds one tag row per label, in order, all owned by `meme_id`.
    pub fn for_meme(meme_id: Uuid, labels: &[String]) -> Vec<Tag> {
        labels
            .iter()
            .enumerate()
            .map(|(position, label)| Tag {
                id: Uuid::new_v4(),
                meme_id,
                label: label.clone(),
                confidence: DEFAULT_TAG_CONFIDENCE,
                position: position as i64,
            })
            .collect()
    }
}

/// Response body for a successful upload.
#[derive(Serialize, Debug, Clone)]
pub struct UploadedMeme {
    pub meme: Meme,
    pub tags: Vec<String>,
}

/// One search result: the meme plus up to `SEARCH_TAG_LIMIT` of its tag labels.
#[derive(Serialize, Debug, Clone)]
pub struct SearchHit {
    #[serde(flatten)]
    pub meme: Meme,
    pub tags: Vec<String>,
}
