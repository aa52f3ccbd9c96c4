use crate::{
    domain::MemeRepository,
    errors::RepoError,
    models::{Meme, Tag},
};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{any::AnyRow, AnyPool, Row};
use tracing::{self, info};
use uuid::Uuid;

const MEME_COLUMNS: &str = "id, description, path, uploader, uploaded_at";

#[derive(Debug, Clone)]
pub struct SqlMemeRepository {
    pool: AnyPool,
}

impl SqlMemeRepository {
    pub fn new(pool: AnyPool) -> Self {
        info!("Initializing SqlMemeRepository");
        Self { pool }
    }

    async fn fetch_memes(&self, sql: &str, needle: Option<&str>) -> Result<Vec<Meme>, RepoError> {
        let mut query = sqlx::query(sql);
        if let Some(needle) = needle {
            query = query.bind(like_pattern(needle));
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .context(format!("Failed to run meme query: {}", sql))
            .map_err(RepoError::BackendError)?;

        rows.iter().map(meme_from_row).collect()
    }
}

#[async_trait]
impl MemeRepository for SqlMemeRepository {
    async fn create_with_tags(&self, meme: &Meme, tags: &[Tag]) -> Result<(), RepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to open transaction")
            .map_err(RepoError::BackendError)?;

        sqlx::query("INSERT INTO memes (id, description, path, uploader, uploaded_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(meme.id.to_string())
            .bind(meme.description.as_str())
            .bind(meme.path.as_str())
            .bind(meme.uploader.as_str())
            .bind(format_timestamp(&meme.uploaded_at))
            .execute(&mut *tx)
            .await
            .context(format!("Failed to insert meme (id: {})", meme.id))
            .map_err(RepoError::BackendError)?;

        for tag in tags {
            sqlx::query("INSERT INTO etiquetas (id, meme_id, label, confidence, position) VALUES ($1, $2, $3, $4, $5)")
                .bind(tag.id.to_string())
                .bind(tag.meme_id.to_string())
                .bind(tag.label.as_str())
                .bind(tag.confidence)
                .bind(tag.position)
                .execute(&mut *tx)
                .await
                .context(format!("Failed to insert tag '{}' for meme (id: {})", tag.label, meme.id))
                .map_err(RepoError::BackendError)?;
        }

        // Dropping the transaction on any error above rolls both inserts back
        tx.commit()
            .await
            .context(format!("Failed to commit meme (id: {})", meme.id))
            .map_err(RepoError::BackendError)?;

        tracing::debug!(meme_id = %meme.id, tag_count = tags.len(), "Stored meme with tags");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Meme>, RepoError> {
        let sql = format!("SELECT {} FROM memes ORDER BY uploaded_at DESC, id ASC", MEME_COLUMNS);
        let memes = self.fetch_memes(&sql, None).await?;
        tracing::debug!(count = memes.len(), "Listed all memes");
        Ok(memes)
    }

    async fn find_by_text(&self, needle: &str) -> Result<Vec<Meme>, RepoError> {
        let sql = format!(
            "SELECT {} FROM memes WHERE description LIKE $1 ESCAPE '\\' OR uploader LIKE $1 ESCAPE '\\' \
             ORDER BY uploaded_at DESC, id ASC",
            MEME_COLUMNS
        );
        self.fetch_memes(&sql, Some(needle)).await
    }

    async fn find_by_tag_label(&self, needle: &str) -> Result<Vec<Meme>, RepoError> {
        let sql = format!(
            "SELECT {} FROM memes WHERE id IN (SELECT meme_id FROM etiquetas WHERE label LIKE $1 ESCAPE '\\') \
             ORDER BY uploaded_at DESC, id ASC",
            MEME_COLUMNS
        );
        self.fetch_memes(&sql, Some(needle)).await
    }

    async fn tags_for(&self, meme_id: Uuid, limit: usize) -> Result<Vec<Tag>, RepoError> {
        let rows = sqlx::query(
            "SELECT id, meme_id, label, confidence, position FROM etiquetas \
             WHERE meme_id = $1 ORDER BY position ASC, id ASC LIMIT $2",
        )
        .bind(meme_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context(format!("Failed to load tags for meme (id: {})", meme_id))
        .map_err(RepoError::BackendError)?;

        rows.iter().map(tag_from_row).collect()
    }
}

/// Fixed-width UTC timestamp so that text ordering matches time ordering.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `%needle%` with LIKE wildcards in `needle` escaped.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn parse_uuid(raw: &str, column: &str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(raw).map_err(|e| RepoError::DataCorruption(format!("{} '{}' is not a UUID: {}", column, raw, e)))
}

fn column<T>(row: &AnyRow, name: &str) -> Result<T, RepoError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Any> + sqlx::Type<sqlx::Any>,
{
    row.try_get(name)
        .map_err(|e| RepoError::DataCorruption(format!("column '{}': {}", name, e)))
}

fn meme_from_row(row: &AnyRow) -> Result<Meme, RepoError> {
    let id: String = column(row, "id")?;
    let uploaded_at: String = column(row, "uploaded_at")?;
    let uploaded_at = DateTime::parse_from_rfc3339(&uploaded_at)
        .map_err(|e| RepoError::DataCorruption(format!("uploaded_at '{}': {}", uploaded_at, e)))?
        .with_timezone(&Utc);

    Ok(Meme {
        id: parse_uuid(&id, "memes.id")?,
        description: column(row, "description")?,
        path: column(row, "path")?,
        uploader: column(row, "uploader")?,
        uploaded_at,
    })
}

fn tag_from_row(row: &AnyRow) -> Result<Tag, RepoError> {
    let id: String = column(row, "id")?;
    let meme_id: String = column(row, "meme_id")?;

    Ok(Tag {
        id: parse_uuid(&id, "etiquetas.id")?,
        meme_id: parse_uuid(&meme_id, "etiquetas.meme_id")?,
        label: column(row, "label")?,
        confidence: column(row, "confidence")?,
        position: column(row, "position")?,
    })
}
