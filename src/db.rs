// External crate imports
use anyhow::{Context, Result};
use sqlx::{any::AnyPoolOptions, AnyPool};
use tracing;

/// The name of the table holding meme metadata.
pub const MEMES_TABLE: &str = "memes";
/// The name of the table holding tags, one row per (meme, label).
pub const TAGS_TABLE: &str = "etiquetas";

/// Statements that work unchanged on both PostgreSQL and SQLite.
const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS memes (
        id TEXT PRIMARY KEY,
        description TEXT NOT NULL,
        path TEXT NOT NULL,
        uploader TEXT NOT NULL,
        uploaded_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS etiquetas (
        id TEXT PRIMARY KEY,
        meme_id TEXT NOT NULL REFERENCES memes(id) ON DELETE CASCADE,
        label TEXT NOT NULL,
        confidence DOUBLE PRECISION NOT NULL,
        position BIGINT NOT NULL DEFAULT 0
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_etiquetas_meme_id ON etiquetas (meme_id)"#,
];

/// Opens a connection pool for `database_url` (`postgres://...` or `sqlite:...`).
///
/// In-memory SQLite databases are private to one connection, so their pool is capped at one.
pub async fn connect(database_url: &str) -> Result<AnyPool> {
    sqlx::any::install_default_drivers();

    let max_connections = if database_url.starts_with("sqlite") && database_url.contains(":memory:") {
        1
    } else {
        5
    };

    let pool = AnyPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to the database")?;

    tracing::info!(max_connections, "Database pool ready");
    Ok(pool)
}

/// Creates the memes and tags tables if they do not already exist.
pub async fn run_migration(pool: &AnyPool) -> Result<()> {
    for stmt in SCHEMA {
        sqlx::query(stmt)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to apply schema statement: {}", stmt))?;
    }
    tracing::info!("Tables '{}' and '{}' are ready.", MEMES_TABLE, TAGS_TABLE);
    Ok(())
}
