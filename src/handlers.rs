use crate::{
    errors::AppError,
    service::{IngestOutcome, IngestRequest, UploadedFile},
    AppState,
};
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing;

pub const WELCOME_MESSAGE: &str =
    "Welcome to MemeDB! Use '/upload' to upload memes and '/search' to find them.";

const UPLOAD_FORM: &str = r#"<!doctype html>
<html>
<head><title>MemeDB - Upload</title></head>
<body>
<h1>Upload a meme</h1>
<form action="/upload" method="post" enctype="multipart/form-data">
  <label>Description <input type="text" name="descripcion" required></label><br>
  <label>User <input type="text" name="usuario" required></label><br>
  <label>Tags (comma separated) <input type="text" name="etiquetas"></label><br>
  <label>Image <input type="file" name="imagen" accept="image/*" required></label><br>
  <button type="submit">Upload</button>
</form>
</body>
</html>
"#;

/// Handler for GET /
pub async fn index() -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html><head><title>MemeDB</title></head><body><p>{}</p></body></html>\n",
        WELCOME_MESSAGE
    ))
}

/// Handler for GET /upload
pub async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

/// Handler for POST /upload
pub async fn upload_meme(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut description = None;
    let mut uploader = None;
    let mut manual_tags = None;
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        match field_name.as_str() {
            "descripcion" => description = Some(field.text().await.map_err(|e| AppError::InvalidInput(format!("Failed to read descripcion: {}", e)))?),
            "usuario" => uploader = Some(field.text().await.map_err(|e| AppError::InvalidInput(format!("Failed to read usuario: {}", e)))?),
            "etiquetas" => manual_tags = Some(field.text().await.map_err(|e| AppError::InvalidInput(format!("Failed to read etiquetas: {}", e)))?),
            "imagen" => {
                let filename = field.file_name().map(|s| s.to_string()).unwrap_or_default();
                let content_type = field.content_type().map(|m| m.to_string());
                let data = field.bytes().await?.to_vec();
                // A file input left empty arrives as a part with no filename
                if !filename.is_empty() {
                    file = Some(UploadedFile { filename, content_type, data });
                }
            }
            _ => tracing::debug!("Ignoring unknown multipart field: {}", field_name),
        }
    }

    let description = description.ok_or_else(|| AppError::MissingFormField("descripcion".to_string()))?;
    let uploader = uploader.ok_or_else(|| AppError::MissingFormField("usuario".to_string()))?;

    let outcome = state
        .memes
        .ingest(IngestRequest { description, uploader, file, manual_tags })
        .await?;

    match outcome {
        IngestOutcome::ShowForm => Ok(Html(UPLOAD_FORM).into_response()),
        IngestOutcome::Created(uploaded) => {
            tracing::info!(meme_id = %uploaded.meme.id, "Meme created successfully via handler");
            Ok((StatusCode::CREATED, Json(uploaded)).into_response())
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct SearchParams {
    pub query: Option<String>,
}

/// Handler for GET /search
pub async fn search_memes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    tracing::debug!(query = ?params.query, "Searching memes via handler");
    let hits = state.memes.search(params.query.as_deref()).await?;
    Ok(Json(hits))
}
