use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error; // Use thiserror for cleaner error definitions

/// Message shown to the uploader whenever the image could not be stored.
pub const UPLOAD_FAILED_MESSAGE: &str = "Error uploading the image. Please try again.";

// --- Domain/Infrastructure Errors ---

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Database backend error: {0}")]
    BackendError(#[from] anyhow::Error), // Wrap Anyhow errors from DB layer

    #[error("Stored row could not be decoded: {0}")]
    DataCorruption(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File upload failed: {0}")]
    UploadFailed(String), // Pass specific reason

    #[error("Storage backend error: {0}")]
    BackendError(#[from] anyhow::Error), // Wrap Anyhow errors from Storage layer
}

/// Failures of the ingestion workflow that stop a meme from being created.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Image upload failed")]
    UploadFailed,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Repository(#[from] RepoError),
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    // Input validation / request parsing errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Missing form field: {0}")]
    MissingFormField(String),
    #[error("Error processing multipart form data: {0}")]
    MultipartError(#[from] axum::extract::multipart::MultipartError),

    // Domain/Service level errors
    #[error("{}", UPLOAD_FAILED_MESSAGE)]
    UploadFailed,
    #[error("Could not access meme data")]
    RepositoryError(#[source] RepoError), // Source allows seeing underlying RepoError

    // Configuration / Startup errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Initialization error: {0}")]
    InitError(String),

    // Generic Internal Server Error
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

// --- Conversions from Domain Errors to AppError ---

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        AppError::RepositoryError(err)
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UploadFailed => AppError::UploadFailed,
            IngestError::InvalidInput(msg) => AppError::InvalidInput(msg),
            IngestError::Repository(e) => AppError::RepositoryError(e),
        }
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalServerError(format!("IO error: {}", err))
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            // 4xx Client Errors
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::MissingFormField(field) => (StatusCode::BAD_REQUEST, format!("Missing form field: {}", field)),
            AppError::MultipartError(e) => (StatusCode::BAD_REQUEST, format!("Invalid multipart form data: {}", e)),

            // Upload failures get the fixed plain-text message, nothing else
            AppError::UploadFailed => {
                tracing::warn!("Responding with upload failure message");
                return (StatusCode::BAD_GATEWAY, UPLOAD_FAILED_MESSAGE).into_response();
            }

            // 5xx Server Errors
            AppError::RepositoryError(e) => {
                tracing::error!(error.source = ?e, "Repository error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database operation failed".to_string())
            },
            AppError::ConfigError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server configuration error".to_string())
            },
            AppError::InitError(msg) => {
                tracing::error!("Initialization error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server initialization error".to_string())
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occurred".to_string())
            }
        };

        // Log the specific error variant and message
        tracing::error!(error.message=%error_message, error.detail=%self, "Responding with error");

        // Build JSON response
        let body = Json(serde_json::json!({ "error": error_message }));
        (status, body).into_response()
    }
}
