use crate::{
    handlers, // Import handlers module
    AppState, // Use the AppState defined in main.rs
};
use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/upload", get(handlers::upload_form).post(handlers::upload_meme))
        .route("/search", get(handlers::search_memes))
        // Middleware Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .with_state(state) // Pass the application state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::MemeRepository,
        errors::UPLOAD_FAILED_MESSAGE,
        service::tests::{harness, Harness},
        upload::tests::RecordingStorage,
    };
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const BOUNDARY: &str = "----memedb-test-boundary";

    fn app(h: &Harness) -> Router {
        create_router(Arc::new(AppState { memes: h.service.clone() }))
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Builds a multipart body; a part with `Some(filename)` is sent as a file.
    fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> String {
        let mut body = String::new();
        for (name, filename, value) in parts {
            body.push_str(&format!("--{}\r\n", BOUNDARY));
            match filename {
                Some(filename) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                    name, filename
                )),
                None => body.push_str(&format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)),
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));
        body
    }

    fn upload_request(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    #[tokio::test]
    async fn index_shows_welcome_text() {
        let h = harness(RecordingStorage::default(), &[]).await;
        let response = app(&h)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("Welcome to MemeDB!"));
    }

    #[tokio::test]
    async fn upload_form_is_served() {
        let h = harness(RecordingStorage::default(), &[]).await;
        let response = app(&h)
            .oneshot(Request::builder().uri("/upload").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("name=\"imagen\""));
        assert!(body.contains("name=\"etiquetas\""));
    }

    #[tokio::test]
    async fn upload_creates_meme_and_returns_combined_tags() {
        let h = harness(RecordingStorage::default(), &["cat"]).await;
        let response = app(&h)
            .oneshot(upload_request(&[
                ("descripcion", None, "D"),
                ("usuario", None, "U"),
                ("etiquetas", None, "funny, cats ,dogs"),
                ("imagen", Some("f.png"), "PNGDATA"),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["tags"], serde_json::json!(["funny", "cats", "dogs", "cat"]));
        assert_eq!(json["meme"]["path"], "https://bucket.s3.region.amazonaws.com/memes/f.png");
        assert_eq!(json["meme"]["uploader"], "U");
        assert_eq!(h.repo.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upload_without_image_redisplays_form() {
        let h = harness(RecordingStorage::default(), &[]).await;
        let response = app(&h)
            .oneshot(upload_request(&[
                ("descripcion", None, "D"),
                ("usuario", None, "U"),
                ("imagen", Some(""), ""),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("<form"));
        assert!(h.repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_failure_returns_fixed_message() {
        let h = harness(RecordingStorage { fail: true, ..Default::default() }, &[]).await;
        let response = app(&h)
            .oneshot(upload_request(&[
                ("descripcion", None, "D"),
                ("usuario", None, "U"),
                ("imagen", Some("f.png"), "PNGDATA"),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_string(response).await, UPLOAD_FAILED_MESSAGE);
        assert!(h.repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_required_field_is_bad_request() {
        let h = harness(RecordingStorage::default(), &[]).await;
        let response = app(&h)
            .oneshot(upload_request(&[("descripcion", None, "D"), ("imagen", Some("f.png"), "PNGDATA")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("usuario"));
    }

    #[tokio::test]
    async fn search_returns_matching_memes_with_tags() {
        let h = harness(RecordingStorage::default(), &[]).await;
        let router = app(&h);
        for (description, tags) in [("cat nap", "sleepy"), ("dog", "dog"), ("bird", "catbird")] {
            let response = router
                .clone()
                .oneshot(upload_request(&[
                    ("descripcion", None, description),
                    ("usuario", None, "U"),
                    ("etiquetas", None, tags),
                    ("imagen", Some("x.png"), "PNGDATA"),
                ]))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/search?query=cat").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let hits: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        let mut descriptions: Vec<&str> = hits
            .as_array()
            .unwrap()
            .iter()
            .map(|hit| hit["description"].as_str().unwrap())
            .collect();
        descriptions.sort();
        assert_eq!(descriptions, vec!["bird", "cat nap"]);

        let response = router
            .oneshot(Request::builder().uri("/search").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let hits: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(hits.as_array().unwrap().len(), 3);
        assert!(hits[0]["tags"].is_array());
    }
}
