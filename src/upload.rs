use crate::domain::FileStorage;
use std::sync::Arc;
use tracing;

/// Prefix under which every meme image is stored in the bucket.
pub const KEY_PREFIX: &str = "memes";

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "AUX", "COM1", "COM2", "COM3", "COM4", "LPT1", "LPT2", "LPT3", "PRN", "NUL",
];

/// Reduces a client-supplied filename to a safe storage key component.
///
/// Directory components are dropped, whitespace runs become `_` and anything
/// outside `[A-Za-z0-9._-]` is removed. Returns `None` when nothing usable is left.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        return None;
    }

    let stem = trimmed.split('.').next().unwrap_or_default().to_ascii_uppercase();
    if WINDOWS_DEVICE_NAMES.contains(&stem.as_str()) {
        Some(format!("_{}", trimmed))
    } else {
        Some(trimmed.to_string())
    }
}

/// Public virtual-hosted style URL of an object.
pub fn public_url(bucket: &str, region: &str, key: &str) -> String {
    format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key)
}

/// Content type to store the object with: the declared one, else a guess from the name.
pub fn resolve_content_type(declared: Option<&str>, filename: &str) -> String {
    declared
        .filter(|ct| !ct.trim().is_empty())
        .map(|ct| ct.to_string())
        .or_else(|| mime_guess::from_path(filename).first_raw().map(|s| s.to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Pushes meme images to object storage and hands back their public URL.
///
/// Every failure is logged and reported as `None`; callers never see an error.
#[derive(Clone)]
pub struct MemeUploader {
    storage: Arc<dyn FileStorage>,
    bucket_name: Option<String>,
    region: Option<String>,
}

impl MemeUploader {
    pub fn new(storage: Arc<dyn FileStorage>, bucket_name: Option<String>, region: Option<String>) -> Self {
        Self { storage, bucket_name, region }
    }

    pub async fn upload(&self, data: Option<Vec<u8>>, filename: &str, content_type: Option<&str>) -> Option<String> {
        let Some(data) = data else {
            tracing::warn!("Upload: no file data supplied");
            return None;
        };
        if filename.is_empty() {
            tracing::warn!("Upload: file has no name");
            return None;
        }

        let Some(safe_name) = sanitize_filename(filename) else {
            tracing::warn!(%filename, "Upload: filename is not usable after sanitizing");
            return None;
        };
        let key = format!("{}/{}", KEY_PREFIX, safe_name);
        tracing::debug!(s3_key = %key, "Upload: computed storage key");

        let (Some(bucket), Some(region)) = (self.bucket_name.as_deref(), self.region.as_deref()) else {
            tracing::error!(
                bucket_set = self.bucket_name.is_some(),
                region_set = self.region.is_some(),
                "Upload: storage bucket or region is not configured"
            );
            return None;
        };

        let content_type = resolve_content_type(content_type, &safe_name);
        match self.storage.upload_public(bucket, &key, data, &content_type).await {
            Ok(()) => {
                let url = public_url(bucket, region, &key);
                tracing::info!(%url, "Upload: image stored");
                Some(url)
            }
            Err(e) => {
                tracing::error!(s3_key = %key, error = %e, "Upload: storage rejected the image");
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::errors::StorageError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records uploads in memory; optionally fails every call.
    #[derive(Default)]
    pub(crate) struct RecordingStorage {
        pub fail: bool,
        pub uploads: Mutex<Vec<(String, String, usize, String)>>,
    }

    #[async_trait]
    impl FileStorage for RecordingStorage {
        async fn upload_public(
            &self,
            bucket: &str,
            key: &str,
            data: Vec<u8>,
            content_type: &str,
        ) -> Result<(), StorageError> {
            if self.fail {
                return Err(StorageError::UploadFailed("AccessDenied (denied)".into()));
            }
            self.uploads
                .lock()
                .unwrap()
                .push((bucket.to_string(), key.to_string(), data.len(), content_type.to_string()));
            Ok(())
        }
    }

    /// Never completes the upload; gives up with a timeout error like the SDK does.
    struct StalledStorage {
        timeout: std::time::Duration,
    }

    #[async_trait]
    impl FileStorage for StalledStorage {
        async fn upload_public(&self, _: &str, _: &str, _: Vec<u8>, _: &str) -> Result<(), StorageError> {
            tokio::time::timeout(self.timeout, std::future::pending::<()>())
                .await
                .map_err(|elapsed| StorageError::BackendError(anyhow::Error::new(elapsed).context("S3: operation timed out")))
        }
    }

    fn uploader(storage: Arc<RecordingStorage>) -> MemeUploader {
        MemeUploader::new(storage, Some("bucket".into()), Some("region".into()))
    }

    #[test]
    fn sanitize_strips_paths_and_unsafe_characters() {
        assert_eq!(sanitize_filename("f.png").as_deref(), Some("f.png"));
        assert_eq!(sanitize_filename("my funny  cat.jpg").as_deref(), Some("my_funny_cat.jpg"));
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename("C:\\Users\\me\\pic (1).gif").as_deref(), Some("pic_1.gif"));
        assert_eq!(sanitize_filename(".hidden.png").as_deref(), Some("hidden.png"));
        assert_eq!(sanitize_filename("nul.txt").as_deref(), Some("_nul.txt"));
    }

    #[test]
    fn sanitize_rejects_names_with_nothing_left() {
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("..."), None);
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename("ñú"), None);
    }

    #[test]
    fn content_type_prefers_declared_then_guesses() {
        assert_eq!(resolve_content_type(Some("image/webp"), "a.png"), "image/webp");
        assert_eq!(resolve_content_type(None, "a.png"), "image/png");
        assert_eq!(resolve_content_type(Some(""), "a.jpg"), "image/jpeg");
        assert_eq!(resolve_content_type(None, "noext"), "application/octet-stream");
    }

    #[tokio::test]
    async fn upload_returns_public_url_and_stores_under_memes_prefix() {
        let storage = Arc::new(RecordingStorage::default());
        let url = uploader(storage.clone())
            .upload(Some(vec![1, 2, 3]), "f.png", Some("image/png"))
            .await;

        assert_eq!(url.as_deref(), Some("https://bucket.s3.region.amazonaws.com/memes/f.png"));
        let uploads = storage.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0], ("bucket".to_string(), "memes/f.png".to_string(), 3, "image/png".to_string()));
    }

    #[tokio::test]
    async fn upload_fails_softly_on_bad_input() {
        let storage = Arc::new(RecordingStorage::default());
        let uploader = uploader(storage.clone());

        assert_eq!(uploader.upload(None, "f.png", None).await, None);
        assert_eq!(uploader.upload(Some(vec![1]), "", None).await, None);
        assert_eq!(uploader.upload(Some(vec![1]), "../..", None).await, None);
        assert!(storage.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_fails_when_bucket_or_region_missing() {
        let storage = Arc::new(RecordingStorage::default());

        let no_bucket = MemeUploader::new(storage.clone(), None, Some("region".into()));
        assert_eq!(no_bucket.upload(Some(vec![1]), "f.png", None).await, None);

        let no_region = MemeUploader::new(storage.clone(), Some("bucket".into()), None);
        assert_eq!(no_region.upload(Some(vec![1]), "f.png", None).await, None);

        assert!(storage.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_fails_when_storage_rejects() {
        let storage = Arc::new(RecordingStorage { fail: true, ..Default::default() });
        assert_eq!(uploader(storage).upload(Some(vec![1]), "f.png", None).await, None);
    }

    #[tokio::test]
    async fn upload_fails_when_storage_times_out() {
        let storage = Arc::new(StalledStorage { timeout: std::time::Duration::from_millis(100) });
        let uploader = MemeUploader::new(storage, Some("bucket".into()), Some("region".into()));

        let started = std::time::Instant::now();
        assert_eq!(uploader.upload(Some(vec![1]), "f.png", None).await, None);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[tokio::test]
    async fn same_filename_maps_to_same_key() {
        let storage = Arc::new(RecordingStorage::default());
        let uploader = uploader(storage.clone());
        let first = uploader.upload(Some(vec![1]), "dup.png", None).await;
        let second = uploader.upload(Some(vec![2, 2]), "dup.png", None).await;

        assert_eq!(first, second);
        let uploads = storage.uploads.lock().unwrap();
        assert_eq!(uploads[0].1, uploads[1].1);
    }
}
