use crate::{
    domain::FileStorage,
    errors::StorageError,
};
use async_trait::async_trait;
use aws_sdk_s3::{
    error::SdkError,
    primitives::ByteStream,
    types::ObjectCannedAcl,
    Client as S3Client,
};
use tracing;

#[derive(Debug, Clone)]
pub struct S3FileStorage {
    client: S3Client,
}

impl S3FileStorage {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FileStorage for S3FileStorage {
    /// Uploads data to S3 using PutObject with the `public-read` canned ACL.
    async fn upload_public(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        tracing::debug!(s3_key = %key, %bucket, %content_type, size = data.len(), "S3: Uploading file");

        let body = ByteStream::from(data);
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .acl(ObjectCannedAcl::PublicRead)
            .content_type(content_type)
            .send()
            .await
            .map_err(|sdk_err| {
                // Provider rejections carry an error code worth surfacing
                if let SdkError::ServiceError(service_err) = &sdk_err {
                    let meta = service_err.err().meta();
                    return StorageError::UploadFailed(format!(
                        "{} ({})",
                        meta.code().unwrap_or("unknown"),
                        meta.message().unwrap_or("no message"),
                    ));
                }
                StorageError::BackendError(
                    anyhow::Error::new(sdk_err).context(format!("S3: Failed to upload object with key '{}'", key)),
                )
            })?;

        tracing::debug!(s3_key = %key, %bucket, "S3: Upload successful");
        Ok(())
    }
}
