use crate::{config::Config, db, errors::AppError};
use aws_sdk_s3::{
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client as S3Client, error::SdkError as S3SdkError,
};
use sqlx::AnyPool;
use tracing;

/// Creates the memes and tags tables if they don't exist.
async fn ensure_schema(pool: &AnyPool) -> Result<(), AppError> {
    db::run_migration(pool).await.map_err(|e| {
        tracing::error!("Startup: schema creation failed: {:?}", e);
        AppError::InitError(format!("Failed to create database schema: {:#}", e))
    })
}

/// Error codes S3 returns when the bucket is already there.
fn is_existing_bucket(code: Option<&str>) -> bool {
    matches!(code, Some("BucketAlreadyOwnedByYou" | "BucketAlreadyExists"))
}

/// Creates the bucket on an S3 emulator; a bucket that already exists is fine.
async fn ensure_bucket(client: &S3Client, bucket: &str, region: &str) -> Result<(), AppError> {
    let mut request = client.create_bucket().bucket(bucket);
    // us-east-1 rejects an explicit location constraint
    if region != "us-east-1" {
        request = request.create_bucket_configuration(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build(),
        );
    }

    match request.send().await {
        Ok(_) => {
            tracing::info!(%bucket, "Startup: bucket created");
            Ok(())
        }
        Err(S3SdkError::ServiceError(e)) if is_existing_bucket(e.err().meta().code()) => {
            tracing::info!(%bucket, "Startup: bucket already exists");
            Ok(())
        }
        Err(e) => Err(AppError::InitError(format!("Failed to create bucket '{}': {}", bucket, e))),
    }
}

/// Prepares the database schema and, against a local S3 emulator, the bucket.
///
/// Real AWS buckets are provisioned outside the application.
pub async fn init_resources(pool: &AnyPool, s3_client: &S3Client, config: &Config) -> Result<(), AppError> {
    tracing::info!("Startup: Initializing resources...");
    ensure_schema(pool).await?;

    match (&config.storage_endpoint, &config.bucket_name, &config.aws_region) {
        (Some(_), Some(bucket), Some(region)) => ensure_bucket(s3_client, bucket, region).await?,
        (_, None, _) | (_, _, None) => {
            tracing::warn!("Startup: AWS_BUCKET_NAME or AWS_REGION is not set; every upload will fail");
        }
        _ => {}
    }

    tracing::info!("Startup: Resource initialization complete.");
    Ok(())
}
