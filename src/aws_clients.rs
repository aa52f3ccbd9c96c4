use crate::config::Config;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_s3::Client as S3Client;
use aws_smithy_types::timeout::TimeoutConfig;
use tracing;

// Creates the base AWS SDK configuration based on application config.
// Region, static credentials and endpoint are all optional; the SDK default
// provider chain fills in whatever is not set.
pub async fn create_sdk_config(config: &Config) -> SdkConfig {
    let timeouts = TimeoutConfig::builder()
        .operation_timeout(config.external_timeout)
        .build();

    let mut config_loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(timeouts);

    if let Some(region) = &config.aws_region {
        tracing::info!(sdk_region = %region, "Setting SDK region");
        config_loader = config_loader.region(Region::new(region.clone()));
    }

    if let Some(creds) = &config.aws_credentials {
        tracing::info!(access_key_id = %creds.access_key_id, "Using static AWS credentials from the environment");
        config_loader = config_loader.credentials_provider(Credentials::new(
            creds.access_key_id.clone(),
            creds.secret_access_key.clone(),
            None,
            None,
            "meme_db-env",
        ));
    }

    if let Some(endpoint_url) = &config.storage_endpoint {
        tracing::info!("Using storage endpoint override: {}", endpoint_url);
        config_loader = config_loader.endpoint_url(endpoint_url);
    } else {
        tracing::info!("Using default AWS endpoints.");
    }

    config_loader.load().await
}

// Creates an S3 client from a shared SdkConfig.
// S3 emulators behind an endpoint override need path-style addressing.
pub fn create_s3_client(sdk_config: &SdkConfig, path_style: bool) -> S3Client {
    let s3_config = aws_sdk_s3::config::Builder::from(sdk_config)
        .force_path_style(path_style)
        .build();
    S3Client::from_conf(s3_config)
}
