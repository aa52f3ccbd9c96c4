use std::{env, net::SocketAddr, str::FromStr, time::Duration};
use thiserror::Error;

pub const DEFAULT_IMAGGA_ENDPOINT: &str = "https://api.imagga.com/v2/tags";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
}

/// Static S3 credentials, used instead of the SDK default chain when both halves are set.
#[derive(Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug)] // Clone needed if passed around, Debug for logging
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    // Bucket and region are checked at upload time, not here
    pub bucket_name: Option<String>,
    pub aws_region: Option<String>,
    pub aws_credentials: Option<StaticCredentials>,
    // Optional endpoint for LocalStack / MinIO
    pub storage_endpoint: Option<String>,
    pub imagga_api_key: String,
    pub imagga_api_secret: String,
    pub imagga_endpoint: String,
    pub external_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_address_str = non_empty("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:5000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let database_url = match non_empty("DATABASE_URL") {
            Some(url) => url,
            None => {
                let user = non_empty("DB_USER").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL or DB_USER".into()))?;
                let password = lookup("DB_PASSWORD").unwrap_or_default();
                let host = non_empty("DB_HOST").ok_or_else(|| ConfigError::MissingVar("DB_HOST".into()))?;
                let name = non_empty("DB_NAME").ok_or_else(|| ConfigError::MissingVar("DB_NAME".into()))?;
                format!("postgres://{}:{}@{}/{}", user, password, host, name)
            }
        };

        let aws_credentials = match (non_empty("AWS_ACCESS_KEY_ID"), non_empty("AWS_SECRET_ACCESS_KEY")) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                access_key_id,
                secret_access_key,
            }),
            _ => None,
        };

        let external_timeout = match non_empty("EXTERNAL_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .map_err(|e| ConfigError::InvalidVar("EXTERNAL_TIMEOUT_SECS".into(), e.to_string()))?;
                if secs == 0 {
                    return Err(ConfigError::InvalidVar(
                        "EXTERNAL_TIMEOUT_SECS".into(),
                        "must be at least 1".into(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Config {
            bind_address,
            database_url,
            bucket_name: non_empty("AWS_BUCKET_NAME"),
            aws_region: non_empty("AWS_REGION"),
            aws_credentials,
            storage_endpoint: non_empty("AWS_ENDPOINT_URL"),
            imagga_api_key: lookup("IMAGGA_API_KEY").unwrap_or_default(),
            imagga_api_secret: lookup("IMAGGA_API_SECRET").unwrap_or_default(),
            imagga_endpoint: non_empty("IMAGGA_ENDPOINT").unwrap_or_else(|| DEFAULT_IMAGGA_ENDPOINT.to_string()),
            external_timeout,
        })
    }
}
