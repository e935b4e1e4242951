//! Configuration module
//!
//! Settings for the metadata database, the object storage backend and the
//! file lifecycle manager, read from the environment (and `.env` when present).

use std::env;
use std::time::Duration;

use crate::storage_types::StorageBackend;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const SIGNED_URL_TTL_SECS: u64 = 3600;
const MAX_CONCURRENT_SIGNATURES: usize = 16;
const MIN_SIGNING_SECRET_LEN: usize = 32;

/// Default key prefix for conversation directories in the bucket.
pub const DEFAULT_PATH_PREFIX: &str = "conversation_";

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub url_signing_secret: Option<String>,
    // Lifecycle configuration
    pub signed_url_ttl_secs: u64,
    pub storage_path_prefix: String,
    pub max_concurrent_signatures: usize,
    /// 0 disables the per-call timeout.
    pub operation_timeout_secs: u64,
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(s) if !s.trim().is_empty() => Some(s.parse::<StorageBackend>()?),
            _ => None,
        };

        let signed_url_ttl_secs = match lookup("SIGNED_URL_TTL_SECONDS") {
            Some(s) => s
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("SIGNED_URL_TTL_SECONDS must be a valid number"))?,
            None => SIGNED_URL_TTL_SECS,
        };

        Ok(Config {
            environment,
            database_url: lookup("DATABASE_URL"),
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: lookup("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: lookup("S3_BUCKET"),
            s3_region: lookup("S3_REGION"),
            s3_endpoint: lookup("S3_ENDPOINT"),
            aws_region: lookup("AWS_REGION"),
            local_storage_path: lookup("LOCAL_STORAGE_PATH"),
            local_storage_base_url: lookup("LOCAL_STORAGE_BASE_URL"),
            url_signing_secret: lookup("URL_SIGNING_SECRET"),
            signed_url_ttl_secs,
            storage_path_prefix: lookup("STORAGE_PATH_PREFIX")
                .unwrap_or_else(|| DEFAULT_PATH_PREFIX.to_string()),
            max_concurrent_signatures: lookup("MAX_CONCURRENT_SIGNATURES")
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(MAX_CONCURRENT_SIGNATURES),
            operation_timeout_secs: lookup("OPERATION_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.signed_url_ttl_secs == 0 {
            return Err(anyhow::anyhow!(
                "SIGNED_URL_TTL_SECONDS must be greater than zero"
            ));
        }

        if self.storage_path_prefix.contains('/') || self.storage_path_prefix.contains("..") {
            return Err(anyhow::anyhow!(
                "STORAGE_PATH_PREFIX must not contain '/' or '..'"
            ));
        }

        if let Some(ref url) = self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        match self.storage_backend() {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
                self.validate_signing_secret()?;
            }
            StorageBackend::Memory => {
                if self.is_production() {
                    return Err(anyhow::anyhow!(
                        "The memory storage backend cannot be used in production"
                    ));
                }
                self.validate_signing_secret()?;
            }
        }

        Ok(())
    }

    fn validate_signing_secret(&self) -> Result<(), anyhow::Error> {
        match self.url_signing_secret {
            Some(ref secret) if secret.len() >= MIN_SIGNING_SECRET_LEN => Ok(()),
            Some(_) => Err(anyhow::anyhow!(
                "URL_SIGNING_SECRET must be at least {} characters long",
                MIN_SIGNING_SECRET_LEN
            )),
            None => Err(anyhow::anyhow!(
                "URL_SIGNING_SECRET must be set for {} storage",
                self.storage_backend()
            )),
        }
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage_backend.unwrap_or(StorageBackend::S3)
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.db_timeout_seconds
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.local_storage_base_url.as_deref()
    }

    pub fn url_signing_secret(&self) -> Option<&str> {
        self.url_signing_secret.as_deref()
    }

    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.signed_url_ttl_secs)
    }

    pub fn storage_path_prefix(&self) -> &str {
        &self.storage_path_prefix
    }

    pub fn max_concurrent_signatures(&self) -> usize {
        self.max_concurrent_signatures
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        (self.operation_timeout_secs > 0).then(|| Duration::from_secs(self.operation_timeout_secs))
    }
}
