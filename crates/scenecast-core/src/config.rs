//! Configuration module
//!
//! Environment-driven configuration for the composition service. Defaults
//! suit local development; `validate` enforces the handful of settings that
//! must be explicit in production.

use std::env;

const DEFAULT_PORT: u16 = 8890;
const DEFAULT_FETCH_CONCURRENCY: usize = 6;
const MAX_FETCH_CONCURRENCY: usize = 32;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;
const DEFAULT_FETCH_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_COMPOSE_TIMEOUT_SECS: u64 = 300;
const DEFAULT_MAX_REQUEST_BODY_MB: usize = 2;

/// Which backend the optional upload collaborator should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Local,
}

/// Application configuration for the composer service.
#[derive(Clone, Debug)]
pub struct ComposerConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    /// Simultaneous asset transfers per composition request.
    pub fetch_concurrency: usize,
    pub fetch_timeout_secs: u64,
    pub fetch_connect_timeout_secs: u64,
    /// Request deadline covering fetch + probe + render.
    pub compose_timeout_secs: u64,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub max_request_body_bytes: usize,
    // Optional upload collaborator
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
}

impl ComposerConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let storage_backend =
            env::var("STORAGE_BACKEND")
                .ok()
                .and_then(|s| match s.to_lowercase().as_str() {
                    "s3" => Some(StorageBackend::S3),
                    "local" => Some(StorageBackend::Local),
                    _ => None,
                });

        let config = ComposerConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            fetch_concurrency: env::var("FETCH_CONCURRENCY")
                .unwrap_or_else(|_| DEFAULT_FETCH_CONCURRENCY.to_string())
                .parse()
                .unwrap_or(DEFAULT_FETCH_CONCURRENCY),
            fetch_timeout_secs: env::var("FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_FETCH_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            fetch_connect_timeout_secs: env::var("FETCH_CONNECT_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_FETCH_CONNECT_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_FETCH_CONNECT_TIMEOUT_SECS),
            compose_timeout_secs: env::var("COMPOSE_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_COMPOSE_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_COMPOSE_TIMEOUT_SECS),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            max_request_body_bytes: env::var("MAX_REQUEST_BODY_MB")
                .unwrap_or_else(|_| DEFAULT_MAX_REQUEST_BODY_MB.to_string())
                .parse::<usize>()
                .unwrap_or(DEFAULT_MAX_REQUEST_BODY_MB)
                * 1024
                * 1024,
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok().or(env::var("AWS_REGION").ok()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.fetch_concurrency == 0 || self.fetch_concurrency > MAX_FETCH_CONCURRENCY {
            return Err(anyhow::anyhow!(
                "FETCH_CONCURRENCY must be between 1 and {}",
                MAX_FETCH_CONCURRENCY
            ));
        }

        if self.compose_timeout_secs == 0 {
            return Err(anyhow::anyhow!("COMPOSE_TIMEOUT_SECS must be positive"));
        }

        match self.storage_backend {
            Some(StorageBackend::S3) => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            Some(StorageBackend::Local) => {
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
            }
            None => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ComposerConfig {
        ComposerConfig {
            server_port: DEFAULT_PORT,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            fetch_connect_timeout_secs: DEFAULT_FETCH_CONNECT_TIMEOUT_SECS,
            compose_timeout_secs: DEFAULT_COMPOSE_TIMEOUT_SECS,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            max_request_body_bytes: DEFAULT_MAX_REQUEST_BODY_MB * 1024 * 1024,
            storage_backend: None,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: None,
            local_storage_base_url: None,
        }
    }

    #[test]
    fn test_development_accepts_wildcard_cors() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_production_rejects_wildcard_cors() {
        let mut config = base_config();
        config.environment = "production".to_string();
        assert!(config.validate().is_err());

        config.cors_origins = vec!["https://app.example.com".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_fetch_concurrency() {
        let mut config = base_config();
        config.fetch_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_s3_backend_requires_bucket_and_region() {
        let mut config = base_config();
        config.storage_backend = Some(StorageBackend::S3);
        assert!(config.validate().is_err());

        config.s3_bucket = Some("artifacts".to_string());
        config.s3_region = Some("us-east-1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_local_backend_requires_path_and_base_url() {
        let mut config = base_config();
        config.storage_backend = Some(StorageBackend::Local);
        assert!(config.validate().is_err());

        config.local_storage_path = Some("/var/lib/scenecast/media".to_string());
        config.local_storage_base_url = Some("http://localhost:8890/media".to_string());
        assert!(config.validate().is_ok());
    }
}
