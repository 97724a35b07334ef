//! Server configuration from environment variables.
//!
//! | Variable               | Default                     |
//! |------------------------|-----------------------------|
//! | `DATABASE_URL`         | `postgres://localhost/refshelf` |
//! | `HOST`                 | `0.0.0.0`                   |
//! | `PORT`                 | `3000`                      |
//! | `FILE_STORAGE_PATH`    | `/var/lib/refshelf/files`   |
//! | `MAX_UPLOAD_BYTES`     | 25 MiB                      |
//! | `INGEST_CONCURRENCY`   | `4`                         |
//! | `PDFTOPPM_PATH`        | `pdftoppm`                  |
//! | `PREVIEW_DPI`          | `72`                        |
//! | `PREVIEW_TIMEOUT_SECS` | `60`                        |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use refshelf_core::defaults;
use refshelf_ingest::{IngestConfig, PdftoppmRenderer};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Everything the server binary needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub file_storage_path: PathBuf,
    pub max_upload_bytes: usize,
    pub ingest_concurrency: usize,
    pub pdftoppm_path: PathBuf,
    pub preview_dpi: u32,
    pub preview_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: defaults::DATABASE_URL.to_string(),
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            file_storage_path: PathBuf::from(defaults::FILE_STORAGE_PATH),
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
            ingest_concurrency: defaults::INGEST_CONCURRENCY,
            pdftoppm_path: PathBuf::from(defaults::PDFTOPPM_PATH),
            preview_dpi: defaults::PREVIEW_DPI,
            preview_timeout: Duration::from_secs(defaults::PREVIEW_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unset or blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(host) = get("HOST") {
            config.host = host;
        }
        if let Some(port) = get("PORT") {
            config.port = parse("PORT", &port)?;
        }
        if let Some(path) = get("FILE_STORAGE_PATH") {
            config.file_storage_path = PathBuf::from(path);
        }
        if let Some(bytes) = get("MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse("MAX_UPLOAD_BYTES", &bytes)?;
        }
        if let Some(n) = get("INGEST_CONCURRENCY") {
            config.ingest_concurrency = parse("INGEST_CONCURRENCY", &n)?;
        }
        if let Some(path) = get("PDFTOPPM_PATH") {
            config.pdftoppm_path = PathBuf::from(path);
        }
        if let Some(dpi) = get("PREVIEW_DPI") {
            config.preview_dpi = parse("PREVIEW_DPI", &dpi)?;
        }
        if let Some(secs) = get("PREVIEW_TIMEOUT_SECS") {
            config.preview_timeout = Duration::from_secs(parse("PREVIEW_TIMEOUT_SECS", &secs)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "MAX_UPLOAD_BYTES must be greater than zero".to_string(),
            ));
        }
        if self.max_upload_bytes > defaults::REQUEST_BODY_LIMIT * 3 / 4 {
            return Err(ConfigError::Validation(format!(
                "MAX_UPLOAD_BYTES cannot exceed {} (request body limit after base64)",
                defaults::REQUEST_BODY_LIMIT * 3 / 4
            )));
        }
        if self.ingest_concurrency == 0 {
            return Err(ConfigError::Validation(
                "INGEST_CONCURRENCY must be at least 1".to_string(),
            ));
        }
        if self.preview_dpi == 0 {
            return Err(ConfigError::Validation(
                "PREVIEW_DPI must be greater than zero".to_string(),
            ));
        }
        if self.preview_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "PREVIEW_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Socket address string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ingest(&self) -> IngestConfig {
        IngestConfig::default()
            .with_max_upload_bytes(self.max_upload_bytes)
            .with_concurrency(self.ingest_concurrency)
    }

    pub fn renderer(&self) -> PdftoppmRenderer {
        PdftoppmRenderer::new(self.pdftoppm_path.clone())
            .with_dpi(self.preview_dpi)
            .with_timeout(self.preview_timeout)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::Validation(format!("{} has an invalid value: '{}'", key, value))
    })
}
