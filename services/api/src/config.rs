//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. Nothing below `main` reads the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where extract files are read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileStoreConfig {
    /// A directory on the local filesystem.
    Local { root: PathBuf },
    /// A Google Cloud Storage bucket, read through the JSON API.
    Gcs {
        base_url: String,
        bucket: String,
        access_token: Option<String>,
    },
}

/// Sender identity and credentials for digest emails.
#[derive(Clone, Debug)]
pub struct MailConfig {
    /// Without a key, digests are logged instead of sent.
    pub sendgrid_api_key: Option<String>,
    pub from_email: String,
    pub from_name: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub jwt_secret: String,
    /// Shared secret for the `/cloud` routes, sent as `X-API-KEY`.
    pub api_key: String,
    /// Public base URL used to build unsubscribe links.
    pub public_url: String,
    pub mail: MailConfig,
    pub file_store: FileStoreConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));
        let with_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Load Server and Database Settings ---
        let bind_address_str = with_default("BIND_ADDRESS", "0.0.0.0:8080");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = required("DATABASE_URL")?;

        let log_level_str = with_default("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Secrets ---
        let jwt_secret = required("JWT_SECRET")?;
        let api_key = required("API_KEY")?;
        let public_url = with_default("PUBLIC_URL", "http://localhost:8080")
            .trim_end_matches('/')
            .to_string();

        // --- Load Mail Settings ---
        let mail = MailConfig {
            sendgrid_api_key: lookup("SENDGRID_API_KEY").filter(|k| !k.is_empty()),
            from_email: with_default("MAIL_FROM_EMAIL", "insights@notebase.local"),
            from_name: with_default("MAIL_FROM_NAME", "Notebase"),
        };

        // --- Load File Store Settings ---
        let file_store = match with_default("FILE_STORE", "local").to_lowercase().as_str() {
            "local" => FileStoreConfig::Local {
                root: PathBuf::from(with_default("FILE_STORE_ROOT", "./extracts")),
            },
            "gcs" => FileStoreConfig::Gcs {
                base_url: with_default("GCS_BASE_URL", "https://storage.googleapis.com")
                    .trim_end_matches('/')
                    .to_string(),
                bucket: required("GCS_BUCKET")?,
                access_token: lookup("GCS_ACCESS_TOKEN"),
            },
            other => {
                return Err(ConfigError::InvalidValue(
                    "FILE_STORE".to_string(),
                    format!("'{}' is not one of local, gcs", other),
                ))
            }
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            jwt_secret,
            api_key,
            public_url,
            mail,
            file_store,
        })
    }
}
