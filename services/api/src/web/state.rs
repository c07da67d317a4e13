//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::{DbAdapter, GcsFileStore, JwtService, LocalFileStore, LogMailer, SendGridMailer};
use crate::config::{Config, FileStoreConfig};
use crate::error::ApiError;
use notebase_core::ports::{BookStore, FileStore, HighlightStore, Mailer, UserStore};
use notebase_core::{DigestDispatcher, Ingestor};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
/// Holds no cached domain data; every request goes to the stores.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn UserStore>,
    pub highlights: Arc<dyn HighlightStore>,
    pub books: Arc<dyn BookStore>,
    pub files: Arc<dyn FileStore>,
    pub mailer: Arc<dyn Mailer>,
    pub tokens: Arc<JwtService>,
}

impl AppState {
    /// Connects to the database, runs migrations, and wires the production adapters.
    pub async fn connect(config: Arc<Config>) -> Result<Self, ApiError> {
        // --- Database ---
        info!("Connecting to database...");
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&config.database_url)
            .await?;
        let db = Arc::new(DbAdapter::new(db_pool));
        info!("Running database migrations...");
        db.run_migrations().await?;
        info!("Database migrations complete.");

        // --- File store ---
        let http = reqwest::Client::new();
        let files: Arc<dyn FileStore> = match &config.file_store {
            FileStoreConfig::Local { root } => {
                info!(root = %root.display(), "Reading extracts from a local directory");
                Arc::new(LocalFileStore::new(root.clone()))
            }
            FileStoreConfig::Gcs {
                base_url,
                bucket,
                access_token,
            } => {
                info!(bucket = %bucket, "Reading extracts from Cloud Storage");
                Arc::new(GcsFileStore::new(
                    http.clone(),
                    base_url.clone(),
                    bucket.clone(),
                    access_token.clone(),
                ))
            }
        };

        // --- Mailer ---
        let mailer: Arc<dyn Mailer> = match &config.mail.sendgrid_api_key {
            Some(key) => Arc::new(SendGridMailer::new(
                http,
                key.clone(),
                config.mail.from_email.clone(),
                config.mail.from_name.clone(),
                config.public_url.clone(),
            )),
            None => {
                warn!("SENDGRID_API_KEY is not set; digests will only be logged");
                Arc::new(LogMailer::new(config.public_url.clone()))
            }
        };

        let tokens = Arc::new(JwtService::new(&config.jwt_secret));

        Ok(Self {
            config,
            users: db.clone(),
            highlights: db.clone(),
            books: db,
            files,
            mailer,
            tokens,
        })
    }

    pub fn ingestor(&self) -> Ingestor {
        Ingestor::new(self.books.clone(), self.highlights.clone())
    }

    pub fn dispatcher(&self) -> DigestDispatcher {
        DigestDispatcher::new(
            self.users.clone(),
            self.highlights.clone(),
            self.books.clone(),
            self.mailer.clone(),
            self.tokens.clone(),
        )
    }
}
