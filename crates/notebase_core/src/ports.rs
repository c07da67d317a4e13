//! crates/notebase_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific storage, file, and mail implementations.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Book, DailyInsight, Highlight, NewBook, NewHighlight, NewUser, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A unique key already exists (e.g. a book created twice).
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    /// The mail provider refused or failed to deliver a message.
    #[error("Delivery failed: {0}")]
    Delivery(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Store Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    /// Used by login only; the hash never leaves the auth path.
    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    /// Returns active and inactive users alike.
    async fn list_users(&self) -> PortResult<Vec<User>>;

    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;

    async fn update_user(&self, user: &User) -> PortResult<()>;
}

#[async_trait]
pub trait HighlightStore: Send + Sync {
    async fn create_highlight(&self, highlight: NewHighlight) -> PortResult<Highlight>;

    /// Persists a batch. Transactional backends insert all or nothing; others stop at
    /// the first failure and report it.
    async fn create_highlights(&self, highlights: Vec<NewHighlight>) -> PortResult<Vec<Highlight>>;

    async fn get_highlight_by_id(&self, id: Uuid, user_id: Uuid) -> PortResult<Highlight>;

    async fn list_highlights_by_user(&self, user_id: Uuid) -> PortResult<Vec<Highlight>>;

    async fn delete_highlight(&self, id: Uuid, user_id: Uuid) -> PortResult<()>;

    /// Uniform random draw of at most `limit` of the user's highlights.
    async fn sample_highlights(&self, user_id: Uuid, limit: usize) -> PortResult<Vec<Highlight>>;
}

#[async_trait]
pub trait BookStore: Send + Sync {
    async fn get_book_by_isbn(&self, isbn: &str) -> PortResult<Book>;

    /// Fails with [`PortError::Conflict`] if a book with the same key exists.
    async fn create_book(&self, book: NewBook) -> PortResult<Book>;
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Reads a named object (uploaded file, cloud object, fixture) as raw bytes.
    async fn read(&self, name: &str) -> PortResult<Vec<u8>>;
}

//=========================================================================================
// Delivery Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one digest email. `unsubscribe_token` ends up in the unsubscribe link.
    async fn send_insights(
        &self,
        user: &User,
        insights: &[DailyInsight],
        unsubscribe_token: &str,
    ) -> PortResult<()>;
}

pub trait TokenIssuer: Send + Sync {
    /// Mints a token that authorizes `user` to unsubscribe from digests.
    fn issue_unsubscribe_token(&self, user: &User) -> PortResult<String>;
}
