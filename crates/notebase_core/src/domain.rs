//! crates/notebase_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or transport format.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Number of highlights drawn per user for each daily digest.
pub const DAILY_INSIGHT_SAMPLE_SIZE: usize = 3;

/// A book, keyed by its ISBN/ASIN. The key is supplied by the extract, never generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub authors: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub isbn: String,
    pub title: String,
    pub authors: String,
}

/// A quoted passage owned by one user and attributed to one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Natural key of the owning book.
    pub book_id: String,
    pub text: String,
    pub location: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHighlight {
    pub user_id: Uuid,
    pub book_id: String,
    pub text: String,
    pub location: String,
    pub note: String,
}

// Represents a user - used throughout app. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// False once the user unsubscribes; suppresses digest emails.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

/// A presentation-ready highlight joined with its book. Built per digest run, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyInsight {
    pub text: String,
    pub note: String,
    pub book_authors: String,
    pub book_title: String,
}
