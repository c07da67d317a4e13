//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `UserStore`, `BookStore` and `HighlightStore` ports from the `core` crate.
//! It handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notebase_core::domain::{
    Book, Highlight, NewBook, NewHighlight, NewUser, User, UserCredentials,
};
use notebase_core::ports::{
    BookStore, HighlightStore, PortError, PortResult, UserStore,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the store ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Maps `RowNotFound` to `NotFound`, unique violations to `Conflict`, and
/// everything else to `Unexpected`.
fn map_err(e: sqlx::Error, what: impl FnOnce() -> String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(format!("{} not found", what())),
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            PortError::Conflict(format!("{} already exists", what()))
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, is_active, created_at";
const BOOK_COLUMNS: &str = "isbn, title, authors, created_at";
const HIGHLIGHT_COLUMNS: &str =
    "id, user_id, book_id, text, location, note, created_at, updated_at";

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_credentials(self) -> UserCredentials {
        UserCredentials {
            user: User {
                id: self.id,
                first_name: self.first_name,
                last_name: self.last_name,
                email: self.email,
                is_active: self.is_active,
                created_at: self.created_at,
            },
            password_hash: self.password_hash,
        }
    }

    fn to_domain(self) -> User {
        self.to_credentials().user
    }
}

#[derive(FromRow)]
struct BookRecord {
    isbn: String,
    title: String,
    authors: String,
    created_at: DateTime<Utc>,
}
impl BookRecord {
    fn to_domain(self) -> Book {
        Book {
            isbn: self.isbn,
            title: self.title,
            authors: self.authors,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct HighlightRecord {
    id: Uuid,
    user_id: Uuid,
    book_id: String,
    text: String,
    location: String,
    note: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl HighlightRecord {
    fn to_domain(self) -> Highlight {
        Highlight {
            id: self.id,
            user_id: self.user_id,
            book_id: self.book_id,
            text: self.text,
            location: self.location,
            note: self.note,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

//=========================================================================================
// `UserStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserStore for DbAdapter {
    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_err(e, || format!("User {}", user_id)))?;
        Ok(record.to_domain())
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_err(e, || format!("User {}", email)))?;
        Ok(record.to_credentials())
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, first_name, last_name, email, password_hash) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_err(e, || format!("User with email {}", new_user.email)))?;
        Ok(record.to_domain())
    }

    async fn update_user(&self, user: &User) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE users SET first_name = $1, last_name = $2, email = $3, is_active = $4 WHERE id = $5",
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.is_active)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_err(e, || format!("User with email {}", user.email)))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user.id)));
        }
        Ok(())
    }
}

//=========================================================================================
// `BookStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl BookStore for DbAdapter {
    async fn get_book_by_isbn(&self, isbn: &str) -> PortResult<Book> {
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE isbn = $1"
        ))
        .bind(isbn)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_err(e, || format!("Book {}", isbn)))?;
        Ok(record.to_domain())
    }

    async fn create_book(&self, book: NewBook) -> PortResult<Book> {
        // The primary key settles concurrent creates; the loser sees no row.
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "INSERT INTO books (isbn, title, authors) VALUES ($1, $2, $3) \
             ON CONFLICT (isbn) DO NOTHING RETURNING {BOOK_COLUMNS}"
        ))
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.authors)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record
            .map(BookRecord::to_domain)
            .ok_or_else(|| PortError::Conflict(format!("Book {} already exists", book.isbn)))
    }
}

//=========================================================================================
// `HighlightStore` Trait Implementation
//=========================================================================================

const INSERT_HIGHLIGHT: &str = "INSERT INTO highlights (id, user_id, book_id, text, location, note) \
     VALUES ($1, $2, $3, $4, $5, $6) \
     RETURNING id, user_id, book_id, text, location, note, created_at, updated_at";

#[async_trait]
impl HighlightStore for DbAdapter {
    async fn create_highlight(&self, highlight: NewHighlight) -> PortResult<Highlight> {
        let record = sqlx::query_as::<_, HighlightRecord>(INSERT_HIGHLIGHT)
            .bind(Uuid::new_v4())
            .bind(highlight.user_id)
            .bind(&highlight.book_id)
            .bind(&highlight.text)
            .bind(&highlight.location)
            .bind(&highlight.note)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.to_domain())
    }

    async fn create_highlights(&self, highlights: Vec<NewHighlight>) -> PortResult<Vec<Highlight>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let mut created = Vec::with_capacity(highlights.len());
        for highlight in highlights {
            let record = sqlx::query_as::<_, HighlightRecord>(INSERT_HIGHLIGHT)
                .bind(Uuid::new_v4())
                .bind(highlight.user_id)
                .bind(&highlight.book_id)
                .bind(&highlight.text)
                .bind(&highlight.location)
                .bind(&highlight.note)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            created.push(record.to_domain());
        }

        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(created)
    }

    async fn get_highlight_by_id(&self, id: Uuid, user_id: Uuid) -> PortResult<Highlight> {
        let record = sqlx::query_as::<_, HighlightRecord>(&format!(
            "SELECT {HIGHLIGHT_COLUMNS} FROM highlights WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_err(e, || format!("Highlight {}", id)))?;
        Ok(record.to_domain())
    }

    async fn list_highlights_by_user(&self, user_id: Uuid) -> PortResult<Vec<Highlight>> {
        let records = sqlx::query_as::<_, HighlightRecord>(&format!(
            "SELECT {HIGHLIGHT_COLUMNS} FROM highlights WHERE user_id = $1 ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete_highlight(&self, id: Uuid, user_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM highlights WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Highlight {} not found", id)));
        }
        Ok(())
    }

    async fn sample_highlights(&self, user_id: Uuid, limit: usize) -> PortResult<Vec<Highlight>> {
        let records = sqlx::query_as::<_, HighlightRecord>(&format!(
            "SELECT {HIGHLIGHT_COLUMNS} FROM highlights WHERE user_id = $1 ORDER BY random() LIMIT $2"
        ))
        .bind(user_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}
