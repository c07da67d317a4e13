//! crates/notebase_core/src/memory.rs
//!
//! In-memory implementations of the store and delivery ports. Used as test
//! fixtures and for running the service without a database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::domain::{
    Book, DailyInsight, Highlight, NewBook, NewHighlight, NewUser, User, UserCredentials,
};
use crate::ports::{
    BookStore, FileStore, HighlightStore, Mailer, PortError, PortResult, TokenIssuer, UserStore,
};

fn lock<T>(mutex: &Mutex<T>) -> PortResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| PortError::Unexpected("in-memory store lock poisoned".to_string()))
}

//=========================================================================================
// Stores
//=========================================================================================

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<Vec<UserCredentials>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        lock(&self.users)?
            .iter()
            .find(|c| c.user.id == user_id)
            .map(|c| c.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        lock(&self.users)?
            .iter()
            .find(|c| c.user.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        Ok(lock(&self.users)?.iter().map(|c| c.user.clone()).collect())
    }

    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let mut users = lock(&self.users)?;
        if users.iter().any(|c| c.user.email == new_user.email) {
            return Err(PortError::Conflict(format!(
                "User with email {} already exists",
                new_user.email
            )));
        }
        let user = User {
            id: Uuid::new_v4(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            is_active: true,
            created_at: Utc::now(),
        };
        users.push(UserCredentials {
            user: user.clone(),
            password_hash: new_user.password_hash,
        });
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> PortResult<()> {
        let mut users = lock(&self.users)?;
        let existing = users
            .iter_mut()
            .find(|c| c.user.id == user.id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user.id)))?;
        existing.user = user.clone();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryBookStore {
    books: Mutex<HashMap<String, Book>>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.books.lock().map(|b| b.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn get_book_by_isbn(&self, isbn: &str) -> PortResult<Book> {
        lock(&self.books)?
            .get(isbn)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", isbn)))
    }

    async fn create_book(&self, book: NewBook) -> PortResult<Book> {
        let mut books = lock(&self.books)?;
        if books.contains_key(&book.isbn) {
            return Err(PortError::Conflict(format!(
                "Book {} already exists",
                book.isbn
            )));
        }
        let created = Book {
            isbn: book.isbn.clone(),
            title: book.title,
            authors: book.authors,
            created_at: Utc::now(),
        };
        books.insert(book.isbn, created.clone());
        Ok(created)
    }
}

#[derive(Default)]
pub struct InMemoryHighlightStore {
    highlights: Mutex<Vec<Highlight>>,
}

impl InMemoryHighlightStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn materialize(new: NewHighlight) -> Highlight {
        let now = Utc::now();
        Highlight {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            book_id: new.book_id,
            text: new.text,
            location: new.location,
            note: new.note,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl HighlightStore for InMemoryHighlightStore {
    async fn create_highlight(&self, highlight: NewHighlight) -> PortResult<Highlight> {
        let created = Self::materialize(highlight);
        lock(&self.highlights)?.push(created.clone());
        Ok(created)
    }

    async fn create_highlights(&self, highlights: Vec<NewHighlight>) -> PortResult<Vec<Highlight>> {
        let created: Vec<Highlight> = highlights.into_iter().map(Self::materialize).collect();
        lock(&self.highlights)?.extend(created.iter().cloned());
        Ok(created)
    }

    async fn get_highlight_by_id(&self, id: Uuid, user_id: Uuid) -> PortResult<Highlight> {
        lock(&self.highlights)?
            .iter()
            .find(|h| h.id == id && h.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Highlight {} not found", id)))
    }

    async fn list_highlights_by_user(&self, user_id: Uuid) -> PortResult<Vec<Highlight>> {
        Ok(lock(&self.highlights)?
            .iter()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_highlight(&self, id: Uuid, user_id: Uuid) -> PortResult<()> {
        let mut highlights = lock(&self.highlights)?;
        let before = highlights.len();
        highlights.retain(|h| !(h.id == id && h.user_id == user_id));
        if highlights.len() == before {
            return Err(PortError::NotFound(format!("Highlight {} not found", id)));
        }
        Ok(())
    }

    async fn sample_highlights(&self, user_id: Uuid, limit: usize) -> PortResult<Vec<Highlight>> {
        let owned: Vec<Highlight> = lock(&self.highlights)?
            .iter()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect();
        let mut rng = rand::thread_rng();
        Ok(owned.choose_multiple(&mut rng, limit).cloned().collect())
    }
}

/// Serves named byte blobs registered up front.
#[derive(Default)]
pub struct InMemoryFileStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, name: &str, contents: impl Into<Vec<u8>>) -> Self {
        if let Ok(mut files) = self.files.lock() {
            files.insert(name.to_string(), contents.into());
        }
        self
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn read(&self, name: &str) -> PortResult<Vec<u8>> {
        lock(&self.files)?
            .get(name)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("File {} not found", name)))
    }
}

//=========================================================================================
// Delivery
//=========================================================================================

/// A digest email captured by [`RecordingMailer`].
#[derive(Debug, Clone)]
pub struct SentDigest {
    pub user_id: Uuid,
    pub insights: Vec<DailyInsight>,
    pub unsubscribe_token: String,
}

/// Records every digest instead of sending it. Recipients listed in
/// `failing_for` get a delivery error.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentDigest>>,
    failing_for: Vec<Uuid>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(user_ids: Vec<Uuid>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing_for: user_ids,
        }
    }

    pub fn sent(&self) -> Vec<SentDigest> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_insights(
        &self,
        user: &User,
        insights: &[DailyInsight],
        unsubscribe_token: &str,
    ) -> PortResult<()> {
        if self.failing_for.contains(&user.id) {
            return Err(PortError::Delivery(format!("mailbox of {} bounced", user.email)));
        }
        lock(&self.sent)?.push(SentDigest {
            user_id: user.id,
            insights: insights.to_vec(),
            unsubscribe_token: unsubscribe_token.to_string(),
        });
        Ok(())
    }
}

/// Issues `unsubscribe-<user id>` tokens.
#[derive(Default)]
pub struct StaticTokenIssuer;

impl TokenIssuer for StaticTokenIssuer {
    fn issue_unsubscribe_token(&self, user: &User) -> PortResult<String> {
        Ok(format!("unsubscribe-{}", user.id))
    }
}
