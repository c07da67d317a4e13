//! crates/notebase_core/src/ingest.rs
//!
//! Turns a parsed extract into persisted books and highlights for one user.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{NewBook, NewHighlight};
use crate::extract::{self, ExtractError, RawExtractBook};
use crate::ports::{BookStore, HighlightStore, PortError};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Malformed(#[from] ExtractError),
    #[error(transparent)]
    Port(#[from] PortError),
}

/// Reconciles raw extracts against the book and highlight stores.
///
/// Re-ingesting the same extract creates the highlights again; callers that
/// need deduplication must do it before calling [`Ingestor::ingest`].
#[derive(Clone)]
pub struct Ingestor {
    books: Arc<dyn BookStore>,
    highlights: Arc<dyn HighlightStore>,
}

impl Ingestor {
    pub fn new(books: Arc<dyn BookStore>, highlights: Arc<dyn HighlightStore>) -> Self {
        Self { books, highlights }
    }

    /// Ensures the extract's book exists, then stores one highlight per entry.
    /// Returns the number of highlights created.
    pub async fn ingest(&self, raw: &RawExtractBook, user_id: Uuid) -> Result<usize, PortError> {
        self.ensure_book(raw).await?;

        let new_highlights: Vec<NewHighlight> = raw
            .highlights
            .iter()
            .map(|h| NewHighlight {
                user_id,
                book_id: raw.asin.clone(),
                text: h.text.clone(),
                location: h.resolved_location(),
                note: h.note.clone(),
            })
            .collect();

        if new_highlights.is_empty() {
            info!(asin = %raw.asin, %user_id, "Extract has no highlights");
            return Ok(0);
        }

        let created = self.highlights.create_highlights(new_highlights).await?;
        info!(asin = %raw.asin, %user_id, count = created.len(), "Ingested extract");
        Ok(created.len())
    }

    /// Parses `bytes` and ingests the result.
    pub async fn ingest_bytes(&self, bytes: &[u8], user_id: Uuid) -> Result<usize, IngestError> {
        let raw = extract::parse(bytes)?;
        Ok(self.ingest(&raw, user_id).await?)
    }

    async fn ensure_book(&self, raw: &RawExtractBook) -> Result<(), PortError> {
        match self.books.get_book_by_isbn(&raw.asin).await {
            Ok(_) => return Ok(()),
            Err(PortError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let new_book = NewBook {
            isbn: raw.asin.clone(),
            title: raw.title.clone(),
            authors: raw.authors.clone(),
        };
        match self.books.create_book(new_book).await {
            Ok(book) => {
                info!(isbn = %book.isbn, title = %book.title, "Created book");
                Ok(())
            }
            // Lost a create race against a concurrent ingestion of the same book.
            Err(PortError::Conflict(msg)) => {
                debug!(asin = %raw.asin, "{}", msg);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Book, Highlight};
    use crate::memory::{InMemoryBookStore, InMemoryHighlightStore};
    use crate::ports::PortResult;
    use async_trait::async_trait;

    const EXTRACT: &str = r#"{
        "asin": "B001",
        "title": "T",
        "authors": "A",
        "highlights": [
            { "text": "x", "location": { "url": "u1", "value": 1 }, "note": null }
        ]
    }"#;

    fn three_entry_extract() -> RawExtractBook {
        extract::parse(
            br#"{"asin":"B002","title":"Walden","authors":"Thoreau","highlights":[
                {"text":"a","location":{"url":"k://1","value":1},"note":"n1"},
                {"text":"b","location":{"value":2},"note":null},
                {"text":"c","location":{"url":"k://3","value":3},"note":""}
            ]}"#,
        )
        .unwrap()
    }

    fn stores() -> (Arc<InMemoryBookStore>, Arc<InMemoryHighlightStore>, Ingestor) {
        let books = Arc::new(InMemoryBookStore::new());
        let highlights = Arc::new(InMemoryHighlightStore::new());
        let ingestor = Ingestor::new(books.clone(), highlights.clone());
        (books, highlights, ingestor)
    }

    #[tokio::test]
    async fn end_to_end_extract_creates_book_and_highlight() {
        let (books, highlights, ingestor) = stores();
        let user_id = Uuid::new_v4();

        let created = ingestor.ingest_bytes(EXTRACT.as_bytes(), user_id).await.unwrap();
        assert_eq!(created, 1);

        let book = books.get_book_by_isbn("B001").await.unwrap();
        assert_eq!(book.title, "T");
        assert_eq!(book.authors, "A");

        let stored = highlights.list_highlights_by_user(user_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].text, "x");
        assert_eq!(stored[0].location, "u1");
        assert_eq!(stored[0].note, "");
        assert_eq!(stored[0].book_id, "B001");
    }

    #[tokio::test]
    async fn creates_one_book_and_n_highlights_bound_to_the_caller() {
        let (books, highlights, ingestor) = stores();
        let user_id = Uuid::new_v4();
        let raw = three_entry_extract();

        assert_eq!(ingestor.ingest(&raw, user_id).await.unwrap(), 3);
        assert_eq!(books.len(), 1);

        let stored = highlights.list_highlights_by_user(user_id).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().all(|h| h.user_id == user_id && h.book_id == "B002"));
        assert_eq!(stored[1].location, "2");
        assert_eq!(stored[1].note, "");
    }

    #[tokio::test]
    async fn re_ingesting_duplicates_highlights_but_not_the_book() {
        let (books, highlights, ingestor) = stores();
        let user_id = Uuid::new_v4();
        let raw = three_entry_extract();

        ingestor.ingest(&raw, user_id).await.unwrap();
        ingestor.ingest(&raw, user_id).await.unwrap();

        assert_eq!(books.len(), 1);
        assert_eq!(highlights.list_highlights_by_user(user_id).await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn existing_book_is_not_overwritten() {
        let (books, _, ingestor) = stores();
        books
            .create_book(NewBook {
                isbn: "B002".to_string(),
                title: "Original".to_string(),
                authors: "Someone".to_string(),
            })
            .await
            .unwrap();

        ingestor.ingest(&three_entry_extract(), Uuid::new_v4()).await.unwrap();
        assert_eq!(books.get_book_by_isbn("B002").await.unwrap().title, "Original");
    }

    #[tokio::test]
    async fn malformed_bytes_create_nothing() {
        let (books, _, ingestor) = stores();
        let err = ingestor.ingest_bytes(b"{oops", Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, IngestError::Malformed(_)));
        assert!(books.is_empty());
    }

    /// Reports the book as absent, then loses the create race.
    struct RacingBookStore;

    #[async_trait]
    impl BookStore for RacingBookStore {
        async fn get_book_by_isbn(&self, isbn: &str) -> PortResult<Book> {
            Err(PortError::NotFound(isbn.to_string()))
        }
        async fn create_book(&self, book: NewBook) -> PortResult<Book> {
            Err(PortError::Conflict(book.isbn))
        }
    }

    struct OfflineBookStore;

    #[async_trait]
    impl BookStore for OfflineBookStore {
        async fn get_book_by_isbn(&self, _isbn: &str) -> PortResult<Book> {
            Err(PortError::Unexpected("connection refused".to_string()))
        }
        async fn create_book(&self, _book: NewBook) -> PortResult<Book> {
            unreachable!("create must not run after a failed lookup")
        }
    }

    #[tokio::test]
    async fn lost_create_race_still_ingests_highlights() {
        let highlights = Arc::new(InMemoryHighlightStore::new());
        let ingestor = Ingestor::new(Arc::new(RacingBookStore), highlights.clone());
        let user_id = Uuid::new_v4();

        assert_eq!(ingestor.ingest(&three_entry_extract(), user_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn lookup_failures_other_than_not_found_propagate() {
        let highlights = Arc::new(InMemoryHighlightStore::new());
        let ingestor = Ingestor::new(Arc::new(OfflineBookStore), highlights.clone());
        let user_id = Uuid::new_v4();

        let err = ingestor.ingest(&three_entry_extract(), user_id).await.unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
        assert!(highlights.list_highlights_by_user(user_id).await.unwrap().is_empty());
    }

    struct FailingHighlightStore;

    #[async_trait]
    impl HighlightStore for FailingHighlightStore {
        async fn create_highlight(&self, _h: NewHighlight) -> PortResult<Highlight> {
            Err(PortError::Unexpected("disk full".to_string()))
        }
        async fn create_highlights(&self, _h: Vec<NewHighlight>) -> PortResult<Vec<Highlight>> {
            Err(PortError::Unexpected("disk full".to_string()))
        }
        async fn get_highlight_by_id(&self, id: Uuid, _u: Uuid) -> PortResult<Highlight> {
            Err(PortError::NotFound(id.to_string()))
        }
        async fn list_highlights_by_user(&self, _u: Uuid) -> PortResult<Vec<Highlight>> {
            Ok(Vec::new())
        }
        async fn delete_highlight(&self, id: Uuid, _u: Uuid) -> PortResult<()> {
            Err(PortError::NotFound(id.to_string()))
        }
        async fn sample_highlights(&self, _u: Uuid, _l: usize) -> PortResult<Vec<Highlight>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn highlight_persistence_failure_is_reported() {
        let ingestor = Ingestor::new(
            Arc::new(InMemoryBookStore::new()),
            Arc::new(FailingHighlightStore),
        );
        let err = ingestor
            .ingest(&three_entry_extract(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
    }
}
