//! crates/notebase_core/src/insights.rs
//!
//! Draws a random sample of a user's highlights and joins each one back to
//! its book to produce [`DailyInsight`]s.

use std::sync::Arc;

use tracing::error;
use uuid::Uuid;

use crate::domain::{DailyInsight, Highlight};
use crate::ports::{BookStore, HighlightStore, PortError, PortResult};

/// Draws independent random samples of a user's highlights.
#[derive(Clone)]
pub struct InsightSelector {
    highlights: Arc<dyn HighlightStore>,
}

impl InsightSelector {
    pub fn new(highlights: Arc<dyn HighlightStore>) -> Self {
        Self { highlights }
    }

    /// Returns `min(limit, available)` highlights. An empty result is not an error.
    pub async fn sample(&self, user_id: Uuid, limit: usize) -> PortResult<Vec<Highlight>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut sampled = self.highlights.sample_highlights(user_id, limit).await?;
        sampled.truncate(limit);
        Ok(sampled)
    }
}

/// Resolves the book behind each highlight.
#[derive(Clone)]
pub struct InsightBuilder {
    books: Arc<dyn BookStore>,
}

impl InsightBuilder {
    pub fn new(books: Arc<dyn BookStore>) -> Self {
        Self { books }
    }

    /// Builds one insight per highlight, in order. A highlight whose book is missing
    /// fails the whole batch rather than producing an unattributed insight.
    pub async fn build(&self, highlights: &[Highlight]) -> PortResult<Vec<DailyInsight>> {
        let mut insights = Vec::with_capacity(highlights.len());

        for highlight in highlights {
            let book = match self.books.get_book_by_isbn(&highlight.book_id).await {
                Ok(book) => book,
                Err(PortError::NotFound(_)) => {
                    error!(
                        highlight_id = %highlight.id,
                        book_id = %highlight.book_id,
                        "Highlight references a missing book"
                    );
                    return Err(PortError::NotFound(format!(
                        "Book {} referenced by highlight {} not found",
                        highlight.book_id, highlight.id
                    )));
                }
                Err(e) => return Err(e),
            };

            insights.push(DailyInsight {
                text: highlight.text.clone(),
                note: highlight.note.clone(),
                book_authors: book.authors,
                book_title: book.title,
            });
        }

        Ok(insights)
    }
}
