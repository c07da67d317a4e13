//! crates/notebase_core/src/digest.rs
//!
//! The daily digest run: sample every active user's highlights, attribute
//! them to their books, and mail them out.
//!
//! Two failure tiers apply. A broken book reference aborts the whole run
//! because it means the stored data is corrupt. A delivery failure only
//! affects its own recipient and is logged.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{DailyInsight, User};
use crate::insights::{InsightBuilder, InsightSelector};
use crate::ports::{
    BookStore, HighlightStore, Mailer, PortError, PortResult, TokenIssuer, UserStore,
};

/// What happened during one digest run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DigestReport {
    pub users_seen: usize,
    pub skipped_inactive: usize,
    pub skipped_empty: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct DigestDispatcher {
    users: Arc<dyn UserStore>,
    selector: InsightSelector,
    builder: InsightBuilder,
    mailer: Arc<dyn Mailer>,
    tokens: Arc<dyn TokenIssuer>,
}

impl DigestDispatcher {
    pub fn new(
        users: Arc<dyn UserStore>,
        highlights: Arc<dyn HighlightStore>,
        books: Arc<dyn BookStore>,
        mailer: Arc<dyn Mailer>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            users,
            selector: InsightSelector::new(highlights),
            builder: InsightBuilder::new(books),
            mailer,
            tokens,
        }
    }

    /// Processes every user sequentially.
    pub async fn run(&self, sample_size: usize) -> PortResult<DigestReport> {
        let users = self.users.list_users().await?;
        let mut report = DigestReport {
            users_seen: users.len(),
            ..DigestReport::default()
        };

        for user in &users {
            if !user.is_active {
                report.skipped_inactive += 1;
                continue;
            }

            let sampled = self.selector.sample(user.id, sample_size).await?;
            if sampled.is_empty() {
                report.skipped_empty += 1;
                continue;
            }

            let insights = self.builder.build(&sampled).await.map_err(|e| {
                error!(user_id = %user.id, error = %e, "Aborting digest run");
                e
            })?;

            match self.deliver(user, &insights).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    warn!(user_id = %user.id, email = %user.email, error = %e, "Failed to deliver digest");
                    report.failed += 1;
                }
            }
        }

        info!(
            users = report.users_seen,
            sent = report.sent,
            failed = report.failed,
            skipped_inactive = report.skipped_inactive,
            skipped_empty = report.skipped_empty,
            "Digest run complete"
        );
        Ok(report)
    }

    async fn deliver(&self, user: &User, insights: &[DailyInsight]) -> PortResult<()> {
        let token = self
            .tokens
            .issue_unsubscribe_token(user)
            .map_err(|e| PortError::Delivery(format!("could not issue unsubscribe token: {}", e)))?;
        self.mailer.send_insights(user, insights, &token).await
    }
}

/// Deactivates a user so future digest runs skip them. Safe to repeat.
pub async fn unsubscribe(users: &dyn UserStore, user_id: Uuid) -> PortResult<()> {
    let mut user = users.get_user_by_id(user_id).await?;
    if !user.is_active {
        return Ok(());
    }
    user.is_active = false;
    users.update_user(&user).await?;
    info!(%user_id, email = %user.email, "User unsubscribed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewBook, NewHighlight, NewUser, DAILY_INSIGHT_SAMPLE_SIZE};
    use crate::memory::{
        InMemoryBookStore, InMemoryHighlightStore, InMemoryUserStore, RecordingMailer,
        StaticTokenIssuer,
    };

    struct Fixture {
        users: Arc<InMemoryUserStore>,
        highlights: Arc<InMemoryHighlightStore>,
        books: Arc<InMemoryBookStore>,
    }

    impl Fixture {
        async fn new() -> Self {
            let books = Arc::new(InMemoryBookStore::new());
            books
                .create_book(NewBook {
                    isbn: "B001".to_string(),
                    title: "Gopher".to_string(),
                    authors: "John Doe".to_string(),
                })
                .await
                .unwrap();
            Self {
                users: Arc::new(InMemoryUserStore::new()),
                highlights: Arc::new(InMemoryHighlightStore::new()),
                books,
            }
        }

        async fn user(&self, email: &str, highlights: usize, book_id: &str) -> User {
            let user = self
                .users
                .create_user(NewUser {
                    first_name: "Test".to_string(),
                    last_name: "User".to_string(),
                    email: email.to_string(),
                    password_hash: "hash".to_string(),
                })
                .await
                .unwrap();
            let batch: Vec<NewHighlight> = (0..highlights)
                .map(|i| NewHighlight {
                    user_id: user.id,
                    book_id: book_id.to_string(),
                    text: format!("{} passage {}", email, i),
                    location: i.to_string(),
                    note: String::new(),
                })
                .collect();
            if !batch.is_empty() {
                self.highlights.create_highlights(batch).await.unwrap();
            }
            user
        }

        fn dispatcher(&self, mailer: Arc<RecordingMailer>) -> DigestDispatcher {
            DigestDispatcher::new(
                self.users.clone(),
                self.highlights.clone(),
                self.books.clone(),
                mailer,
                Arc::new(StaticTokenIssuer),
            )
        }
    }

    #[tokio::test]
    async fn sends_one_digest_per_active_user_with_highlights() {
        let fixture = Fixture::new().await;
        let reader = fixture.user("reader@example.com", 10, "B001").await;
        let mailer = Arc::new(RecordingMailer::new());

        let report = fixture
            .dispatcher(mailer.clone())
            .run(DAILY_INSIGHT_SAMPLE_SIZE)
            .await
            .unwrap();

        assert_eq!(report.sent, 1);
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].user_id, reader.id);
        assert_eq!(sent[0].insights.len(), 3);
        assert!(sent[0].insights.iter().all(|i| i.book_title == "Gopher"));
        assert_eq!(sent[0].unsubscribe_token, format!("unsubscribe-{}", reader.id));
    }

    #[tokio::test]
    async fn skips_inactive_users_and_users_without_highlights() {
        let fixture = Fixture::new().await;
        let mut inactive = fixture.user("gone@example.com", 5, "B001").await;
        inactive.is_active = false;
        fixture.users.update_user(&inactive).await.unwrap();
        fixture.user("empty@example.com", 0, "B001").await;
        let mailer = Arc::new(RecordingMailer::new());

        let report = fixture.dispatcher(mailer.clone()).run(3).await.unwrap();

        assert!(mailer.sent().is_empty());
        assert_eq!(
            report,
            DigestReport {
                users_seen: 2,
                skipped_inactive: 1,
                skipped_empty: 1,
                sent: 0,
                failed: 0,
            }
        );
    }

    #[tokio::test]
    async fn broken_book_reference_aborts_the_run() {
        let fixture = Fixture::new().await;
        fixture.user("broken@example.com", 2, "MISSING").await;
        let mailer = Arc::new(RecordingMailer::new());

        let result = fixture.dispatcher(mailer.clone()).run(3).await;

        assert!(matches!(result, Err(PortError::NotFound(_))));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn delivery_failures_do_not_block_other_users() {
        let fixture = Fixture::new().await;
        let bouncing = fixture.user("bounce@example.com", 2, "B001").await;
        let fine = fixture.user("fine@example.com", 2, "B001").await;
        let mailer = Arc::new(RecordingMailer::failing_for(vec![bouncing.id]));

        let report = fixture.dispatcher(mailer.clone()).run(3).await.unwrap();

        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].user_id, fine.id);
        assert_eq!(sent[0].insights.len(), 2);
    }

    #[tokio::test]
    async fn unsubscribe_deactivates_and_is_idempotent() {
        let fixture = Fixture::new().await;
        let user = fixture.user("leaving@example.com", 1, "B001").await;

        unsubscribe(fixture.users.as_ref(), user.id).await.unwrap();
        unsubscribe(fixture.users.as_ref(), user.id).await.unwrap();

        let stored = fixture.users.get_user_by_id(user.id).await.unwrap();
        assert!(!stored.is_active);

        let mailer = Arc::new(RecordingMailer::new());
        let report = fixture.dispatcher(mailer.clone()).run(3).await.unwrap();
        assert_eq!(report.skipped_inactive, 1);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn unsubscribing_an_unknown_user_is_not_found() {
        let users = InMemoryUserStore::new();
        let result = unsubscribe(&users, Uuid::new_v4()).await;
        assert!(matches!(result, Err(PortError::NotFound(_))));
    }
}
