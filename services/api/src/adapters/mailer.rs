//! services/api/src/adapters/mailer.rs
//!
//! Adapters for the `Mailer` port. `SendGridMailer` renders the digest template
//! and posts it to the SendGrid v3 API; `LogMailer` only logs, for local runs
//! without mail credentials.

use askama::Template;
use async_trait::async_trait;
use notebase_core::domain::{DailyInsight, User};
use notebase_core::ports::{Mailer, PortError, PortResult};
use serde::Serialize;
use tracing::info;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const DIGEST_SUBJECT: &str = "Daily Insight(s)";

//=========================================================================================
// Template
//=========================================================================================

#[derive(Template)]
#[template(path = "daily.html")]
struct DailyInsightsTemplate<'a> {
    user_name: String,
    insights: &'a [DailyInsight],
    unsubscribe_url: String,
}

/// Builds the link a recipient follows to stop receiving digests.
pub fn unsubscribe_url(public_url: &str, token: &str) -> String {
    format!("{}/unsubscribe?token={}", public_url, token)
}

/// Renders the digest email body as HTML.
pub fn render_insights_email(
    user: &User,
    insights: &[DailyInsight],
    unsubscribe_url: String,
) -> PortResult<String> {
    DailyInsightsTemplate {
        user_name: user.full_name(),
        insights,
        unsubscribe_url,
    }
    .render()
    .map_err(|e| PortError::Unexpected(format!("rendering digest email: {}", e)))
}

//=========================================================================================
// SendGrid
//=========================================================================================

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

/// Sends digests through the SendGrid v3 mail API.
#[derive(Clone)]
pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: String,
    from_email: String,
    from_name: String,
    public_url: String,
}

impl SendGridMailer {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        from_email: String,
        from_name: String,
        public_url: String,
    ) -> Self {
        Self {
            client,
            api_key,
            from_email,
            from_name,
            public_url,
        }
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send_insights(
        &self,
        user: &User,
        insights: &[DailyInsight],
        unsubscribe_token: &str,
    ) -> PortResult<()> {
        if user.email.is_empty() {
            return Err(PortError::Delivery(format!("user {} has no email", user.id)));
        }

        let html = render_insights_email(
            user,
            insights,
            unsubscribe_url(&self.public_url, unsubscribe_token),
        )?;
        let recipient_name = user.full_name();
        let body = SendRequest {
            personalizations: [Personalization {
                to: [Address {
                    email: &user.email,
                    name: &recipient_name,
                }],
            }],
            from: Address {
                email: &self.from_email,
                name: &self.from_name,
            },
            subject: DIGEST_SUBJECT,
            content: [Content {
                kind: "text/html",
                value: &html,
            }],
        };

        let response = self
            .client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PortError::Delivery(format!(
                "SendGrid returned {} for {}: {}",
                status, user.email, detail
            )));
        }

        info!(email = %user.email, status = %status, "Digest email sent");
        Ok(())
    }
}

//=========================================================================================
// Log-only
//=========================================================================================

/// Logs digests instead of sending them.
#[derive(Clone)]
pub struct LogMailer {
    public_url: String,
}

impl LogMailer {
    pub fn new(public_url: String) -> Self {
        Self { public_url }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_insights(
        &self,
        user: &User,
        insights: &[DailyInsight],
        unsubscribe_token: &str,
    ) -> PortResult<()> {
        let html = render_insights_email(
            user,
            insights,
            unsubscribe_url(&self.public_url, unsubscribe_token),
        )?;
        info!(
            email = %user.email,
            insights = insights.len(),
            bytes = html.len(),
            "Digest email rendered (mail delivery disabled)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            first_name: "Test".to_string(),
            last_name: "Reader".to_string(),
            email: "gopher@gopher.xyz".to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn insight(note: &str) -> DailyInsight {
        DailyInsight {
            text: "This is an insight".to_string(),
            note: note.to_string(),
            book_authors: "John Doe".to_string(),
            book_title: "Gopher".to_string(),
        }
    }

    #[test]
    fn email_lists_every_insight_with_its_book() {
        let html = render_insights_email(
            &user(),
            &[insight("This is a note")],
            unsubscribe_url("https://notebase.example", "some-random-token"),
        )
        .unwrap();

        assert!(html.contains("Hi Test Reader"));
        assert!(html.contains("This is an insight"));
        assert!(html.contains("This is a note"));
        assert!(html.contains("John Doe"));
        assert!(html.contains("Gopher"));
        assert!(html.contains("https://notebase.example/unsubscribe?token=some-random-token"));
    }

    #[test]
    fn empty_notes_are_omitted_and_text_is_escaped() {
        let mut quoted = insight("");
        quoted.text = "<script>alert(1)</script>".to_string();
        let html = render_insights_email(&user(), &[quoted], "u".to_string()).unwrap();

        assert!(!html.contains("Note:"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn sendgrid_mailer_refuses_users_without_email() {
        let mailer = SendGridMailer::new(
            reqwest::Client::new(),
            "key".to_string(),
            "from@notebase.local".to_string(),
            "Notebase".to_string(),
            "http://localhost".to_string(),
        );
        let mut nobody = user();
        nobody.email.clear();

        let result = mailer.send_insights(&nobody, &[insight("")], "t").await;
        assert!(matches!(result, Err(PortError::Delivery(_))));
    }
}
