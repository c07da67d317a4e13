pub mod db;
pub mod files;
pub mod mailer;
pub mod tokens;

pub use db::DbAdapter;
pub use files::{GcsFileStore, LocalFileStore};
pub use mailer::{LogMailer, SendGridMailer};
pub use tokens::{JwtService, TokenPurpose};
