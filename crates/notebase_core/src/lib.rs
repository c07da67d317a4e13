pub mod digest;
pub mod domain;
pub mod extract;
pub mod ingest;
pub mod insights;
pub mod memory;
pub mod ports;

pub use digest::{unsubscribe, DigestDispatcher, DigestReport};
pub use domain::{
    Book, DailyInsight, Highlight, NewBook, NewHighlight, NewUser, User, UserCredentials,
    DAILY_INSIGHT_SAMPLE_SIZE,
};
pub use extract::{ExtractError, RawExtractBook, RawExtractHighlight, RawLocation};
pub use ingest::{IngestError, Ingestor};
pub use insights::{InsightBuilder, InsightSelector};
pub use ports::{
    BookStore, FileStore, HighlightStore, Mailer, PortError, PortResult, TokenIssuer, UserStore,
};
