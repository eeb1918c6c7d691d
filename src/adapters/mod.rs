// Adapters layer: concrete implementations of the domain ports (HTTP, SQLite, SMTP).

pub mod http;
pub mod mail;
pub mod storage;

pub use http::RateLimitedFetcher;
pub use mail::SmtpNotifier;
pub use storage::SqliteSeenStore;
