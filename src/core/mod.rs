pub mod dedup;
pub mod extract;
pub mod filter;
pub mod pipeline;
pub mod scheduler;

pub use crate::domain::model::{JobPosting, PassReport, SeenRecord, WatchList};
pub use crate::domain::ports::{Notifier, PageFetcher, Pipeline, SeenStore};
pub use crate::utils::error::Result;
