pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{RateLimitedFetcher, SmtpNotifier, SqliteSeenStore};
pub use config::{AppConfig, CliArgs};
pub use core::{
    extract::ListingExtractor,
    pipeline::{JobPipeline, PipelineSettings},
    scheduler::{Scheduler, SchedulerConfig, TriggerOutcome},
};
pub use utils::error::{Result, WatchError};
