use crate::domain::model::{JobPosting, PassReport, SeenRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the raw body of `url`, waiting for the rate budget if needed.
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub trait SeenStore: Send + Sync {
    fn find(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<SeenRecord>>> + Send;

    /// Insert-if-absent. Resolves to `true` when a row was written.
    fn insert(&self, record: &SeenRecord) -> impl std::future::Future<Output = Result<bool>> + Send;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Dispatch one digest. Callers never pass an empty batch.
    async fn notify(&self, postings: &[JobPosting]) -> Result<()>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn run_pass(&self) -> Result<PassReport>;
}
