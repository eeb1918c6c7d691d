use crate::core::dedup::{reconcile, PersistencePolicy};
use crate::core::extract::ListingExtractor;
use crate::core::filter::filter_by_interest;
use crate::domain::model::{PassReport, WatchList};
use crate::domain::ports::{Notifier, PageFetcher, Pipeline, SeenStore};
use crate::utils::error::Result;
use std::sync::atomic::{AtomicU32, Ordering};

/// Settings for [`JobPipeline`] that are not collaborators.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub source_url: String,
    pub watch_list: WatchList,
    pub persistence_policy: PersistencePolicy,
    /// Consecutive empty extractions before a scraper-health warning is logged.
    pub zero_result_alert_after: u32,
}

/// fetch → extract → filter → reconcile → notify.
pub struct JobPipeline<F: PageFetcher, S: SeenStore, N: Notifier> {
    fetcher: F,
    extractor: ListingExtractor,
    store: S,
    notifier: N,
    settings: PipelineSettings,
    empty_streak: AtomicU32,
}

impl<F: PageFetcher, S: SeenStore, N: Notifier> JobPipeline<F, S, N> {
    pub fn new(
        fetcher: F,
        extractor: ListingExtractor,
        store: S,
        notifier: N,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            store,
            notifier,
            settings,
            empty_streak: AtomicU32::new(0),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of consecutive passes whose extraction found nothing.
    pub fn empty_streak(&self) -> u32 {
        self.empty_streak.load(Ordering::Relaxed)
    }

    fn track_extraction_health(&self, scraped: usize) {
        if scraped > 0 {
            self.empty_streak.store(0, Ordering::Relaxed);
            return;
        }

        let streak = self.empty_streak.fetch_add(1, Ordering::Relaxed) + 1;
        if streak >= self.settings.zero_result_alert_after {
            tracing::warn!(
                "⚠️ No postings extracted for {} consecutive passes; the page layout may have changed",
                streak
            );
        }
    }
}

#[async_trait::async_trait]
impl<F: PageFetcher, S: SeenStore, N: Notifier> Pipeline for JobPipeline<F, S, N> {
    async fn run_pass(&self) -> Result<PassReport> {
        let html = self.fetcher.fetch(&self.settings.source_url).await?;

        let postings = self.extractor.extract(&html);
        let scraped = postings.len();
        self.track_extraction_health(scraped);

        let matched_jobs = filter_by_interest(postings, &self.settings.watch_list);
        let matched = matched_jobs.len();
        tracing::debug!("Scraped {} posting(s), {} matched the watch list", scraped, matched);

        let new_jobs =
            reconcile(&self.store, matched_jobs, self.settings.persistence_policy).await?;

        let mut report = PassReport {
            scraped,
            matched,
            new_jobs: new_jobs.len(),
            notified: false,
        };

        if new_jobs.is_empty() {
            tracing::info!("No new jobs found");
            return Ok(report);
        }

        tracing::info!("Found {} new job(s)", new_jobs.len());
        match self.notifier.notify(&new_jobs).await {
            Ok(()) => {
                tracing::info!("📧 Email notification sent successfully");
                report.notified = true;
            }
            // Records stay written: these jobs will not be re-notified.
            Err(e) => tracing::error!(
                "❌ Failed to send notification for {} job(s): {}",
                new_jobs.len(),
                e
            ),
        }

        Ok(report)
    }
}
