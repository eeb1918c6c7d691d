//! Rate-limited page fetcher.
//!
//! One request per quota period for the whole process, whatever the URL. The
//! slot is taken before the request goes out, so failed requests spend it too.

use crate::config::AppConfig;
use crate::domain::ports::PageFetcher;
use crate::utils::error::{Result, WatchError};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

#[derive(Clone)]
pub struct RateLimitedFetcher {
    client: Client,
    limiter: Arc<DirectRateLimiter>,
}

impl RateLimitedFetcher {
    pub fn new(user_agent: &str, timeout: Duration, period: Duration) -> Result<Self> {
        let quota = Quota::with_period(period).ok_or_else(|| WatchError::InvalidConfigValue {
            field: "source.rate_limit_period_seconds".to_string(),
            value: format!("{:?}", period),
            reason: "Rate limit period must be greater than zero".to_string(),
        })?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US,en;q=0.5"),
        );

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| WatchError::ConfigValidation {
                field: "source".to_string(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.user_agent(),
            config.request_timeout(),
            config.rate_limit_period(),
        )
    }

    async fn get(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| WatchError::Fetch {
                url: url.to_string(),
                source,
            })?;

        tracing::debug!("Source page response status: {}", response.status());

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|source| WatchError::Fetch {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl PageFetcher for RateLimitedFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.limiter.until_ready().await;
        tracing::debug!("Fetching {}", url);
        self.get(url).await
    }
}
