//! HTTP rate feeds.
//!
//! A [`RateFetcher`] polls one JSON endpoint and stores what it finds in a
//! [`CachedRate`] shared with the runtime.  Until the first good value it
//! retries every `retry_secs`; after that it refreshes every
//! `interval_secs` and keeps the last good value through failures.

use std::time::Duration;

use log::{info, warn};
use reqwest::Client;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::adapters::rates::CachedRate;
use crate::app::ports::RateSource;
use crate::config::RateFeedConfig;
use crate::error::{FetchError, Result};

pub struct RateFetcher {
    name: String,
    url: String,
    key: String,
    sub_key: Option<String>,
    interval: Duration,
    retry: Duration,
    client: Client,
    cache: CachedRate,
}

impl RateFetcher {
    pub fn new(feed: &RateFeedConfig, cache: CachedRate) -> core::result::Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(feed.request_timeout_secs))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            name: feed.name.clone(),
            url: feed.url.clone(),
            key: feed.key.clone(),
            sub_key: feed.sub_key.clone(),
            interval: Duration::from_secs(feed.interval_secs),
            retry: Duration::from_secs(feed.retry_secs),
            client,
            cache,
        })
    }

    /// One request.  A good value is stored before it is returned.
    pub async fn fetch_once(&self) -> core::result::Result<f64, FetchError> {
        let body: Value = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(FetchError::Http)?
            .json()
            .await
            .map_err(FetchError::Http)?;

        let value = extract_rate(&body, &self.key, self.sub_key.as_deref()).ok_or_else(|| {
            FetchError::MissingValue {
                key: self.key.clone(),
                sub_key: self.sub_key.clone(),
            }
        })?;
        self.cache.set(value);
        Ok(value)
    }

    /// Poll forever.
    pub async fn run(self) {
        loop {
            let delay = match self.fetch_once().await {
                Ok(value) => {
                    info!("[{}] Updated rate: {}", self.name, value);
                    self.interval
                }
                Err(e) if self.cache.get().is_some() => {
                    warn!("[{}] Fetch failed: {}. Keeping last value", self.name, e);
                    self.interval
                }
                Err(e) => {
                    warn!(
                        "[{}] Fetch failed: {}. Retrying in {}s",
                        self.name,
                        e,
                        self.retry.as_secs()
                    );
                    self.retry
                }
            };
            tokio::time::sleep(delay).await;
        }
    }
}

/// Start polling `feed` into `cache`.  With no feed the cache stays empty
/// and the kiosk converts at its fallback rate, which is logged loudly.
pub fn spawn_feed(
    what: &str,
    feed: Option<&RateFeedConfig>,
    cache: &CachedRate,
) -> Result<Option<JoinHandle<()>>> {
    let Some(feed) = feed else {
        warn!("No {what} feed configured: every transaction will use the fallback {what}");
        return Ok(None);
    };
    let fetcher = RateFetcher::new(feed, cache.clone())?;
    info!("Polling {what} from {} every {}s", feed.url, feed.interval_secs);
    Ok(Some(tokio::spawn(fetcher.run())))
}

/// Pull `body[key]` or `body[key][sub_key]` as a positive number.
/// Numeric strings are accepted.
pub fn extract_rate(body: &Value, key: &str, sub_key: Option<&str>) -> Option<f64> {
    let mut value = body.get(key)?;
    if let Some(sub) = sub_key {
        value = value.get(sub)?;
    }
    let rate = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}
