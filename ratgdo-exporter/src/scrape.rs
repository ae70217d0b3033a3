//! Scrape orchestration: fetch the status, then update the metrics.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::mapping::{ExporterMetrics, StatusClass};

/// Result of a scrape that obtained an HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeOutcome {
    /// Upstream status code.
    pub status: u16,
    /// Bucket the response was counted in.
    pub class: Option<StatusClass>,
    /// Whether the body decoded and the gauges were updated.
    pub updated: bool,
}

/// Runs fetch and update for each scrape request, one at a time.
pub struct Scraper {
    fetcher: Fetcher,
    metrics: Arc<ExporterMetrics>,
    lock: Mutex<()>,
}

/// Create a shareable scraper handle.
pub type SharedScraper = Arc<Scraper>;

impl Scraper {
    pub fn new(fetcher: Fetcher, metrics: Arc<ExporterMetrics>) -> Self {
        Self {
            fetcher,
            metrics,
            lock: Mutex::new(()),
        }
    }

    pub fn metrics(&self) -> &ExporterMetrics {
        &self.metrics
    }

    /// Fetch the upstream status and apply it.
    ///
    /// Concurrent calls are serialized for the whole fetch and update. A
    /// transport failure is returned without counting anything; a body that
    /// fails to decode is logged and the previous gauge values are kept.
    pub async fn scrape(&self) -> Result<ScrapeOutcome, FetchError> {
        let _guard = self.lock.lock().await;

        let response = match self.fetcher.fetch().await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    address = %self.fetcher.address(),
                    timeout = e.is_timeout(),
                    error = %e,
                    "Error fetching data"
                );
                return Err(e);
            }
        };

        let (class, applied) = self.metrics.apply_response(response.status, &response.body);
        let updated = match applied {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    status = response.status,
                    body_len = response.body.len(),
                    error = %e,
                    "Error decoding status JSON"
                );
                false
            }
        };

        debug!(
            status = response.status,
            class = class.map(|c| c.as_str()),
            updated,
            "Scrape complete"
        );

        Ok(ScrapeOutcome {
            status: response.status,
            class,
            updated,
        })
    }
}
