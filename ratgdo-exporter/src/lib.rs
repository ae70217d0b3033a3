//! Prometheus metrics exporter for ratgdo garage door controllers.
//!
//! Every request to the metrics endpoint fetches the controller's
//! `status.json`, maps its fields onto a fixed set of gauges, counts the
//! upstream response by status class, and renders the result.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │     ratgdo      │<────│     Scraper     │<────│   HTTP Server   │
//! │  (status.json)  │────>│ (fetch + map)   │────>│   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! ratgdo-exporter --json-address http://ratgdo/status.json --port 8080 --location garage
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration file options.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod mapping;
pub mod registry;
pub mod scrape;
pub mod status;

pub use config::ExporterConfig;
pub use error::{DecodeError, FetchError};
pub use fetcher::{FetchResponse, Fetcher};
pub use http::HttpServer;
pub use mapping::{ExporterMetrics, StatusClass};
pub use registry::MetricsRegistry;
pub use scrape::{ScrapeOutcome, Scraper, SharedScraper};
pub use status::{DoorState, StatusSnapshot};
