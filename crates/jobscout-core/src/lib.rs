pub mod aggregate;
pub mod config;
pub mod error;
pub mod event_log;
pub mod models;
pub mod normalize;
pub mod registry;
pub mod retry;
pub mod scrape;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use aggregate::Aggregator;
pub use config::ScraperConfig;
pub use error::AppError;
pub use event_log::{EventLevel, EventLog, LogEvent};
pub use models::{
    AggregateResult, FetchMethod, NormalizedJob, RawJobRecord, RunSummary, ScrapeResult,
    SiteConfig, SiteSelectors, compute_hash,
};
pub use normalize::normalize_jobs;
pub use registry::SiteRegistry;
pub use retry::{RetryPolicy, with_retry};
pub use scrape::SiteScraper;
pub use traits::{DisabledRenderer, Fetcher, JobParser, Renderer};
