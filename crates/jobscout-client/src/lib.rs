#[cfg(feature = "browser")]
pub mod browser;
pub mod fetcher;
pub mod parser;

#[cfg(feature = "browser")]
pub use browser::ChromiumRenderer;
pub use fetcher::ReqwestFetcher;
pub use parser::{SelectorParser, SelectorPattern};

use jobscout_core::{Aggregator, AppError, EventLog, ScraperConfig, SiteRegistry, SiteScraper};

/// Browser strategy used by [`build_aggregator`].
#[cfg(feature = "browser")]
pub type DefaultRenderer = ChromiumRenderer;
#[cfg(not(feature = "browser"))]
pub type DefaultRenderer = jobscout_core::DisabledRenderer;

/// Wire the production strategies into an aggregator.
///
/// Without the `browser` feature the browser fallback always fails, so
/// sites whose listings need script rendering come back as failures.
pub fn build_aggregator(
    registry: SiteRegistry,
    config: ScraperConfig,
    log: EventLog,
) -> Result<Aggregator<ReqwestFetcher, DefaultRenderer, SelectorParser>, AppError> {
    let fetcher = ReqwestFetcher::new(&config)?;
    let renderer = default_renderer(&config);
    let scraper = SiteScraper::new(fetcher, renderer, SelectorParser::new(), config, log);
    Ok(Aggregator::new(registry, scraper))
}

#[cfg(feature = "browser")]
fn default_renderer(config: &ScraperConfig) -> DefaultRenderer {
    ChromiumRenderer::new(config)
}

#[cfg(not(feature = "browser"))]
fn default_renderer(_config: &ScraperConfig) -> DefaultRenderer {
    jobscout_core::DisabledRenderer
}
