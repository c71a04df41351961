use crate::config::ScraperConfig;
use crate::event_log::EventLog;
use crate::models::{FetchMethod, NormalizedJob, ScrapeResult, SiteConfig};
use crate::normalize::normalize_jobs;
use crate::retry::with_retry;
use crate::traits::{Fetcher, JobParser, Renderer};

/// Error reported when neither strategy produced a usable job.
pub const NO_JOBS_ERROR: &str = "no jobs found after trying all methods";

/// Per-site control flow.
///
/// ```text
/// HTTP_ATTEMPT --[0 jobs]--> BROWSER_FALLBACK --[0 jobs]--> TERMINAL
///      |                          |
///      +--[>=1 job]--> done       +--[>=1 job]--> done
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapePhase {
    HttpAttempt,
    BrowserFallback,
    Terminal,
}

impl ScrapePhase {
    /// Strategy run in this phase, or `None` once terminal.
    pub fn method(self) -> Option<FetchMethod> {
        match self {
            ScrapePhase::HttpAttempt => Some(FetchMethod::Http),
            ScrapePhase::BrowserFallback => Some(FetchMethod::Browser),
            ScrapePhase::Terminal => None,
        }
    }

    /// Next phase after this one yielded `jobs_found` normalized jobs.
    ///
    /// `None` means the site is done and successful.
    pub fn advance(self, jobs_found: usize) -> Option<ScrapePhase> {
        match self {
            ScrapePhase::Terminal => Some(ScrapePhase::Terminal),
            _ if jobs_found > 0 => None,
            ScrapePhase::HttpAttempt => Some(ScrapePhase::BrowserFallback),
            ScrapePhase::BrowserFallback => Some(ScrapePhase::Terminal),
        }
    }
}

/// Scrapes one site: HTTP first, headless browser on zero yield.
///
/// Generic over the fetch strategies and parser so the fallback policy can
/// be exercised without network access. Never fails: every outcome is a
/// [`ScrapeResult`].
#[derive(Clone)]
pub struct SiteScraper<F, R, P>
where
    F: Fetcher,
    R: Renderer,
    P: JobParser,
{
    fetcher: F,
    renderer: R,
    parser: P,
    config: ScraperConfig,
    log: EventLog,
}

impl<F, R, P> SiteScraper<F, R, P>
where
    F: Fetcher,
    R: Renderer,
    P: JobParser,
{
    pub fn new(fetcher: F, renderer: R, parser: P, config: ScraperConfig, log: EventLog) -> Self {
        Self {
            fetcher,
            renderer,
            parser,
            config,
            log,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub async fn scrape_site(&self, site: &SiteConfig) -> ScrapeResult {
        let label = site.company.as_str();
        self.log.info(label, format!("Scraping {}", site.url));

        let mut phase = ScrapePhase::HttpAttempt;
        let mut last_method = FetchMethod::Http;

        while let Some(method) = phase.method() {
            let jobs = self.attempt(site, method).await;
            last_method = method;

            match phase.advance(jobs.len()) {
                None => {
                    self.log.success(
                        label,
                        format!("Found {} jobs via {method}", jobs.len()),
                    );
                    return ScrapeResult::succeeded(label, jobs, method);
                }
                Some(next) => {
                    if next == ScrapePhase::BrowserFallback {
                        self.log
                            .info(label, "No jobs via HTTP, falling back to browser");
                    }
                    phase = next;
                }
            }
        }

        self.log.error(label, NO_JOBS_ERROR);
        ScrapeResult::failed(label, NO_JOBS_ERROR, last_method)
    }

    /// Fetch (with retry), parse and normalize using one strategy.
    async fn attempt(&self, site: &SiteConfig, method: FetchMethod) -> Vec<NormalizedJob> {
        let label = site.company.as_str();
        let retry = &self.config.retry;

        let html = match method {
            FetchMethod::Http => {
                with_retry(retry, label, &self.log, || self.fetcher.fetch(&site.url)).await
            }
            FetchMethod::Browser => {
                with_retry(retry, label, &self.log, || self.renderer.render(&site.url)).await
            }
        };

        let html = match html {
            Ok(html) => html,
            Err(e) => {
                let kind = if e.is_transport() {
                    "transport failure"
                } else {
                    "unusable page"
                };
                self.log
                    .warn(label, format!("{method} strategy gave up ({kind}): {e}"));
                return Vec::new();
            }
        };

        let raw = self.parser.parse(&html, site);
        if raw.is_empty() {
            self.log
                .warn(label, format!("No job listings matched in {method} page"));
            return Vec::new();
        }
        self.log
            .info(label, format!("Parsed {} raw listings via {method}", raw.len()));

        normalize_jobs(raw, label, &self.log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::retry::RetryPolicy;
    use crate::testutil::*;
    use crate::traits::DisabledRenderer;
    use std::time::Duration;

    fn acme() -> SiteConfig {
        SiteConfig::new("Acme", "https://acme.test/jobs")
    }

    fn fast_config() -> ScraperConfig {
        ScraperConfig::default().with_retry(RetryPolicy::new(1, Duration::from_millis(1)))
    }

    #[test]
    fn phase_transitions() {
        assert_eq!(
            ScrapePhase::HttpAttempt.advance(0),
            Some(ScrapePhase::BrowserFallback)
        );
        assert_eq!(ScrapePhase::HttpAttempt.advance(3), None);
        assert_eq!(
            ScrapePhase::BrowserFallback.advance(0),
            Some(ScrapePhase::Terminal)
        );
        assert_eq!(ScrapePhase::BrowserFallback.advance(1), None);
        assert_eq!(ScrapePhase::Terminal.advance(5), Some(ScrapePhase::Terminal));
        assert_eq!(ScrapePhase::Terminal.method(), None);
    }

    #[tokio::test]
    async fn http_success_skips_browser() {
        let renderer = MockRenderer::new(SAMPLE_HTML);
        let parser = MockParser::new().with_jobs("https://acme.test/jobs", sample_raw_jobs("Acme", 3));
        let scraper = SiteScraper::new(
            MockFetcher::new(SAMPLE_HTML),
            renderer.clone(),
            parser,
            fast_config(),
            EventLog::new(),
        );

        let result = scraper.scrape_site(&acme()).await;

        assert!(result.success);
        assert_eq!(result.method, FetchMethod::Http);
        assert_eq!(result.jobs.len(), 3);
        assert!(result.error.is_none());
        assert_eq!(renderer.render_calls(), 0);
    }

    #[tokio::test]
    async fn http_retry_recovers_without_browser() {
        let fetcher = MockFetcher::with_error(AppError::NetworkError("connection reset".into()));
        let renderer = MockRenderer::new(SAMPLE_HTML);
        let parser = MockParser::new().with_jobs("https://acme.test/jobs", sample_raw_jobs("Acme", 2));
        let scraper = SiteScraper::new(
            fetcher.clone(),
            renderer.clone(),
            parser,
            fast_config(),
            EventLog::new(),
        );

        let result = scraper.scrape_site(&acme()).await;

        assert!(result.success);
        assert_eq!(result.method, FetchMethod::Http);
        assert_eq!(result.jobs.len(), 2);
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(renderer.render_calls(), 0);
        assert!(
            scraper
                .log()
                .events_for("Acme")
                .iter()
                .any(|e| e.level == crate::event_log::EventLevel::Warn)
        );
    }

    #[tokio::test]
    async fn zero_http_jobs_falls_back_to_browser() {
        let fetcher = MockFetcher::new(SAMPLE_HTML);
        let renderer = MockRenderer::new(SAMPLE_HTML);
        // First parse (HTTP page) yields nothing, second (rendered page) yields one.
        let parser = MockParser::new().with_sequence(
            "https://acme.test/jobs",
            vec![Vec::new(), sample_raw_jobs("Acme", 1)],
        );
        let scraper = SiteScraper::new(
            fetcher.clone(),
            renderer.clone(),
            parser,
            fast_config(),
            EventLog::new(),
        );

        let result = scraper.scrape_site(&acme()).await;

        assert!(result.success);
        assert_eq!(result.method, FetchMethod::Browser);
        assert_eq!(result.jobs.len(), 1);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(renderer.render_calls(), 1);
    }

    #[tokio::test]
    async fn http_timeouts_then_browser_success() {
        let fetcher = MockFetcher::with_responses(vec![
            Err(AppError::Timeout(30)),
            Err(AppError::Timeout(30)),
        ]);
        let renderer = MockRenderer::new(SAMPLE_HTML);
        let parser = MockParser::new().with_jobs("https://acme.test/jobs", sample_raw_jobs("Acme", 1));
        let scraper = SiteScraper::new(
            fetcher.clone(),
            renderer.clone(),
            parser,
            fast_config(),
            EventLog::new(),
        );

        let result = scraper.scrape_site(&acme()).await;

        assert!(result.success);
        assert_eq!(result.method, FetchMethod::Browser);
        assert_eq!(result.jobs.len(), 1);
        // max_retries = 1: two HTTP attempts before falling back.
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(renderer.render_calls(), 1);
    }

    #[tokio::test]
    async fn both_strategies_empty_is_terminal_failure() {
        let renderer = MockRenderer::new(SAMPLE_HTML);
        let log = EventLog::new();
        let scraper = SiteScraper::new(
            MockFetcher::new(SAMPLE_HTML),
            renderer.clone(),
            MockParser::new(),
            fast_config(),
            log.clone(),
        );

        let result = scraper.scrape_site(&acme()).await;

        assert!(!result.success);
        assert!(result.jobs.is_empty());
        assert_eq!(result.error.as_deref(), Some(NO_JOBS_ERROR));
        assert_eq!(result.method, FetchMethod::Browser);
        assert_eq!(renderer.render_calls(), 1);
        assert!(log.events_for("Acme").iter().any(|e| e.message == NO_JOBS_ERROR));
    }

    #[tokio::test]
    async fn browser_unavailable_is_reported_not_raised() {
        let fetcher = MockFetcher::with_responses(vec![
            Err(AppError::NetworkError("refused".into())),
            Err(AppError::NetworkError("refused".into())),
        ]);
        let scraper = SiteScraper::new(
            fetcher,
            DisabledRenderer,
            MockParser::new(),
            fast_config(),
            EventLog::new(),
        );

        let result = scraper.scrape_site(&acme()).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(NO_JOBS_ERROR));
    }

    #[tokio::test]
    async fn invalid_records_do_not_count_as_jobs() {
        let renderer = MockRenderer::new(SAMPLE_HTML);
        let bad = vec![
            crate::models::RawJobRecord::new("C", "Acme", "https://acme.test/jobs/1"),
            crate::models::RawJobRecord::new("Cookie banner", "Acme", "https://acme.test/c"),
        ];
        let parser = MockParser::new().with_sequence(
            "https://acme.test/jobs",
            vec![bad, sample_raw_jobs("Acme", 2)],
        );
        let scraper = SiteScraper::new(
            MockFetcher::new(SAMPLE_HTML),
            renderer.clone(),
            parser,
            fast_config(),
            EventLog::new(),
        );

        let result = scraper.scrape_site(&acme()).await;

        assert!(result.success);
        assert_eq!(result.method, FetchMethod::Browser);
        assert_eq!(result.jobs.len(), 2);
    }
}
