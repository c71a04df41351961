//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` or atomics for interior mutability,
//! allowing test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::models::{RawJobRecord, SiteConfig};
use crate::normalize::company_slug;
use crate::traits::{Fetcher, JobParser, Renderer};

/// A page long enough to pass the substantive-content checks.
pub const SAMPLE_HTML: &str = "<html><head><title>Careers</title></head><body>\
<h1>Open positions</h1><p>We are hiring engineers, designers and product managers \
across several offices. Browse the listings below.</p></body></html>";

/// `count` valid raw listings for `company`, with distinct URLs.
pub fn sample_raw_jobs(company: &str, count: usize) -> Vec<RawJobRecord> {
    let slug = company_slug(company);
    (1..=count)
        .map(|i| {
            let mut job = RawJobRecord::new(
                format!("Software Engineer {i}"),
                company,
                format!("https://{slug}.test/jobs/{i}"),
            );
            job.location = "Remote".into();
            job
        })
        .collect()
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock HTTP strategy with queued responses and in-flight tracking.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns the default HTML.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    default_html: String,
    delay: Duration,
    url_delays: Arc<HashMap<String, Duration>>,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::build(Vec::new(), html)
    }

    pub fn with_error(error: AppError) -> Self {
        Self::build(vec![Err(error)], SAMPLE_HTML)
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self::build(responses, SAMPLE_HTML)
    }

    fn build(responses: Vec<Result<String, AppError>>, default_html: &str) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            default_html: default_html.to_string(),
            delay: Duration::ZERO,
            url_delays: Arc::new(HashMap::new()),
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sleep this long inside every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sleep this long when fetching `url`, overriding the global delay.
    pub fn with_url_delay(mut self, url: &str, delay: Duration) -> Self {
        Arc::make_mut(&mut self.url_delays).insert(url.to_string(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of fetches observed running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.url_delays.get(url).copied().unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_html.clone())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockRenderer
// ---------------------------------------------------------------------------

/// Mock browser strategy that records render and release calls.
#[derive(Clone)]
pub struct MockRenderer {
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    default_html: String,
    release_error: Arc<Mutex<Option<AppError>>>,
    render_calls: Arc<AtomicUsize>,
    release_calls: Arc<AtomicUsize>,
}

impl MockRenderer {
    pub fn new(html: &str) -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            default_html: html.to_string(),
            release_error: Arc::new(Mutex::new(None)),
            render_calls: Arc::new(AtomicUsize::new(0)),
            release_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        let renderer = Self::new(SAMPLE_HTML);
        *renderer.responses.lock().unwrap() = responses;
        renderer
    }

    pub fn with_release_error(self, error: AppError) -> Self {
        *self.release_error.lock().unwrap() = Some(error);
        self
    }

    pub fn render_calls(&self) -> usize {
        self.render_calls.load(Ordering::SeqCst)
    }

    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }
}

impl Renderer for MockRenderer {
    async fn render(&self, _url: &str) -> Result<String, AppError> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_html.clone())
        } else {
            responses.remove(0)
        }
    }

    async fn release(&self) -> Result<(), AppError> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        match self.release_error.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// MockParser
// ---------------------------------------------------------------------------

/// Mock parser keyed by site URL.
///
/// A URL registered with [`with_jobs`](Self::with_jobs) yields the same
/// records on every call; one registered with
/// [`with_sequence`](Self::with_sequence) yields successive batches, then
/// nothing. Unknown URLs yield nothing.
#[derive(Clone, Default)]
pub struct MockParser {
    fixed: Arc<HashMap<String, Vec<RawJobRecord>>>,
    sequences: Arc<Mutex<HashMap<String, Vec<Vec<RawJobRecord>>>>>,
    parsed_urls: Arc<Mutex<Vec<String>>>,
    panic_all: bool,
    panic_urls: Arc<Vec<String>>,
}

impl MockParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// A parser whose every call panics.
    pub fn panicking() -> Self {
        Self {
            panic_all: true,
            ..Self::default()
        }
    }

    /// Panic whenever the page of `url` is parsed.
    pub fn with_panic(mut self, url: &str) -> Self {
        Arc::make_mut(&mut self.panic_urls).push(url.to_string());
        self
    }

    pub fn with_jobs(mut self, url: &str, jobs: Vec<RawJobRecord>) -> Self {
        Arc::make_mut(&mut self.fixed).insert(url.to_string(), jobs);
        self
    }

    pub fn with_sequence(self, url: &str, batches: Vec<Vec<RawJobRecord>>) -> Self {
        self.sequences
            .lock()
            .unwrap()
            .insert(url.to_string(), batches);
        self
    }

    /// Site URLs passed to `parse`, in call order.
    pub fn parsed_urls(&self) -> Vec<String> {
        self.parsed_urls.lock().unwrap().clone()
    }
}

impl JobParser for MockParser {
    fn parse(&self, _html: &str, site: &SiteConfig) -> Vec<RawJobRecord> {
        if self.panic_all || self.panic_urls.contains(&site.url) {
            panic!("parser exploded on {}", site.url);
        }
        self.parsed_urls.lock().unwrap().push(site.url.clone());

        if let Some(jobs) = self.fixed.get(&site.url) {
            return jobs.clone();
        }
        let mut sequences = self.sequences.lock().unwrap();
        match sequences.get_mut(&site.url) {
            Some(batches) if !batches.is_empty() => batches.remove(0),
            _ => Vec::new(),
        }
    }
}
