use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Location used when a listing does not state one.
pub const UNSPECIFIED_LOCATION: &str = "Not specified";

/// Recruiter id stamped on every scraped listing.
pub const EXTERNAL_RECRUITER_ID: &str = "external_scraper";

/// Optional CSS selector hints for a single site.
///
/// `job_container` selects one element per listing; the other selectors
/// are evaluated relative to that element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteSelectors {
    pub job_container: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
}

/// A scrape target: one career page or job board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub company: String,
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub selectors: Option<SiteSelectors>,
}

fn default_enabled() -> bool {
    true
}

impl SiteConfig {
    pub fn new(company: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            url: url.into(),
            enabled: true,
            selectors: None,
        }
    }

    pub fn with_selectors(mut self, selectors: SiteSelectors) -> Self {
        self.selectors = Some(selectors);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A listing as extracted from the page, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJobRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub description: Option<String>,
    pub job_type: Option<String>,
    pub posted_date: Option<String>,
}

impl RawJobRecord {
    pub fn new(title: impl Into<String>, company: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            location: UNSPECIFIED_LOCATION.to_string(),
            url: url.into(),
            description: None,
            job_type: None,
            posted_date: None,
        }
    }
}

/// Canonical job record handed to the caller for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedJob {
    pub id: String,
    pub title: String,
    pub description: String,
    pub role: String,
    pub salary: u64,
    pub experience: u32,
    pub location: String,
    pub status: String,
    pub openings: u32,
    pub company_id: String,
    pub company_name: String,
    pub recruiter_id: String,
    pub tech_stack: Vec<String>,
    pub source: String,
    pub external_company: String,
    pub external_url: String,
    pub scraped_at: DateTime<Utc>,
    pub scrape_status: String,
    pub job_type: Option<String>,
    pub posted_date: Option<String>,
}

/// Which fetch strategy produced a site's jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMethod {
    Http,
    Browser,
}

impl FetchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMethod::Http => "http",
            FetchMethod::Browser => "browser",
        }
    }
}

impl fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of scraping a single site.
///
/// On failure `method` is the last strategy that was attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub site: String,
    pub success: bool,
    pub jobs: Vec<NormalizedJob>,
    pub error: Option<String>,
    pub method: FetchMethod,
}

impl ScrapeResult {
    pub fn succeeded(site: impl Into<String>, jobs: Vec<NormalizedJob>, method: FetchMethod) -> Self {
        Self {
            site: site.into(),
            success: true,
            jobs,
            error: None,
            method,
        }
    }

    pub fn failed(site: impl Into<String>, error: impl Into<String>, method: FetchMethod) -> Self {
        Self {
            site: site.into(),
            success: false,
            jobs: Vec::new(),
            error: Some(error.into()),
            method,
        }
    }
}

/// Run-level tallies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub jobs_per_site: BTreeMap<String, usize>,
}

/// Result of one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub success: bool,
    pub total_jobs: usize,
    pub jobs: Vec<NormalizedJob>,
    pub results: Vec<ScrapeResult>,
    pub summary: RunSummary,
    pub errors: Vec<String>,
}

impl AggregateResult {
    /// Merge per-site results, in the order given, into a run result.
    ///
    /// A listing URL appears once in `jobs`; the earliest site keeps it.
    pub fn from_results(results: Vec<ScrapeResult>) -> Self {
        let mut summary = RunSummary {
            total: results.len(),
            ..RunSummary::default()
        };
        let mut errors = Vec::new();
        let mut jobs = Vec::new();
        let mut seen_urls = HashSet::new();

        for result in &results {
            *summary.jobs_per_site.entry(result.site.clone()).or_default() += result.jobs.len();
            if result.success {
                summary.successful += 1;
                jobs.extend(
                    result
                        .jobs
                        .iter()
                        .filter(|job| seen_urls.insert(job.external_url.as_str()))
                        .cloned(),
                );
            } else {
                summary.failed += 1;
                if let Some(err) = &result.error {
                    errors.push(format!("{}: {}", result.site, err));
                }
            }
        }

        Self {
            success: true,
            total_jobs: jobs.len(),
            jobs,
            results,
            summary,
            errors,
        }
    }

    /// A run that aborted before producing per-site results.
    pub fn aborted(error: impl Into<String>) -> Self {
        Self {
            success: false,
            total_jobs: 0,
            jobs: Vec::new(),
            results: Vec::new(),
            summary: RunSummary::default(),
            errors: vec![error.into()],
        }
    }
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
