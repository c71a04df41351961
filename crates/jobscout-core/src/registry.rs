use std::path::Path;

use crate::error::AppError;
use crate::models::{SiteConfig, SiteSelectors};

/// The list of scrape targets for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteRegistry {
    sites: Vec<SiteConfig>,
}

impl SiteRegistry {
    pub fn new(sites: Vec<SiteConfig>) -> Self {
        Self { sites }
    }

    /// Parse a JSON array of site entries (camelCase keys).
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let sites: Vec<SiteConfig> = serde_json::from_str(json)?;
        for site in &sites {
            if site.company.trim().is_empty() {
                return Err(AppError::ConfigError(format!(
                    "Site entry for {} has an empty company name",
                    site.url
                )));
            }
            if !site.url.starts_with("http://") && !site.url.starts_with("https://") {
                return Err(AppError::ConfigError(format!(
                    "Site '{}' has a non-http URL: {}",
                    site.company, site.url
                )));
            }
        }
        Ok(Self { sites })
    }

    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Career pages scraped when the caller supplies no registry.
    pub fn builtin() -> Self {
        Self::new(vec![
            SiteConfig::new("Stripe", "https://stripe.com/jobs/search"),
            SiteConfig::new("Shopify", "https://www.shopify.com/careers/search"),
            SiteConfig::new("GitLab", "https://about.gitlab.com/jobs/all-jobs/").with_selectors(
                SiteSelectors {
                    job_container: Some(".job-listing, [class*='job-item']".into()),
                    title: Some("a, h3".into()),
                    location: Some("[class*='location']".into()),
                    link: Some("a[href]".into()),
                    description: None,
                },
            ),
            SiteConfig::new("Cloudflare", "https://www.cloudflare.com/careers/jobs/"),
            SiteConfig::new("Mozilla", "https://www.mozilla.org/en-US/careers/listings/")
                .with_selectors(SiteSelectors {
                    job_container: Some("tr.position".into()),
                    title: Some("td.title a".into()),
                    location: Some("td.location".into()),
                    link: Some("td.title a".into()),
                    description: None,
                }),
            SiteConfig::new("Notion", "https://www.notion.so/careers").disabled(),
        ])
    }

    pub fn sites(&self) -> &[SiteConfig] {
        &self.sites
    }

    /// Enabled sites, in registry order.
    pub fn enabled(&self) -> Vec<SiteConfig> {
        self.sites.iter().filter(|s| s.enabled).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
