use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::retry::RetryPolicy;

/// Tunables for one aggregation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScraperConfig {
    /// Per-HTTP-request abort threshold.
    pub timeout: Duration,
    /// Retry behaviour applied to each fetch strategy.
    pub retry: RetryPolicy,
    /// Maximum number of sites scraped at once.
    pub concurrency: usize,
    /// Browser navigation abort threshold.
    pub browser_timeout: Duration,
    /// Fixed delay after navigation before looking for job containers.
    pub settle_delay: Duration,
    /// How long the browser waits for each job-container selector to attach.
    pub selector_timeout: Duration,
    /// Raw HTML shorter than this is treated as a block page.
    pub min_html_length: usize,
    /// Visible body text shorter than this is treated as a block page.
    pub min_text_length: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            concurrency: 3,
            browser_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(2),
            selector_timeout: Duration::from_secs(2),
            min_html_length: 100,
            min_text_length: 50,
        }
    }
}

impl ScraperConfig {
    /// Read overrides from environment variables, falling back to defaults.
    ///
    /// - `JOBSCOUT_TIMEOUT_SECS`
    /// - `JOBSCOUT_MAX_RETRIES`
    /// - `JOBSCOUT_RETRY_DELAY_MS`
    /// - `JOBSCOUT_EXPONENTIAL_BACKOFF` (`true`/`false`)
    /// - `JOBSCOUT_CONCURRENCY` (at least 1)
    /// - `JOBSCOUT_BROWSER_TIMEOUT_SECS`
    /// - `JOBSCOUT_SETTLE_DELAY_MS`
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<u64>(&lookup, "JOBSCOUT_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var::<u32>(&lookup, "JOBSCOUT_MAX_RETRIES")? {
            config.retry.max_retries = retries;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "JOBSCOUT_RETRY_DELAY_MS")? {
            config.retry.retry_delay = Duration::from_millis(ms);
        }
        if let Some(exp) = parse_var::<bool>(&lookup, "JOBSCOUT_EXPONENTIAL_BACKOFF")? {
            config.retry.exponential_backoff = exp;
        }
        if let Some(n) = parse_var::<usize>(&lookup, "JOBSCOUT_CONCURRENCY")? {
            if n == 0 {
                return Err(AppError::ConfigError(
                    "JOBSCOUT_CONCURRENCY must be at least 1".into(),
                ));
            }
            config.concurrency = n;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "JOBSCOUT_BROWSER_TIMEOUT_SECS")? {
            config.browser_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "JOBSCOUT_SETTLE_DELAY_MS")? {
            config.settle_delay = Duration::from_millis(ms);
        }

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_browser_timeout(mut self, timeout: Duration) -> Self {
        self.browser_timeout = timeout;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, AppError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            AppError::ConfigError(format!("Invalid {key} '{raw}'"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = ScraperConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ScraperConfig::default());
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.selector_timeout, Duration::from_secs(2));
    }

    #[test]
    fn reads_overrides() {
        let config = ScraperConfig::from_lookup(lookup(&[
            ("JOBSCOUT_TIMEOUT_SECS", "10"),
            ("JOBSCOUT_MAX_RETRIES", "4"),
            ("JOBSCOUT_RETRY_DELAY_MS", "250"),
            ("JOBSCOUT_EXPONENTIAL_BACKOFF", "false"),
            ("JOBSCOUT_CONCURRENCY", "5"),
            ("JOBSCOUT_BROWSER_TIMEOUT_SECS", "45"),
            ("JOBSCOUT_SETTLE_DELAY_MS", "500"),
        ]))
        .unwrap();

        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(config.retry.retry_delay, Duration::from_millis(250));
        assert!(!config.retry.exponential_backoff);
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.browser_timeout, Duration::from_secs(45));
        assert_eq!(config.settle_delay, Duration::from_millis(500));
    }

    #[test]
    fn rejects_malformed_values() {
        let err = ScraperConfig::from_lookup(lookup(&[("JOBSCOUT_MAX_RETRIES", "lots")]))
            .unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("JOBSCOUT_MAX_RETRIES"));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let err =
            ScraperConfig::from_lookup(lookup(&[("JOBSCOUT_CONCURRENCY", "0")])).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn builder_clamps_concurrency() {
        assert_eq!(ScraperConfig::default().with_concurrency(0).concurrency, 1);
    }
}
