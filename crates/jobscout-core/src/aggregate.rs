//! Runs the site scraper over every enabled site under a bounded pool.
//!
//! The aggregator owns the renderer for the length of a run and releases it
//! on every exit path, including pipeline-level failures. A fault inside one
//! site's task stays with that site.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};

use crate::error::AppError;
use crate::event_log::EventLog;
use crate::models::{AggregateResult, FetchMethod, ScrapeResult};
use crate::registry::SiteRegistry;
use crate::scrape::SiteScraper;
use crate::traits::{Fetcher, JobParser, Renderer};

/// Site label used for run-level events.
pub const RUN_LABEL: &str = "aggregator";

pub struct Aggregator<F, R, P>
where
    F: Fetcher + 'static,
    R: Renderer + 'static,
    P: JobParser + 'static,
{
    registry: SiteRegistry,
    scraper: SiteScraper<F, R, P>,
}

impl<F, R, P> Aggregator<F, R, P>
where
    F: Fetcher + 'static,
    R: Renderer + 'static,
    P: JobParser + 'static,
{
    pub fn new(registry: SiteRegistry, scraper: SiteScraper<F, R, P>) -> Self {
        Self { registry, scraper }
    }

    pub fn log(&self) -> &EventLog {
        self.scraper.log()
    }

    /// Perform one aggregation run.
    ///
    /// Individual site failures are reported in the result; only a failure
    /// of the run itself yields `success: false`.
    pub async fn scrape_all_sites(&self) -> AggregateResult {
        let log = self.scraper.log();
        let outcome = self.run_sites().await;

        if let Err(e) = self.scraper.renderer().release().await {
            log.error(RUN_LABEL, format!("Failed to release browser: {e}"));
        }

        let result = match outcome {
            Ok(results) => AggregateResult::from_results(results),
            Err(e) => {
                log.error(RUN_LABEL, format!("Scrape run aborted: {e}"));
                AggregateResult::aborted(e.to_string())
            }
        };

        log.info(
            RUN_LABEL,
            format!(
                "Run finished: {} jobs from {}/{} sites ({} failed)",
                result.total_jobs,
                result.summary.successful,
                result.summary.total,
                result.summary.failed
            ),
        );
        log.log_summary();

        result
    }

    /// Scrape enabled sites concurrently; results come back in registry order.
    ///
    /// A site whose task panics is reported as a failed site. Only a broken
    /// pool or a lost result fails the run.
    async fn run_sites(&self) -> Result<Vec<ScrapeResult>, AppError> {
        let log = self.scraper.log();
        let sites = self.registry.enabled();
        let concurrency = self.scraper.config().concurrency.max(1);
        log.info(
            RUN_LABEL,
            format!(
                "Scraping {} enabled sites (concurrency {concurrency})",
                sites.len()
            ),
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut tasks = JoinSet::new();
        let mut task_sites: HashMap<Id, usize> = HashMap::with_capacity(sites.len());

        for (index, site) in sites.iter().cloned().enumerate() {
            let scraper = self.scraper.clone();
            let semaphore = Arc::clone(&semaphore);
            let handle = tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| AppError::Pipeline(format!("Concurrency pool closed: {e}")))?;
                Ok::<_, AppError>(scraper.scrape_site(&site).await)
            });
            task_sites.insert(handle.id(), index);
        }

        let mut slots: Vec<Option<ScrapeResult>> = vec![None; sites.len()];
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, outcome)) => {
                    let index = slot_for(&task_sites, id)?;
                    slots[index] = Some(outcome?);
                }
                Err(e) => {
                    let index = slot_for(&task_sites, e.id())?;
                    let site = &sites[index].company;
                    let message = format!("Site task failed: {e}");
                    log.error(site, &message);
                    slots[index] = Some(ScrapeResult::failed(site, message, FetchMethod::Http));
                }
            }
        }

        slots
            .into_iter()
            .zip(&sites)
            .map(|(slot, site)| {
                slot.ok_or_else(|| {
                    AppError::Pipeline(format!("No result recorded for {}", site.company))
                })
            })
            .collect()
    }
}

fn slot_for(task_sites: &HashMap<Id, usize>, id: Id) -> Result<usize, AppError> {
    task_sites
        .get(&id)
        .copied()
        .ok_or_else(|| AppError::Pipeline(format!("Unknown site task {id}")))
}
