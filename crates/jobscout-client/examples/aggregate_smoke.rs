/// One aggregation run against live career pages.
///
/// Reads `JOBSCOUT_*` settings from the environment (or `.env`), uses the
/// registry file named by `JOBSCOUT_SITES` when set, and prints the result
/// as JSON on stdout.
///
/// Run with:
///   cargo run -p jobscout-client --example aggregate_smoke --features browser
use std::path::PathBuf;

use jobscout_client::build_aggregator;
use jobscout_core::{EventLog, ScraperConfig, SiteRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,jobscout_core=info,jobscout_client=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ScraperConfig::from_env()?;
    let registry = match std::env::var_os("JOBSCOUT_SITES") {
        Some(path) => SiteRegistry::from_path(&PathBuf::from(path))?,
        None => SiteRegistry::builtin(),
    };
    eprintln!(
        "Scraping {} enabled of {} registered sites",
        registry.enabled().len(),
        registry.len()
    );

    let aggregator = build_aggregator(registry, config, EventLog::new())?;
    let result = aggregator.scrape_all_sites().await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    let events = aggregator.log().summary();
    eprintln!(
        "{} jobs, {} ok / {} failed sites, {} warnings, {} errors",
        result.total_jobs,
        result.summary.successful,
        result.summary.failed,
        events.warn,
        events.error
    );

    if !result.success {
        anyhow::bail!("run aborted: {}", result.errors.join("; "));
    }
    Ok(())
}
