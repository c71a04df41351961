//! In-memory structured event log for a scrape run.
//!
//! Every event is appended under a single lock acquisition and mirrored to
//! `tracing`, so concurrent site scrapes can share one log without
//! interleaving partial records.

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Severity of a logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Warn,
    Error,
    Success,
}

impl EventLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventLevel::Info => "info",
            EventLevel::Warn => "warn",
            EventLevel::Error => "error",
            EventLevel::Success => "success",
        }
    }
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single recorded event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    pub site: String,
    pub message: String,
}

/// Per-level event counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    pub info: usize,
    pub warn: usize,
    pub error: usize,
    pub success: usize,
}

/// Shared, append-only event sink. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, level: EventLevel, site: &str, message: impl Into<String>) {
        let message = message.into();
        match level {
            EventLevel::Info => tracing::info!(%site, "{message}"),
            EventLevel::Warn => tracing::warn!(%site, "{message}"),
            EventLevel::Error => tracing::error!(%site, "{message}"),
            EventLevel::Success => tracing::info!(%site, outcome = "success", "{message}"),
        }

        let event = LogEvent {
            timestamp: Utc::now(),
            level,
            site: site.to_string(),
            message,
        };
        // A poisoned lock only means another thread panicked mid-push;
        // the Vec itself is still valid.
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push(event);
    }

    pub fn info(&self, site: &str, message: impl Into<String>) {
        self.record(EventLevel::Info, site, message);
    }

    pub fn warn(&self, site: &str, message: impl Into<String>) {
        self.record(EventLevel::Warn, site, message);
    }

    pub fn error(&self, site: &str, message: impl Into<String>) {
        self.record(EventLevel::Error, site, message);
    }

    pub fn success(&self, site: &str, message: impl Into<String>) {
        self.record(EventLevel::Success, site, message);
    }

    /// Snapshot of all events in append order.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn events_for(&self, site: &str) -> Vec<LogEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| e.site == site)
            .cloned()
            .collect()
    }

    pub fn summary(&self) -> EventSummary {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let mut summary = EventSummary::default();
        for event in events.iter() {
            match event.level {
                EventLevel::Info => summary.info += 1,
                EventLevel::Warn => summary.warn += 1,
                EventLevel::Error => summary.error += 1,
                EventLevel::Success => summary.success += 1,
            }
        }
        summary
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the end-of-run summary, plus every error event, to `tracing`.
    pub fn log_summary(&self) {
        let summary = self.summary();
        tracing::info!(
            info = summary.info,
            warn = summary.warn,
            error = summary.error,
            success = summary.success,
            "Scrape run event summary"
        );
        for event in self.events().iter().filter(|e| e.level == EventLevel::Error) {
            tracing::info!(site = %event.site, "  error: {}", event.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_events_in_order() {
        let log = EventLog::new();
        log.info("Acme", "fetching");
        log.warn("Acme", "slow");
        log.success("Acme", "3 jobs");

        let events = log.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].level, EventLevel::Info);
        assert_eq!(events[2].message, "3 jobs");
    }

    #[test]
    fn filters_by_site_and_summarises() {
        let log = EventLog::new();
        log.info("Acme", "a");
        log.error("Globex", "b");
        log.error("Globex", "c");
        log.success("Acme", "d");

        assert_eq!(log.events_for("Globex").len(), 2);
        assert_eq!(
            log.summary(),
            EventSummary {
                info: 1,
                warn: 0,
                error: 2,
                success: 1
            }
        );
    }

    #[test]
    fn clones_share_the_buffer() {
        let log = EventLog::new();
        let other = log.clone();
        other.warn("Acme", "shared");
        assert_eq!(log.len(), 1);
        assert!(!log.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_are_not_lost() {
        let log = EventLog::new();
        let mut handles = Vec::new();
        for task in 0..8 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    log.info(&format!("site-{task}"), format!("event {i}"));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(log.len(), 400);
        for task in 0..8 {
            let events = log.events_for(&format!("site-{task}"));
            assert_eq!(events.len(), 50);
            assert!(events.iter().all(|e| e.message.starts_with("event ")));
        }
    }
}
