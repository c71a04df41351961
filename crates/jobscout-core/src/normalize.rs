//! Validation, cleanup and heuristic enrichment of raw listings.
//!
//! Everything here is a pure function of its input (plus the clock passed to
//! [`normalize_jobs_at`]); the only side effect is event logging.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::event_log::EventLog;
use crate::models::{
    EXTERNAL_RECRUITER_ID, NormalizedJob, RawJobRecord, UNSPECIFIED_LOCATION, compute_hash,
};

const MIN_TITLE_LENGTH: usize = 3;
const DEFAULT_EXPERIENCE: u32 = 2;
const MAX_EXPERIENCE: u32 = 40;

/// Title fragments that mark page chrome rather than a listing.
const BOILERPLATE_MARKERS: &[&str] = &["cookie", "privacy policy"];

/// Seniority keywords, checked in order; the first matching tier wins.
const SENIORITY_TIERS: &[(&[&str], u32)] = &[
    (&["senior", "lead", "principal"], 5),
    (&["mid", "intermediate"], 3),
    (&["junior", "entry"], 1),
];

/// Technology vocabulary matched as substrings of the lower-cased text.
const TECH_KEYWORDS: &[&str] = &[
    "javascript",
    "typescript",
    "python",
    "java",
    "react",
    "angular",
    "vue",
    "node",
    "golang",
    "rust",
    "ruby",
    "php",
    "swift",
    "kotlin",
    "scala",
    "c++",
    "c#",
    ".net",
    "sql",
    "postgres",
    "mongodb",
    "redis",
    "graphql",
    "aws",
    "azure",
    "gcp",
    "docker",
    "kubernetes",
    "terraform",
    "linux",
    "machine learning",
    "django",
    "spring",
];

static YEARS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*\+?\s*(?:years?|yrs?)\b")
        .expect("hardcoded regex pattern is valid")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("hardcoded regex pattern is valid"));

/// Why a raw record was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    TitleTooShort(String),
    InvalidUrl(String),
    Boilerplate { title: String, marker: &'static str },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::TitleTooShort(title) => write!(f, "title too short: '{title}'"),
            Rejection::InvalidUrl(url) => write!(f, "invalid url: '{url}'"),
            Rejection::Boilerplate { title, marker } => {
                write!(f, "title looks like page chrome ({marker}): '{title}'")
            }
        }
    }
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Check a raw record against the acceptance rules.
pub fn validate(raw: &RawJobRecord) -> Result<(), Rejection> {
    let title = clean_text(&raw.title);
    if title.chars().count() < MIN_TITLE_LENGTH {
        return Err(Rejection::TitleTooShort(title));
    }

    let url = raw.url.trim();
    if url.is_empty() || !url.starts_with("http") {
        return Err(Rejection::InvalidUrl(url.to_string()));
    }

    let lowered = title.to_lowercase();
    if let Some(&marker) = BOILERPLATE_MARKERS.iter().find(|m| lowered.contains(**m)) {
        return Err(Rejection::Boilerplate { title, marker });
    }

    Ok(())
}

/// The part of the title before the first `-`, or the whole title.
pub fn derive_role(title: &str) -> String {
    let role = title.split('-').next().unwrap_or(title).trim();
    if role.is_empty() {
        title.trim().to_string()
    } else {
        role.to_string()
    }
}

/// Years of experience implied by the text.
///
/// An explicit "N years" wins; otherwise seniority keywords decide.
pub fn infer_experience(text: &str) -> u32 {
    if let Some(years) = YEARS_PATTERN
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
    {
        return years.min(MAX_EXPERIENCE);
    }

    let lowered = text.to_lowercase();
    let words: HashSet<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    SENIORITY_TIERS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| words.contains(k)))
        .map(|(_, years)| *years)
        .unwrap_or(DEFAULT_EXPERIENCE)
}

/// Technologies mentioned in the text, capitalised, in vocabulary order.
///
/// Never empty: falls back to `["General"]`.
pub fn infer_tech_stack(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let stack: Vec<String> = TECH_KEYWORDS
        .iter()
        .filter(|k| lowered.contains(**k))
        .map(|k| capitalize(k))
        .collect();

    if stack.is_empty() {
        vec!["General".to_string()]
    } else {
        stack
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lower-case, dash-separated form of a company name.
pub fn company_slug(company: &str) -> String {
    let mut slug = String::with_capacity(company.len());
    for c in company.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Filesystem-safe id: URL hash prefix plus a millisecond timestamp.
pub fn job_id(url: &str, at: DateTime<Utc>) -> String {
    format!("ext_{}_{}", &compute_hash(url)[..16], at.timestamp_millis())
}

/// Normalize a batch using the current time.
pub fn normalize_jobs(
    raw_jobs: Vec<RawJobRecord>,
    site: &str,
    log: &EventLog,
) -> Vec<NormalizedJob> {
    normalize_jobs_at(raw_jobs, site, log, Utc::now())
}

/// Validate, enrich and deduplicate a batch of raw records.
///
/// Duplicates are detected by exact URL; the first occurrence wins.
pub fn normalize_jobs_at(
    raw_jobs: Vec<RawJobRecord>,
    site: &str,
    log: &EventLog,
    now: DateTime<Utc>,
) -> Vec<NormalizedJob> {
    let mut seen_urls = HashSet::new();
    let mut jobs = Vec::with_capacity(raw_jobs.len());

    for raw in raw_jobs {
        if let Err(rejection) = validate(&raw) {
            log.warn(site, format!("Rejected job: {rejection}"));
            continue;
        }

        let url = raw.url.trim().to_string();
        if !seen_urls.insert(url.clone()) {
            log.warn(site, format!("Dropped duplicate job: {url}"));
            continue;
        }

        jobs.push(build_job(raw, url, site, now));
    }

    log.info(site, format!("Normalized {} jobs", jobs.len()));
    jobs
}

fn build_job(raw: RawJobRecord, url: String, site: &str, now: DateTime<Utc>) -> NormalizedJob {
    let title = clean_text(&raw.title);
    let company = match clean_text(&raw.company) {
        c if c.is_empty() => site.to_string(),
        c => c,
    };
    let location = match clean_text(&raw.location) {
        l if l.is_empty() => UNSPECIFIED_LOCATION.to_string(),
        l => l,
    };
    let description = raw
        .description
        .as_deref()
        .map(clean_text)
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| format!("{title} at {company}"));

    let haystack = format!("{title} {description}");

    NormalizedJob {
        id: job_id(&url, now),
        role: derive_role(&title),
        experience: infer_experience(&haystack),
        tech_stack: infer_tech_stack(&haystack),
        title,
        description,
        salary: 0,
        location,
        status: "open".to_string(),
        openings: 1,
        company_id: company_slug(&company),
        company_name: company.clone(),
        recruiter_id: EXTERNAL_RECRUITER_ID.to_string(),
        source: "external".to_string(),
        external_company: company,
        external_url: url,
        scraped_at: now,
        scrape_status: "success".to_string(),
        job_type: raw.job_type.map(|t| clean_text(&t)),
        posted_date: raw.posted_date.map(|d| clean_text(&d)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn raw(title: &str, url: &str) -> RawJobRecord {
        RawJobRecord::new(title, "Acme", url)
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn rejects_short_titles() {
        assert!(matches!(
            validate(&raw("C", "https://x/y")),
            Err(Rejection::TitleTooShort(_))
        ));
        assert!(matches!(
            validate(&raw("", "https://x/y")),
            Err(Rejection::TitleTooShort(_))
        ));
    }

    #[test]
    fn rejects_invalid_urls() {
        assert!(matches!(
            validate(&raw("Senior Engineer", "not-a-url")),
            Err(Rejection::InvalidUrl(_))
        ));
        assert!(matches!(
            validate(&raw("Senior Engineer", "")),
            Err(Rejection::InvalidUrl(_))
        ));
    }

    #[test]
    fn rejects_boilerplate_titles() {
        assert!(matches!(
            validate(&raw("Cookie Settings", "https://acme.test/cookies")),
            Err(Rejection::Boilerplate { marker: "cookie", .. })
        ));
        assert!(matches!(
            validate(&raw("Read our Privacy Policy", "https://acme.test/privacy")),
            Err(Rejection::Boilerplate { .. })
        ));
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Senior\n\n  Rust   Engineer\t"), "Senior Rust Engineer");
    }

    #[test]
    fn role_is_text_before_first_dash() {
        assert_eq!(derive_role("Backend Engineer - Payments"), "Backend Engineer");
        assert_eq!(derive_role("Data Scientist"), "Data Scientist");
        assert_eq!(derive_role("- Remote"), "- Remote");
    }

    #[test]
    fn experience_table() {
        let cases = [
            ("Engineer, 7+ years required", 7),
            ("Engineer with 3 years of experience", 3),
            ("10 yrs Go", 10),
            ("Senior Backend Engineer", 5),
            ("Tech Lead", 5),
            ("Principal Architect", 5),
            ("Mid-level Developer", 3),
            ("Intermediate QA", 3),
            ("Junior Developer", 1),
            ("Entry-level Analyst", 1),
            ("Software Engineer", 2),
            ("Midnight Operations Engineer", 2),
            ("Senior Engineer. Trusted for over 100 years.", 5),
            ("Junior Analyst at a 150 years old firm", 1),
            ("Platform team, founded 2019, 4 yrs minimum", 4),
        ];
        for (text, expected) in cases {
            assert_eq!(infer_experience(text), expected, "text: {text}");
        }
    }

    #[test]
    fn explicit_years_beat_keywords() {
        assert_eq!(infer_experience("Senior engineer, 2 years"), 2);
    }

    #[test]
    fn tech_stack_table() {
        assert_eq!(
            infer_tech_stack("Backend engineer: Rust, Postgres and Kubernetes"),
            ["Rust", "Postgres", "Kubernetes"]
        );
        assert_eq!(infer_tech_stack("React + TypeScript"), ["Typescript", "React"]);
        assert_eq!(infer_tech_stack("C++ systems programmer"), ["C++"]);
        assert_eq!(infer_tech_stack("Account Executive"), ["General"]);
    }

    #[test]
    fn every_tech_keyword_is_recognised() {
        for keyword in TECH_KEYWORDS {
            let stack = infer_tech_stack(&format!("Engineer working with {keyword} daily"));
            assert!(
                stack.contains(&capitalize(keyword)),
                "{keyword} not found in {stack:?}"
            );
        }
    }

    #[test]
    fn tech_keyword_capitalisation() {
        assert_eq!(infer_tech_stack("C# developer"), ["C#"]);
        assert_eq!(infer_tech_stack("Migrating from .NET"), [".net"]);
        assert_eq!(
            infer_tech_stack("Machine Learning researcher"),
            ["Machine learning"]
        );
        assert_eq!(infer_tech_stack("GraphQL APIs on AWS"), ["Graphql", "Aws"]);
    }

    #[test]
    fn slug_and_id_are_filesystem_safe() {
        assert_eq!(company_slug("  Acme, Inc. "), "acme-inc");
        assert_eq!(company_slug("Globex"), "globex");

        let id = job_id("https://acme.test/jobs/1", fixed_now());
        assert!(id.starts_with("ext_"));
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        assert_eq!(id, job_id("https://acme.test/jobs/1", fixed_now()));
        assert_ne!(id, job_id("https://acme.test/jobs/2", fixed_now()));
    }

    #[test]
    fn builds_canonical_record() {
        let log = EventLog::new();
        let mut record = raw(
            "Senior  Rust Engineer - Platform",
            " https://acme.test/jobs/42 ",
        );
        record.location = "Berlin,\n Germany".into();
        record.description = Some("Work on\n our Docker fleet".into());

        let jobs = normalize_jobs_at(vec![record], "Acme", &log, fixed_now());
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];

        assert_eq!(job.title, "Senior Rust Engineer - Platform");
        assert_eq!(job.role, "Senior Rust Engineer");
        assert_eq!(job.experience, 5);
        assert_eq!(job.location, "Berlin, Germany");
        assert_eq!(job.description, "Work on our Docker fleet");
        assert_eq!(job.tech_stack, ["Rust", "Docker"]);
        assert_eq!(job.external_url, "https://acme.test/jobs/42");
        assert_eq!(job.company_id, "acme");
        assert_eq!(job.company_name, "Acme");
        assert_eq!(job.external_company, "Acme");
        assert_eq!(job.recruiter_id, EXTERNAL_RECRUITER_ID);
        assert_eq!(job.status, "open");
        assert_eq!(job.openings, 1);
        assert_eq!(job.salary, 0);
        assert_eq!(job.source, "external");
        assert_eq!(job.scrape_status, "success");
        assert_eq!(job.scraped_at, fixed_now());
    }

    #[test]
    fn missing_description_falls_back_to_title_and_company() {
        let log = EventLog::new();
        let jobs = normalize_jobs_at(
            vec![raw("Account Executive", "https://acme.test/jobs/1")],
            "Acme",
            &log,
            fixed_now(),
        );
        assert_eq!(jobs[0].description, "Account Executive at Acme");
        assert_eq!(jobs[0].tech_stack, ["General"]);
        assert_eq!(jobs[0].location, UNSPECIFIED_LOCATION);
    }

    #[test]
    fn drops_invalid_records_and_logs_reason() {
        let log = EventLog::new();
        let jobs = normalize_jobs(
            vec![
                raw("C", "https://x/y"),
                raw("Senior Engineer", "not-a-url"),
                raw("Staff Engineer", "https://acme.test/jobs/1"),
            ],
            "Acme",
            &log,
        );

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Staff Engineer");
        let warnings: Vec<_> = log
            .events()
            .into_iter()
            .filter(|e| e.message.starts_with("Rejected job"))
            .collect();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn deduplicates_by_url_first_wins() {
        let log = EventLog::new();
        let batch = vec![
            raw("Backend Engineer", "https://acme.test/jobs/1"),
            raw("Backend Engineer (copy)", "https://acme.test/jobs/1"),
            raw("Frontend Engineer", "https://acme.test/jobs/2"),
        ];

        let jobs = normalize_jobs(batch.clone(), "Acme", &log);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].title, "Backend Engineer");

        // Stable across re-runs over the same URLs.
        let again = normalize_jobs(batch, "Acme", &log);
        assert_eq!(again.len(), jobs.len());
    }
}
