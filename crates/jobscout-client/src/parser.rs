//! CSS-selector based job listing extraction.
//!
//! A page is searched with an ordered list of [`SelectorPattern`]s: the
//! site's configured container first, then generic container shapes. The
//! first pattern that matches at least one element decides the cards; each
//! card is then mined for title, link, location and description.

use jobscout_core::error::AppError;
use jobscout_core::models::{RawJobRecord, SiteConfig, SiteSelectors, UNSPECIFIED_LOCATION};
use jobscout_core::traits::JobParser;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Maximum description length, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Role-agnostic job card containers, in priority order.
const GENERIC_CONTAINERS: &[&str] = &[
    "[role='listitem']",
    "[class*='job-card']",
    "[class*='job-listing']",
    "[class*='job-item']",
    "[class*='opening']",
    "[class*='vacancy']",
    "li[class*='job']",
    "[class*='position']",
    "article",
];

const GENERIC_TITLE: &[&str] = &["h2", "h3", "h4", "[class*='title']", "a"];
const GENERIC_LOCATION: &[&str] = &["[class*='location']", "[class*='city']", "address"];
const GENERIC_LINK: &[&str] = &["a[href]"];
const GENERIC_DESCRIPTION: &[&str] = &["[class*='description']", "[class*='summary']", "p"];
const GENERIC_JOB_TYPE: &[&str] = &["[class*='job-type']", "[class*='employment']"];
const GENERIC_POSTED: &[&str] = &["time", "[class*='posted']", "[class*='date']"];

/// Where a pattern came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternSource {
    Configured,
    Generic,
}

/// One way of locating job cards, plus the site's field selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorPattern {
    pub source: PatternSource,
    pub container: String,
    pub title: Option<String>,
    pub location: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
}

impl SelectorPattern {
    fn new(source: PatternSource, container: &str, hints: &SiteSelectors) -> Self {
        Self {
            source,
            container: container.to_string(),
            title: non_empty(&hints.title),
            location: non_empty(&hints.location),
            link: non_empty(&hints.link),
            description: non_empty(&hints.description),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Patterns to try for `site`, in evaluation order.
pub fn candidate_patterns(site: &SiteConfig) -> Vec<SelectorPattern> {
    let hints = site.selectors.clone().unwrap_or_default();
    let mut patterns = Vec::with_capacity(GENERIC_CONTAINERS.len() + 1);

    if let Some(container) = non_empty(&hints.job_container) {
        patterns.push(SelectorPattern::new(
            PatternSource::Configured,
            &container,
            &hints,
        ));
    }
    patterns.extend(
        GENERIC_CONTAINERS
            .iter()
            .map(|c| SelectorPattern::new(PatternSource::Generic, c, &hints)),
    );
    patterns
}

pub fn compile(selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector).map_err(|e| AppError::SelectorError {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Characters of human-visible text under `<body>`, ignoring scripts and styles.
pub fn visible_text_len(html: &str) -> usize {
    let document = Html::parse_document(html);
    let root = match compile("body")
        .ok()
        .and_then(|body| document.select(&body).next())
    {
        Some(body) => body,
        None => document.root_element(),
    };

    root.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent()?.value().as_element()?.name();
            (!matches!(parent, "script" | "style" | "noscript" | "template")).then_some(text)
        })
        .map(|text| text.split_whitespace().map(|w| w.chars().count()).sum::<usize>())
        .sum()
}

/// Parser driven by the site's selector hints with generic fallbacks.
#[derive(Debug, Clone, Default)]
pub struct SelectorParser;

impl SelectorParser {
    pub fn new() -> Self {
        Self
    }
}

impl JobParser for SelectorParser {
    fn parse(&self, html: &str, site: &SiteConfig) -> Vec<RawJobRecord> {
        let base = match Url::parse(&site.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(site = %site.company, url = %site.url, "Site URL does not parse: {e}");
                return Vec::new();
            }
        };
        let document = Html::parse_document(html);

        for pattern in candidate_patterns(site) {
            let selector = match compile(&pattern.container) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(site = %site.company, "{e}");
                    continue;
                }
            };

            let cards: Vec<ElementRef<'_>> = document.select(&selector).collect();
            if cards.is_empty() {
                continue;
            }

            tracing::debug!(
                site = %site.company,
                container = %pattern.container,
                source = ?pattern.source,
                cards = cards.len(),
                "Matched job containers"
            );

            return cards
                .into_iter()
                .filter_map(|card| extract_record(card, &pattern, site, &base))
                .collect();
        }

        tracing::debug!(site = %site.company, "No container pattern matched");
        Vec::new()
    }
}

/// Build a record from one card; `None` unless both title and link are found.
fn extract_record(
    card: ElementRef<'_>,
    pattern: &SelectorPattern,
    site: &SiteConfig,
    base: &Url,
) -> Option<RawJobRecord> {
    let title = field_text(card, pattern.title.as_deref(), GENERIC_TITLE)?;
    let url = extract_link(card, pattern.link.as_deref(), base)?;

    let location = field_text(card, pattern.location.as_deref(), GENERIC_LOCATION)
        .unwrap_or_else(|| UNSPECIFIED_LOCATION.to_string());
    let description = field_text(card, pattern.description.as_deref(), GENERIC_DESCRIPTION)
        .filter(|d| *d != title)
        .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS));
    let job_type = field_text(card, None, GENERIC_JOB_TYPE);
    let posted_date = extract_posted(card);

    Some(RawJobRecord {
        title,
        company: site.company.clone(),
        location,
        url,
        description,
        job_type,
        posted_date,
    })
}

/// First non-empty text under `card` for the configured selector, then the
/// generic ones.
fn field_text(card: ElementRef<'_>, configured: Option<&str>, generic: &[&str]) -> Option<String> {
    configured
        .into_iter()
        .chain(generic.iter().copied())
        .filter_map(|s| compile(s).ok())
        .find_map(|selector| {
            card.select(&selector)
                .map(element_text)
                .find(|text| !text.is_empty())
        })
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_link(card: ElementRef<'_>, configured: Option<&str>, base: &Url) -> Option<String> {
    let own_href = (card.value().name() == "a")
        .then(|| card.value().attr("href"))
        .flatten();

    let from_selectors = || {
        configured
            .into_iter()
            .chain(GENERIC_LINK.iter().copied())
            .filter_map(|s| compile(s).ok())
            .find_map(|selector| {
                card.select(&selector)
                    .filter_map(|a| a.value().attr("href"))
                    .find_map(|href| resolve(base, href))
            })
    };

    own_href
        .and_then(|href| resolve(base, href))
        .or_else(from_selectors)
}

/// Absolute http(s) URL for `href`, or `None`.
fn resolve(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

fn extract_posted(card: ElementRef<'_>) -> Option<String> {
    let time = compile("time[datetime]").ok()?;
    card.select(&time)
        .find_map(|t| t.value().attr("datetime").map(str::to_string))
        .or_else(|| field_text(card, None, GENERIC_POSTED))
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
