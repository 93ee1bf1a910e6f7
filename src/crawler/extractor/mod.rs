#[cfg(test)]
mod tests;

use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use fancy_regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::corpus::PostingCandidate;
use crate::text::clean_text;

/// Tags whose text never belongs to a posting description
const EXCLUDED_TAGS: &[&str] = &["script", "style", "noscript", "header", "footer", "nav"];

/// Containers tried, in order, before falling back to the longest text block
const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=\"main\"]",
    "#main-content",
    ".job-description",
];

/// A main container must hold more than this many characters to be used
const MIN_MAIN_CONTENT_CHARS: usize = 200;
/// Smallest block considered by the longest-block fallback
const MIN_BLOCK_CHARS: usize = 100;
/// Company and location values longer than this are treated as noise
const MAX_LABEL_CHARS: usize = 100;

static COMPANY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"(?i)soci[ée]t[ée]\s*:\s*([\w \t\-'.&]+)",
        r"(?i)entreprise\s*:\s*([\w \t\-'.&]+)",
        r"(?i)company\s*:\s*([\w \t\-'.&]+)",
    ])
});

static LOCATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"(?i)lieu\s*:\s*([\w \t\-'.&,]+)",
        r"(?i)localisation\s*:\s*([\w \t\-'.&,]+)",
        r"(?i)location\s*:\s*([\w \t\-'.&,]+)",
    ])
});

fn compile_patterns(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!("Skipping invalid pattern {}: {}", pattern, e);
                None
            }
        })
        .collect()
}

/// CSS selectors tried, in order, for each field of a posting on one site.
///
/// Rules apply to `domain` and to every subdomain of it. Fields left empty
/// use the generic heuristics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRules {
    pub domain: String,
    #[serde(default)]
    pub title: Vec<String>,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub company: Vec<String>,
    #[serde(default)]
    pub location: Vec<String>,
}

impl DomainRules {
    #[inline]
    pub fn applies_to(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let domain = self.domain.trim_start_matches('.');
        host.eq_ignore_ascii_case(domain)
            || host
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", domain.to_ascii_lowercase()))
    }

    /// Every selector of every field, for validation
    #[inline]
    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.title
            .iter()
            .chain(&self.description)
            .chain(&self.company)
            .chain(&self.location)
            .map(String::as_str)
    }
}

fn rules(domain: &str, fields: [&[&str]; 4]) -> DomainRules {
    let owned =
        |selectors: &[&str]| -> Vec<String> { selectors.iter().map(|s| (*s).to_string()).collect() };
    let [title, description, company, location] = fields;
    DomainRules {
        domain: domain.to_string(),
        title: owned(title),
        description: owned(description),
        company: owned(company),
        location: owned(location),
    }
}

/// Rules shipped with the crate for sites whose markup defeats the heuristics
pub static BUILTIN_RULES: LazyLock<Vec<DomainRules>> = LazyLock::new(|| {
    vec![
        rules(
            "welcometothejungle.com",
            [
                &["h1.sc-1uownj7-0", "h1.ais7m6-0", "h1"],
                &[
                    "div.sc-2j2v96-0",
                    "div[data-testid=\"job-description\"]",
                    "div.jd-container",
                ],
                &["div.sc-bqWxrE", "div.sc-1h0mp4p-0", "a.sc-18bqcmu-1"],
                &["div.sc-168vpsi-0", "span[data-testid=\"job-location\"]"],
            ],
        ),
        rules(
            "apec.fr",
            [
                &["h1.title", "h1.offer-title", "div.offer-title h1"],
                &[
                    "div.container-justify-text",
                    "div.details-offer-body",
                    "div.details-offer",
                ],
                &["p.org-name", "div.org-name"],
                &["li.location span", "p.location"],
            ],
        ),
    ]
});

/// Registrable part of a host: the last two labels (`jobs.apec.fr` -> `apec.fr`)
#[inline]
pub fn registrable_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let labels: Vec<&str> = host.split('.').collect();
    let start = labels.len().saturating_sub(2);
    Some(labels.get(start..).unwrap_or_default().join("."))
}

/// Built-in rules for the site of `url`, if any
#[inline]
pub fn rules_for(url: &Url) -> Option<&'static DomainRules> {
    BUILTIN_RULES.iter().find(|rules| rules.applies_to(url))
}

/// Posting page parser holding the configured site rules.
///
/// Configured rules are checked before the built-in ones, so a config entry
/// for a built-in domain replaces it.
#[derive(Debug, Clone, Default)]
pub struct PostingExtractor {
    custom: Vec<DomainRules>,
}

impl PostingExtractor {
    #[inline]
    pub fn new(custom: Vec<DomainRules>) -> Self {
        Self { custom }
    }

    #[inline]
    pub fn rules_for(&self, url: &Url) -> Option<&DomainRules> {
        self.custom
            .iter()
            .find(|rules| rules.applies_to(url))
            .or_else(|| rules_for(url))
    }

    /// Parse a single job posting page.
    ///
    /// Site rules win when they match; every field they leave empty falls back
    /// to the generic heuristics. Returns `None` when no title can be found.
    #[inline]
    pub fn extract(&self, html: &str, page_url: &Url) -> Option<PostingCandidate> {
        extract_with_rules(html, page_url, self.rules_for(page_url))
    }
}

/// Parse a posting page with the built-in site rules only
#[inline]
pub fn extract_posting(html: &str, page_url: &Url) -> Option<PostingCandidate> {
    extract_with_rules(html, page_url, rules_for(page_url))
}

fn extract_with_rules(
    html: &str,
    page_url: &Url,
    rules: Option<&DomainRules>,
) -> Option<PostingCandidate> {
    let document = Html::parse_document(html);
    let from_rules =
        |selectors: Option<&[String]>| selectors.and_then(|s| first_match_text(&document, s));

    let title = from_rules(rules.map(|r| r.title.as_slice()))
        .or_else(|| first_match_text(&document, &["h1", "title"]))
        .filter(|title| !title.is_empty());

    let Some(title) = title else {
        debug!("No title found on {}", page_url);
        return None;
    };

    let description = from_rules(rules.map(|r| r.description.as_slice()))
        .or_else(|| main_content(&document))
        .or_else(|| longest_text_block(&document))
        .unwrap_or_default();

    let page_text = page_text(&document);
    let company = from_rules(rules.map(|r| r.company.as_slice()))
        .or_else(|| match_patterns(&page_text, &COMPANY_PATTERNS));
    let location = from_rules(rules.map(|r| r.location.as_slice()))
        .or_else(|| match_patterns(&page_text, &LOCATION_PATTERNS));

    Some(PostingCandidate {
        url: page_url.to_string(),
        title,
        company,
        location,
        raw_text: description,
    })
}

/// Text of the first element matching any of `selectors`, tried in order
fn first_match_text<S: AsRef<str>>(document: &Html, selectors: &[S]) -> Option<String> {
    selectors.iter().find_map(|raw| {
        let raw = raw.as_ref();
        let selector = match Selector::parse(raw) {
            Ok(selector) => selector,
            Err(e) => {
                debug!("Invalid selector {}: {:?}", raw, e);
                return None;
            }
        };
        document
            .select(&selector)
            .map(visible_text)
            .find(|text| !text.is_empty())
    })
}

fn main_content(document: &Html) -> Option<String> {
    MAIN_CONTENT_SELECTORS.iter().find_map(|raw| {
        let selector = Selector::parse(raw).ok()?;
        let element = document.select(&selector).next()?;
        let text = visible_text(element);
        (text.chars().count() > MIN_MAIN_CONTENT_CHARS).then_some(text)
    })
}

fn longest_text_block(document: &Html) -> Option<String> {
    let selector = Selector::parse("div, article, section, main").ok()?;
    document
        .select(&selector)
        .filter(|element| !is_excluded(*element))
        .map(visible_text)
        .map(|text| (text.chars().count(), text))
        .filter(|(len, _)| *len >= MIN_BLOCK_CHARS)
        .max_by_key(|(len, _)| *len)
        .map(|(_, text)| text)
}

fn is_excluded(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .chain(std::iter::once(element))
        .any(|el| EXCLUDED_TAGS.contains(&el.value().name()))
}

/// Whitespace-collapsed text of an element, skipping script/nav/footer content
fn visible_text(element: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    collect_text(element, &mut parts);
    clean_text(&parts.join(" "))
}

fn collect_text(element: ElementRef<'_>, parts: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let text = text.trim();
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        } else if let Some(child) = ElementRef::wrap(child) {
            if !EXCLUDED_TAGS.contains(&child.value().name()) {
                collect_text(child, parts);
            }
        }
    }
}

/// Page text with one line per text node, for the label patterns
fn page_text(document: &Html) -> String {
    let mut parts = Vec::new();
    collect_text(document.root_element(), &mut parts);
    parts.join("\n")
}

fn match_patterns(text: &str, patterns: &[Regex]) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        let captures = pattern.captures(text).ok()??;
        let value = clean_text(captures.get(1)?.as_str());
        (!value.is_empty() && value.chars().count() <= MAX_LABEL_CHARS).then_some(value)
    })
}

/// Plain text of an HTML fragment
#[inline]
pub fn html_to_text(fragment: &str) -> String {
    let fragment = Html::parse_fragment(fragment);
    visible_text(fragment.root_element())
}

/// Reject bodies that are not HTML documents
#[inline]
pub fn ensure_html(content_type: Option<&str>) -> Result<()> {
    match content_type {
        Some(content_type)
            if !content_type.contains("text/html")
                && !content_type.contains("application/xhtml+xml") =>
        {
            Err(anyhow!("Unsupported content type: {}", content_type))
        }
        _ => Ok(()),
    }
}
