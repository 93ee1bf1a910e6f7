
use std::fmt;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::extractor::html_to_text;
use super::validate_url;
use crate::corpus::PostingCandidate;

/// Default number of postings followed from a listing page
pub const DEFAULT_MAX_POSTINGS: usize = 20;

/// Placeholder in a listing or feed URL replaced by the searched title
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// A configured place to fetch postings from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub url: String,
    #[serde(flatten)]
    pub kind: SourceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceKind {
    /// A single HTML posting page
    JobPage,
    /// An HTML page linking to posting pages
    Listing {
        #[serde(default = "default_max_postings")]
        max_postings: usize,
    },
    /// A JSON document of postings
    JsonFeed {
        #[serde(default)]
        format: FeedFormat,
    },
}

fn default_max_postings() -> usize {
    DEFAULT_MAX_POSTINGS
}

impl fmt::Display for SourceKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JobPage => write!(f, "job page"),
            Self::Listing { max_postings } => write!(f, "listing (up to {})", max_postings),
            Self::JsonFeed { format } => write!(f, "{} feed", format),
        }
    }
}

impl SourceDescriptor {
    #[inline]
    pub fn job_page(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kind: SourceKind::JobPage,
        }
    }

    #[inline]
    pub fn listing(name: impl Into<String>, url: impl Into<String>, max_postings: usize) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kind: SourceKind::Listing { max_postings },
        }
    }

    #[inline]
    pub fn json_feed(name: impl Into<String>, url: impl Into<String>, format: FeedFormat) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kind: SourceKind::JsonFeed { format },
        }
    }

    /// Whether the URL needs a searched title before it can be fetched
    #[inline]
    pub fn is_query_template(&self) -> bool {
        self.url.contains(QUERY_PLACEHOLDER)
    }

    /// Copy with every `{query}` in the URL replaced by the form-encoded title
    #[inline]
    #[must_use]
    pub fn for_query(&self, query: &str) -> Self {
        let encoded: String = url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
        Self {
            url: self.url.replace(QUERY_PLACEHOLDER, &encoded),
            ..self.clone()
        }
    }
}

/// Sources to crawl for one refresh.
///
/// Templates are filled from `query`; without a query they are left out.
#[inline]
pub fn resolve_sources(sources: &[SourceDescriptor], query: Option<&str>) -> Vec<SourceDescriptor> {
    sources
        .iter()
        .filter_map(|source| match (source.is_query_template(), query) {
            (false, _) => Some(source.clone()),
            (true, Some(query)) => Some(source.for_query(query)),
            (true, None) => {
                debug!("Skipping {}: its URL needs a search query", source.name);
                None
            }
        })
        .collect()
}

/// Shape of a JSON feed document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedFormat {
    /// A bare array, or an object wrapping one under `jobs`/`results`/`postings`
    #[default]
    Generic,
    /// The Greenhouse job board API (`?content=true`)
    Greenhouse,
}

impl fmt::Display for FeedFormat {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => write!(f, "generic"),
            Self::Greenhouse => write!(f, "greenhouse"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenericRecord {
    url: Option<String>,
    title: Option<String>,
    company: Option<String>,
    location: Option<String>,
    #[serde(alias = "description_full")]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenericFeed {
    List(Vec<GenericRecord>),
    Wrapped {
        #[serde(alias = "results", alias = "postings")]
        jobs: Vec<GenericRecord>,
    },
}

#[derive(Debug, Deserialize)]
struct GreenhouseFeed {
    jobs: Vec<GreenhouseJob>,
}

#[derive(Debug, Deserialize)]
struct GreenhouseJob {
    absolute_url: Option<String>,
    title: Option<String>,
    location: Option<GreenhouseLocation>,
    content: Option<String>,
    company_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GreenhouseLocation {
    name: Option<String>,
}

/// Candidates parsed from a feed plus the number of records dropped
#[derive(Debug, Default)]
pub struct FeedPostings {
    pub candidates: Vec<PostingCandidate>,
    pub skipped: usize,
}

impl FeedPostings {
    fn push(&mut self, candidate: Option<PostingCandidate>) {
        match candidate {
            Some(candidate) => self.candidates.push(candidate),
            None => self.skipped += 1,
        }
    }
}

/// Parse a feed body into posting candidates.
///
/// Fails only when the document itself does not match `format`; individual
/// records without a usable URL or title are counted as skipped.
#[inline]
pub fn parse_feed(body: &str, format: FeedFormat) -> Result<FeedPostings> {
    let mut postings = FeedPostings::default();

    match format {
        FeedFormat::Generic => {
            let feed: GenericFeed =
                serde_json::from_str(body).context("Malformed generic job feed")?;
            let records = match feed {
                GenericFeed::List(records) | GenericFeed::Wrapped { jobs: records } => records,
            };
            for record in records {
                postings.push(map_generic(record));
            }
        }
        FeedFormat::Greenhouse => {
            let feed: GreenhouseFeed =
                serde_json::from_str(body).context("Malformed Greenhouse job feed")?;
            for job in feed.jobs {
                postings.push(map_greenhouse(job));
            }
        }
    }

    debug!(
        "Parsed {} feed: {} postings, {} skipped",
        format,
        postings.candidates.len(),
        postings.skipped
    );
    Ok(postings)
}

fn required_url(url: Option<String>) -> Option<String> {
    let url = url?;
    match validate_url(url.trim()) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            debug!("Skipping feed record: {}", e);
            None
        }
    }
}

fn required_title(title: Option<String>) -> Option<String> {
    title.filter(|title| !title.trim().is_empty())
}

fn map_generic(record: GenericRecord) -> Option<PostingCandidate> {
    Some(PostingCandidate {
        url: required_url(record.url)?,
        title: required_title(record.title)?,
        company: record.company,
        location: record.location,
        raw_text: record.description.map(|d| html_to_text(&d)).unwrap_or_default(),
    })
}

fn map_greenhouse(job: GreenhouseJob) -> Option<PostingCandidate> {
    Some(PostingCandidate {
        url: required_url(job.absolute_url)?,
        title: required_title(job.title)?,
        company: job.company_name,
        location: job.location.and_then(|location| location.name),
        // Greenhouse escapes the HTML inside `content`
        raw_text: job
            .content
            .map(|content| html_to_text(&html_to_text(&content)))
            .unwrap_or_default(),
    })
}
