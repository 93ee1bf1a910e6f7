pub mod extractor;
pub mod sources;


use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDateTime, Utc};
use futures::{StreamExt, stream};
use indicatif::{ProgressBar, ProgressStyle};
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use ureq::Agent;
use url::Url;

pub use self::sources::{FeedFormat, SourceDescriptor, SourceKind};

use self::extractor::{PostingExtractor, ensure_html, registrable_domain};
use self::sources::parse_feed;
use crate::JobRecError;
use crate::corpus::{CorpusStore, PostingCandidate};
use crate::database::sqlite::NewRefreshRun;

/// Configuration for the job crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// User agent string to use for requests
    pub user_agent: String,
    /// Timeout for a single HTTP request in seconds
    pub timeout_seconds: u64,
    /// Deadline for everything fetched from one source, in seconds
    pub source_timeout_seconds: u64,
    /// Rate limit delay between requests in milliseconds
    pub rate_limit_ms: u64,
    /// Maximum number of retry attempts for retryable errors
    pub max_retries: u32,
    /// Delay between retry attempts in seconds
    pub retry_delay_seconds: u64,
    /// Number of sources crawled at the same time
    pub max_concurrent_sources: usize,
}

impl Default for CrawlerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            user_agent: "jobrec/0.1.0 (Job Recommendation Crawler)".to_string(),
            timeout_seconds: 15,
            source_timeout_seconds: 120,
            rate_limit_ms: 1000,
            max_retries: 2,
            retry_delay_seconds: 5,
            max_concurrent_sources: 4,
        }
    }
}

impl CrawlerConfig {
    #[inline]
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_seconds)
    }
}

/// A fetched response body along with its declared content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub body: String,
    pub content_type: Option<String>,
}

/// HTTP client wrapper with rate limiting and retry logic
#[derive(Debug)]
pub struct HttpClient {
    agent: Agent,
    config: CrawlerConfig,
    last_request_time: Option<Instant>,
}

fn build_agent(config: &CrawlerConfig) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
        .user_agent(&config.user_agent)
        .build()
        .into()
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    #[inline]
    pub fn new(config: CrawlerConfig) -> Self {
        let agent = build_agent(&config);
        Self::with_agent(agent, config)
    }

    /// Client sharing an existing connection pool; rate limiting stays per client
    #[inline]
    pub fn with_agent(agent: Agent, config: CrawlerConfig) -> Self {
        Self {
            agent,
            config,
            last_request_time: None,
        }
    }

    /// Perform an HTTP GET request with rate limiting and retry logic
    #[inline]
    pub async fn get(&mut self, url: &str) -> Result<FetchedPage> {
        self.apply_rate_limit().await;

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                debug!("Retrying request to {} (attempt {})", url, attempt + 1);
                sleep(Duration::from_secs(self.config.retry_delay_seconds)).await;
            }

            match self.try_get(url).await {
                Ok(page) => {
                    debug!("Successfully fetched {} (attempt {})", url, attempt + 1);
                    return Ok(page);
                }
                Err(e) if is_retryable_error(&e) && attempt < self.config.max_retries => {
                    warn!("Retryable error for {}: {}", url, e);
                    last_error = Some(e);
                }
                Err(e) => {
                    debug!("Non-retryable error for {}: {}", url, e);
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("All retry attempts failed")))
    }

    /// Apply rate limiting by sleeping if necessary
    async fn apply_rate_limit(&mut self) {
        if let Some(last_time) = self.last_request_time {
            let elapsed = last_time.elapsed();
            let rate_limit_duration = Duration::from_millis(self.config.rate_limit_ms);

            if elapsed < rate_limit_duration {
                let sleep_duration = rate_limit_duration - elapsed;
                debug!("Rate limiting: sleeping for {:?}", sleep_duration);
                sleep(sleep_duration).await;
            }
        }

        self.last_request_time = Some(Instant::now());
    }

    /// Attempt a single request on the blocking pool without retry logic
    async fn try_get(&self, url: &str) -> Result<FetchedPage> {
        let agent = self.agent.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || fetch_blocking(&agent, &url))
            .await
            .context("HTTP worker task failed")?
    }
}

fn fetch_blocking(agent: &Agent, url: &str) -> Result<FetchedPage> {
    debug!("Making HTTP GET request to: {}", url);

    let request = agent
        .get(url)
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8",
        )
        .header("Accept-Language", "fr,fr-FR;q=0.8,en-US;q=0.5,en;q=0.3");

    match request.call() {
        Ok(mut response) => {
            let content_type = response
                .headers()
                .get("content-type")
                .and_then(|value| value.to_str().ok())
                .map(str::to_lowercase);
            let body = response
                .body_mut()
                .read_to_string()
                .with_context(|| format!("Failed to read response body from {}", url))?;
            debug!("Successfully read {} bytes from {}", body.len(), url);
            Ok(FetchedPage { body, content_type })
        }
        Err(ureq::Error::StatusCode(status)) => {
            debug!("HTTP request failed with status {}: {}", status, url);
            Err(anyhow!("HTTP error {}", status))
        }
        Err(e) => {
            debug!("HTTP request failed with transport error: {}", e);
            Err(anyhow::Error::from(e))
                .with_context(|| format!("Failed to make HTTP request to {}", url))
        }
    }
}

/// Check if an error is retryable (network timeouts, 5xx errors, 429)
fn is_retryable_error(error: &anyhow::Error) -> bool {
    let error_str = format!("{:#}", error).to_lowercase();

    if error_str.contains("timeout")
        || error_str.contains("connection")
        || error_str.contains("network")
    {
        return true;
    }

    error_str.contains("http error 5") || error_str.contains("http error 429")
}

/// Validate and normalize a URL
#[inline]
pub fn validate_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str).with_context(|| format!("Invalid URL format: {}", url_str))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(anyhow!("URL must use HTTP or HTTPS scheme: {}", url_str));
    }

    if url.host_str().is_none() {
        return Err(anyhow!("URL must have a valid host: {}", url_str));
    }

    Ok(url)
}

/// Hosts that require a login or never carry postings directly
const EXCLUDED_DOMAINS: &[&str] = &[
    "indeed.com",
    "linkedin.com",
    "jooble.org",
    "glassdoor.fr",
    "pole-emploi.fr/connexion",
    "monster.fr/connexion",
    "facebook.com",
    "twitter.com",
    "instagram.com",
    "youtube.com",
];

const JOB_URL_KEYWORDS: &[&str] = &[
    "job",
    "emploi",
    "offre",
    "carriere",
    "recrutement",
    "poste",
    "annonce",
    "vacanc",
    "position",
    "career",
];

const JOB_ANCHOR_KEYWORDS: &[&str] = &["job", "emploi", "poste", "cddi", "recrutement"];

/// Links kept from any one registrable domain on a listing page
pub const MAX_LINKS_PER_DOMAIN: usize = 3;

#[inline]
pub fn is_excluded_url(url: &Url) -> bool {
    let location = format!(
        "{}{}",
        url.host_str().unwrap_or_default().to_lowercase(),
        url.path().to_lowercase()
    );
    EXCLUDED_DOMAINS
        .iter()
        .any(|excluded| location.contains(excluded))
}

/// Whether a link looks like it leads to a job posting
#[inline]
pub fn is_probably_job_url(url: &Url, anchor_text: &str) -> bool {
    let url_lower = url.as_str().to_lowercase();
    if JOB_URL_KEYWORDS
        .iter()
        .any(|keyword| url_lower.contains(keyword))
    {
        return true;
    }

    let anchor_lower = anchor_text.to_lowercase();
    JOB_ANCHOR_KEYWORDS
        .iter()
        .any(|keyword| anchor_lower.contains(keyword))
}

/// Extract links to job postings from a listing page, in page order.
///
/// Links are resolved against `page_url`, stripped of fragments and
/// deduplicated. Excluded hosts are skipped, each registrable domain
/// contributes at most [`MAX_LINKS_PER_DOMAIN`] links, and at most
/// `max_links` are returned.
#[inline]
pub fn extract_job_links(html: &str, page_url: &Url, max_links: usize) -> Result<Vec<Url>> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse("a[href]")
        .map_err(|e| anyhow!("Failed to create CSS selector: {:?}", e))?;

    let mut links = Vec::new();
    let mut seen = HashSet::new();
    let mut per_domain: HashMap<String, usize> = HashMap::new();

    for element in document.select(&link_selector) {
        if links.len() >= max_links {
            break;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.starts_with("mailto:")
            || href.starts_with("javascript:")
            || href.starts_with("tel:")
            || href.starts_with('#')
        {
            continue;
        }

        let mut link = match page_url.join(href) {
            Ok(link) => link,
            Err(e) => {
                debug!("Failed to resolve '{}' relative to '{}': {}", href, page_url, e);
                continue;
            }
        };
        link.set_fragment(None);

        if (link.scheme() != "http" && link.scheme() != "https") || link == *page_url {
            continue;
        }
        if is_excluded_url(&link) {
            debug!("Skipping excluded link {}", link);
            continue;
        }

        let anchor_text = element.text().collect::<String>();
        if !is_probably_job_url(&link, &anchor_text) {
            continue;
        }

        let domain = registrable_domain(&link).unwrap_or_default();
        let domain_count = per_domain.entry(domain).or_default();
        if *domain_count >= MAX_LINKS_PER_DOMAIN {
            continue;
        }

        if seen.insert(link.to_string()) {
            *domain_count += 1;
            links.push(link);
        }
    }

    info!("Extracted {} job links from {}", links.len(), page_url);
    Ok(links)
}

/// Outcome of crawling one source during a refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub name: String,
    /// Postings upserted, including ones whose content did not change
    pub written: usize,
    /// Postings inserted or updated with new content
    pub changed: usize,
    /// Records or linked pages that could not be turned into postings
    pub skipped: usize,
    /// Why the source failed, if it did
    pub error: Option<String>,
}

impl SourceReport {
    #[inline]
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Statistics about a refresh
#[derive(Debug, Clone)]
pub struct RefreshSummary {
    pub started_at: NaiveDateTime,
    pub duration: Duration,
    /// One report per source, in configuration order
    pub sources: Vec<SourceReport>,
}

impl RefreshSummary {
    /// Total postings written across all sources
    #[inline]
    pub fn written(&self) -> usize {
        self.sources.iter().map(|s| s.written).sum()
    }

    #[inline]
    pub fn changed(&self) -> usize {
        self.sources.iter().map(|s| s.changed).sum()
    }

    #[inline]
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| s.is_failed())
    }

    #[inline]
    pub fn all_failed(&self) -> bool {
        !self.sources.is_empty() && self.sources.iter().all(SourceReport::is_failed)
    }

    fn to_run(&self, finished_at: NaiveDateTime) -> NewRefreshRun {
        NewRefreshRun {
            started_at: self.started_at,
            finished_at,
            sources_total: count_i64(self.sources.len()),
            sources_failed: count_i64(self.failed_sources().count()),
            postings_written: count_i64(self.written()),
            postings_changed: count_i64(self.changed()),
        }
    }
}

fn count_i64(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Counters updated while a source is crawled, readable even after a timeout
#[derive(Debug, Default)]
struct SourceProgress {
    written: AtomicUsize,
    changed: AtomicUsize,
    skipped: AtomicUsize,
}

impl SourceProgress {
    fn report(&self, name: &str, error: Option<String>) -> SourceReport {
        SourceReport {
            name: name.to_string(),
            written: self.written.load(Ordering::Relaxed),
            changed: self.changed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            error,
        }
    }

    fn skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }
}

/// A source report plus the store failure that must abort the refresh, if any
struct SourceRun {
    report: SourceReport,
    store_error: Option<JobRecError>,
}

/// Crawler that refreshes the corpus store from configured sources
#[derive(Debug)]
pub struct Crawler {
    store: CorpusStore,
    config: CrawlerConfig,
    agent: Agent,
    extractor: PostingExtractor,
}

impl Crawler {
    #[inline]
    pub fn new(store: CorpusStore, config: CrawlerConfig) -> Self {
        let agent = build_agent(&config);
        Self {
            store,
            config,
            agent,
            extractor: PostingExtractor::default(),
        }
    }

    /// Parse posting pages with configured site rules
    #[inline]
    #[must_use]
    pub fn with_extractor(mut self, extractor: PostingExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    #[inline]
    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    #[inline]
    pub fn store(&self) -> &CorpusStore {
        &self.store
    }

    /// Crawl every source and upsert what they yield.
    ///
    /// Sources run concurrently, at most `max_concurrent_sources` at a time,
    /// each bounded by the source deadline. A failing source is logged and
    /// recorded in the summary without affecting the others. A store failure
    /// aborts the refresh with [`JobRecError::StoreUnavailable`] once all
    /// in-flight sources have finished.
    #[inline]
    pub async fn refresh(&self, sources: &[SourceDescriptor]) -> crate::Result<RefreshSummary> {
        let started_at = Utc::now().naive_utc();
        let start_time = Instant::now();
        info!("Refreshing corpus from {} sources", sources.len());

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(sources.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Fetching {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            )
        } else {
            ProgressBar::hidden()
        };

        let runs: Vec<SourceRun> = stream::iter(sources.iter().cloned())
            .map(|source| self.run_tracked(source, &bar))
            .buffered(self.config.max_concurrent_sources.max(1))
            .collect()
            .await;
        bar.finish_and_clear();

        let mut store_error = None;
        let mut reports = Vec::with_capacity(runs.len());
        for run in runs {
            if let Some(e) = run.store_error {
                store_error.get_or_insert(e);
            }
            reports.push(run.report);
        }

        if let Some(e) = store_error {
            error!("Refresh aborted: {}", e);
            return Err(e);
        }

        let summary = RefreshSummary {
            started_at,
            duration: start_time.elapsed(),
            sources: reports,
        };

        self.store
            .record_refresh(&summary.to_run(Utc::now().naive_utc()))
            .await?;

        info!(
            "Refresh completed: {} postings written ({} changed), {} of {} sources failed, took {:?}",
            summary.written(),
            summary.changed(),
            summary.failed_sources().count(),
            summary.sources.len(),
            summary.duration
        );

        Ok(summary)
    }

    async fn run_tracked(&self, source: SourceDescriptor, bar: &ProgressBar) -> SourceRun {
        bar.set_message(source.name.clone());
        let run = self.run_source(&source).await;
        bar.inc(1);
        run
    }

    async fn run_source(&self, source: &SourceDescriptor) -> SourceRun {
        let progress = SourceProgress::default();
        let deadline = self.config.source_timeout();

        let result =
            match tokio::time::timeout(deadline, self.crawl_source(source, &progress)).await {
                Ok(result) => result,
                Err(_) => Err(JobRecError::SourceFetchFailed {
                    source_name: source.name.clone(),
                    message: format!("timed out after {:?}", deadline),
                }),
            };

        match result {
            Ok(()) => {
                let report = progress.report(&source.name, None);
                info!(
                    "Source {} done: {} written, {} skipped",
                    source.name, report.written, report.skipped
                );
                SourceRun {
                    report,
                    store_error: None,
                }
            }
            Err(e @ JobRecError::SourceFetchFailed { .. }) => {
                warn!("{}", e);
                SourceRun {
                    report: progress.report(&source.name, Some(e.to_string())),
                    store_error: None,
                }
            }
            Err(e) => SourceRun {
                report: progress.report(&source.name, Some(e.to_string())),
                store_error: Some(e),
            },
        }
    }

    async fn crawl_source(
        &self,
        source: &SourceDescriptor,
        progress: &SourceProgress,
    ) -> crate::Result<()> {
        let fetch_failed = |e: anyhow::Error| JobRecError::SourceFetchFailed {
            source_name: source.name.clone(),
            message: format!("{:#}", e),
        };

        debug!("Crawling {} source {} at {}", source.kind, source.name, source.url);
        let url = validate_url(&source.url).map_err(fetch_failed)?;
        let mut client = HttpClient::with_agent(self.agent.clone(), self.config.clone());

        match source.kind {
            SourceKind::JobPage => {
                let candidate = fetch_posting(&mut client, &self.extractor, &url).await.map_err(fetch_failed)?;
                self.save(candidate, source, progress).await?;
            }
            SourceKind::Listing { max_postings } => {
                let page = client.get(url.as_str()).await.map_err(fetch_failed)?;
                ensure_html(page.content_type.as_deref()).map_err(fetch_failed)?;
                let links =
                    extract_job_links(&page.body, &url, max_postings).map_err(fetch_failed)?;

                for link in links {
                    match fetch_posting(&mut client, &self.extractor, &link).await {
                        Ok(candidate) => self.save(candidate, source, progress).await?,
                        Err(e) => {
                            warn!("Skipping {} from {}: {:#}", link, source.name, e);
                            progress.skip();
                        }
                    }
                }
            }
            SourceKind::JsonFeed { format } => {
                let page = client.get(url.as_str()).await.map_err(fetch_failed)?;
                let feed = parse_feed(&page.body, format).map_err(fetch_failed)?;
                progress.skipped.fetch_add(feed.skipped, Ordering::Relaxed);
                for candidate in feed.candidates {
                    self.save(candidate, source, progress).await?;
                }
            }
        }

        Ok(())
    }

    async fn save(
        &self,
        candidate: PostingCandidate,
        source: &SourceDescriptor,
        progress: &SourceProgress,
    ) -> crate::Result<()> {
        let url = candidate.url.clone();
        let outcome = self.store.upsert(candidate, &source.name).await?;
        debug!("{} {}", outcome, url);

        progress.written.fetch_add(1, Ordering::Relaxed);
        if outcome.is_change() {
            progress.changed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

/// Fetch one posting page and parse it
async fn fetch_posting(
    client: &mut HttpClient,
    extractor: &PostingExtractor,
    url: &Url,
) -> Result<PostingCandidate> {
    let page = client.get(url.as_str()).await?;
    ensure_html(page.content_type.as_deref())?;
    extractor
        .extract(&page.body, url)
        .ok_or_else(|| anyhow!("No job posting found at {}", url))
}
