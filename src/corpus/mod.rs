// Corpus store: the durable, URL-keyed collection of job postings


use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::{debug, info};

use crate::database::sqlite::{
    Database, JobPosting, NewJobPosting, NewRefreshRun, PostingQueries, RefreshRun,
    RefreshRunQueries, SourceCount, UNKNOWN, UpsertOutcome,
};
use crate::skills::SkillExtractor;
use crate::text::{clean_text, truncate_chars};
use crate::{JobRecError, Result};

/// Longest title kept for display
pub const MAX_TITLE_CHARS: usize = 150;
/// Longest description kept for skill extraction
pub const MAX_DESCRIPTION_CHARS: usize = 5000;

/// A posting as parsed by the crawler, before skills and fetch time are attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingCandidate {
    pub url: String,
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub raw_text: String,
}

impl PostingCandidate {
    /// Clean display fields, substituting `unknown` for blank company/location
    #[inline]
    pub fn into_new_posting(self, source: &str, extractor: &SkillExtractor) -> NewJobPosting {
        let title = truncate_chars(&clean_text(&self.title), MAX_TITLE_CHARS);
        let raw_text = truncate_chars(self.raw_text.trim(), MAX_DESCRIPTION_CHARS);
        let skills = extractor.extract(&raw_text);

        NewJobPosting {
            url: self.url.trim().to_string(),
            title,
            company: or_unknown(self.company.as_deref()),
            location: or_unknown(self.location.as_deref()),
            raw_text,
            skills,
            source: source.to_string(),
        }
    }
}

fn or_unknown(value: Option<&str>) -> String {
    value
        .map(clean_text)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Corpus store backed by SQLite.
///
/// Opened once at startup and shared (cheaply cloned) between the crawler and
/// the recommendation pipeline. Every backend failure surfaces as
/// [`JobRecError::StoreUnavailable`].
#[derive(Debug, Clone)]
pub struct CorpusStore {
    database: Database,
    extractor: Arc<SkillExtractor>,
}

impl CorpusStore {
    #[inline]
    pub fn new(database: Database, extractor: SkillExtractor) -> Self {
        Self {
            database,
            extractor: Arc::new(extractor),
        }
    }

    /// Open (creating if needed) the corpus database at `path`
    #[inline]
    pub async fn open<P: AsRef<Path>>(path: P, extractor: SkillExtractor) -> Result<Self> {
        let database = Database::open(path.as_ref())
            .await
            .map_err(|e| JobRecError::store(&e))?;
        info!("Opened corpus store at {}", path.as_ref().display());
        Ok(Self::new(database, extractor))
    }

    #[inline]
    pub async fn close(&self) {
        self.database.close().await;
        info!("Corpus store closed");
    }

    #[inline]
    pub fn database(&self) -> &Database {
        &self.database
    }

    #[inline]
    pub fn extractor(&self) -> &SkillExtractor {
        &self.extractor
    }

    /// Insert or replace by URL, recomputing skills from the candidate text
    #[inline]
    pub async fn upsert(&self, candidate: PostingCandidate, source: &str) -> Result<UpsertOutcome> {
        self.upsert_at(candidate, source, Utc::now().naive_utc())
            .await
    }

    /// [`CorpusStore::upsert`] with an explicit fetch timestamp
    #[inline]
    pub async fn upsert_at(
        &self,
        candidate: PostingCandidate,
        source: &str,
        fetched_at: NaiveDateTime,
    ) -> Result<UpsertOutcome> {
        let posting = candidate.into_new_posting(source, &self.extractor);
        PostingQueries::upsert(self.database.pool(), &posting, fetched_at)
            .await
            .map_err(|e| JobRecError::store(&e))
    }

    /// Lazily scan the whole corpus as it is when the scan starts
    #[inline]
    pub fn all(&self) -> BoxStream<'_, Result<JobPosting>> {
        PostingQueries::stream_all(self.database.pool())
            .map(|posting| posting.map_err(|e| JobRecError::store(&e)))
            .boxed()
    }

    #[inline]
    pub async fn get(&self, url: &str) -> Result<Option<JobPosting>> {
        PostingQueries::get_by_url(self.database.pool(), url)
            .await
            .map_err(|e| JobRecError::store(&e))
    }

    #[inline]
    pub async fn count(&self) -> Result<i64> {
        PostingQueries::count(self.database.pool())
            .await
            .map_err(|e| JobRecError::store(&e))
    }

    #[inline]
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.count().await? == 0)
    }

    #[inline]
    pub async fn latest_fetched_at(&self) -> Result<Option<NaiveDateTime>> {
        PostingQueries::latest_fetched_at(self.database.pool())
            .await
            .map_err(|e| JobRecError::store(&e))
    }

    /// True when the corpus is empty or its newest posting is older than `max_age`
    #[inline]
    pub async fn is_stale(&self, max_age: Duration) -> Result<bool> {
        self.is_stale_at(max_age, Utc::now().naive_utc()).await
    }

    #[inline]
    pub async fn is_stale_at(&self, max_age: Duration, now: NaiveDateTime) -> Result<bool> {
        let Some(latest) = self.latest_fetched_at().await? else {
            debug!("Corpus is empty, treating as stale");
            return Ok(true);
        };

        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let age = now.signed_duration_since(latest);
        Ok(age > max_age)
    }

    #[inline]
    pub async fn source_counts(&self) -> Result<Vec<SourceCount>> {
        PostingQueries::count_by_source(self.database.pool())
            .await
            .map_err(|e| JobRecError::store(&e))
    }

    #[inline]
    pub async fn record_refresh(&self, run: &NewRefreshRun) -> Result<RefreshRun> {
        RefreshRunQueries::record(self.database.pool(), run)
            .await
            .map_err(|e| JobRecError::store(&e))
    }

    #[inline]
    pub async fn last_refresh(&self) -> Result<Option<RefreshRun>> {
        RefreshRunQueries::latest(self.database.pool())
            .await
            .map_err(|e| JobRecError::store(&e))
    }
}
