// Recommendation pipeline: validate, refresh when needed, score, rank


use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use futures::TryStreamExt;
use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::config::RecommendSettings;
use crate::corpus::CorpusStore;
use crate::crawler::sources::resolve_sources;
use crate::crawler::{Crawler, RefreshSummary, SourceDescriptor};
use crate::database::sqlite::JobPosting;
use crate::scoring::{TitleScorer, token_set};
use crate::text::{normalize, tokens};
use crate::{JobRecError, Result};

/// Upper bound on recommendations per request
pub const MAX_TOP_N: usize = 100;

/// A posting paired with its similarity to the query title
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub posting: JobPosting,
    pub score: f64,
}

/// Ranking order: score descending, then most recently fetched, then URL
#[inline]
pub fn rank_order(a: &Recommendation, b: &Recommendation) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.posting.fetched_at.cmp(&a.posting.fetched_at))
        .then_with(|| a.posting.url.cmp(&b.posting.url))
}

type SharedRefresh =
    Shared<BoxFuture<'static, std::result::Result<Arc<RefreshSummary>, Arc<JobRecError>>>>;

struct InFlightRefresh {
    /// Normalized query the sources were resolved for, when any are templates
    query: Option<String>,
    done: Arc<AtomicBool>,
    result: SharedRefresh,
}

/// Flags the refresh as finished when the crawl task ends, even by panic
struct MarkDone(Arc<AtomicBool>);

impl Drop for MarkDone {
    fn drop(&mut self) {
        self.0.store(true, AtomicOrdering::Release);
    }
}

/// Answers "which postings best match this title".
///
/// Holds the corpus store, the crawler and its sources. Refreshes triggered by
/// concurrent requests are coalesced: while one crawl is running every caller
/// asking for the same sources waits on it and receives the same summary.
/// Sources whose URL contains `{query}` are filled from the requested title.
pub struct RecommendationPipeline {
    store: CorpusStore,
    crawler: Arc<Crawler>,
    sources: Arc<[SourceDescriptor]>,
    settings: RecommendSettings,
    scorer: TitleScorer,
    in_flight: Mutex<Option<InFlightRefresh>>,
}

impl RecommendationPipeline {
    #[inline]
    pub fn new(
        crawler: Crawler,
        sources: Vec<SourceDescriptor>,
        settings: RecommendSettings,
    ) -> Self {
        Self {
            store: crawler.store().clone(),
            crawler: Arc::new(crawler),
            sources: sources.into(),
            settings,
            scorer: TitleScorer::default(),
            in_flight: Mutex::new(None),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_scorer(mut self, scorer: TitleScorer) -> Self {
        self.scorer = scorer;
        self
    }

    #[inline]
    pub fn store(&self) -> &CorpusStore {
        &self.store
    }

    #[inline]
    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    #[inline]
    pub fn settings(&self) -> &RecommendSettings {
        &self.settings
    }

    /// Rank stored postings against `query_title`.
    ///
    /// The corpus is refreshed first when `force_refresh` is set or it is
    /// stale. Only postings scoring strictly above `min_score` are kept.
    /// `top_n` defaults to the configured count and is clamped to
    /// `1..=MAX_TOP_N`.
    #[inline]
    pub async fn recommend(
        &self,
        query_title: &str,
        force_refresh: bool,
        top_n: Option<usize>,
    ) -> Result<Vec<Recommendation>> {
        if tokens(query_title).is_empty() {
            return Err(JobRecError::InvalidQuery(
                "title must contain at least one word other than a stop word".to_string(),
            ));
        }

        let top_n = top_n.unwrap_or(self.settings.top_n).clamp(1, MAX_TOP_N);

        if force_refresh || self.store.is_stale(self.settings.max_age()).await? {
            let summary = self.refresh_for(Some(query_title)).await?;
            if summary.written() == 0 {
                warn!("Refresh wrote no postings, using existing corpus");
            }
        }

        if self.store.is_empty().await? {
            return Err(JobRecError::NoDataAvailable(
                "the corpus is empty and no source returned postings".to_string(),
            ));
        }

        let query = token_set(query_title);
        let min_score = self.settings.min_score;
        let scorer = self.scorer;

        let candidates: Vec<Recommendation> = self
            .store
            .all()
            .try_filter_map(|posting| {
                let score = scorer.score_sets(&query, &token_set(&posting.title));
                let kept = (score > min_score).then_some(Recommendation { posting, score });
                futures::future::ready(Ok(kept))
            })
            .try_collect()
            .await?;

        let scanned = candidates.len();
        let recommendations: Vec<Recommendation> = candidates
            .into_iter()
            .k_smallest_by(top_n, rank_order)
            .collect();

        info!(
            "Recommended {} of {} postings for '{}'",
            recommendations.len(),
            scanned,
            query_title
        );
        Ok(recommendations)
    }

    /// Refresh the corpus from every configured source that needs no query,
    /// joining a crawl that is already running instead of starting a second one.
    ///
    /// The crawl runs on its own task, so it completes even if every caller
    /// stops waiting.
    #[inline]
    pub async fn refresh(&self) -> Result<Arc<RefreshSummary>> {
        self.refresh_for(None).await
    }

    /// [`refresh`](Self::refresh) with `{query}` source templates filled
    /// from `query_title`
    #[inline]
    pub async fn refresh_for(&self, query_title: Option<&str>) -> Result<Arc<RefreshSummary>> {
        let has_templates = self.sources.iter().any(SourceDescriptor::is_query_template);
        let key = query_title
            .filter(|_| has_templates)
            .map(normalize)
            .filter(|query| !query.is_empty());

        let result = {
            let mut slot = self
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            let joinable = slot
                .as_ref()
                .filter(|running| {
                    running.query == key && !running.done.load(AtomicOrdering::Acquire)
                })
                .map(|running| running.result.clone());

            match joinable {
                Some(result) => {
                    debug!("Joining refresh already in progress");
                    result
                }
                None => {
                    let running = self.start_refresh(key);
                    let result = running.result.clone();
                    *slot = Some(running);
                    result
                }
            }
        };

        result.await.map_err(|e| e.duplicate())
    }

    fn start_refresh(&self, query: Option<String>) -> InFlightRefresh {
        let sources = resolve_sources(&self.sources, query.as_deref());
        info!(
            "Starting refresh of {} of {} sources",
            sources.len(),
            self.sources.len()
        );

        let done = Arc::new(AtomicBool::new(false));
        let crawler = Arc::clone(&self.crawler);
        let finished = Arc::clone(&done);

        let handle = tokio::spawn(async move {
            let _done = MarkDone(finished);
            crawler.refresh(&sources).await
        });

        let result = async move {
            match handle.await {
                Ok(result) => result.map(Arc::new).map_err(Arc::new),
                Err(e) => Err(Arc::new(JobRecError::Crawler(format!(
                    "refresh task failed: {}",
                    e
                )))),
            }
        }
        .boxed()
        .shared();

        InFlightRefresh {
            query,
            done,
            result,
        }
    }
}
