
use super::models::*;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use futures::StreamExt;
use futures::stream::BoxStream;
use sqlx::SqlitePool;
use tracing::debug;

const SELECT_POSTINGS: &str = r#"
    SELECT url,
           title,
           company,
           location,
           raw_text,
           skills,
           source,
           fetched_at
    FROM job_postings
"#;

pub struct PostingQueries;

impl PostingQueries {
    /// Insert or replace the posting stored under `posting.url`.
    ///
    /// The write is a single `INSERT .. ON CONFLICT` statement, so readers
    /// see either the previous row or the new one, never a mix.
    #[inline]
    pub async fn upsert(
        pool: &SqlitePool,
        posting: &NewJobPosting,
        fetched_at: NaiveDateTime,
    ) -> Result<UpsertOutcome> {
        let existing = Self::get_by_url(pool, &posting.url).await?;
        let outcome = match existing {
            None => UpsertOutcome::Inserted,
            Some(ref current) if posting.same_content_as(current) => UpsertOutcome::Unchanged,
            Some(_) => UpsertOutcome::Updated,
        };

        let skills =
            serde_json::to_string(&posting.skills).context("Failed to serialize skills")?;

        sqlx::query(
            r#"
            INSERT INTO job_postings (url, title, company, location, raw_text, skills, source, fetched_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                company = excluded.company,
                location = excluded.location,
                raw_text = excluded.raw_text,
                skills = excluded.skills,
                source = excluded.source,
                fetched_at = excluded.fetched_at
            "#,
        )
        .bind(&posting.url)
        .bind(&posting.title)
        .bind(&posting.company)
        .bind(&posting.location)
        .bind(&posting.raw_text)
        .bind(skills)
        .bind(&posting.source)
        .bind(fetched_at)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to upsert job posting {}", posting.url))?;

        debug!("Upserted {} ({})", posting.url, outcome);
        Ok(outcome)
    }

    #[inline]
    pub async fn get_by_url(pool: &SqlitePool, url: &str) -> Result<Option<JobPosting>> {
        let query = format!("{} WHERE url = ?", SELECT_POSTINGS);
        let row = sqlx::query_as::<_, JobPostingRow>(&query)
            .bind(url)
            .fetch_optional(pool)
            .await
            .context("Failed to get job posting by url")?;

        row.map(JobPosting::try_from).transpose()
    }

    /// Lazily scan every posting. Each call issues a fresh query.
    #[inline]
    pub fn stream_all(pool: &SqlitePool) -> BoxStream<'_, Result<JobPosting>> {
        sqlx::query_as::<_, JobPostingRow>(SELECT_POSTINGS)
            .fetch(pool)
            .map(|row| {
                let row = row.context("Failed to read job posting row")?;
                JobPosting::try_from(row)
            })
            .boxed()
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_postings")
            .fetch_one(pool)
            .await
            .context("Failed to count job postings")?;

        Ok(count)
    }

    #[inline]
    pub async fn latest_fetched_at(pool: &SqlitePool) -> Result<Option<NaiveDateTime>> {
        let latest: Option<NaiveDateTime> = sqlx::query_scalar(
            "SELECT fetched_at FROM job_postings ORDER BY fetched_at DESC LIMIT 1",
        )
        .fetch_optional(pool)
        .await
        .context("Failed to get latest fetch time")?;

        Ok(latest)
    }

    #[inline]
    pub async fn count_by_source(pool: &SqlitePool) -> Result<Vec<SourceCount>> {
        let counts = sqlx::query_as::<_, SourceCount>(
            r#"
            SELECT source, COUNT(*) AS postings
            FROM job_postings
            GROUP BY source
            ORDER BY postings DESC, source ASC
            "#,
        )
        .fetch_all(pool)
        .await
        .context("Failed to count postings by source")?;

        Ok(counts)
    }
}

pub struct RefreshRunQueries;

impl RefreshRunQueries {
    #[inline]
    pub async fn record(pool: &SqlitePool, run: &NewRefreshRun) -> Result<RefreshRun> {
        let id = sqlx::query(
            r#"
            INSERT INTO refresh_runs (started_at, finished_at, sources_total, sources_failed, postings_written, postings_changed)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(run.started_at)
        .bind(run.finished_at)
        .bind(run.sources_total)
        .bind(run.sources_failed)
        .bind(run.postings_written)
        .bind(run.postings_changed)
        .execute(pool)
        .await
        .context("Failed to record refresh run")?
        .last_insert_rowid();

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve recorded refresh run"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<RefreshRun>> {
        let run = sqlx::query_as::<_, RefreshRun>(
            r#"
            SELECT id, started_at, finished_at, sources_total, sources_failed, postings_written, postings_changed
            FROM refresh_runs WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get refresh run by id")?;

        Ok(run)
    }

    #[inline]
    pub async fn latest(pool: &SqlitePool) -> Result<Option<RefreshRun>> {
        let run = sqlx::query_as::<_, RefreshRun>(
            r#"
            SELECT id, started_at, finished_at, sources_total, sources_failed, postings_written, postings_changed
            FROM refresh_runs ORDER BY id DESC LIMIT 1
            "#,
        )
        .fetch_optional(pool)
        .await
        .context("Failed to get latest refresh run")?;

        Ok(run)
    }
}
