#[cfg(test)]
mod tests;

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Placeholder stored for a missing company or location
pub const UNKNOWN: &str = "unknown";

/// A job posting as persisted in the corpus, identified by its URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub url: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub raw_text: String,
    pub skills: BTreeSet<String>,
    pub source: String,
    pub fetched_at: NaiveDateTime,
}

/// Row shape of `job_postings`; skills are stored as a JSON array
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct JobPostingRow {
    pub url: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub raw_text: String,
    pub skills: String,
    pub source: String,
    pub fetched_at: NaiveDateTime,
}

impl TryFrom<JobPostingRow> for JobPosting {
    type Error = anyhow::Error;

    #[inline]
    fn try_from(row: JobPostingRow) -> Result<Self> {
        let skills: BTreeSet<String> = serde_json::from_str(&row.skills)
            .with_context(|| format!("Invalid skills column for {}", row.url))?;

        Ok(Self {
            url: row.url,
            title: row.title,
            company: row.company,
            location: row.location,
            raw_text: row.raw_text,
            skills,
            source: row.source,
            fetched_at: row.fetched_at,
        })
    }
}

/// Fields written by an upsert. `skills` must already be derived from `raw_text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJobPosting {
    pub url: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub raw_text: String,
    pub skills: BTreeSet<String>,
    pub source: String,
}

impl NewJobPosting {
    /// Whether writing `self` would leave `existing` unchanged apart from `fetched_at`
    #[inline]
    pub fn same_content_as(&self, existing: &JobPosting) -> bool {
        self.url == existing.url
            && self.title == existing.title
            && self.company == existing.company
            && self.location == existing.location
            && self.raw_text == existing.raw_text
            && self.skills == existing.skills
            && self.source == existing.source
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

impl UpsertOutcome {
    #[inline]
    pub fn is_change(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl std::fmt::Display for UpsertOutcome {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            UpsertOutcome::Inserted => write!(f, "Inserted"),
            UpsertOutcome::Updated => write!(f, "Updated"),
            UpsertOutcome::Unchanged => write!(f, "Unchanged"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RefreshRun {
    pub id: i64,
    pub started_at: NaiveDateTime,
    pub finished_at: NaiveDateTime,
    pub sources_total: i64,
    pub sources_failed: i64,
    pub postings_written: i64,
    pub postings_changed: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRefreshRun {
    pub started_at: NaiveDateTime,
    pub finished_at: NaiveDateTime,
    pub sources_total: i64,
    pub sources_failed: i64,
    pub postings_written: i64,
    pub postings_changed: i64,
}

impl RefreshRun {
    #[inline]
    pub fn all_sources_failed(&self) -> bool {
        self.sources_total > 0 && self.sources_failed == self.sources_total
    }
}

/// Posting count per source name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SourceCount {
    pub source: String,
    pub postings: i64,
}
