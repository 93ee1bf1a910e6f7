// Title similarity scoring


use std::collections::BTreeSet;

use crate::text;

/// Role and seniority words that appear in most titles and say little about
/// the actual job.
const GENERIC_TERMS: &[&str] = &[
    "senior",
    "junior",
    "confirmed",
    "confirme",
    "confirmé",
    "lead",
    "principal",
    "staff",
    "head",
    "chief",
    "engineer",
    "ingenieur",
    "ingénieur",
    "developer",
    "developpeur",
    "développeur",
    "dev",
    "manager",
    "specialist",
    "consultant",
    "analyst",
    "intern",
    "stagiaire",
    "alternance",
    "cdi",
    "cdd",
    "h",
    "f",
    "m",
    "w",
    "x",
];

/// Weighted Jaccard similarity over title tokens.
///
/// Every distinct token weighs `1.0` except generic role/seniority words,
/// which weigh `generic_weight`. The score is the weight of the shared tokens
/// divided by the weight of the union, so it always lies in `[0, 1]`, word
/// order is irrelevant and identical token sets score exactly `1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TitleScorer {
    pub generic_weight: f64,
}

impl Default for TitleScorer {
    #[inline]
    fn default() -> Self {
        Self {
            generic_weight: 0.5,
        }
    }
}

impl TitleScorer {
    #[inline]
    pub fn new(generic_weight: f64) -> Self {
        Self { generic_weight }
    }

    #[inline]
    pub fn score(&self, query_title: &str, posting_title: &str) -> f64 {
        let query = token_set(query_title);
        let posting = token_set(posting_title);
        self.score_sets(&query, &posting)
    }

    /// Score two pre-tokenized titles; lets the pipeline tokenize the query once
    #[inline]
    pub fn score_sets(&self, query: &BTreeSet<String>, posting: &BTreeSet<String>) -> f64 {
        if query.is_empty() || posting.is_empty() {
            return 0.0;
        }

        let shared: f64 = query
            .intersection(posting)
            .map(|token| self.weight(token))
            .sum();
        let union: f64 = query.union(posting).map(|token| self.weight(token)).sum();

        // An empty float sum is -0.0, which would order below real zeros
        if shared <= 0.0 || union <= 0.0 {
            return 0.0;
        }

        (shared / union).clamp(0.0, 1.0)
    }

    #[inline]
    pub fn weight(&self, token: &str) -> f64 {
        if GENERIC_TERMS.contains(&token) {
            self.generic_weight
        } else {
            1.0
        }
    }
}

/// Distinct normalized tokens of a title.
///
/// Stop words are dropped unless the title consists of nothing else, in
/// which case every normalized word is kept.
#[inline]
pub fn token_set(title: &str) -> BTreeSet<String> {
    let tokens = text::tokens(title);
    if tokens.is_empty() {
        return text::normalize(title)
            .split_whitespace()
            .map(str::to_string)
            .collect();
    }
    tokens.into_iter().collect()
}

/// Similarity between a query title and a posting title using the default scorer
#[inline]
pub fn score(query_title: &str, posting_title: &str) -> f64 {
    TitleScorer::default().score(query_title, posting_title)
}
