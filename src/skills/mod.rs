// Skill extraction against a curated vocabulary

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use fancy_regex::Regex;
use tracing::warn;

/// Vocabulary used when the configuration does not provide one
pub const DEFAULT_SKILLS: &[&str] = &[
    "python",
    "java",
    "c++",
    "javascript",
    "react",
    "angular",
    "vue",
    "node.js",
    "django",
    "flask",
    "spring",
    "sql",
    "nosql",
    "mongodb",
    "postgresql",
    "docker",
    "kubernetes",
    "aws",
    "azure",
    "gcp",
    "git",
    "agile",
    "scrum",
    "machine learning",
    "deep learning",
    "data science",
    "nlp",
    "communication",
    "problem solving",
    "teamwork",
    "leadership",
    "gestion de projet",
    "analyse de données",
    "cybersécurité",
];

#[derive(Debug)]
struct SkillPattern {
    term: String,
    regex: Regex,
}

/// Matches vocabulary terms as whole words, case-insensitively.
///
/// A term only matches when the characters around it are not letters, digits
/// or underscores, so `java` is not found inside `javascript` while terms that
/// carry punctuation (`c++`, `node.js`) still match.
#[derive(Debug)]
pub struct SkillExtractor {
    patterns: Vec<SkillPattern>,
}

impl SkillExtractor {
    #[inline]
    pub fn new<I, S>(vocabulary: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms: BTreeSet<String> = vocabulary
            .into_iter()
            .map(|term| term.as_ref().trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .collect();

        let patterns = terms
            .into_iter()
            .map(|term| {
                let regex = compile_term(&term)?;
                Ok(SkillPattern { term, regex })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    #[inline]
    pub fn vocabulary_len(&self) -> usize {
        self.patterns.len()
    }

    /// Return the vocabulary terms present in `text`
    #[inline]
    pub fn extract(&self, text: &str) -> BTreeSet<String> {
        self.patterns
            .iter()
            .filter(|pattern| match pattern.regex.is_match(text) {
                Ok(found) => found,
                Err(e) => {
                    warn!("Skill matching failed for '{}': {}", pattern.term, e);
                    false
                }
            })
            .map(|pattern| pattern.term.clone())
            .collect()
    }
}

impl Default for SkillExtractor {
    #[inline]
    fn default() -> Self {
        let patterns = DEFAULT_SKILLS
            .iter()
            .filter_map(|term| {
                compile_term(term).ok().map(|regex| SkillPattern {
                    term: (*term).to_string(),
                    regex,
                })
            })
            .collect();

        Self { patterns }
    }
}

fn compile_term(term: &str) -> Result<Regex> {
    let pattern = format!(
        r"(?i)(?<![\p{{L}}\p{{N}}_]){}(?![\p{{L}}\p{{N}}_])",
        fancy_regex::escape(term)
    );
    Regex::new(&pattern).with_context(|| format!("Invalid skill pattern for '{}'", term))
}

/// One-shot extraction for callers that do not keep an extractor around
#[inline]
pub fn extract<S: AsRef<str>>(raw_text: &str, vocabulary: &[S]) -> Result<BTreeSet<String>> {
    let extractor = SkillExtractor::new(vocabulary)?;
    Ok(extractor.extract(raw_text))
}
