
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::crawler::extractor::{DomainRules, PostingExtractor};
use crate::crawler::{CrawlerConfig, SourceDescriptor, SourceKind, validate_url};
use crate::pipeline::MAX_TOP_N;
use crate::skills::{DEFAULT_SKILLS, SkillExtractor};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerSettings,
    #[serde(default)]
    pub recommend: RecommendSettings,
    #[serde(default)]
    pub skills: SkillSettings,
    #[serde(default)]
    pub sources: Vec<SourceDescriptor>,
    /// Site selectors tried before the built-in ones
    #[serde(default)]
    pub domain_rules: Vec<DomainRules>,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CrawlerSettings {
    pub user_agent: String,
    pub request_timeout_seconds: u64,
    pub source_timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub rate_limit_ms: u64,
    pub max_concurrent_sources: usize,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        let defaults = CrawlerConfig::default();
        Self {
            user_agent: defaults.user_agent,
            request_timeout_seconds: defaults.timeout_seconds,
            source_timeout_seconds: defaults.source_timeout_seconds,
            max_retries: defaults.max_retries,
            retry_delay_seconds: defaults.retry_delay_seconds,
            rate_limit_ms: defaults.rate_limit_ms,
            max_concurrent_sources: defaults.max_concurrent_sources,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecommendSettings {
    /// Recommendations returned when the caller does not ask for a count
    pub top_n: usize,
    /// Only postings scoring strictly above this are recommended
    pub min_score: f64,
    /// A corpus whose newest posting is older than this is refreshed first
    pub max_age_hours: u64,
}

impl Default for RecommendSettings {
    fn default() -> Self {
        Self {
            top_n: 10,
            min_score: 0.0,
            max_age_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SkillSettings {
    pub vocabulary: Vec<String>,
}

impl Default for SkillSettings {
    fn default() -> Self {
        Self {
            vocabulary: DEFAULT_SKILLS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid user agent: cannot be empty")]
    InvalidUserAgent,
    #[error("Invalid {0}: {1} (must be between 1 and 300 seconds)")]
    InvalidTimeout(&'static str, u64),
    #[error("Invalid retry count: {0} (must be at most 10)")]
    InvalidRetries(u32),
    #[error("Invalid rate limit: {0}ms (must be at most 60000)")]
    InvalidRateLimit(u64),
    #[error("Invalid concurrency: {0} (must be between 1 and 32)")]
    InvalidConcurrency(usize),
    #[error("Invalid top_n: {0} (must be between 1 and 100)")]
    InvalidTopN(usize),
    #[error("Invalid min_score: {0} (must be between 0 and 1)")]
    InvalidMinScore(f64),
    #[error("Invalid max_age_hours: {0} (must be at least 1)")]
    InvalidMaxAge(u64),
    #[error("Skill vocabulary cannot be empty")]
    EmptyVocabulary,
    #[error("Invalid source '{name}': {reason}")]
    InvalidSource { name: String, reason: String },
    #[error("Duplicate source name: {0}")]
    DuplicateSource(String),
    #[error("Invalid domain rules for '{domain}': {reason}")]
    InvalidDomainRule { domain: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load `config.toml` from `config_dir`, falling back to defaults when absent
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = self.to_toml()?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.crawler.validate()?;
        self.recommend.validate()?;
        self.skills.validate()?;
        validate_sources(&self.sources)?;
        validate_domain_rules(&self.domain_rules)?;
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Get the path for the SQLite corpus database
    #[inline]
    pub fn database_path(&self) -> PathBuf {
        self.get_base_dir().join("corpus.db")
    }

    #[inline]
    pub fn crawler_config(&self) -> CrawlerConfig {
        CrawlerConfig::from(&self.crawler)
    }

    #[inline]
    pub fn skill_extractor(&self) -> Result<SkillExtractor> {
        SkillExtractor::new(&self.skills.vocabulary).context("Invalid skill vocabulary")
    }

    #[inline]
    pub fn posting_extractor(&self) -> PostingExtractor {
        PostingExtractor::new(self.domain_rules.clone())
    }
}

impl CrawlerSettings {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidUserAgent);
        }

        if !(1..=300).contains(&self.request_timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(
                "request timeout",
                self.request_timeout_seconds,
            ));
        }

        if !(1..=300).contains(&self.source_timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(
                "source timeout",
                self.source_timeout_seconds,
            ));
        }

        if self.max_retries > 10 {
            return Err(ConfigError::InvalidRetries(self.max_retries));
        }

        if !(1..=300).contains(&self.retry_delay_seconds) {
            return Err(ConfigError::InvalidTimeout(
                "retry delay",
                self.retry_delay_seconds,
            ));
        }

        if self.rate_limit_ms > 60_000 {
            return Err(ConfigError::InvalidRateLimit(self.rate_limit_ms));
        }

        if !(1..=32).contains(&self.max_concurrent_sources) {
            return Err(ConfigError::InvalidConcurrency(self.max_concurrent_sources));
        }

        Ok(())
    }
}

impl From<&CrawlerSettings> for CrawlerConfig {
    #[inline]
    fn from(settings: &CrawlerSettings) -> Self {
        Self {
            user_agent: settings.user_agent.clone(),
            timeout_seconds: settings.request_timeout_seconds,
            source_timeout_seconds: settings.source_timeout_seconds,
            rate_limit_ms: settings.rate_limit_ms,
            max_retries: settings.max_retries,
            retry_delay_seconds: settings.retry_delay_seconds,
            max_concurrent_sources: settings.max_concurrent_sources,
        }
    }
}

impl RecommendSettings {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_TOP_N).contains(&self.top_n) {
            return Err(ConfigError::InvalidTopN(self.top_n));
        }

        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(ConfigError::InvalidMinScore(self.min_score));
        }

        if self.max_age_hours == 0 {
            return Err(ConfigError::InvalidMaxAge(self.max_age_hours));
        }

        Ok(())
    }

    #[inline]
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours.saturating_mul(3600))
    }
}

impl SkillSettings {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vocabulary.iter().all(|term| term.trim().is_empty()) {
            return Err(ConfigError::EmptyVocabulary);
        }
        Ok(())
    }
}

/// Check names are present and unique and every URL is http(s)
#[inline]
pub fn validate_sources(sources: &[SourceDescriptor]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();

    for source in sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::InvalidSource {
                name: source.name.clone(),
                reason: "name cannot be empty".to_string(),
            });
        }

        if source.is_query_template() && source.kind == SourceKind::JobPage {
            return Err(ConfigError::InvalidSource {
                name: source.name.clone(),
                reason: "only listing and feed URLs can contain {query}".to_string(),
            });
        }

        // Templates are checked as they will be fetched
        let resolved = if source.is_query_template() {
            source.for_query("engineer")
        } else {
            source.clone()
        };
        if let Err(e) = validate_url(&resolved.url) {
            return Err(ConfigError::InvalidSource {
                name: source.name.clone(),
                reason: e.to_string(),
            });
        }

        if !names.insert(source.name.as_str()) {
            return Err(ConfigError::DuplicateSource(source.name.clone()));
        }
    }

    Ok(())
}

/// Check every rule names a domain and every selector parses
#[inline]
pub fn validate_domain_rules(rules: &[DomainRules]) -> Result<(), ConfigError> {
    for rule in rules {
        let invalid = |reason: String| ConfigError::InvalidDomainRule {
            domain: rule.domain.clone(),
            reason,
        };

        let domain = rule.domain.trim();
        if domain.is_empty() || domain.contains(['/', ':', ' ']) {
            return Err(invalid("domain must be a bare host name".to_string()));
        }

        for selector in rule.selectors() {
            if let Err(e) = scraper::Selector::parse(selector) {
                return Err(invalid(format!("invalid selector '{}': {:?}", selector, e)));
            }
        }
    }

    Ok(())
}
