#[cfg(test)]
mod tests;

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, ConfigError, CrawlerSettings, RecommendSettings};
use crate::crawler::sources::DEFAULT_MAX_POSTINGS;
use crate::crawler::{FeedFormat, SourceDescriptor, validate_url};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 jobrec Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Crawler Settings").bold().yellow());
    eprintln!("Control how postings are fetched from your sources.");
    eprintln!();
    configure_crawler(&mut config.crawler)?;

    eprintln!();
    eprintln!("{}", style("Recommendation Settings").bold().yellow());
    configure_recommend(&mut config.recommend)?;

    eprintln!();
    eprintln!("{}", style("Sources").bold().yellow());
    eprintln!("{} configured", config.sources.len());
    while Confirm::new()
        .with_prompt("Add a source?")
        .default(config.sources.is_empty())
        .interact()?
    {
        let source = prompt_source(&config.sources)?;
        eprintln!(
            "{}",
            style(format!("✓ Added {} ({})", source.name, source.kind)).green()
        );
        config.sources.push(source);
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

/// Print a summary to stderr and the effective TOML to stdout
#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Crawler Settings:").bold().yellow());
    eprintln!(
        "  Request timeout: {}s",
        style(config.crawler.request_timeout_seconds).cyan()
    );
    eprintln!(
        "  Source timeout: {}s",
        style(config.crawler.source_timeout_seconds).cyan()
    );
    eprintln!(
        "  Concurrent sources: {}",
        style(config.crawler.max_concurrent_sources).cyan()
    );

    eprintln!("{}", style("Recommendation Settings:").bold().yellow());
    eprintln!("  Top N: {}", style(config.recommend.top_n).cyan());
    eprintln!("  Min score: {}", style(config.recommend.min_score).cyan());
    eprintln!(
        "  Max corpus age: {}h",
        style(config.recommend.max_age_hours).cyan()
    );
    eprintln!(
        "  Skill vocabulary: {} terms",
        style(config.skills.vocabulary.len()).cyan()
    );
    eprintln!("  Sources: {}", style(config.sources.len()).cyan());
    eprintln!(
        "  Domain rules: {}",
        style(config.domain_rules.len()).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
    eprintln!();

    println!("{}", config.to_toml()?);

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |e| {
            eprintln!(
                "{}",
                style(format!("Could not load existing configuration ({e:#}). Using defaults."))
                    .yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            if config.config_file_path().exists() {
                eprintln!("{}", style("Found existing configuration.").green());
            }
            Ok(config)
        },
    )
}

fn configure_crawler(crawler: &mut CrawlerSettings) -> Result<()> {
    let request_timeout_seconds: u64 = Input::new()
        .with_prompt("Request timeout (seconds)")
        .default(crawler.request_timeout_seconds)
        .validate_with(|input: &u64| -> Result<(), ConfigError> {
            CrawlerSettings {
                request_timeout_seconds: *input,
                ..crawler.clone()
            }
            .validate()
        })
        .interact_text()?;

    let source_timeout_seconds: u64 = Input::new()
        .with_prompt("Deadline per source (seconds)")
        .default(crawler.source_timeout_seconds)
        .validate_with(|input: &u64| -> Result<(), ConfigError> {
            CrawlerSettings {
                source_timeout_seconds: *input,
                ..crawler.clone()
            }
            .validate()
        })
        .interact_text()?;

    let max_concurrent_sources: usize = Input::new()
        .with_prompt("Sources crawled concurrently")
        .default(crawler.max_concurrent_sources)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=32).contains(input) {
                Ok(())
            } else {
                Err("Concurrency must be between 1 and 32")
            }
        })
        .interact_text()?;

    let max_retries: u32 = Input::new()
        .with_prompt("Retries for failed requests")
        .default(crawler.max_retries)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input > 10 {
                Err("Retries must be 10 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    crawler.request_timeout_seconds = request_timeout_seconds;
    crawler.source_timeout_seconds = source_timeout_seconds;
    crawler.max_concurrent_sources = max_concurrent_sources;
    crawler.max_retries = max_retries;
    crawler.validate()?;

    Ok(())
}

fn configure_recommend(recommend: &mut RecommendSettings) -> Result<()> {
    let top_n: usize = Input::new()
        .with_prompt("Default number of recommendations")
        .default(recommend.top_n)
        .validate_with(|input: &usize| -> Result<(), ConfigError> {
            RecommendSettings {
                top_n: *input,
                ..*recommend
            }
            .validate()
        })
        .interact_text()?;

    let min_score: f64 = Input::new()
        .with_prompt("Minimum score (0 to 1)")
        .default(recommend.min_score)
        .validate_with(|input: &f64| -> Result<(), ConfigError> {
            RecommendSettings {
                min_score: *input,
                ..*recommend
            }
            .validate()
        })
        .interact_text()?;

    let max_age_hours: u64 = Input::new()
        .with_prompt("Refresh when the newest posting is older than (hours)")
        .default(recommend.max_age_hours)
        .validate_with(|input: &u64| -> Result<(), &str> {
            if *input == 0 {
                Err("Max age must be at least one hour")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    *recommend = RecommendSettings {
        top_n,
        min_score,
        max_age_hours,
    };
    recommend.validate()?;

    Ok(())
}

fn prompt_source(existing: &[SourceDescriptor]) -> Result<SourceDescriptor> {
    let name: String = Input::new()
        .with_prompt("Source name")
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Name cannot be empty")
            } else if existing.iter().any(|source| source.name == input.trim()) {
                Err("A source with this name already exists")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let url: String = Input::new()
        .with_prompt("URL")
        .validate_with(|input: &String| -> Result<(), String> {
            validate_url(input.trim()).map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()?;

    let kinds = &["Job posting page", "Listing page", "JSON feed"];
    let kind = Select::new()
        .with_prompt("Source type")
        .default(0)
        .items(kinds)
        .interact()?;

    let name = name.trim().to_string();
    let url = url.trim().to_string();

    let source = match kind {
        1 => {
            let max_postings: usize = Input::new()
                .with_prompt("Maximum postings to follow")
                .default(DEFAULT_MAX_POSTINGS)
                .interact_text()?;
            SourceDescriptor::listing(name, url, max_postings)
        }
        2 => {
            let formats = &["generic", "greenhouse"];
            let format = match Select::new()
                .with_prompt("Feed format")
                .default(0)
                .items(formats)
                .interact()?
            {
                1 => FeedFormat::Greenhouse,
                _ => FeedFormat::Generic,
            };
            SourceDescriptor::json_feed(name, url, format)
        }
        _ => SourceDescriptor::job_page(name, url),
    };

    Ok(source)
}
