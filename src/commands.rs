use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use tracing::{error, info};

use crate::api::{RecommendResponse, RecommendationView};
use crate::config::Config;
use crate::corpus::CorpusStore;
use crate::crawler::{Crawler, RefreshSummary};
use crate::pipeline::RecommendationPipeline;

/// Load the configuration and open the corpus behind a ready pipeline
#[inline]
pub async fn open_pipeline(config_dir: &Path) -> Result<RecommendationPipeline> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    let store = CorpusStore::open(config.database_path(), config.skill_extractor()?)
        .await
        .context("Failed to open corpus database")?;
    let crawler =
        Crawler::new(store, config.crawler_config()).with_extractor(config.posting_extractor());

    Ok(RecommendationPipeline::new(
        crawler,
        config.sources,
        config.recommend,
    ))
}

/// Recommend postings for a job title
#[inline]
pub async fn recommend(
    config_dir: &Path,
    title: &str,
    scrape: bool,
    top_n: Option<usize>,
    json: bool,
) -> Result<()> {
    let pipeline = open_pipeline(config_dir).await?;
    let result = print_recommendations(&pipeline, title, scrape, top_n, json).await;
    pipeline.store().close().await;
    result
}

async fn print_recommendations(
    pipeline: &RecommendationPipeline,
    title: &str,
    scrape: bool,
    top_n: Option<usize>,
    json: bool,
) -> Result<()> {
    let recommendations = pipeline.recommend(title, scrape, top_n).await?;

    let response = RecommendResponse {
        recommendations: recommendations
            .into_iter()
            .map(RecommendationView::from)
            .collect(),
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).context("Failed to serialize response")?
        );
        return Ok(());
    }

    if response.recommendations.is_empty() {
        println!("No postings matched '{}'.", title);
        println!(
            "Lower recommend.min_score or run 'jobrec refresh' to fetch new postings."
        );
        return Ok(());
    }

    println!(
        "{}",
        style(format!("Recommendations for '{}':", title)).bold()
    );
    println!();

    for (rank, view) in response.recommendations.iter().enumerate() {
        println!(
            "{:>3}. {} {}",
            rank + 1,
            style(&view.title).bold(),
            style(format!("({:.4})", view.score)).dim()
        );
        println!("     {} · {}", view.company, view.location);
        println!("     {}", style(&view.url).cyan());
        if !view.skills.is_empty() {
            println!("     Skills: {}", view.skills.join(", "));
        }
    }

    Ok(())
}

/// Fetch postings from every configured source
#[inline]
pub async fn refresh(config_dir: &Path) -> Result<()> {
    let pipeline = open_pipeline(config_dir).await?;

    if pipeline.sources().is_empty() {
        println!("No sources configured.");
        println!("Use 'jobrec config' to add one.");
        pipeline.store().close().await;
        return Ok(());
    }

    info!("Refreshing {} sources", pipeline.sources().len());
    let result = pipeline.refresh().await;
    pipeline.store().close().await;
    let summary = result?;
    print_summary(&summary);

    if summary.all_failed() {
        error!("Every source failed during refresh");
    }

    Ok(())
}

fn print_summary(summary: &RefreshSummary) {
    println!("Refresh completed in {:.1?}", summary.duration);
    println!("  Postings written: {}", summary.written());
    println!("  Postings changed: {}", summary.changed());
    println!();

    for report in &summary.sources {
        match &report.error {
            Some(error) => println!(
                "  {} {}: {}",
                style("✗").red(),
                report.name,
                error
            ),
            None => println!(
                "  {} {}: {} written, {} changed, {} skipped",
                style("✓").green(),
                report.name,
                report.written,
                report.changed,
                report.skipped
            ),
        }
    }
}

/// Show what the corpus holds and when it was last refreshed
#[inline]
pub async fn show_status(config_dir: &Path) -> Result<()> {
    let pipeline = open_pipeline(config_dir).await?;
    let result = print_status(&pipeline).await;
    pipeline.store().close().await;
    result
}

async fn print_status(pipeline: &RecommendationPipeline) -> Result<()> {
    let store = pipeline.store();
    let settings = pipeline.settings();

    println!("{}", style("📊 jobrec Status Report").bold());
    println!("{}", "=".repeat(50));
    println!();

    let total = store.count().await?;
    println!("🗄️  Corpus:");
    println!("   Postings: {}", total);

    match store.latest_fetched_at().await? {
        Some(latest) => {
            println!("   Latest fetch: {}", latest.format("%Y-%m-%d %H:%M:%S"));
            if store.is_stale(settings.max_age()).await? {
                println!(
                    "   ⚠️  Stale: older than {} hours, the next request will refresh",
                    settings.max_age_hours
                );
            } else {
                println!("   ✅ Fresh");
            }
        }
        None => println!("   📭 Empty"),
    }

    let counts = store.source_counts().await?;
    if !counts.is_empty() {
        println!();
        println!("📚 Postings by source:");
        for count in &counts {
            println!("   {}: {}", count.source, count.postings);
        }
    }

    println!();
    println!("🔄 Last refresh:");
    match store.last_refresh().await? {
        Some(run) => {
            println!(
                "   Finished: {}",
                run.finished_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!(
                "   Sources: {} ({} failed)",
                run.sources_total, run.sources_failed
            );
            println!(
                "   Postings: {} written, {} changed",
                run.postings_written, run.postings_changed
            );
        }
        None => println!("   Never"),
    }

    Ok(())
}

/// List configured sources
#[inline]
pub fn list_sources(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    if config.sources.is_empty() {
        println!("No sources configured.");
        println!("Use 'jobrec config' to add one.");
        return Ok(());
    }

    println!("Sources ({} total):", config.sources.len());
    println!();
    for source in &config.sources {
        println!("  {} ({})", style(&source.name).bold(), source.kind);
        println!("     {}", source.url);
    }

    Ok(())
}
