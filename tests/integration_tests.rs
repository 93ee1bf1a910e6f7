#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end tests: configuration on disk, crawl, corpus and ranking

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jobrec::JobRecError;
use jobrec::api::{RecommendResponse, handle_json};
use jobrec::commands::{self, open_pipeline};
use jobrec::config::{Config, CrawlerSettings, RecommendSettings};
use jobrec::crawler::{FeedFormat, SourceDescriptor};

/// Write a config with the given sources into a fresh directory
fn create_test_config(sources: Vec<SourceDescriptor>) -> anyhow::Result<TempDir> {
    let temp_dir = TempDir::new()?;
    let config = Config {
        crawler: CrawlerSettings {
            request_timeout_seconds: 5,
            source_timeout_seconds: 10,
            max_retries: 0,
            retry_delay_seconds: 1,
            rate_limit_ms: 0,
            ..CrawlerSettings::default()
        },
        recommend: RecommendSettings {
            top_n: 3,
            ..RecommendSettings::default()
        },
        sources,
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    config.save()?;
    Ok(temp_dir)
}

async fn mount_feed(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Scrape, store and rank postings from a feed
#[tokio::test]
async fn recommend_after_scrape() {
    let mock_server = MockServer::start().await;
    mount_feed(
        &mock_server,
        "/feed.json",
        serde_json::json!({
            "jobs": [
                {
                    "url": "https://jobs.example.com/backend",
                    "title": "Senior Backend Engineer",
                    "company": "Acme",
                    "location": "Paris",
                    "description": "Go services, SQL and Kubernetes"
                },
                {
                    "url": "https://jobs.example.com/frontend",
                    "title": "Frontend Developer",
                    "description": "React and TypeScript"
                },
                {
                    "url": "https://jobs.example.com/chef",
                    "title": "Pastry Chef"
                },
                {
                    "url": "https://jobs.example.com/backend-junior",
                    "title": "Junior Backend Developer",
                    "description": "Python and Docker"
                }
            ]
        }),
    )
    .await;

    let temp_dir = create_test_config(vec![SourceDescriptor::json_feed(
        "feed",
        format!("{}/feed.json", mock_server.uri()),
        FeedFormat::Generic,
    )])
    .expect("can create test config");

    let pipeline = open_pipeline(temp_dir.path())
        .await
        .expect("can open pipeline");

    let recommendations = pipeline
        .recommend("Backend Engineer", true, None)
        .await
        .expect("recommend should succeed");

    // Frontend and pastry postings share no word with the query
    assert_eq!(recommendations.len(), 2);
    assert_eq!(recommendations[0].posting.title, "Senior Backend Engineer");
    assert_eq!(recommendations[0].posting.company, "Acme");
    assert!(recommendations[0].posting.skills.contains("sql"));
    assert!(recommendations[0].posting.skills.contains("kubernetes"));
    assert_eq!(recommendations[1].posting.title, "Junior Backend Developer");
    assert!(
        recommendations
            .windows(2)
            .all(|pair| pair[0].score >= pair[1].score)
    );

    // Missing company and location fall back to the placeholder
    let frontend = pipeline
        .store()
        .get("https://jobs.example.com/frontend")
        .await
        .expect("store should answer")
        .expect("frontend posting should be stored");
    assert_eq!(frontend.company, "unknown");
    assert_eq!(frontend.location, "unknown");
}

/// Every source fails and nothing was stored before
#[tokio::test]
async fn all_sources_fail_on_empty_corpus() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let temp_dir = create_test_config(vec![
        SourceDescriptor::job_page("page", format!("{}/jobs/1", mock_server.uri())),
        SourceDescriptor::listing("board", format!("{}/careers", mock_server.uri()), 5),
        SourceDescriptor::json_feed(
            "feed",
            format!("{}/feed.json", mock_server.uri()),
            FeedFormat::Generic,
        ),
    ])
    .expect("can create test config");

    let pipeline = open_pipeline(temp_dir.path())
        .await
        .expect("can open pipeline");

    let result = pipeline.recommend("Data Scientist", false, None).await;
    assert!(
        matches!(result, Err(JobRecError::NoDataAvailable(_))),
        "unexpected result: {:?}",
        result
    );

    let run = pipeline
        .store()
        .last_refresh()
        .await
        .expect("store should answer")
        .expect("the failed refresh should still be recorded");
    assert_eq!(run.sources_total, 3);
    assert_eq!(run.sources_failed, 3);
    assert!(run.all_sources_failed());
}

/// The JSON boundary over a real pipeline
#[tokio::test]
async fn json_request_round_trip() {
    let mock_server = MockServer::start().await;
    mount_feed(
        &mock_server,
        "/feed.json",
        serde_json::json!([
            {
                "url": "https://jobs.example.com/ml",
                "title": "Machine Learning Engineer",
                "company": "Initech",
                "description_full": "Machine learning with Python on AWS"
            }
        ]),
    )
    .await;

    let temp_dir = create_test_config(vec![SourceDescriptor::json_feed(
        "feed",
        format!("{}/feed.json", mock_server.uri()),
        FeedFormat::Generic,
    )])
    .expect("can create test config");
    let pipeline = open_pipeline(temp_dir.path())
        .await
        .expect("can open pipeline");

    let response = handle_json(
        &pipeline,
        r#"{"title": "machine learning engineer", "scrape_new": true}"#,
    )
    .await;
    assert_eq!(response.status, 200);

    let body: RecommendResponse =
        serde_json::from_value(response.body).expect("body should be a recommendation list");
    assert_eq!(body.recommendations.len(), 1);

    let recommendation = &body.recommendations[0];
    assert_eq!(recommendation.url, "https://jobs.example.com/ml");
    assert_eq!(recommendation.company, "Initech");
    assert_eq!(recommendation.location, "unknown");
    assert!((recommendation.score - 1.0).abs() < f64::EPSILON);
    assert_eq!(
        recommendation.skills,
        vec!["aws", "machine learning", "python"]
    );

    let response = handle_json(&pipeline, r#"{"title": "  "}"#).await;
    assert_eq!(response.status, 400);
}

/// Commands release the corpus before returning
#[tokio::test]
async fn commands_close_the_corpus() {
    let temp_dir = create_test_config(Vec::new()).expect("can create test config");
    let wal = temp_dir.path().join("corpus.db-wal");

    commands::show_status(temp_dir.path())
        .await
        .expect("status should succeed");
    assert!(temp_dir.path().join("corpus.db").exists());
    assert!(!wal.exists(), "write-ahead log left open after status");

    commands::refresh(temp_dir.path())
        .await
        .expect("refresh without sources should succeed");
    assert!(!wal.exists(), "write-ahead log left open after refresh");

    let result = commands::recommend(temp_dir.path(), "   ", false, None, true).await;
    assert!(result.is_err());
    assert!(!wal.exists(), "write-ahead log left open after a failed recommend");
}
