use super::load_existing_config as load_existing_config_impl;
use tempfile::TempDir;

#[test]
fn load_existing_config() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = load_existing_config_impl(temp_dir.path()).expect("config loaded successfully");
    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert!(config.crawler.request_timeout_seconds > 0);
    assert!(config.recommend.top_n > 0);
    assert!(!config.skills.vocabulary.is_empty());
}

#[test]
fn broken_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(temp_dir.path().join("config.toml"), "[crawler\n")
        .expect("should write config");

    let config = load_existing_config_impl(temp_dir.path()).expect("config loaded successfully");
    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert!(config.sources.is_empty());
}
