// Configuration management module
// TOML settings stored under the jobrec home directory

pub mod interactive;
pub mod settings;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, CrawlerSettings, RecommendSettings, SkillSettings, validate_sources,
};

/// Environment variable overriding the default configuration directory
pub const CONFIG_DIR_ENV: &str = "JOBREC_HOME";

/// Get the configuration directory path: `$JOBREC_HOME`, else `~/.jobrec`
#[inline]
pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    dirs::home_dir()
        .map(|home| home.join(".jobrec"))
        .ok_or(ConfigError::DirectoryError)
}

/// An explicit `--config-dir` wins over the environment and the default
#[inline]
pub fn resolve_config_dir(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    explicit.map_or_else(get_config_dir, |dir| Ok(dir.to_path_buf()))
}
