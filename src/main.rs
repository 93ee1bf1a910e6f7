use clap::{Parser, Subcommand};
use jobrec::Result;
use jobrec::commands::{list_sources, recommend, refresh, show_status};
use jobrec::config::{resolve_config_dir, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "jobrec")]
#[command(about = "Recommend job postings by title similarity")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the corpus database
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend postings for a job title
    Recommend {
        /// Job title to match against
        title: String,
        /// Refresh the corpus from all sources first
        #[arg(long)]
        scrape: bool,
        /// Number of recommendations to return
        #[arg(long)]
        top: Option<usize>,
        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch postings from every configured source
    Refresh,
    /// Show corpus size, freshness and the last refresh
    Status,
    /// List configured sources
    Sources,
    /// Configure crawler, recommendation and source settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = resolve_config_dir(cli.config_dir.as_deref())
        .map_err(|e| jobrec::JobRecError::Config(e.to_string()))?;

    match cli.command {
        Commands::Recommend {
            title,
            scrape,
            top,
            json,
        } => {
            recommend(&config_dir, &title, scrape, top, json).await?;
        }
        Commands::Refresh => {
            refresh(&config_dir).await?;
        }
        Commands::Status => {
            show_status(&config_dir).await?;
        }
        Commands::Sources => {
            list_sources(&config_dir)?;
        }
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["jobrec", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Status));
            assert_eq!(parsed.config_dir, None);
        }
    }

    #[test]
    fn recommend_command_defaults() {
        let cli = Cli::try_parse_from(["jobrec", "recommend", "Data Engineer"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Recommend {
                title,
                scrape,
                top,
                json,
            } = parsed.command
            {
                assert_eq!(title, "Data Engineer");
                assert!(!scrape);
                assert_eq!(top, None);
                assert!(!json);
            } else {
                panic!("expected recommend command");
            }
        }
    }

    #[test]
    fn recommend_command_with_flags() {
        let cli = Cli::try_parse_from([
            "jobrec",
            "recommend",
            "Backend Engineer",
            "--scrape",
            "--top",
            "5",
            "--json",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Recommend {
                title,
                scrape,
                top,
                json,
            } = parsed.command
            {
                assert_eq!(title, "Backend Engineer");
                assert!(scrape);
                assert_eq!(top, Some(5));
                assert!(json);
            } else {
                panic!("expected recommend command");
            }
        }
    }

    #[test]
    fn config_dir_is_global() {
        let cli = Cli::try_parse_from(["jobrec", "refresh", "--config-dir", "/tmp/jobrec"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Refresh));
            assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/jobrec")));
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["jobrec", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn recommend_requires_title() {
        let cli = Cli::try_parse_from(["jobrec", "recommend"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn invalid_top_value() {
        let cli = Cli::try_parse_from(["jobrec", "recommend", "Engineer", "--top", "many"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["jobrec", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["jobrec", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
