use thiserror::Error;

pub type Result<T> = std::result::Result<T, JobRecError>;

#[derive(Error, Debug)]
pub enum JobRecError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("No job postings available: {0}")]
    NoDataAvailable(String),

    #[error("Source {source_name} failed: {message}")]
    SourceFetchFailed {
        source_name: String,
        message: String,
    },

    #[error("Corpus store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Crawler error: {0}")]
    Crawler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl JobRecError {
    /// Wrap a backend failure as [`JobRecError::StoreUnavailable`], keeping the context chain
    #[inline]
    pub fn store(error: &anyhow::Error) -> Self {
        Self::StoreUnavailable(format!("{:#}", error))
    }

    /// Copy of this error with the same variant, for handing one failure to
    /// several waiters. Wrapped `io`/`anyhow` errors keep only their message.
    #[inline]
    pub fn duplicate(&self) -> Self {
        match self {
            Self::InvalidQuery(message) => Self::InvalidQuery(message.clone()),
            Self::NoDataAvailable(message) => Self::NoDataAvailable(message.clone()),
            Self::SourceFetchFailed {
                source_name,
                message,
            } => Self::SourceFetchFailed {
                source_name: source_name.clone(),
                message: message.clone(),
            },
            Self::StoreUnavailable(message) => Self::StoreUnavailable(message.clone()),
            Self::Config(message) => Self::Config(message.clone()),
            Self::Crawler(message) => Self::Crawler(message.clone()),
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), e.to_string())),
            Self::Other(e) => Self::Other(anyhow::anyhow!("{:#}", e)),
        }
    }
}

pub mod api;
pub mod commands;
pub mod config;
pub mod corpus;
pub mod crawler;
pub mod database;
pub mod pipeline;
pub mod scoring;
pub mod skills;
pub mod text;
