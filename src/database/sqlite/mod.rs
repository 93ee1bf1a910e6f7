use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};


pub mod models;
pub mod queries;

pub use models::*;
pub use queries::*;

pub type DbPool = Pool<Sqlite>;

/// Pooled connections; WAL lets scans run while a refresh writes
const MAX_CONNECTIONS: u32 = 8;
/// How long a writer waits for another writer's lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite file holding the posting corpus and the refresh history
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open the database file at `path`, creating it and its parent directory
    /// when missing, and apply pending migrations.
    #[inline]
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database at {}", path.display()))?;

        let database = Self { pool };
        database.migrate().await?;

        Ok(database)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Bring the schema up to date; already applied migrations are skipped
    #[inline]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to apply corpus schema")?;

        debug!("Corpus schema is up to date");
        Ok(())
    }

    /// Close every pooled connection; later queries fail
    #[inline]
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}
