//! SQLite pool setup and schema migrations.

use std::path::Path;
use std::time::Duration;

use sqlx::ConnectOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

pub const DEFAULT_DATABASE_PATH: &str = "autopark.db";

/// How to open the ledger database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Database file; parent directories are created on open.
    pub path: String,
    pub pool_size: u32,
    pub acquire_timeout: Duration,
    /// How long a writer waits on a locked database before failing.
    pub busy_timeout: Duration,
    pub create_if_missing: bool,
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DATABASE_PATH.to_string(),
            pool_size: 4,
            acquire_timeout: Duration::from_secs(10),
            busy_timeout: Duration::from_secs(5),
            create_if_missing: true,
            run_migrations: true,
        }
    }
}

impl DatabaseConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    #[must_use]
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }
}

/// Shared handle to the ledger database pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the database in WAL mode, migrating it unless disabled.
    ///
    /// ```no_run
    /// use autopark_storage::{Database, DatabaseConfig};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Database::open(DatabaseConfig::new("/var/lib/autopark/ledger.db")).await?;
    /// db.health_check().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open(config: DatabaseConfig) -> StorageResult<Self> {
        if config.pool_size == 0 {
            return Err(StorageError::Configuration(
                "pool_size must be at least 1".to_string(),
            ));
        }
        ensure_parent_dir(Path::new(&config.path))?;

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(config.create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;
        info!(path = %config.path, pool_size = config.pool_size, "ledger database opened");

        let db = Self { pool };
        if config.run_migrations {
            db.migrate().await?;
        }
        Ok(db)
    }

    /// Private in-memory database, already migrated.
    ///
    /// The pool holds a single connection: every SQLite memory connection
    /// is its own database.
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .disable_statement_logging();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Apply the migrations embedded from the workspace `migrations/`
    /// directory. Already applied migrations are skipped.
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        debug!("ledger schema up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Configuration(format!(
                    "cannot create database directory {}: {e}",
                    parent.display()
                ))
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_builder() {
        let config = DatabaseConfig::default();
        assert_eq!(config.path, DEFAULT_DATABASE_PATH);
        assert_eq!(config.pool_size, 4);
        assert!(config.run_migrations);

        let config = DatabaseConfig::new("ledger.db").pool_size(2).run_migrations(false);
        assert_eq!(config.path, "ledger.db");
        assert_eq!(config.pool_size, 2);
        assert!(!config.run_migrations);
    }

    #[tokio::test]
    async fn test_zero_pool_rejected() {
        let err = Database::open(DatabaseConfig::new("unused.db").pool_size(0))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_open_without_migrations_has_no_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.db").to_string_lossy().into_owned();
        let db = Database::open(DatabaseConfig::new(path).run_migrations(false))
            .await
            .unwrap();

        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'active_sessions'",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(tables, 0);
        db.close().await;
    }
}
