use serde::{Deserialize, Serialize};
use tracing::info;

use crate::connection::{DEFAULT_DATABASE_PATH, Database, DatabaseConfig};
use crate::error::StorageResult;
use crate::stores::{AnyLedgerStore, MemoryStore, SqliteStore};

fn default_database_path() -> String {
    DEFAULT_DATABASE_PATH.to_string()
}

/// `storage` configuration section.
///
/// ```
/// use autopark_storage::StorageConfig;
///
/// let config: StorageConfig = serde_yaml::from_str("backend: memory").unwrap();
/// assert_eq!(config, StorageConfig::Memory);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    Memory,
    Sqlite {
        #[serde(default = "default_database_path")]
        path: String,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_database_path(),
        }
    }
}

impl StorageConfig {
    /// Open the configured store, running migrations for SQLite.
    ///
    /// # Errors
    /// Fails if the database cannot be opened or migrated.
    pub async fn open(&self) -> StorageResult<AnyLedgerStore> {
        match self {
            StorageConfig::Memory => {
                info!("using in-memory ledger; sessions are lost on exit");
                Ok(MemoryStore::new().into())
            }
            StorageConfig::Sqlite { path } => {
                let db = Database::open(DatabaseConfig::new(path)).await?;
                info!(path = %path, "ledger database opened");
                Ok(SqliteStore::from_database(&db).into())
            }
        }
    }
}
