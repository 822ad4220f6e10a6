//! # Local Device Store
//!
//! SQLite-backed document store. Each collection is one JSON array kept in a
//! single `kv_store` row, plus the `appSettings` row.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  kv_store                                                              │
//! │  ┌──────────────┬────────────────────────────────┬──────────────────┐  │
//! │  │ key          │ value                          │ updated_at       │  │
//! │  ├──────────────┼────────────────────────────────┼──────────────────┤  │
//! │  │ products     │ [{"id":"p1",...}, ...]         │ 2024-05-01T...Z  │  │
//! │  │ customers    │ [{"id":"c1",...}, ...]         │                  │  │
//! │  │ orders       │ [{"id":"17...",...}, ...]      │                  │  │
//! │  │ appSettings  │ {"useRemote":false,...}        │                  │  │
//! │  └──────────────┴────────────────────────────────┴──────────────────┘  │
//! │                                                                         │
//! │  upsert/remove: BEGIN → read blob → modify array → write blob → COMMIT │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writers are serialized in-process so two read-modify-write cycles never
//! interleave on the same blob.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::collection::Collection;
use crate::config::AppSettings;
use crate::error::{StoreError, StoreResult};
use crate::migrations;
use crate::store::{document_id, upsert_in_place, EntityStore};

/// Key of the persisted runtime settings.
pub const SETTINGS_KEY: &str = "appSettings";

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Local store configuration.
///
/// ```rust,ignore
/// let config = LocalConfig::new("/var/lib/quill/quill.db").max_connections(2);
/// ```
#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    /// Default: 4
    pub max_connections: u32,

    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// Default: true
    pub run_migrations: bool,
}

impl LocalConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LocalConfig {
            database_path: path.into(),
            max_connections: 4,
            connect_timeout: Duration::from_secs(10),
            run_migrations: true,
        }
    }

    /// Isolated store for tests. The database lives as long as its single
    /// connection, so that connection is never recycled.
    pub fn in_memory() -> Self {
        LocalConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }
}

// =============================================================================
// Store
// =============================================================================

/// The device-resident [`EntityStore`].
#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
}

impl LocalStore {
    /// Opens (creating if needed) the database and applies migrations.
    pub async fn open(config: LocalConfig) -> StoreResult<Self> {
        info!(path = %config.database_path.display(), "Opening local store");

        let (options, pool_options) = if config.is_in_memory() {
            let options = SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
            let pool_options = SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
            (options, pool_options)
        } else {
            if let Some(parent) = config.database_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            let options = SqliteConnectOptions::new()
                .filename(&config.database_path)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .create_if_missing(true);
            let pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
            (options, pool_options)
        };

        let pool = pool_options
            .acquire_timeout(config.connect_timeout)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Local pool created");

        if config.run_migrations {
            migrations::run_migrations(&pool).await?;
        }

        Ok(LocalStore {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        })
    }

    pub async fn in_memory() -> StoreResult<Self> {
        Self::open(LocalConfig::in_memory()).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub async fn close(&self) {
        info!("Closing local store");
        self.pool.close().await;
    }

    /// Raw blob for `key`, if present.
    pub async fn read_blob(&self, key: &str) -> StoreResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    pub async fn write_blob(&self, key: &str, value: &str) -> StoreResult<()> {
        let _guard = self.write_gate.lock().await;
        sqlx::query(UPSERT_BLOB)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Replaces a whole collection in one write (used by sync pull).
    pub async fn replace_all(&self, collection: Collection, items: &[Value]) -> StoreResult<()> {
        let blob = serde_json::to_string(items)?;
        self.write_blob(collection.local_key(), &blob).await?;
        info!(collection = %collection, count = items.len(), "Replaced local collection");
        Ok(())
    }

    /// Persisted runtime settings; defaults when never saved.
    ///
    /// An unreadable settings blob is logged and treated as unset, so a bad
    /// value can always be overwritten from the CLI.
    pub async fn load_settings(&self) -> StoreResult<AppSettings> {
        match self.read_blob(SETTINGS_KEY).await? {
            None => Ok(AppSettings::default()),
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(settings) => Ok(settings),
                Err(e) => {
                    warn!(error = %e, "Stored settings unreadable, using defaults");
                    Ok(AppSettings::default())
                }
            },
        }
    }

    pub async fn save_settings(&self, settings: &AppSettings) -> StoreResult<()> {
        let blob = serde_json::to_string(settings)?;
        self.write_blob(SETTINGS_KEY, &blob).await?;
        info!(use_remote = settings.use_remote, "Saved settings");
        Ok(())
    }

    async fn load_collection(
        tx: &mut Transaction<'_, Sqlite>,
        collection: Collection,
    ) -> StoreResult<Vec<Value>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?")
            .bind(collection.local_key())
            .fetch_optional(&mut **tx)
            .await?;
        parse_collection(collection, raw)
    }

    async fn store_collection(
        tx: &mut Transaction<'_, Sqlite>,
        collection: Collection,
        items: &[Value],
    ) -> StoreResult<()> {
        let blob = serde_json::to_string(items)?;
        sqlx::query(UPSERT_BLOB)
            .bind(collection.local_key())
            .bind(blob)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

const UPSERT_BLOB: &str = "INSERT INTO kv_store (key, value, updated_at) \
     VALUES (?, ?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')) \
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

fn parse_collection(collection: Collection, raw: Option<String>) -> StoreResult<Vec<Value>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(Value::Null) => Ok(Vec::new()),
        Ok(other) => Err(StoreError::Corrupt {
            key: collection.local_key().to_string(),
            message: format!("expected array, found {}", json_kind(&other)),
        }),
        Err(e) => Err(StoreError::Corrupt {
            key: collection.local_key().to_string(),
            message: e.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl EntityStore for LocalStore {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn list(&self, collection: Collection) -> StoreResult<Vec<Value>> {
        let raw = self.read_blob(collection.local_key()).await?;
        parse_collection(collection, raw)
    }

    async fn upsert(&self, collection: Collection, item: Value) -> StoreResult<()> {
        let id = document_id(&item).ok_or_else(|| StoreError::MissingId {
            collection: collection.to_string(),
        })?;

        let _guard = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await?;
        let mut items = Self::load_collection(&mut tx, collection).await?;
        let inserted = upsert_in_place(&mut items, &id, item);
        Self::store_collection(&mut tx, collection, &items).await?;
        tx.commit().await?;

        debug!(collection = %collection, id = %id, inserted, "Local upsert");
        Ok(())
    }

    async fn remove(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let _guard = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await?;
        let mut items = Self::load_collection(&mut tx, collection).await?;
        let before = items.len();
        items.retain(|v| document_id(v).as_deref() != Some(id));
        let removed = before - items.len();
        if removed > 0 {
            Self::store_collection(&mut tx, collection, &items).await?;
        }
        tx.commit().await?;

        debug!(collection = %collection, id = %id, removed, "Local remove");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
