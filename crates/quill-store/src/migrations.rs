//! # Local Store Migrations
//!
//! The local store is a single key/value table; each collection lives in one
//! row as a JSON array. The schema is embedded from `migrations/sqlite/`.
//!
//! ```text
//! open()
//!   │
//!   ▼
//! _sqlx_migrations present? ── no ──► create it
//!   │
//!   ▼
//! 001_kv_store.sql applied? ── no ──► run, record checksum
//!   │
//!   ▼
//! store ready
//! ```
//!
//! Never edit an applied migration; add `NNN_description.sql` instead.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::StoreResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs every pending migration. Safe to call on each open.
pub async fn run_migrations(pool: &SqlitePool) -> StoreResult<()> {
    debug!("Checking for pending migrations");
    MIGRATOR.run(pool).await?;
    info!("Local store schema is current");
    Ok(())
}

/// `(embedded, applied)` migration counts, for `check` style diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> StoreResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;
    Ok((total, applied.max(0) as usize))
}
