//! # Database Migrations
//!
//! Embedded SQL migrations for the counter and snapshot tables.
//!
//! ## Schema
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  001_document_sequences.sql                                            │
//! │    document_sequences(kind PK, next_value, updated_at)                 │
//! │    triggers: next_value never decreases, rows never deleted            │
//! │                                                                         │
//! │  002_documents.sql                                                     │
//! │    documents(id PK, kind, number, sequence_value, revision, *_cents,   │
//! │              lines_json, created_at, UNIQUE(kind, number, revision))   │
//! │    triggers: no UPDATE, no DELETE                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Create a new file in `migrations/sqlite/` with the next sequence number
//! 2. Name format: `NNN_description.sql`
//! 3. **NEVER** modify existing migrations - always add new ones

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded migrations from the workspace `migrations/sqlite` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations.
///
/// Idempotent, transactional per migration, applied in filename order.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!(
        migrations = MIGRATOR.migrations.len(),
        "All migrations applied successfully"
    );
    Ok(())
}

/// Returns `(total_migrations, applied_migrations)` for diagnostics.
///
/// Fails if the migrations table does not exist yet.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((total, applied as usize))
}
