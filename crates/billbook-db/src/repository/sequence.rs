//! # Sequence Repository
//!
//! The durable half of document numbering: one counter row per kind.
//!
//! ## Reservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE document_sequences                                             │
//! │     SET next_value = next_value + 1, updated_at = ?                    │
//! │   WHERE kind = ?                                                       │
//! │  RETURNING next_value - 1          ← the reserved value                │
//! │                                                                         │
//! │  One statement: read, increment and persist are a single atomic        │
//! │  write, so two reservations can never see the same value.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::numbering::SequenceStore;
use billbook_core::DocumentKind;

/// A counter row as stored.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SequenceRow {
    pub kind: DocumentKind,
    pub next_value: i64,
    pub updated_at: DateTime<Utc>,
}

/// Repository for the `document_sequences` table.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    /// Creates a new SequenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Returns the stored `next_value`, or `None` if the kind was never seeded.
    pub async fn load(&self, kind: DocumentKind) -> DbResult<Option<i64>> {
        let next: Option<i64> =
            sqlx::query_scalar("SELECT next_value FROM document_sequences WHERE kind = ?1")
                .bind(kind)
                .fetch_optional(&self.pool)
                .await?;

        Ok(next)
    }

    /// Inserts the counter row if it is absent and returns the stored value.
    ///
    /// An existing row is left untouched, so seeding twice is harmless.
    pub async fn seed(&self, kind: DocumentKind, next_value: i64) -> DbResult<i64> {
        debug!(kind = %kind, next_value, "Seeding document sequence");

        sqlx::query(
            r#"
            INSERT INTO document_sequences (kind, next_value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (kind) DO NOTHING
            "#,
        )
        .bind(kind)
        .bind(next_value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.load(kind).await?.ok_or_else(|| DbError::SequenceMissing {
            kind: kind.to_string(),
        })
    }

    /// Atomically reserves the current value and advances the counter.
    ///
    /// ## Returns
    /// The reserved value (the counter before the increment).
    pub async fn advance(&self, kind: DocumentKind) -> DbResult<i64> {
        let reserved: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE document_sequences
               SET next_value = next_value + 1,
                   updated_at = ?1
             WHERE kind = ?2
            RETURNING next_value - 1
            "#,
        )
        .bind(Utc::now())
        .bind(kind)
        .fetch_optional(&self.pool)
        .await?;

        reserved.ok_or_else(|| DbError::SequenceMissing {
            kind: kind.to_string(),
        })
    }

    /// Raises the counter to at least `min_next`; never lowers it.
    ///
    /// ## Returns
    /// The counter after the update.
    pub async fn fast_forward(&self, kind: DocumentKind, min_next: i64) -> DbResult<i64> {
        let next: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE document_sequences
               SET next_value = MAX(next_value, ?1),
                   updated_at = ?2
             WHERE kind = ?3
            RETURNING next_value
            "#,
        )
        .bind(min_next)
        .bind(Utc::now())
        .bind(kind)
        .fetch_optional(&self.pool)
        .await?;

        next.ok_or_else(|| DbError::SequenceMissing {
            kind: kind.to_string(),
        })
    }

    /// Lists every counter row, ordered by kind.
    pub async fn list(&self) -> DbResult<Vec<SequenceRow>> {
        let rows = sqlx::query_as::<_, SequenceRow>(
            "SELECT kind, next_value, updated_at FROM document_sequences ORDER BY kind",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl SequenceStore for SequenceRepository {
    async fn load(&self, kind: DocumentKind) -> DbResult<Option<i64>> {
        SequenceRepository::load(self, kind).await
    }

    async fn seed(&self, kind: DocumentKind, next_value: i64) -> DbResult<i64> {
        SequenceRepository::seed(self, kind, next_value).await
    }

    async fn advance(&self, kind: DocumentKind) -> DbResult<i64> {
        SequenceRepository::advance(self, kind).await
    }

    async fn fast_forward(&self, kind: DocumentKind, min_next: i64) -> DbResult<i64> {
        SequenceRepository::fast_forward(self, kind, min_next).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn repo() -> SequenceRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().sequences()
    }

    #[tokio::test]
    async fn test_unseeded_kind() {
        let repo = repo().await;

        assert_eq!(repo.load(DocumentKind::Invoice).await.unwrap(), None);
        assert!(matches!(
            repo.advance(DocumentKind::Invoice).await,
            Err(DbError::SequenceMissing { .. })
        ));
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let repo = repo().await;

        assert_eq!(repo.seed(DocumentKind::Quote, 5).await.unwrap(), 5);
        assert_eq!(repo.seed(DocumentKind::Quote, 1).await.unwrap(), 5);
        assert_eq!(repo.load(DocumentKind::Quote).await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_advance_returns_reserved_value() {
        let repo = repo().await;
        repo.seed(DocumentKind::Invoice, 1).await.unwrap();

        assert_eq!(repo.advance(DocumentKind::Invoice).await.unwrap(), 1);
        assert_eq!(repo.advance(DocumentKind::Invoice).await.unwrap(), 2);
        assert_eq!(repo.load(DocumentKind::Invoice).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_kinds_are_independent() {
        let repo = repo().await;
        repo.seed(DocumentKind::Invoice, 10).await.unwrap();
        repo.seed(DocumentKind::Quote, 1).await.unwrap();

        repo.advance(DocumentKind::Invoice).await.unwrap();

        assert_eq!(repo.load(DocumentKind::Invoice).await.unwrap(), Some(11));
        assert_eq!(repo.load(DocumentKind::Quote).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_fast_forward_never_lowers() {
        let repo = repo().await;
        repo.seed(DocumentKind::Invoice, 10).await.unwrap();

        assert_eq!(repo.fast_forward(DocumentKind::Invoice, 4).await.unwrap(), 10);
        assert_eq!(repo.fast_forward(DocumentKind::Invoice, 25).await.unwrap(), 25);
    }

    #[tokio::test]
    async fn test_counter_cannot_move_backwards() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.sequences().seed(DocumentKind::Invoice, 10).await.unwrap();

        let err = sqlx::query("UPDATE document_sequences SET next_value = 3 WHERE kind = 'invoice'")
            .execute(db.pool())
            .await
            .map_err(DbError::from)
            .unwrap_err();

        assert!(matches!(err, DbError::ConstraintViolation { .. }));
    }

    #[tokio::test]
    async fn test_list() {
        let repo = repo().await;
        repo.seed(DocumentKind::Quote, 3).await.unwrap();
        repo.seed(DocumentKind::Invoice, 7).await.unwrap();

        let rows = repo.list().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, DocumentKind::Invoice);
        assert_eq!(rows[0].next_value, 7);
        assert_eq!(rows[1].kind, DocumentKind::Quote);
    }
}
