//! # Document Repository
//!
//! Immutable snapshots of saved invoices and quotes.
//!
//! ## Snapshot Pattern
//! The lines and totals are copied into the row at save time. Changing a
//! tax rate later never changes what a historical invoice says; exporters
//! read `DocumentTotals` from here, not from the pricing engine. Rows are
//! insert-only (enforced by triggers).
//!
//! ## Revisions
//! ```text
//! save INV-0042        ──► revision 1
//! edit + save INV-0042 ──► revision 2   (revision 1 is kept as-is)
//! get_by_number        ──► latest revision
//! ```
//!
//! The highest committed `sequence_value` per kind is what the numbering
//! service seeds its counters from on startup.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use billbook_core::validation::validate_line_items;
use billbook_core::{DocumentKind, DocumentSnapshot, DocumentTotals, LineItem};

const SNAPSHOT_COLUMNS: &str = "id, kind, number, sequence_value, revision, \
     subtotal_cents, discount_cents, tax_cents, total_cents, lines_json, created_at";

/// Raw `documents` row.
#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    kind: DocumentKind,
    number: String,
    sequence_value: i64,
    revision: i64,
    subtotal_cents: i64,
    discount_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    lines_json: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for DocumentSnapshot {
    type Error = DbError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let lines: Vec<LineItem> = serde_json::from_str(&row.lines_json)?;

        Ok(DocumentSnapshot {
            id: row.id,
            kind: row.kind,
            number: row.number,
            sequence_value: row.sequence_value,
            revision: row.revision,
            lines,
            totals: DocumentTotals {
                subtotal_cents: row.subtotal_cents,
                discount_cents: row.discount_cents,
                tax_cents: row.tax_cents,
                total_cents: row.total_cents,
            },
            created_at: row.created_at,
        })
    }
}

/// Repository for the `documents` table.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    /// Creates a new DocumentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DocumentRepository { pool }
    }

    /// Stores the first save of a document.
    ///
    /// ## Errors
    /// - `Core` if the lines would not pass save-time validation
    /// - `UniqueViolation` if this number and revision already exist
    /// - `ConstraintViolation` if the totals do not add up
    pub async fn insert_snapshot(&self, snapshot: &DocumentSnapshot) -> DbResult<()> {
        validate_line_items(&snapshot.lines)?;

        debug!(
            id = %snapshot.id,
            kind = %snapshot.kind,
            number = %snapshot.number,
            revision = snapshot.revision,
            total_cents = snapshot.totals.total_cents,
            "Inserting document snapshot"
        );

        let lines_json = serde_json::to_string(&snapshot.lines)?;

        sqlx::query(
            r#"
            INSERT INTO documents (
                id, kind, number, sequence_value, revision,
                subtotal_cents, discount_cents, tax_cents, total_cents,
                lines_json, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11
            )
            "#,
        )
        .bind(&snapshot.id)
        .bind(snapshot.kind)
        .bind(&snapshot.number)
        .bind(snapshot.sequence_value)
        .bind(snapshot.revision)
        .bind(snapshot.totals.subtotal_cents)
        .bind(snapshot.totals.discount_cents)
        .bind(snapshot.totals.tax_cents)
        .bind(snapshot.totals.total_cents)
        .bind(lines_json)
        .bind(snapshot.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.contains("number") => {
                DbError::duplicate("document number", snapshot.number.clone())
            }
            other => other,
        })?;

        Ok(())
    }

    /// Stores an edit of an already saved document as its next revision.
    ///
    /// The revision and `sequence_value` come from the stored document, in
    /// the same statement; whatever `snapshot` carries for them is ignored.
    /// Returns the snapshot as stored.
    ///
    /// ## Errors
    /// - `NotFound` if no document has this kind and number
    /// - `Core` if the lines would not pass save-time validation
    /// - `ConstraintViolation` if the totals do not add up
    pub async fn insert_revision(&self, snapshot: &DocumentSnapshot) -> DbResult<DocumentSnapshot> {
        validate_line_items(&snapshot.lines)?;

        let lines_json = serde_json::to_string(&snapshot.lines)?;

        let stored: Option<(i64, i64)> = sqlx::query_as(
            r#"
            INSERT INTO documents (
                id, kind, number, sequence_value, revision,
                subtotal_cents, discount_cents, tax_cents, total_cents,
                lines_json, created_at
            )
            SELECT
                ?1, ?2, ?3, sequence_value, MAX(revision) + 1,
                ?4, ?5, ?6, ?7,
                ?8, ?9
            FROM documents
            WHERE kind = ?2 AND number = ?3
            GROUP BY kind, number
            RETURNING sequence_value, revision
            "#,
        )
        .bind(&snapshot.id)
        .bind(snapshot.kind)
        .bind(&snapshot.number)
        .bind(snapshot.totals.subtotal_cents)
        .bind(snapshot.totals.discount_cents)
        .bind(snapshot.totals.tax_cents)
        .bind(snapshot.totals.total_cents)
        .bind(lines_json)
        .bind(snapshot.created_at)
        .fetch_optional(&self.pool)
        .await?;

        let (sequence_value, revision) =
            stored.ok_or_else(|| DbError::not_found("document", snapshot.number.clone()))?;

        debug!(
            id = %snapshot.id,
            kind = %snapshot.kind,
            number = %snapshot.number,
            revision,
            "Stored document revision"
        );

        Ok(DocumentSnapshot {
            sequence_value,
            revision,
            ..snapshot.clone()
        })
    }

    /// Gets the latest revision of a document by its display number.
    pub async fn get_by_number(
        &self,
        kind: DocumentKind,
        number: &str,
    ) -> DbResult<Option<DocumentSnapshot>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents WHERE kind = ?1 AND number = ?2 \
             ORDER BY revision DESC LIMIT 1",
            SNAPSHOT_COLUMNS
        ))
        .bind(kind)
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DocumentSnapshot::try_from).transpose()
    }

    /// Every revision of a document, oldest first.
    pub async fn revisions(&self, kind: DocumentKind, number: &str) -> DbResult<Vec<DocumentSnapshot>> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents WHERE kind = ?1 AND number = ?2 ORDER BY revision",
            SNAPSHOT_COLUMNS
        ))
        .bind(kind)
        .bind(number)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DocumentSnapshot::try_from).collect()
    }

    /// Returns the highest committed counter value for a kind, if any.
    pub async fn highest_sequence_value(&self, kind: DocumentKind) -> DbResult<Option<i64>> {
        let highest: Option<i64> =
            sqlx::query_scalar("SELECT MAX(sequence_value) FROM documents WHERE kind = ?1")
                .bind(kind)
                .fetch_one(&self.pool)
                .await?;

        Ok(highest)
    }

    /// Counts saved documents of a kind. Revisions of one document count once.
    pub async fn count(&self, kind: DocumentKind) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE kind = ?1 AND revision = 1")
                .bind(kind)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
