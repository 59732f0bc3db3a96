//! # Document Numbering Service
//!
//! Hands out unique, increasing display numbers per document kind.
//!
//! ## Peek vs. Generate
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Form opens / re-renders        Save pressed (new document)            │
//! │       │                               │                                 │
//! │       ▼                               ▼                                 │
//! │  peek_next(kind)                 generate(kind)                         │
//! │  ├── lock cache                  ├── lock cache (owned guard)           │
//! │  ├── stale? reload from store    ├── tokio::spawn ─────────────────┐    │
//! │  └── format(next) ─► "INV-0042"  │   store.advance(kind)           │    │
//! │      (nothing changes)           │   ├── Ok(42): cache = 43        │    │
//! │                                  │   └── Err: cache stale, warn    │    │
//! │                                  │◄────────────────────────────────┘    │
//! │                                  └── format(42) ─► "INV-0042"           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - The store is the ground truth; the in-memory cache only serves peeks
//! - `generate` returns a number only after the store has committed it
//! - Dropping a `generate` future never cancels a reservation in flight:
//!   the worst case is a gap, never a duplicate
//! - Counters are seeded past every committed snapshot on startup

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::document::DocumentRepository;
use crate::repository::sequence::SequenceRepository;
use billbook_core::{DocumentKind, NumberFormats};

// =============================================================================
// Storage Seam
// =============================================================================

/// Durable counter storage.
///
/// Implemented by [`SequenceRepository`]; every method must be atomic on
/// its own.
#[async_trait]
pub trait SequenceStore: Send + Sync + 'static {
    /// Stored next value, or `None` if the kind has no row.
    async fn load(&self, kind: DocumentKind) -> DbResult<Option<i64>>;

    /// Creates the row with `next_value` if absent; returns the stored value.
    async fn seed(&self, kind: DocumentKind, next_value: i64) -> DbResult<i64>;

    /// Reserves the current value, advances by one, returns the reserved value.
    async fn advance(&self, kind: DocumentKind) -> DbResult<i64>;

    /// Raises the counter to at least `min_next`; returns the new value.
    async fn fast_forward(&self, kind: DocumentKind, min_next: i64) -> DbResult<i64>;
}

// =============================================================================
// Reconciliation
// =============================================================================

/// A counter that was found at or behind committed documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceRepair {
    pub kind: DocumentKind,
    /// Counter value found in storage.
    pub stored_next: i64,
    /// Highest `sequence_value` among saved snapshots.
    pub highest_committed: i64,
    /// Counter value after fast-forwarding.
    pub repaired_next: i64,
}

/// What startup seeding found and fixed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    /// Kinds whose counter row did not exist and was created.
    pub seeded: Vec<DocumentKind>,
    /// Counters that would have re-issued a committed number.
    pub repairs: Vec<SequenceRepair>,
}

impl ReconciliationReport {
    /// Returns true if no counter had to be moved.
    pub fn is_clean(&self) -> bool {
        self.repairs.is_empty()
    }
}

// =============================================================================
// Numbering Service
// =============================================================================

/// Cached `next_value` per kind. A missing entry means "reload from store".
type CounterCache = HashMap<DocumentKind, i64>;

/// Stateful per-kind counter service.
///
/// Cheap to clone; clones share the cache and the store.
///
/// ## Example
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("billbook.db")).await?;
/// let numbering = NumberingService::open(db.sequences(), &db.documents(), NumberFormats::default()).await?;
///
/// let preview = numbering.peek_next(DocumentKind::Invoice).await?;  // "INV-0001"
/// let number = numbering.generate(DocumentKind::Invoice).await?;    // "INV-0001"
/// ```
#[derive(Debug)]
pub struct NumberingService<S: SequenceStore = SequenceRepository> {
    store: Arc<S>,
    formats: NumberFormats,
    cache: Arc<Mutex<CounterCache>>,
    startup_report: ReconciliationReport,
}

impl<S: SequenceStore> Clone for NumberingService<S> {
    fn clone(&self) -> Self {
        NumberingService {
            store: Arc::clone(&self.store),
            formats: self.formats.clone(),
            cache: Arc::clone(&self.cache),
            startup_report: self.startup_report.clone(),
        }
    }
}

impl<S: SequenceStore> NumberingService<S> {
    /// Opens the service: seeds missing counters and repairs lagging ones.
    ///
    /// ## Seeding
    /// For each kind, `floor = highest committed sequence_value + 1` (or 1):
    /// - no counter row: create it at `floor`
    /// - counter below `floor`: warn, fast-forward to `floor`, report it
    /// - otherwise: use the stored counter as-is
    ///
    /// Saved documents are never renumbered.
    pub async fn open(
        store: S,
        documents: &DocumentRepository,
        formats: NumberFormats,
    ) -> DbResult<Self> {
        formats
            .validate()
            .map_err(|e| DbError::InvalidConfig(e.to_string()))?;

        let mut service = NumberingService {
            store: Arc::new(store),
            formats,
            cache: Arc::new(Mutex::new(CounterCache::new())),
            startup_report: ReconciliationReport::default(),
        };

        let report = service.reconcile(documents).await?;
        if !report.is_clean() {
            warn!(
                repairs = report.repairs.len(),
                "Document counters were behind saved documents and have been advanced"
            );
        }
        service.startup_report = report;

        info!("Numbering service ready");
        Ok(service)
    }

    /// Re-runs startup seeding against the current snapshots.
    pub async fn reconcile(&self, documents: &DocumentRepository) -> DbResult<ReconciliationReport> {
        let mut cache = self.cache.lock().await;
        let mut report = ReconciliationReport::default();

        for kind in DocumentKind::ALL {
            let highest = documents.highest_sequence_value(kind).await?;
            let floor = highest.map_or(1, |v| v + 1);

            let next = match self.store.load(kind).await? {
                None => {
                    let next = self.store.seed(kind, floor).await?;
                    info!(kind = %kind, next_value = next, "Seeded document counter");
                    report.seeded.push(kind);
                    next
                }
                Some(stored) if stored < floor => {
                    warn!(
                        kind = %kind,
                        stored_next = stored,
                        highest_committed = floor - 1,
                        "Document counter is behind saved documents, advancing"
                    );
                    let next = self.store.fast_forward(kind, floor).await?;
                    report.repairs.push(SequenceRepair {
                        kind,
                        stored_next: stored,
                        highest_committed: floor - 1,
                        repaired_next: next,
                    });
                    next
                }
                Some(stored) => stored,
            };

            debug!(kind = %kind, next_value = next, "Counter loaded");
            cache.insert(kind, next);
        }

        Ok(report)
    }

    /// What [`open`](Self::open) found on startup.
    pub fn startup_report(&self) -> &ReconciliationReport {
        &self.startup_report
    }

    /// The configured display formats.
    pub fn formats(&self) -> &NumberFormats {
        &self.formats
    }

    /// Next counter value for `kind`, without reserving it.
    ///
    /// Reloads from storage if the cache was invalidated by a failure.
    pub async fn peek_value(&self, kind: DocumentKind) -> DbResult<i64> {
        let mut cache = self.cache.lock().await;

        if let Some(next) = cache.get(&kind) {
            return Ok(*next);
        }

        let next = self
            .store
            .load(kind)
            .await?
            .ok_or_else(|| DbError::SequenceMissing {
                kind: kind.to_string(),
            })?;

        debug!(kind = %kind, next_value = next, "Reloaded stale counter from storage");
        cache.insert(kind, next);
        Ok(next)
    }

    /// The number the next `generate(kind)` will return.
    ///
    /// Read-only: calling it any number of times changes nothing.
    pub async fn peek_next(&self, kind: DocumentKind) -> DbResult<String> {
        let next = self.peek_value(kind).await?;
        Ok(self.formats.get(kind).format(next))
    }

    /// Reserves and returns the next number for `kind`.
    ///
    /// ## Atomicity
    /// The reservation runs in its own task holding the cache lock, so it
    /// completes even if the caller stops waiting. The number is returned
    /// only after the store has committed the increment.
    ///
    /// ## Errors
    /// On a storage failure no number is returned, the cached value is
    /// dropped and the next peek reloads from storage.
    pub async fn generate(&self, kind: DocumentKind) -> DbResult<String> {
        let mut cache = Arc::clone(&self.cache).lock_owned().await;
        let store = Arc::clone(&self.store);

        let reservation = tokio::spawn(async move {
            match store.advance(kind).await {
                Ok(reserved) => {
                    cache.insert(kind, reserved + 1);
                    Ok(reserved)
                }
                Err(err) => {
                    cache.remove(&kind);
                    warn!(kind = %kind, error = %err, "Failed to reserve document number");
                    Err(err)
                }
            }
        });

        let reserved = reservation.await??;
        let number = self.formats.get(kind).format(reserved);

        info!(kind = %kind, number = %number, sequence_value = reserved, "Reserved document number");
        Ok(number)
    }

    /// Number to save a document under.
    ///
    /// Editing a document keeps the number it already has; only a new
    /// document (`existing` is `None` or blank) reserves one.
    pub async fn commit_number(&self, kind: DocumentKind, existing: Option<&str>) -> DbResult<String> {
        match existing.map(str::trim).filter(|n| !n.is_empty()) {
            Some(number) => {
                debug!(kind = %kind, number = %number, "Keeping existing document number");
                Ok(number.to_string())
            }
            None => self.generate(kind).await,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
