//! # billbook-db: Persistence and Numbering for Billbook
//!
//! Owns the only state in the engine: the per-kind document counters and
//! the immutable snapshots of saved documents. Uses SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Billbook Data Flow                               │
//! │                                                                         │
//! │  Invoice / Quote form            Save workflow                         │
//! │       │ peek_next(kind)                │ commit_number + snapshot       │
//! │       ▼                                ▼                                │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   billbook-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  Numbering    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │  Service      │───►│ Sequence      │    │  (embedded)  │  │   │
//! │  │   │  (cache+lock) │    │ Document      │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │   ┌───────────────┐            │                               │   │
//! │  │   │ EngineConfig  │    ┌───────▼───────┐                       │   │
//! │  │   │ (TOML + env)  │    │   Database    │                       │   │
//! │  │   └───────────────┘    │  (SqlitePool) │                       │   │
//! │  │                        └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL): document_sequences, documents                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`repository`] - Counter and snapshot repositories
//! - [`numbering`] - NumberingService (peek / generate / commit_number)
//! - [`config`] - EngineConfig (file + environment)
//! - [`error`] - Error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use billbook_db::{Database, EngineConfig, NumberingService};
//! use billbook_core::DocumentKind;
//!
//! let config = EngineConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//! let numbering = NumberingService::open(db.sequences(), &db.documents(), config.numbering.clone()).await?;
//!
//! let preview = numbering.peek_next(DocumentKind::Invoice).await?;
//! let number = numbering.commit_number(DocumentKind::Invoice, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod numbering;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::EngineConfig;
pub use error::{DbError, DbResult};
pub use numbering::{NumberingService, ReconciliationReport, SequenceRepair, SequenceStore};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::document::DocumentRepository;
pub use repository::sequence::{SequenceRepository, SequenceRow};
