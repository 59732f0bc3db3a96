//! # billbook-core: Pure Business Logic for Billbook
//!
//! The arithmetic half of the invoicing engine: turning line items into
//! document totals, and turning counter values into display numbers.
//! Everything here is a pure function over plain data.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Billbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Invoice / Quote Form (UI)                    │   │
//! │  │     line edits ──► live totals      save ──► number + snapshot  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ billbook-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │  pricing  │  │ numbering │  │ validation│  │   │
//! │  │   │   Money   │  │ LineTotal │  │ NumberFmt │  │   rules   │  │   │
//! │  │   │ Rounding  │  │ Totals    │  │           │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             billbook-db (counters + snapshots)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (LineItem, TaxCode, Discount, DocumentKind, ...)
//! - [`money`] - Money type with integer arithmetic and one rounding helper
//! - [`pricing`] - Line and document totals
//! - [`deposit`] - Deposit / balance split for quotes
//! - [`numbering`] - Display-number formatting
//! - [`error`] - Domain error types
//! - [`validation`] - Caller-side validation before pricing
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, no clock, no randomness
//! 2. **Integer Money**: all monetary values are cents (i64)
//! 3. **Round per line**: each row is rounded once, totals are plain sums
//! 4. **Clamp, don't fail**: pricing never errors; validation is the caller's job
//!
//! ## Example Usage
//!
//! ```rust
//! use billbook_core::pricing::compute_document_totals;
//! use billbook_core::types::{Discount, LineItem, Quantity, TaxCode, TaxRateTable};
//!
//! let items = vec![LineItem::new("1", Quantity::units(2), 1000)
//!     .with_discount(Discount::None)
//!     .with_tax_code(TaxCode::Gst)];
//!
//! let totals = compute_document_totals(&items, &TaxRateTable::standard());
//! assert_eq!(totals.subtotal_cents, 2000);
//! assert_eq!(totals.tax_cents, 200);
//! assert_eq!(totals.total_cents, 2200);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod deposit;
pub mod error;
pub mod money;
pub mod numbering;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use deposit::{apply_deposit, DepositSpec, DepositSplit};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, RoundingMode};
pub use numbering::{NumberFormat, NumberFormats};
pub use pricing::{
    compute_document_totals, compute_line_total, price_document, DocumentTotals, LineTotal,
    PricedDocument, PricingEngine, PricingWarning, TaxStatus,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Basis points in 100%.
pub const BPS_PER_WHOLE: u32 = 10_000;

/// Quantities are stored in thousandths of a unit.
pub const QUANTITY_SCALE: u64 = 1_000;

/// Maximum line items accepted on one document by [`validation`].
pub const MAX_LINE_ITEMS: usize = 500;
