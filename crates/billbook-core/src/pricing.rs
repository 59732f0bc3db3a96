//! # Pricing Engine
//!
//! Turns line items and a tax table into line totals and document totals.
//!
//! ## Per-Line Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        compute_line_total                               │
//! │                                                                         │
//! │  quantity × unit_price ──round──► base                                 │
//! │                                     │                                   │
//! │  discount (percent ──round──► / amount ──clamp──►) ──► discount         │
//! │                                     │                                   │
//! │                        max(0, base − discount) ──► net                  │
//! │                                     │                                   │
//! │  tax_code ──table──► rate    net × rate ──round──► tax                  │
//! │                                     │                                   │
//! │                              net + tax ──► line total                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rounding happens per line, with one mode for the whole document.
//! Document totals are plain integer sums of the rounded line figures, so
//! the rows shown on an invoice always add up to its total.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::deposit::{DepositSpec, DepositSplit};
use crate::money::{Money, RoundingMode};
use crate::types::{LineItem, TaxRateTable, TaxResolution};
use crate::QUANTITY_SCALE;

// =============================================================================
// Line Total
// =============================================================================

/// How a line's tax code was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaxStatus {
    /// A configured rate was applied (possibly 0%).
    Applied,
    /// The line is untaxed (`NONE` with no table entry).
    Exempt,
    /// The tax code has no configured rate; priced at 0%.
    MissingRate,
}

/// The computed figures for one line, all in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineTotal {
    /// Id of the line item these figures belong to.
    pub line_id: String,
    /// `round(quantity × unit price)`.
    pub base_cents: i64,
    /// Resolved discount, within `[0, base]`.
    pub discount_cents: i64,
    /// `base − discount`, never negative.
    pub net_cents: i64,
    /// `round(net × rate)`.
    pub tax_cents: i64,
    /// `net + tax`.
    pub total_cents: i64,
    /// Rate actually applied.
    pub tax_rate_bps: u32,
    pub tax_status: TaxStatus,
}

// =============================================================================
// Document Totals
// =============================================================================

/// Aggregate totals for an invoice or quote.
///
/// ## Invariants
/// - `total_cents == subtotal_cents - discount_cents + tax_cents`
/// - `0 <= discount_cents <= subtotal_cents`, `total_cents >= 0`
/// - Derived from the lines; once saved it is an immutable snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentTotals {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl DocumentTotals {
    /// All-zero totals (an empty document).
    pub const fn zero() -> Self {
        DocumentTotals {
            subtotal_cents: 0,
            discount_cents: 0,
            tax_cents: 0,
            total_cents: 0,
        }
    }

    /// Folds one line into the aggregate.
    ///
    /// Sums saturate at `i64::MAX`; validated documents never get there.
    pub fn add_line(&mut self, line: &LineTotal) {
        self.subtotal_cents = self.subtotal_cents.saturating_add(line.base_cents);
        self.discount_cents = self.discount_cents.saturating_add(line.discount_cents);
        self.tax_cents = self.tax_cents.saturating_add(line.tax_cents);
        self.total_cents = self.net_cents().saturating_add(self.tax_cents);
    }

    /// Subtotal after discounts, before tax.
    #[inline]
    pub const fn net_cents(&self) -> i64 {
        self.subtotal_cents.saturating_sub(self.discount_cents)
    }

    /// Returns the total as Money.
    #[inline]
    pub const fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Warnings
// =============================================================================

/// Non-fatal pricing findings the form shows as a badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingWarning {
    /// A line's tax code is not in the tax table; it was taxed at 0%.
    MissingTaxRate { line_id: String, tax_code: String },
}

impl fmt::Display for PricingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingWarning::MissingTaxRate { line_id, tax_code } => write!(
                f,
                "No tax rate configured for code {} (line {})",
                tax_code, line_id
            ),
        }
    }
}

/// Line totals, document totals and warnings from one pricing pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedDocument {
    pub lines: Vec<LineTotal>,
    pub totals: DocumentTotals,
    pub warnings: Vec<PricingWarning>,
}

impl PricedDocument {
    /// Returns true if any line needs the user's attention.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

// =============================================================================
// Pricing Engine
// =============================================================================

/// Stateless pricing with a single rounding mode.
///
/// Holding the mode in one value is what keeps every line of a document on
/// the same rounding rule. `PricingEngine::default()` rounds half-up.
///
/// ## Example
/// ```rust
/// use billbook_core::pricing::PricingEngine;
/// use billbook_core::money::RoundingMode;
/// use billbook_core::types::{LineItem, Quantity, TaxCode, TaxRate, TaxRateTable};
///
/// let table = TaxRateTable::new().with_rate("HST", TaxRate::from_bps(825));
/// let item = LineItem::new("1", Quantity::units(1), 1000).with_tax_code("HST");
///
/// assert_eq!(PricingEngine::default().line_total(&item, &table).tax_cents, 83);
/// assert_eq!(PricingEngine::new(RoundingMode::HalfEven).line_total(&item, &table).tax_cents, 82);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PricingEngine {
    rounding: RoundingMode,
}

impl PricingEngine {
    /// Creates an engine using `rounding` for every step.
    pub const fn new(rounding: RoundingMode) -> Self {
        PricingEngine { rounding }
    }

    /// The engine's rounding mode.
    pub const fn rounding(&self) -> RoundingMode {
        self.rounding
    }

    /// Computes one line's base, discount, net, tax and total.
    ///
    /// Never fails: a negative unit price is treated as zero, discounts are
    /// clamped to the base, and an unknown tax code is taxed at 0% with
    /// `TaxStatus::MissingRate`.
    pub fn line_total(&self, item: &LineItem, table: &TaxRateTable) -> LineTotal {
        let unit_price = item.unit_price().non_negative();

        let base = unit_price.mul_ratio(
            item.quantity.milli() as i128,
            QUANTITY_SCALE as i128,
            self.rounding,
        );
        let discount = item.discount.amount_off(base, self.rounding);
        let net = (base - discount).non_negative();

        let resolution = table.resolve(&item.tax_code);
        let rate = resolution.rate();
        let tax = net.calculate_tax(rate, self.rounding);

        let tax_status = match resolution {
            TaxResolution::Rate(_) => TaxStatus::Applied,
            TaxResolution::Exempt => TaxStatus::Exempt,
            TaxResolution::Missing(_) => TaxStatus::MissingRate,
        };

        LineTotal {
            line_id: item.id.clone(),
            base_cents: base.cents(),
            discount_cents: discount.cents(),
            net_cents: net.cents(),
            tax_cents: tax.cents(),
            total_cents: (net + tax).cents(),
            tax_rate_bps: rate.bps(),
            tax_status,
        }
    }

    /// Sums line totals into document totals. Empty input gives all zeros.
    pub fn document_totals(&self, items: &[LineItem], table: &TaxRateTable) -> DocumentTotals {
        items
            .iter()
            .fold(DocumentTotals::zero(), |mut totals, item| {
                totals.add_line(&self.line_total(item, table));
                totals
            })
    }

    /// Prices a document and collects per-line figures and warnings.
    pub fn price_document(&self, items: &[LineItem], table: &TaxRateTable) -> PricedDocument {
        let mut totals = DocumentTotals::zero();
        let mut lines = Vec::with_capacity(items.len());
        let mut warnings = Vec::new();

        for item in items {
            let line = self.line_total(item, table);
            totals.add_line(&line);

            if line.tax_status == TaxStatus::MissingRate {
                let warning = PricingWarning::MissingTaxRate {
                    line_id: item.id.clone(),
                    tax_code: item.tax_code.to_string(),
                };
                if !warnings.contains(&warning) {
                    warnings.push(warning);
                }
            }

            lines.push(line);
        }

        PricedDocument {
            lines,
            totals,
            warnings,
        }
    }

    /// Splits a quote total into deposit and balance with this engine's
    /// rounding mode. See [`crate::deposit`].
    pub fn apply_deposit(&self, total_cents: i64, spec: DepositSpec) -> DepositSplit {
        crate::deposit::apply_deposit_with(total_cents, spec, self.rounding)
    }
}

// =============================================================================
// Free Functions (default half-up engine)
// =============================================================================

/// Computes one line's totals with half-up rounding.
pub fn compute_line_total(item: &LineItem, table: &TaxRateTable) -> LineTotal {
    PricingEngine::default().line_total(item, table)
}

/// Computes document totals with half-up rounding.
pub fn compute_document_totals(items: &[LineItem], table: &TaxRateTable) -> DocumentTotals {
    PricingEngine::default().document_totals(items, table)
}

/// Prices a document with half-up rounding, returning lines and warnings.
pub fn price_document(items: &[LineItem], table: &TaxRateTable) -> PricedDocument {
    PricingEngine::default().price_document(items, table)
}

// =============================================================================
// Unit Tests
// =============================================================================
