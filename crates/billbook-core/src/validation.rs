//! # Validation Module
//!
//! Caller-side checks run by the save workflow and the settings screens.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Document form                                                │
//! │  ├── Live totals via the pricing engine (clamps, never fails)          │
//! │  └── Warnings as badges (missing tax rate)                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Save workflow                                                │
//! │  └── THIS MODULE: reject bad lines before a number is committed        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on counters and totals                          │
//! │  └── UNIQUE(kind, number, revision)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use billbook_core::validation::validate_line_items;
//! use billbook_core::types::{LineItem, Quantity};
//!
//! let items = vec![LineItem::new("1", Quantity::units(2), 1000)];
//! assert!(validate_line_items(&items).is_ok());
//! assert!(validate_line_items(&[]).is_err());
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::numbering::{NumberFormat, MAX_NUMBER_WIDTH};
use crate::types::{Discount, LineItem, Quantity, TaxRateTable};
use crate::{BPS_PER_WHOLE, MAX_LINE_ITEMS, QUANTITY_SCALE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Largest quantity on one line, in whole units.
pub const MAX_LINE_QUANTITY: u64 = 1_000_000;

/// Largest unit price, in cents ($10,000,000).
///
/// With [`MAX_LINE_QUANTITY`], a 100% tax rate and [`MAX_LINE_ITEMS`] lines
/// the document total stays below 10^18 cents, well inside i64.
pub const MAX_UNIT_PRICE_CENTS: i64 = 1_000_000_000;

const MAX_LINE_ID_LEN: usize = 64;
const MAX_DESCRIPTION_LEN: usize = 1000;
const MAX_PREFIX_LEN: usize = 16;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a line id.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
pub fn validate_line_id(id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "line id".to_string(),
        });
    }

    if id.len() > MAX_LINE_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "line id".to_string(),
            max: MAX_LINE_ID_LEN,
        });
    }

    Ok(())
}

/// Validates a line description. Empty is allowed.
pub fn validate_description(description: &str) -> ValidationResult<()> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }

    Ok(())
}

/// Validates a line quantity.
///
/// ## Rules
/// - Must be greater than zero
/// - At most [`MAX_LINE_QUANTITY`] units
///
/// ## Example
/// ```rust
/// use billbook_core::types::Quantity;
/// use billbook_core::validation::validate_quantity;
///
/// assert!(validate_quantity(Quantity::from_milli(500)).is_ok());
/// assert!(validate_quantity(Quantity::units(0)).is_err());
/// ```
pub fn validate_quantity(quantity: Quantity) -> ValidationResult<()> {
    if quantity.is_zero() {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity.milli() > MAX_LINE_QUANTITY * QUANTITY_SCALE {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_LINE_QUANTITY as i64,
        });
    }

    Ok(())
}

/// Validates a unit price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
/// - At most [`MAX_UNIT_PRICE_CENTS`]
///
/// ## Example
/// ```rust
/// use billbook_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());  // $10.99
/// assert!(validate_price_cents(0).is_ok());     // Free item
/// assert!(validate_price_cents(-100).is_err()); // Invalid
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_UNIT_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "unit price".to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a discount.
///
/// The pricing engine clamps out-of-range discounts; this rejects them so
/// a saved document never relies on clamping.
pub fn validate_discount(discount: &Discount) -> ValidationResult<()> {
    match *discount {
        Discount::None => Ok(()),
        Discount::Percent { bps } if bps > BPS_PER_WHOLE => Err(ValidationError::OutOfRange {
            field: "percent discount".to_string(),
            min: 0,
            max: 100,
        }),
        Discount::Amount { cents } if cents < 0 => Err(ValidationError::OutOfRange {
            field: "amount discount".to_string(),
            min: 0,
            max: i64::MAX,
        }),
        _ => Ok(()),
    }
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > BPS_PER_WHOLE {
        return Err(ValidationError::OutOfRange {
            field: "tax rate".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// Line Items
// =============================================================================

/// Validates every field of one line item.
pub fn validate_line_item(item: &LineItem) -> ValidationResult<()> {
    validate_line_id(&item.id)?;
    validate_description(&item.description)?;
    validate_quantity(item.quantity)?;
    validate_price_cents(item.unit_price_cents)?;
    validate_discount(&item.discount)?;
    Ok(())
}

/// Validates the lines of a document about to be saved.
///
/// ## Rules
/// - At least one line
/// - At most [`MAX_LINE_ITEMS`] lines
/// - Every line passes [`validate_line_item`]; the first failure is
///   reported with its zero-based index
pub fn validate_line_items(items: &[LineItem]) -> CoreResult<()> {
    if items.is_empty() {
        return Err(CoreError::EmptyDocument);
    }

    if items.len() > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "line items".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        }
        .into());
    }

    for (index, item) in items.iter().enumerate() {
        validate_line_item(item).map_err(|source| CoreError::InvalidLine { index, source })?;
    }

    Ok(())
}

// =============================================================================
// Settings
// =============================================================================

/// Validates every rate in a tax table.
pub fn validate_tax_table(table: &TaxRateTable) -> ValidationResult<()> {
    for (code, rate) in table.iter() {
        validate_tax_rate_bps(rate.bps()).map_err(|_| ValidationError::OutOfRange {
            field: format!("tax rate {}", code),
            min: 0,
            max: 100,
        })?;
    }

    Ok(())
}

/// Validates a display-number format.
///
/// ## Rules
/// - Prefix must not be blank and at most 16 characters
/// - Width between 1 and [`MAX_NUMBER_WIDTH`]
pub fn validate_number_format(format: &NumberFormat) -> ValidationResult<()> {
    if format.prefix.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "number prefix".to_string(),
        });
    }

    if format.prefix.chars().count() > MAX_PREFIX_LEN {
        return Err(ValidationError::TooLong {
            field: "number prefix".to_string(),
            max: MAX_PREFIX_LEN,
        });
    }

    if format.width == 0 || format.width > MAX_NUMBER_WIDTH {
        return Err(ValidationError::OutOfRange {
            field: "number width".to_string(),
            min: 1,
            max: MAX_NUMBER_WIDTH as i64,
        });
    }

    Ok(())
}

/// Validates the invoice and quote formats together.
///
/// Two kinds sharing a prefix would print indistinguishable numbers.
pub fn validate_number_formats(invoice: &NumberFormat, quote: &NumberFormat) -> ValidationResult<()> {
    validate_number_format(invoice)?;
    validate_number_format(quote)?;

    if invoice.prefix == quote.prefix {
        return Err(ValidationError::Duplicate {
            field: "number prefix".to_string(),
            value: invoice.prefix.clone(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
