//! # Domain Types
//!
//! Core domain types shared by the pricing engine, the numbering service
//! and the invoice form.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    LineItem     │   │    Discount     │   │    TaxCode      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UI only)   │──►│  None           │   │  None           │       │
//! │  │  quantity       │   │  Percent{bps}   │   │  Gst            │       │
//! │  │  unit_price     │   │  Amount{cents}  │   │  Other("VAT20") │       │
//! │  │  discount       │   └─────────────────┘   └────────┬────────┘       │
//! │  │  tax_code ──────┼──────────────────────────────────┘                │
//! │  └─────────────────┘                                  │ resolve         │
//! │                                                       ▼                 │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  DocumentKind   │   │    Quantity     │   │  TaxRateTable   │       │
//! │  │  Invoice        │   │  thousandths    │   │  code → bps     │       │
//! │  │  Quote          │   │  1500 = 1.5     │   │  GST → 1000     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};
use crate::money::{round_ratio, Money, RoundingMode};
use crate::pricing::DocumentTotals;
use crate::{BPS_PER_WHOLE, QUANTITY_SCALE};

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1000 bps = 10% (GST) and 825 bps = 8.25%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a whole percentage (`10` = 10%).
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        TaxRate(pct.saturating_mul(100))
    }

    /// Creates a tax rate from a fractional percentage (configuration input).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round().max(0.0) as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Tax Code
// =============================================================================

/// Key selecting which rate applies to a line.
///
/// Serialized as its upper-case code string (`"NONE"`, `"GST"`, `"VAT20"`).
/// Parsing is case-insensitive and an empty string means `None`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaxCode {
    /// Not taxable.
    #[default]
    None,
    /// Goods and services tax.
    Gst,
    /// Any jurisdiction-specific code, stored upper-case.
    Other(String),
}

impl TaxCode {
    /// Returns the canonical code string.
    pub fn as_str(&self) -> &str {
        match self {
            TaxCode::None => "NONE",
            TaxCode::Gst => "GST",
            TaxCode::Other(code) => code,
        }
    }
}

impl From<&str> for TaxCode {
    fn from(code: &str) -> Self {
        let code = code.trim().to_uppercase();
        match code.as_str() {
            "" | "NONE" => TaxCode::None,
            "GST" => TaxCode::Gst,
            _ => TaxCode::Other(code),
        }
    }
}

impl From<String> for TaxCode {
    fn from(code: String) -> Self {
        TaxCode::from(code.as_str())
    }
}

impl From<TaxCode> for String {
    fn from(code: TaxCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for TaxCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Tax Rate Table
// =============================================================================

/// Outcome of looking a tax code up in a [`TaxRateTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxResolution {
    /// The table has a rate for the code.
    Rate(TaxRate),
    /// `TaxCode::None` with no explicit table entry: untaxed by design.
    Exempt,
    /// The code is not configured. Priced at zero; the caller must warn.
    Missing(TaxCode),
}

impl TaxResolution {
    /// The rate to apply (zero for `Exempt` and `Missing`).
    pub fn rate(&self) -> TaxRate {
        match self {
            TaxResolution::Rate(rate) => *rate,
            TaxResolution::Exempt | TaxResolution::Missing(_) => TaxRate::zero(),
        }
    }

    /// Returns true when the code was absent from the table.
    pub fn is_missing(&self) -> bool {
        matches!(self, TaxResolution::Missing(_))
    }
}

/// Mapping of tax code to rate, owned by the tax settings screen.
///
/// The pricing engine only reads it. Serialized as a JSON object of
/// `code → bps`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRateTable {
    rates: BTreeMap<TaxCode, TaxRate>,
}

impl TaxRateTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in defaults: `NONE → 0%`, `GST → 10%`.
    pub fn standard() -> Self {
        Self::new()
            .with_rate(TaxCode::None, TaxRate::zero())
            .with_rate(TaxCode::Gst, TaxRate::from_percent(10))
    }

    /// Builder-style insert.
    pub fn with_rate(mut self, code: impl Into<TaxCode>, rate: TaxRate) -> Self {
        self.insert(code, rate);
        self
    }

    /// Inserts or replaces a rate.
    pub fn insert(&mut self, code: impl Into<TaxCode>, rate: TaxRate) {
        self.rates.insert(code.into(), rate);
    }

    /// Looks up the configured rate for a code.
    pub fn get(&self, code: &TaxCode) -> Option<TaxRate> {
        self.rates.get(code).copied()
    }

    /// Resolves a code to a rate, failing open.
    ///
    /// ## Resolution Order
    /// 1. An explicit entry wins (even for `NONE`)
    /// 2. `TaxCode::None` without an entry is `Exempt`
    /// 3. Anything else is `Missing` (rate 0, warning surfaced by the caller)
    pub fn resolve(&self, code: &TaxCode) -> TaxResolution {
        match (self.get(code), code) {
            (Some(rate), _) => TaxResolution::Rate(rate),
            (None, TaxCode::None) => TaxResolution::Exempt,
            (None, other) => TaxResolution::Missing(other.clone()),
        }
    }

    /// Iterates codes and rates in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&TaxCode, &TaxRate)> {
        self.rates.iter()
    }

    /// Number of configured codes.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Returns true if no codes are configured.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl FromIterator<(TaxCode, TaxRate)> for TaxRateTable {
    fn from_iter<I: IntoIterator<Item = (TaxCode, TaxRate)>>(iter: I) -> Self {
        TaxRateTable {
            rates: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// A non-negative quantity in thousandths of a unit.
///
/// `Quantity::units(2)` is two units, `Quantity::from_milli(1500)` is 1.5
/// (hours, kilograms, ...). Non-negativity is enforced by the `u64` storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Quantity(u64);

impl Quantity {
    /// Whole units.
    #[inline]
    pub const fn units(units: u64) -> Self {
        Quantity(units.saturating_mul(QUANTITY_SCALE))
    }

    /// Thousandths of a unit.
    #[inline]
    pub const fn from_milli(milli: u64) -> Self {
        Quantity(milli)
    }

    /// Returns the quantity in thousandths.
    #[inline]
    pub const fn milli(&self) -> u64 {
        self.0
    }

    /// Checks if the quantity is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parses a decimal quantity typed into the form (`"2"`, `"1.5"`).
    ///
    /// Digits beyond the third decimal place round half-up.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::types::Quantity;
    ///
    /// assert_eq!(Quantity::parse("1.5").unwrap().milli(), 1500);
    /// assert_eq!(Quantity::parse("0.0005").unwrap().milli(), 1);
    /// assert!(Quantity::parse("-1").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Quantity, ValidationError> {
        let trimmed = input.trim();
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "quantity".to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(ValidationError::Required {
                field: "quantity".to_string(),
            });
        }
        if trimmed.starts_with('-') {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }

        let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        if (whole.is_empty() && fraction.is_empty())
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("must be a plain decimal number like 1.5"));
        }
        if whole.len() > 15 || fraction.len() > 18 {
            return Err(invalid("too many digits"));
        }

        let whole_value: i128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("out of range"))?
        };
        let fraction_value: i128 = if fraction.is_empty() {
            0
        } else {
            fraction.parse().map_err(|_| invalid("out of range"))?
        };
        let scale = 10i128.pow(fraction.len() as u32);

        let milli = round_ratio(
            (whole_value * scale + fraction_value) * QUANTITY_SCALE as i128,
            scale,
            RoundingMode::HalfUp,
        );

        u64::try_from(milli)
            .map(Quantity)
            .map_err(|_| invalid("out of range"))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / QUANTITY_SCALE;
        let fraction = self.0 % QUANTITY_SCALE;
        if fraction == 0 {
            write!(f, "{}", whole)
        } else {
            let digits = format!("{:03}", fraction);
            write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
        }
    }
}

// =============================================================================
// Discount
// =============================================================================

/// A per-line discount.
///
/// ## Clamping
/// - `Percent` is clamped to `[0, 10000]` bps when applied
/// - `Amount` is clamped to `[0, base]` when applied
///
/// Neither can drive a line's net below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discount {
    /// No discount.
    #[default]
    None,
    /// Percentage of the line's base, in basis points (1000 = 10%).
    Percent { bps: u32 },
    /// Fixed amount off the line, in cents.
    Amount { cents: i64 },
}

impl Discount {
    /// Whole-percent discount (`Discount::percent(10)` = 10% off).
    pub const fn percent(pct: u32) -> Self {
        Discount::Percent {
            bps: pct.saturating_mul(100),
        }
    }

    /// Percent discount in basis points.
    pub const fn percent_bps(bps: u32) -> Self {
        Discount::Percent { bps }
    }

    /// Fixed discount in cents.
    pub const fn amount(cents: i64) -> Self {
        Discount::Amount { cents }
    }

    /// Resolves the discount against a line base, clamped to `[0, base]`.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::money::{Money, RoundingMode};
    /// use billbook_core::types::Discount;
    ///
    /// let base = Money::from_cents(500);
    /// let off = Discount::amount(1000).amount_off(base, RoundingMode::HalfUp);
    /// assert_eq!(off.cents(), 500);
    /// ```
    pub fn amount_off(&self, base: Money, mode: RoundingMode) -> Money {
        let base = base.non_negative();
        match *self {
            Discount::None => Money::zero(),
            Discount::Percent { bps } => base.percentage(bps.min(BPS_PER_WHOLE), mode),
            Discount::Amount { cents } => Money::from_cents(cents.clamp(0, base.cents())),
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One billable row on an invoice or quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    /// Stable id for UI diffing (not an accounting identity).
    pub id: String,

    /// Free-text description shown on the document.
    #[serde(default)]
    pub description: String,

    /// Quantity in thousandths of a unit.
    #[serde(rename = "quantity_milli")]
    pub quantity: Quantity,

    /// Price of one unit in cents.
    pub unit_price_cents: i64,

    /// Per-line discount.
    #[serde(default)]
    pub discount: Discount,

    /// Tax code resolved against the document's tax table.
    #[serde(default)]
    #[ts(as = "String")]
    pub tax_code: TaxCode,
}

impl LineItem {
    /// Creates an undiscounted, untaxed line.
    pub fn new(id: impl Into<String>, quantity: Quantity, unit_price_cents: i64) -> Self {
        LineItem {
            id: id.into(),
            description: String::new(),
            quantity,
            unit_price_cents,
            discount: Discount::None,
            tax_code: TaxCode::None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the discount.
    pub fn with_discount(mut self, discount: Discount) -> Self {
        self.discount = discount;
        self
    }

    /// Sets the tax code.
    pub fn with_tax_code(mut self, tax_code: impl Into<TaxCode>) -> Self {
        self.tax_code = tax_code.into();
        self
    }

    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

// =============================================================================
// Document Kind
// =============================================================================

/// The document types that carry their own number sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// A bill sent to a client.
    Invoice,
    /// An offer that may later become an invoice.
    Quote,
}

impl DocumentKind {
    /// Every kind, in a stable order.
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Invoice, DocumentKind::Quote];

    /// Lower-case name as stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoice",
            DocumentKind::Quote => "quote",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "invoice" | "inv" => Ok(DocumentKind::Invoice),
            "quote" | "quo" | "estimate" => Ok(DocumentKind::Quote),
            other => Err(CoreError::UnknownDocumentKind(other.to_string())),
        }
    }
}

// =============================================================================
// Document Snapshot
// =============================================================================

/// A saved document's lines and totals, frozen at save time.
///
/// Totals on a historical invoice are never recomputed from a tax table
/// that may since have changed; this is what exporters read. Editing a
/// saved document stores a new revision under the same number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentSnapshot {
    pub id: String,
    pub kind: DocumentKind,
    /// Display number, e.g. `INV-0042`.
    pub number: String,
    /// Counter value the number was generated from.
    pub sequence_value: i64,
    /// 1 for the first save, +1 for every edit.
    #[serde(default = "first_revision")]
    pub revision: i64,
    pub lines: Vec<LineItem>,
    pub totals: DocumentTotals,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

fn first_revision() -> i64 {
    1
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_constructors() {
        assert_eq!(TaxRate::from_percent(10).bps(), 1000);
        assert_eq!(TaxRate::from_percentage(8.25).bps(), 825);
        assert!((TaxRate::from_bps(825).percentage() - 8.25).abs() < 0.001);
        assert!(TaxRate::default().is_zero());
    }

    #[test]
    fn test_tax_code_parsing() {
        assert_eq!(TaxCode::from("gst"), TaxCode::Gst);
        assert_eq!(TaxCode::from(""), TaxCode::None);
        assert_eq!(TaxCode::from(" none "), TaxCode::None);
        assert_eq!(TaxCode::from("vat20"), TaxCode::Other("VAT20".to_string()));
        assert_eq!(TaxCode::Other("VAT20".to_string()).to_string(), "VAT20");
    }

    #[test]
    fn test_tax_code_serde_as_string() {
        let json = serde_json::to_string(&TaxCode::Gst).unwrap();
        assert_eq!(json, "\"GST\"");

        let code: TaxCode = serde_json::from_str("\"hst\"").unwrap();
        assert_eq!(code, TaxCode::Other("HST".to_string()));
    }

    #[test]
    fn test_tax_table_resolution() {
        let table = TaxRateTable::standard();

        assert_eq!(table.resolve(&TaxCode::Gst), TaxResolution::Rate(TaxRate::from_bps(1000)));
        assert_eq!(table.resolve(&TaxCode::None), TaxResolution::Rate(TaxRate::zero()));

        let missing = table.resolve(&TaxCode::from("PST"));
        assert!(missing.is_missing());
        assert!(missing.rate().is_zero());

        assert_eq!(TaxRateTable::new().resolve(&TaxCode::None), TaxResolution::Exempt);
    }

    #[test]
    fn test_tax_table_json_shape() {
        let table = TaxRateTable::standard();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"NONE":0,"GST":1000}"#);

        let back: TaxRateTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_quantity_parse_and_display() {
        assert_eq!(Quantity::parse("2").unwrap(), Quantity::units(2));
        assert_eq!(Quantity::parse("1.25").unwrap().milli(), 1250);
        assert_eq!(Quantity::parse(".5").unwrap().milli(), 500);
        assert!(Quantity::parse("").is_err());
        assert!(Quantity::parse("1.2.3").is_err());
        assert!(Quantity::parse("-0.5").is_err());

        assert_eq!(Quantity::units(3).to_string(), "3");
        assert_eq!(Quantity::from_milli(1500).to_string(), "1.5");
        assert_eq!(Quantity::from_milli(1005).to_string(), "1.005");
    }

    #[test]
    fn test_discount_clamping() {
        let base = Money::from_cents(500);
        let mode = RoundingMode::HalfUp;

        assert_eq!(Discount::None.amount_off(base, mode), Money::zero());
        assert_eq!(Discount::percent(10).amount_off(base, mode).cents(), 50);
        assert_eq!(Discount::percent(250).amount_off(base, mode).cents(), 500);
        assert_eq!(Discount::amount(1000).amount_off(base, mode).cents(), 500);
        assert_eq!(Discount::amount(-20).amount_off(base, mode).cents(), 0);
    }

    #[test]
    fn test_discount_serde_shape() {
        let json = serde_json::to_string(&Discount::percent(10)).unwrap();
        assert_eq!(json, r#"{"kind":"percent","bps":1000}"#);

        let none: Discount = serde_json::from_str(r#"{"kind":"none"}"#).unwrap();
        assert_eq!(none, Discount::None);
    }

    #[test]
    fn test_line_item_defaults_from_json() {
        let item: LineItem = serde_json::from_str(
            r#"{"id":"a","quantity_milli":2000,"unit_price_cents":1000}"#,
        )
        .unwrap();

        assert_eq!(item.quantity, Quantity::units(2));
        assert_eq!(item.discount, Discount::None);
        assert_eq!(item.tax_code, TaxCode::None);
    }

    #[test]
    fn test_document_kind_parse() {
        assert_eq!("Invoice".parse::<DocumentKind>().unwrap(), DocumentKind::Invoice);
        assert_eq!("quote".parse::<DocumentKind>().unwrap(), DocumentKind::Quote);
        assert!(matches!(
            "receipt".parse::<DocumentKind>(),
            Err(CoreError::UnknownDocumentKind(_))
        ));
        assert_eq!(DocumentKind::Quote.to_string(), "quote");
    }
}
