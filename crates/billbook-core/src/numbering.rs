//! # Display Numbers
//!
//! Pure formatting between a counter value and the number printed on a
//! document. The stateful counter lives in `billbook-db`.
//!
//! ```text
//!   counter 42 ──format──► "INV-0042" ──parse──► 42
//!   counter 12345 ─────► "INV-12345"   (never truncated)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::DocumentKind;

/// Widest zero-padding a format may ask for.
pub const MAX_NUMBER_WIDTH: usize = 12;

/// Prefix plus zero-padded counter, e.g. `INV-` + 4 ⇒ `INV-0042`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NumberFormat {
    pub prefix: String,
    /// Minimum digit count; longer values are printed in full.
    pub width: usize,
}

impl NumberFormat {
    /// Creates a format, rejecting an empty prefix or an unusable width.
    pub fn new(prefix: impl Into<String>, width: usize) -> Result<Self, ValidationError> {
        let format = NumberFormat {
            prefix: prefix.into(),
            width,
        };
        crate::validation::validate_number_format(&format)?;
        Ok(format)
    }

    /// `INV-` with four digits.
    pub fn invoice_default() -> Self {
        NumberFormat {
            prefix: "INV-".to_string(),
            width: 4,
        }
    }

    /// `QUO-` with four digits.
    pub fn quote_default() -> Self {
        NumberFormat {
            prefix: "QUO-".to_string(),
            width: 4,
        }
    }

    /// The default format for a document kind.
    pub fn default_for(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Invoice => Self::invoice_default(),
            DocumentKind::Quote => Self::quote_default(),
        }
    }

    /// Formats a counter value.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::numbering::NumberFormat;
    ///
    /// let format = NumberFormat::invoice_default();
    /// assert_eq!(format.format(42), "INV-0042");
    /// assert_eq!(format.format(123456), "INV-123456");
    /// ```
    pub fn format(&self, value: i64) -> String {
        format!("{}{:0width$}", self.prefix, value, width = self.width)
    }

    /// Recovers the counter value from a display number.
    ///
    /// Returns `None` if the prefix does not match or the remainder is not
    /// all digits. Used when seeding counters from numbers already issued.
    ///
    /// ## Example
    /// ```rust
    /// use billbook_core::numbering::NumberFormat;
    ///
    /// let format = NumberFormat::quote_default();
    /// assert_eq!(format.parse("QUO-0042"), Some(42));
    /// assert_eq!(format.parse("INV-0042"), None);
    /// ```
    pub fn parse(&self, number: &str) -> Option<i64> {
        let digits = number.trim().strip_prefix(self.prefix.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

impl fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, "#".repeat(self.width))
    }
}

/// The invoice and quote formats used together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NumberFormats {
    pub invoice: NumberFormat,
    pub quote: NumberFormat,
}

impl NumberFormats {
    /// The format for `kind`.
    pub fn get(&self, kind: DocumentKind) -> &NumberFormat {
        match kind {
            DocumentKind::Invoice => &self.invoice,
            DocumentKind::Quote => &self.quote,
        }
    }

    /// Checks both formats and that their prefixes differ.
    pub fn validate(&self) -> Result<(), ValidationError> {
        crate::validation::validate_number_formats(&self.invoice, &self.quote)
    }
}

impl Default for NumberFormats {
    fn default() -> Self {
        NumberFormats {
            invoice: NumberFormat::invoice_default(),
            quote: NumberFormat::quote_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pads_to_width() {
        let format = NumberFormat::invoice_default();
        assert_eq!(format.format(1), "INV-0001");
        assert_eq!(format.format(42), "INV-0042");
        assert_eq!(format.format(9999), "INV-9999");
    }

    #[test]
    fn test_format_never_truncates() {
        let format = NumberFormat::new("Q", 2).unwrap();
        assert_eq!(format.format(7), "Q07");
        assert_eq!(format.format(12345), "Q12345");
    }

    #[test]
    fn test_parse() {
        let format = NumberFormat::invoice_default();
        assert_eq!(format.parse("INV-0042"), Some(42));
        assert_eq!(format.parse("INV-12345"), Some(12345));
        assert_eq!(format.parse(" INV-0007 "), Some(7));
        assert_eq!(format.parse("INV-"), None);
        assert_eq!(format.parse("INV-12a"), None);
        assert_eq!(format.parse("INV--12"), None);
        assert_eq!(format.parse("QUO-0042"), None);
    }

    #[test]
    fn test_defaults_per_kind() {
        assert_eq!(
            NumberFormat::default_for(DocumentKind::Invoice).format(3),
            "INV-0003"
        );
        assert_eq!(
            NumberFormat::default_for(DocumentKind::Quote).format(3),
            "QUO-0003"
        );
    }

    #[test]
    fn test_new_rejects_bad_formats() {
        assert!(NumberFormat::new("", 4).is_err());
        assert!(NumberFormat::new("INV-", 0).is_err());
        assert!(NumberFormat::new("INV-", MAX_NUMBER_WIDTH + 1).is_err());
        assert!(NumberFormat::new("INV-", MAX_NUMBER_WIDTH).is_ok());
    }

    #[test]
    fn test_formats_pair() {
        let formats = NumberFormats::default();
        assert_eq!(formats.get(DocumentKind::Quote).prefix, "QUO-");
        assert!(formats.validate().is_ok());

        let clash = NumberFormats {
            invoice: NumberFormat::invoice_default(),
            quote: NumberFormat::invoice_default(),
        };
        assert!(clash.validate().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(NumberFormat::invoice_default().to_string(), "INV-####");
    }
}
