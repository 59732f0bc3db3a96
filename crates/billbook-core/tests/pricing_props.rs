use billbook_core::deposit::{apply_deposit_with, DepositSpec};
use billbook_core::money::{round_ratio, RoundingMode};
use billbook_core::pricing::{compute_document_totals, price_document, PricingEngine};
use billbook_core::types::{Discount, LineItem, Quantity, TaxCode, TaxRate, TaxRateTable};
use billbook_core::validation::{validate_line_items, MAX_LINE_QUANTITY, MAX_UNIT_PRICE_CENTS};
use billbook_core::QUANTITY_SCALE;
use proptest::prelude::*;

fn discount_strategy() -> impl Strategy<Value = Discount> {
    prop_oneof![
        Just(Discount::None),
        (0u32..20_000).prop_map(Discount::percent_bps),
        (-5_000i64..2_000_000).prop_map(Discount::amount),
    ]
}

fn tax_code_strategy() -> impl Strategy<Value = TaxCode> {
    prop_oneof![
        Just(TaxCode::None),
        Just(TaxCode::Gst),
        Just(TaxCode::from("VAT20")),
        // never configured: exercises the zero-rate path
        Just(TaxCode::from("ZZZ")),
    ]
}

fn line_strategy() -> impl Strategy<Value = LineItem> {
    (
        0u64..100_000,
        -1_000i64..1_000_000,
        discount_strategy(),
        tax_code_strategy(),
    )
        .prop_map(|(milli, price, discount, code)| {
            LineItem::new("x", Quantity::from_milli(milli), price)
                .with_discount(discount)
                .with_tax_code(code)
        })
}

// Anything the type admits, far past what validation lets through.
fn extreme_line_strategy() -> impl Strategy<Value = LineItem> {
    (
        any::<u64>(),
        any::<i64>(),
        prop_oneof![
            Just(Discount::None),
            any::<u32>().prop_map(Discount::percent_bps),
            any::<i64>().prop_map(Discount::amount),
        ],
        tax_code_strategy(),
    )
        .prop_map(|(milli, price, discount, code)| {
            LineItem::new("x", Quantity::from_milli(milli), price)
                .with_discount(discount)
                .with_tax_code(code)
        })
}

// The largest lines validation accepts.
fn valid_line_strategy() -> impl Strategy<Value = LineItem> {
    (
        1u64..=MAX_LINE_QUANTITY * QUANTITY_SCALE,
        0i64..=MAX_UNIT_PRICE_CENTS,
        prop_oneof![
            Just(Discount::None),
            (0u32..=10_000).prop_map(Discount::percent_bps),
            (0i64..=MAX_UNIT_PRICE_CENTS).prop_map(Discount::amount),
        ],
        tax_code_strategy(),
    )
        .prop_map(|(milli, price, discount, code)| {
            LineItem::new("x", Quantity::from_milli(milli), price)
                .with_discount(discount)
                .with_tax_code(code)
        })
}

fn table() -> TaxRateTable {
    TaxRateTable::standard().with_rate("VAT20", TaxRate::from_percent(20))
}

fn mode_strategy() -> impl Strategy<Value = RoundingMode> {
    prop_oneof![Just(RoundingMode::HalfUp), Just(RoundingMode::HalfEven)]
}

proptest! {
    // Sum of the per-line figures is exactly the document total.
    #[test]
    fn line_totals_add_up(items in prop::collection::vec(line_strategy(), 0..20), mode in mode_strategy()) {
        let priced = PricingEngine::new(mode).price_document(&items, &table());
        let totals = priced.totals;

        let base: i64 = priced.lines.iter().map(|l| l.base_cents).sum();
        let discount: i64 = priced.lines.iter().map(|l| l.discount_cents).sum();
        let tax: i64 = priced.lines.iter().map(|l| l.tax_cents).sum();
        let total: i64 = priced.lines.iter().map(|l| l.total_cents).sum();

        prop_assert_eq!(totals.subtotal_cents, base);
        prop_assert_eq!(totals.discount_cents, discount);
        prop_assert_eq!(totals.tax_cents, tax);
        prop_assert_eq!(totals.total_cents, total);
        prop_assert_eq!(totals.total_cents, totals.subtotal_cents - totals.discount_cents + totals.tax_cents);
    }

    // Nothing ever goes negative, whatever the discount.
    #[test]
    fn clamping_holds(item in line_strategy(), mode in mode_strategy()) {
        let line = PricingEngine::new(mode).line_total(&item, &table());

        prop_assert!(line.base_cents >= 0);
        prop_assert!(line.discount_cents >= 0);
        prop_assert!(line.discount_cents <= line.base_cents);
        prop_assert!(line.net_cents >= 0);
        prop_assert!(line.tax_cents >= 0);
        prop_assert!(line.total_cents >= 0);
        prop_assert_eq!(line.net_cents, line.base_cents - line.discount_cents);
    }

    // Extreme input saturates; it never panics or goes negative.
    #[test]
    fn extreme_lines_stay_in_range(items in prop::collection::vec(extreme_line_strategy(), 1..8), mode in mode_strategy()) {
        let priced = PricingEngine::new(mode).price_document(&items, &table());

        for line in &priced.lines {
            prop_assert!(line.base_cents >= 0);
            prop_assert!(line.discount_cents <= line.base_cents);
            prop_assert!(line.net_cents >= 0);
            prop_assert!(line.tax_cents >= 0);
            prop_assert!(line.total_cents >= line.net_cents);
        }

        let totals = priced.totals;
        prop_assert!(totals.discount_cents <= totals.subtotal_cents);
        prop_assert!(totals.total_cents >= 0);
        prop_assert_eq!(totals.total_cents, totals.net_cents().saturating_add(totals.tax_cents));
    }

    // At the validation limits the sums are still exact.
    #[test]
    fn valid_documents_add_up_exactly(items in prop::collection::vec(valid_line_strategy(), 1..20), mode in mode_strategy()) {
        prop_assert!(validate_line_items(&items).is_ok());

        let priced = PricingEngine::new(mode).price_document(&items, &table());
        let total: i128 = priced.lines.iter().map(|l| l.total_cents as i128).sum();
        let tax: i128 = priced.lines.iter().map(|l| l.tax_cents as i128).sum();

        prop_assert_eq!(priced.totals.total_cents as i128, total);
        prop_assert_eq!(priced.totals.tax_cents as i128, tax);
        prop_assert!(priced.totals.total_cents < i64::MAX);
    }

    // Recomputing never changes the answer.
    #[test]
    fn totals_are_deterministic(items in prop::collection::vec(line_strategy(), 0..10)) {
        let first = compute_document_totals(&items, &table());
        for _ in 0..5 {
            prop_assert_eq!(compute_document_totals(&items, &table()), first);
        }
        prop_assert_eq!(price_document(&items, &table()).totals, first);
    }

    // Half-up and half-even differ by at most one cent, and only on ties.
    #[test]
    fn rounding_modes_agree_off_ties(numerator in -1_000_000_000i128..1_000_000_000, denominator in 1i128..100_000) {
        let up = round_ratio(numerator, denominator, RoundingMode::HalfUp);
        let even = round_ratio(numerator, denominator, RoundingMode::HalfEven);

        let is_tie = (numerator % denominator).abs() * 2 == denominator;
        if is_tie {
            prop_assert!((up - even).abs() <= 1);
            prop_assert_eq!(even % 2, 0);
        } else {
            prop_assert_eq!(up, even);
        }

        // Rounded result is within half a unit of the exact ratio.
        let diff = (up * denominator - numerator).abs() * 2;
        prop_assert!(diff <= denominator);
    }

    // Deposit plus balance recovers the total whenever the deposit fits.
    #[test]
    fn deposit_split_is_consistent(total in 0i64..10_000_000, bps in 0u32..15_000, mode in mode_strategy()) {
        let split = apply_deposit_with(total, DepositSpec::Percent { bps }, mode);

        prop_assert!(split.deposit_cents >= 0);
        prop_assert!(split.deposit_cents <= total);
        prop_assert!(split.balance_cents >= 0);
        prop_assert_eq!(split.deposit_cents + split.balance_cents, total);
    }
}
