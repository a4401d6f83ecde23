//! Moving-average costing arithmetic
//!
//! Pure decimal math used by the posting engine when it receives stock and by
//! the ledger replay when it rebuilds derived state. The database stores what
//! these functions produce, so replaying the same ledger through them must
//! reproduce the stored values exactly.

use rust_decimal::Decimal;

/// Decimal places at which average costs are persisted.
pub const AVG_COST_SCALE: u32 = 6;

/// Recompute the weighted moving average after a purchase receipt.
///
/// `old_qty` is the on-hand quantity before the receipt and `old_avg` the
/// average cost on file for it. Only purchases move the average; sales,
/// transfers and adjustments relieve stock at the average without changing it.
///
/// When the combined quantity is zero (first receipt for a pair, or a receipt
/// that exactly cancels negative stock) the incoming unit cost becomes the
/// new average outright.
pub fn moving_average(
    old_qty: Decimal,
    old_avg: Decimal,
    purchase_qty: Decimal,
    unit_cost: Decimal,
) -> Decimal {
    let combined_qty = old_qty + purchase_qty;
    if combined_qty.is_zero() {
        unit_cost
    } else {
        (old_qty * old_avg + purchase_qty * unit_cost) / combined_qty
    }
}

/// The moving average as it is persisted: rounded to storage scale.
pub fn moving_average_rounded(
    old_qty: Decimal,
    old_avg: Decimal,
    purchase_qty: Decimal,
    unit_cost: Decimal,
) -> Decimal {
    moving_average(old_qty, old_avg, purchase_qty, unit_cost).round_dp(AVG_COST_SCALE)
}

/// Monetary extension of a single document line.
pub fn line_total(qty: Decimal, unit_amount: Decimal) -> Decimal {
    qty * unit_amount
}

/// Header total across document lines given as (qty, unit amount) pairs.
pub fn document_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, Decimal)>,
{
    lines
        .into_iter()
        .map(|(qty, unit_amount)| line_total(qty, unit_amount))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_first_receipt_sets_average_to_unit_cost() {
        let avg = moving_average(Decimal::ZERO, Decimal::ZERO, dec("10"), dec("5"));
        assert_eq!(avg, dec("5"));
    }

    #[test]
    fn test_blended_average_of_two_receipts() {
        // 10 @ 5.00 then 10 @ 7.00 blends to exactly 6.00
        let avg = moving_average(dec("10"), dec("5"), dec("10"), dec("7"));
        assert_eq!(avg, dec("6"));
    }

    #[test]
    fn test_unequal_quantities_weight_the_blend() {
        // 3 @ 2.50 + 7 @ 3.10 = (7.50 + 21.70) / 10 = 2.92
        let avg = moving_average(dec("3"), dec("2.50"), dec("7"), dec("3.10"));
        assert_eq!(avg, dec("2.92"));
    }

    #[test]
    fn test_receipt_cancelling_negative_stock_resets_average() {
        // Combined quantity of zero takes the incoming cost, not a division
        let avg = moving_average(dec("-5"), dec("4"), dec("5"), dec("9.25"));
        assert_eq!(avg, dec("9.25"));
    }

    #[test]
    fn test_rounded_average_is_storage_scale() {
        // 1 @ 10 + 2 @ 0 = 10/3, rounded to 6 places
        let avg = moving_average_rounded(dec("1"), dec("10"), dec("2"), dec("0"));
        assert_eq!(avg, dec("3.333333"));
    }

    #[test]
    fn test_line_and_document_totals() {
        assert_eq!(line_total(dec("4"), dec("2.25")), dec("9.00"));
        let total = document_total(vec![
            (dec("10"), dec("5")),
            (dec("3"), dec("1.50")),
        ]);
        assert_eq!(total, dec("54.50"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        // Quantities up to 10_000.0000 and costs up to 1_000.00
        fn qty_strategy() -> impl Strategy<Value = Decimal> {
            (1i64..=100_000_000, 0u32..=4).prop_map(|(m, s)| Decimal::new(m, s))
        }

        fn cost_strategy() -> impl Strategy<Value = Decimal> {
            (0i64..=100_000, 0u32..=2).prop_map(|(m, s)| Decimal::new(m, s))
        }

        proptest! {
            #[test]
            fn receipts_at_a_constant_cost_never_move_the_average(
                old_qty in qty_strategy(),
                purchase_qty in qty_strategy(),
                cost in cost_strategy(),
            ) {
                let avg = moving_average(old_qty, cost, purchase_qty, cost);
                prop_assert_eq!(avg, cost);
            }

            #[test]
            fn average_stays_within_one_tick_of_the_blend_bounds(
                old_qty in qty_strategy(),
                old_avg in cost_strategy(),
                purchase_qty in qty_strategy(),
                unit_cost in cost_strategy(),
            ) {
                let avg = moving_average_rounded(old_qty, old_avg, purchase_qty, unit_cost);
                let lo = old_avg.min(unit_cost);
                let hi = old_avg.max(unit_cost);
                let tick = Decimal::new(1, AVG_COST_SCALE);
                prop_assert!(avg >= lo - tick, "avg {} below {}", avg, lo);
                prop_assert!(avg <= hi + tick, "avg {} above {}", avg, hi);
            }

            #[test]
            fn document_total_matches_line_sum(
                lines in proptest::collection::vec((qty_strategy(), cost_strategy()), 0..8),
            ) {
                let by_lines: Decimal = lines
                    .iter()
                    .map(|(qty, unit)| line_total(*qty, *unit))
                    .sum();
                prop_assert_eq!(document_total(lines), by_lines);
            }
        }
    }
}
