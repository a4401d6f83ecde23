//! Document posting tests
//!
//! Pure-logic simulation of the document posters: input validation, header
//! totals, and the all-or-nothing rule that a document either lands every
//! line in the ledger or leaves the book untouched.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Document simulation
// ============================================================================

/// Document-granular rendition of the posters: each post works on a copy of
/// the book and commits it only when every line clears, the way one database
/// transaction wraps header, lines and ledger entries.
#[cfg(test)]
mod doc_sim {
    use rust_decimal::Decimal;
    use shared::costing::{document_total, moving_average_rounded};
    use shared::validation;
    use std::collections::HashMap;

    /// (product, warehouse)
    pub type Pair = (u8, u8);

    /// One document line
    #[derive(Debug, Clone, Copy)]
    pub struct Line {
        pub product: u8,
        pub warehouse: u8,
        pub qty: Decimal,
        pub unit_amount: Decimal,
    }

    /// Derived state plus a count of ledger entries written
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Book {
        pub entries: usize,
        pub stock: HashMap<Pair, Decimal>,
        pub averages: HashMap<Pair, Decimal>,
    }

    impl Book {
        pub fn on_hand(&self, pair: Pair) -> Decimal {
            self.stock.get(&pair).copied().unwrap_or(Decimal::ZERO)
        }

        pub fn avg_cost(&self, pair: Pair) -> Decimal {
            self.averages.get(&pair).copied().unwrap_or(Decimal::ZERO)
        }

        fn receive(&mut self, pair: Pair, qty: Decimal, unit_cost: Decimal) {
            let avg = moving_average_rounded(self.on_hand(pair), self.avg_cost(pair), qty, unit_cost);
            self.averages.insert(pair, avg);
            *self.stock.entry(pair).or_insert(Decimal::ZERO) += qty;
            self.entries += 1;
        }

        fn issue(&mut self, pair: Pair, qty: Decimal) -> Result<(), &'static str> {
            if self.on_hand(pair) < qty {
                return Err("insufficient stock");
            }
            *self.stock.entry(pair).or_insert(Decimal::ZERO) -= qty;
            self.entries += 1;
            Ok(())
        }
    }

    /// Post a purchase document. Returns the header total.
    pub fn post_purchase(book: &mut Book, lines: &[Line]) -> Result<Decimal, &'static str> {
        validate_lines(lines)?;

        let mut tx = book.clone();
        for line in lines {
            tx.receive((line.product, line.warehouse), line.qty, line.unit_amount);
        }

        let total = document_total(lines.iter().map(|line| (line.qty, line.unit_amount)));
        *book = tx;
        Ok(total)
    }

    /// Post a sale document: every line must clear stock or nothing posts.
    pub fn post_sale(book: &mut Book, lines: &[Line]) -> Result<Decimal, &'static str> {
        validate_lines(lines)?;

        let mut tx = book.clone();
        for line in lines {
            tx.issue((line.product, line.warehouse), line.qty)?;
        }

        let total = document_total(lines.iter().map(|line| (line.qty, line.unit_amount)));
        *book = tx;
        Ok(total)
    }

    /// Post a transfer: one outbound and one inbound entry, or neither.
    pub fn post_transfer(
        book: &mut Book,
        product: u8,
        from: u8,
        to: u8,
        qty: Decimal,
    ) -> Result<(), &'static str> {
        validation::validate_positive_qty(qty)?;
        if from == to {
            return Err("source and destination warehouses must differ");
        }

        let mut tx = book.clone();
        tx.issue((product, from), qty)?;
        *tx.stock.entry((product, to)).or_insert(Decimal::ZERO) += qty;
        tx.entries += 1;

        *book = tx;
        Ok(())
    }

    /// Post an adjustment: signed quantity with a mandatory reason.
    pub fn post_adjustment(
        book: &mut Book,
        pair: Pair,
        qty: Decimal,
        reason: &str,
    ) -> Result<(), &'static str> {
        validation::validate_nonzero_qty(qty)?;
        validation::validate_reason(reason)?;

        let mut tx = book.clone();
        if qty < Decimal::ZERO {
            tx.issue(pair, -qty)?;
        } else {
            *tx.stock.entry(pair).or_insert(Decimal::ZERO) += qty;
            tx.entries += 1;
        }

        *book = tx;
        Ok(())
    }

    fn validate_lines(lines: &[Line]) -> Result<(), &'static str> {
        validation::validate_has_lines(lines.len())?;
        for line in lines {
            validation::validate_positive_qty(line.qty)?;
            validation::validate_unit_cost(line.unit_amount)?;
        }
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::doc_sim::{self, Book, Line};
    use super::*;

    fn line(product: u8, warehouse: u8, qty: &str, unit_amount: &str) -> Line {
        Line {
            product,
            warehouse,
            qty: dec(qty),
            unit_amount: dec(unit_amount),
        }
    }

    fn seeded(product: u8, warehouse: u8, qty: &str, cost: &str) -> Book {
        let mut book = Book::default();
        doc_sim::post_purchase(&mut book, &[line(product, warehouse, qty, cost)]).unwrap();
        book
    }

    /// A purchase document lands every line and totals the header
    #[test]
    fn test_purchase_posts_all_lines() {
        let mut book = Book::default();
        let total = doc_sim::post_purchase(
            &mut book,
            &[line(1, 1, "10", "5"), line(2, 1, "4", "7")],
        )
        .unwrap();

        assert_eq!(total, dec("78"));
        assert_eq!(book.entries, 2);
        assert_eq!(book.on_hand((1, 1)), dec("10"));
        assert_eq!(book.on_hand((2, 1)), dec("4"));
        assert_eq!(book.avg_cost((1, 1)), dec("5"));
        assert_eq!(book.avg_cost((2, 1)), dec("7"));
    }

    /// Two lines of the same pair blend the average within one document
    #[test]
    fn test_purchase_lines_apply_in_order() {
        let mut book = Book::default();
        doc_sim::post_purchase(&mut book, &[line(1, 1, "10", "5"), line(1, 1, "10", "7")])
            .unwrap();

        assert_eq!(book.on_hand((1, 1)), dec("20"));
        assert_eq!(book.avg_cost((1, 1)), dec("6"));
    }

    /// A sale whose second line lacks stock posts nothing at all
    #[test]
    fn test_sale_is_all_or_nothing() {
        let mut book = seeded(1, 1, "10", "5");
        let before = book.clone();

        let result = doc_sim::post_sale(
            &mut book,
            &[line(1, 1, "6", "9"), line(1, 1, "6", "9")],
        );

        assert!(result.is_err());
        assert_eq!(book, before);
    }

    /// Shortage on an early line also rolls back untouched later lines
    #[test]
    fn test_sale_shortage_on_first_line_posts_nothing() {
        let mut book = seeded(1, 1, "2", "5");
        let before = book.clone();

        let result = doc_sim::post_sale(
            &mut book,
            &[line(1, 1, "3", "9"), line(1, 1, "1", "9")],
        );

        assert!(result.is_err());
        assert_eq!(book, before);
    }

    /// A sale that clears every line posts them all and totals the header
    #[test]
    fn test_sale_posts_when_stock_clears() {
        let mut book = seeded(1, 1, "10", "5");
        let total = doc_sim::post_sale(
            &mut book,
            &[line(1, 1, "4", "9"), line(1, 1, "6", "8.50")],
        )
        .unwrap();

        assert_eq!(total, dec("87.00"));
        assert_eq!(book.on_hand((1, 1)), Decimal::ZERO);
        assert_eq!(book.avg_cost((1, 1)), dec("5"));
    }

    /// Empty documents are rejected before any work happens
    #[test]
    fn test_empty_documents_rejected() {
        let mut book = Book::default();
        assert!(doc_sim::post_purchase(&mut book, &[]).is_err());
        assert!(doc_sim::post_sale(&mut book, &[]).is_err());
        assert_eq!(book.entries, 0);
    }

    /// Non-positive line quantities are rejected
    #[test]
    fn test_non_positive_line_qty_rejected() {
        let mut book = seeded(1, 1, "10", "5");
        assert!(doc_sim::post_sale(&mut book, &[line(1, 1, "0", "9")]).is_err());
        assert!(doc_sim::post_sale(&mut book, &[line(1, 1, "-2", "9")]).is_err());
        assert!(doc_sim::post_purchase(&mut book, &[line(1, 1, "-2", "9")]).is_err());
    }

    /// Negative unit amounts are rejected, zero-cost receipts are not
    #[test]
    fn test_unit_amount_bounds() {
        let mut book = Book::default();
        assert!(doc_sim::post_purchase(&mut book, &[line(1, 1, "5", "-1")]).is_err());
        assert!(doc_sim::post_purchase(&mut book, &[line(1, 1, "5", "0")]).is_ok());
        assert_eq!(book.avg_cost((1, 1)), Decimal::ZERO);
    }

    /// A transfer moves quantity between warehouses with exactly two entries
    #[test]
    fn test_transfer_moves_stock() {
        let mut book = seeded(1, 1, "20", "3");
        let averages_before = book.averages.clone();

        doc_sim::post_transfer(&mut book, 1, 1, 2, dec("5")).unwrap();

        assert_eq!(book.on_hand((1, 1)), dec("15"));
        assert_eq!(book.on_hand((1, 2)), dec("5"));
        assert_eq!(book.entries, 3);
        assert_eq!(book.averages, averages_before);
    }

    /// Transfers between the same warehouse are rejected
    #[test]
    fn test_transfer_requires_distinct_warehouses() {
        let mut book = seeded(1, 1, "20", "3");
        let before = book.clone();

        assert!(doc_sim::post_transfer(&mut book, 1, 1, 1, dec("5")).is_err());
        assert_eq!(book, before);
    }

    /// A transfer larger than the source on-hand posts nothing
    #[test]
    fn test_transfer_shortage_posts_nothing() {
        let mut book = seeded(1, 1, "4", "3");
        let before = book.clone();

        assert!(doc_sim::post_transfer(&mut book, 1, 1, 2, dec("5")).is_err());
        assert_eq!(book, before);
    }

    /// Adjustments demand a reason and a non-zero quantity
    #[test]
    fn test_adjustment_validation() {
        let mut book = seeded(1, 1, "10", "5");

        assert!(doc_sim::post_adjustment(&mut book, (1, 1), dec("2"), "  ").is_err());
        assert!(doc_sim::post_adjustment(&mut book, (1, 1), Decimal::ZERO, "cycle count").is_err());
        assert_eq!(book.on_hand((1, 1)), dec("10"));

        doc_sim::post_adjustment(&mut book, (1, 1), dec("-3"), "damaged in storage").unwrap();
        assert_eq!(book.on_hand((1, 1)), dec("7"));

        doc_sim::post_adjustment(&mut book, (1, 1), dec("1"), "cycle count").unwrap();
        assert_eq!(book.on_hand((1, 1)), dec("8"));
    }

    /// A write-down below on-hand is refused like any outbound movement
    #[test]
    fn test_adjustment_cannot_go_below_zero() {
        let mut book = seeded(1, 1, "3", "5");
        let before = book.clone();

        let result = doc_sim::post_adjustment(&mut book, (1, 1), dec("-4"), "shrinkage");

        assert!(result.is_err());
        assert_eq!(book, before);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::doc_sim::{self, Book, Line};
    use super::*;
    use std::collections::HashMap;

    fn qty_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=500_000, 0u32..=4).prop_map(|(m, s)| Decimal::new(m, s))
    }

    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=100_000, 0u32..=2).prop_map(|(m, s)| Decimal::new(m, s))
    }

    fn line_strategy() -> impl Strategy<Value = Line> {
        ((1u8..=3), (1u8..=2), qty_strategy(), amount_strategy()).prop_map(
            |(product, warehouse, qty, unit_amount)| Line {
                product,
                warehouse,
                qty,
                unit_amount,
            },
        )
    }

    fn demand_by_pair(lines: &[Line]) -> HashMap<(u8, u8), Decimal> {
        let mut demand: HashMap<(u8, u8), Decimal> = HashMap::new();
        for line in lines {
            *demand
                .entry((line.product, line.warehouse))
                .or_insert(Decimal::ZERO) += line.qty;
        }
        demand
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Purchase totals always equal the line sum and stock rises by
        /// exactly the posted quantities
        #[test]
        fn prop_purchase_totals_and_quantities(
            lines in prop::collection::vec(line_strategy(), 1..10)
        ) {
            let mut book = Book::default();
            let total = doc_sim::post_purchase(&mut book, &lines).unwrap();

            let line_sum: Decimal = lines
                .iter()
                .map(|line| line.qty * line.unit_amount)
                .sum();
            prop_assert_eq!(total, line_sum);

            for (pair, demanded) in demand_by_pair(&lines) {
                prop_assert_eq!(book.on_hand(pair), demanded);
            }
            prop_assert_eq!(book.entries, lines.len());
        }

        /// A sale document either applies every line or leaves the book
        /// exactly as it was
        #[test]
        fn prop_sale_is_atomic(
            seed in prop::collection::vec(line_strategy(), 1..6),
            lines in prop::collection::vec(line_strategy(), 1..6),
        ) {
            let mut book = Book::default();
            doc_sim::post_purchase(&mut book, &seed).unwrap();
            let before = book.clone();

            match doc_sim::post_sale(&mut book, &lines) {
                Ok(total) => {
                    let line_sum: Decimal = lines
                        .iter()
                        .map(|line| line.qty * line.unit_amount)
                        .sum();
                    prop_assert_eq!(total, line_sum);

                    for (pair, demanded) in demand_by_pair(&lines) {
                        prop_assert_eq!(book.on_hand(pair), before.on_hand(pair) - demanded);
                    }
                    prop_assert_eq!(book.entries, before.entries + lines.len());
                }
                Err(_) => prop_assert_eq!(book, before),
            }
        }

        /// Transfers conserve the total quantity of the product across
        /// warehouses
        #[test]
        fn prop_transfer_conserves_product_quantity(
            seed_qty in qty_strategy(),
            cost in amount_strategy(),
            moved in qty_strategy(),
        ) {
            let mut book = Book::default();
            doc_sim::post_purchase(&mut book, &[Line {
                product: 1,
                warehouse: 1,
                qty: seed_qty,
                unit_amount: cost,
            }]).unwrap();

            let total_before = book.on_hand((1, 1)) + book.on_hand((1, 2));
            let _ = doc_sim::post_transfer(&mut book, 1, 1, 2, moved);
            let total_after = book.on_hand((1, 1)) + book.on_hand((1, 2));

            prop_assert_eq!(total_before, total_after);
            prop_assert!(book.on_hand((1, 1)) >= Decimal::ZERO);
        }

        /// Failed adjustments never leak partial state
        #[test]
        fn prop_adjustment_failure_changes_nothing(
            seed_qty in qty_strategy(),
            cost in amount_strategy(),
            extra in qty_strategy(),
        ) {
            let mut book = Book::default();
            doc_sim::post_purchase(&mut book, &[Line {
                product: 1,
                warehouse: 1,
                qty: seed_qty,
                unit_amount: cost,
            }]).unwrap();
            let before = book.clone();

            let write_down = -(seed_qty + extra);
            let result = doc_sim::post_adjustment(&mut book, (1, 1), write_down, "shrinkage");

            prop_assert!(result.is_err());
            prop_assert_eq!(book, before);
        }
    }
}
