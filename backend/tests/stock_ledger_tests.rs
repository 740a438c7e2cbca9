//! Stock ledger tests
//!
//! Tests for stock movements including:
//! - Availability checks before a batch deducts anything
//! - Rejection of movements that would go negative or out of range
//! - Movement costs and lock ordering
//! - Conservation between the stock counter and the ledger

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    apply_movement, calculate_requirements, check_availability, lock_order, movement_cost,
    quantity_limit, reconcile, MaterialRequirement, ProductionPlan, StockDirection, StockError,
};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// 3 units/piece, 10 pieces, stock 100
    #[test]
    fn test_batch_start_deducts_requirements() {
        let m = Uuid::new_v4();
        let on_hand = HashMap::from([(m, dec("100"))]);
        let rows = vec![MaterialRequirement::new(m, dec("3"), Some("none"))];
        let set = calculate_requirements(&rows, &ProductionPlan::total(10)).unwrap();

        assert!(check_availability(set.iter(), &on_hand).is_ok());
        let needed = set.get(&m).unwrap();
        assert_eq!(needed, dec("30"));
        assert_eq!(
            apply_movement(m, on_hand[&m], StockDirection::Out, needed),
            Ok(dec("70"))
        );
    }

    /// Same configuration, 40 pieces: 120 needed, 100 available
    #[test]
    fn test_batch_start_insufficient_stock() {
        let m = Uuid::new_v4();
        let on_hand = HashMap::from([(m, dec("100"))]);
        let rows = vec![MaterialRequirement::new(m, dec("3"), None)];
        let set = calculate_requirements(&rows, &ProductionPlan::total(40)).unwrap();

        assert_eq!(
            check_availability(set.iter(), &on_hand),
            Err(StockError::Insufficient {
                material_id: m,
                required: dec("120"),
                available: dec("100"),
            })
        );
    }

    /// The pre-check names the short material even when another one is fine
    #[test]
    fn test_precheck_names_short_material() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let on_hand = HashMap::from([(a, dec("50")), (b, dec("5"))]);

        let err = check_availability([(a, dec("10")), (b, dec("6"))], &on_hand).unwrap_err();

        assert!(matches!(err, StockError::Insufficient { material_id, .. } if material_id == b));
    }

    /// Deducting exactly the available stock is allowed
    #[test]
    fn test_deduct_to_zero() {
        let m = Uuid::new_v4();
        let left = apply_movement(m, dec("12.5"), StockDirection::Out, dec("12.5")).unwrap();
        assert_eq!(left, Decimal::ZERO);
    }

    /// Non-positive quantities are rejected in both directions
    #[test]
    fn test_non_positive_quantity() {
        let m = Uuid::new_v4();
        assert_eq!(
            apply_movement(m, dec("10"), StockDirection::In, Decimal::ZERO),
            Err(StockError::NonPositiveQuantity(m))
        );
        assert_eq!(
            apply_movement(m, dec("10"), StockDirection::Out, dec("-1")),
            Err(StockError::NonPositiveQuantity(m))
        );
    }

    /// A restore that would overflow the stock column is refused instead of panicking
    #[test]
    fn test_restore_overflow_rejected() {
        let m = Uuid::new_v4();
        assert_eq!(
            apply_movement(m, Decimal::MAX, StockDirection::In, Decimal::ONE),
            Err(StockError::OutOfRange(m))
        );
        assert_eq!(
            apply_movement(m, Decimal::ZERO, StockDirection::In, quantity_limit()),
            Err(StockError::OutOfRange(m))
        );
    }

    /// Ledger cost is quantity times unit price, refused when it overflows
    #[test]
    fn test_movement_cost() {
        let m = Uuid::new_v4();
        assert_eq!(movement_cost(m, dec("30"), dec("4.25")), Ok(dec("127.50")));
        assert_eq!(
            movement_cost(m, dec("50000000000000000000000000000"), dec("2")),
            Err(StockError::OutOfRange(m))
        );
    }

    /// Unknown materials fail the availability check
    #[test]
    fn test_unknown_material() {
        let ghost = Uuid::new_v4();
        assert_eq!(
            check_availability([(ghost, dec("1"))], &HashMap::new()),
            Err(StockError::UnknownMaterial(ghost))
        );
    }

    /// Rows are locked in ascending id order whatever the request order
    #[test]
    fn test_lock_order() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let c = Uuid::from_u128(3);
        assert_eq!(lock_order([c, a, b, a]), vec![a, b, c]);
        assert!(lock_order(Vec::new()).is_empty());
    }

    /// Reconciliation spots a counter changed outside the ledger
    #[test]
    fn test_reconciliation_drift() {
        let m = Uuid::new_v4();
        let movements = vec![
            (StockDirection::Out, dec("30")),
            (StockDirection::In, dec("5")),
        ];

        let report = reconcile(m, dec("100"), dec("75"), movements.clone());
        assert!(report.is_balanced());
        assert_eq!(report.total_in, dec("5"));
        assert_eq!(report.total_out, dec("30"));
        assert_eq!(report.expected_stock, dec("75"));

        let tampered = reconcile(m, dec("100"), dec("80"), movements);
        assert!(!tampered.is_balanced());
        assert_eq!(tampered.drift, dec("5"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn movement_strategy() -> impl Strategy<Value = (bool, u32)> {
        (any::<bool>(), 1u32..200)
    }

    proptest! {
        /// Accepted movements reconcile with the resulting counter
        #[test]
        fn prop_conservation(
            opening in 0u32..1000,
            movements in prop::collection::vec(movement_strategy(), 0..40),
        ) {
            let m = Uuid::new_v4();
            let mut stock = Decimal::from(opening);
            let mut accepted = Vec::new();

            for (incoming, qty) in movements {
                let direction = if incoming { StockDirection::In } else { StockDirection::Out };
                if let Ok(next) = apply_movement(m, stock, direction, Decimal::from(qty)) {
                    stock = next;
                    accepted.push((direction, Decimal::from(qty)));
                }
            }

            let report = reconcile(m, Decimal::from(opening), stock, accepted);
            prop_assert!(report.is_balanced());
            prop_assert_eq!(report.net_movement, stock - Decimal::from(opening));
        }

        /// Stock never goes negative
        #[test]
        fn prop_no_negative_stock(
            opening in 0u32..100,
            qty in 1u32..200,
        ) {
            let m = Uuid::new_v4();
            let result = apply_movement(m, Decimal::from(opening), StockDirection::Out, Decimal::from(qty));

            if qty > opening {
                prop_assert!(result.is_err());
            } else {
                prop_assert_eq!(result.unwrap(), Decimal::from(opening - qty));
            }
        }

        /// The pre-check passes exactly when every material is covered
        #[test]
        fn prop_precheck_all_or_nothing(
            stock_a in 0u32..100,
            stock_b in 0u32..100,
            need_a in 1u32..100,
            need_b in 1u32..100,
        ) {
            let a = Uuid::new_v4();
            let b = Uuid::new_v4();
            let on_hand = HashMap::from([(a, Decimal::from(stock_a)), (b, Decimal::from(stock_b))]);

            let result = check_availability(
                [(a, Decimal::from(need_a)), (b, Decimal::from(need_b))],
                &on_hand,
            );

            prop_assert_eq!(result.is_ok(), need_a <= stock_a && need_b <= stock_b);
        }

        /// Lock order is sorted and holds each id once
        #[test]
        fn prop_lock_order_sorted_unique(raw in prop::collection::vec(0u128..20, 0..30)) {
            let ids: Vec<Uuid> = raw.iter().map(|n| Uuid::from_u128(*n)).collect();
            let ordered = lock_order(ids.iter().copied());

            prop_assert!(ordered.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(ids.iter().all(|id| ordered.contains(id)));
        }
    }
}
