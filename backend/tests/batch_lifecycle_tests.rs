//! Batch lifecycle tests
//!
//! Tests for production batches including:
//! - Status transitions
//! - Deduction modes and the once-only actual deduction
//! - Cancellation restore plans per mode
//! - Batch references and plan validation

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    actual_consumption, apply_movement, ensure_actual_deduction_allowed, generate_batch_reference,
    restore_quantities, validate_plan_matches_quantity, BatchMaterialUsage, BatchRuleError,
    BatchStatus, DeductionMode, MaterialRequirement, ProductionPlan, RestoreSource, StockDirection,
    StockError,
};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn plan(entries: &[(&str, u32)]) -> ProductionPlan {
    ProductionPlan::new(
        entries
            .iter()
            .map(|(size, pieces)| (size.to_string(), *pieces))
            .collect::<BTreeMap<_, _>>(),
    )
}

fn usage(material_id: Uuid, qty: &str) -> BatchMaterialUsage {
    BatchMaterialUsage {
        id: Uuid::new_v4(),
        batch_id: Uuid::new_v4(),
        material_id,
        material_name: "Denim".to_string(),
        quantity_used: dec(qty),
        unit_cost: dec("2"),
        total_cost: dec(qty) * dec("2"),
        transaction_id: Uuid::new_v4(),
        created_at: Utc::now(),
    }
}

const ALL_STATUSES: [BatchStatus; 4] = [
    BatchStatus::Planifie,
    BatchStatus::EnCours,
    BatchStatus::Termine,
    BatchStatus::Cancelled,
];

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Forward transitions and cancellation from open states
    #[test]
    fn test_allowed_transitions() {
        assert!(BatchStatus::Planifie.can_transition_to(BatchStatus::EnCours));
        assert!(BatchStatus::Planifie.can_transition_to(BatchStatus::Termine));
        assert!(BatchStatus::EnCours.can_transition_to(BatchStatus::Termine));
        assert!(BatchStatus::Planifie.can_transition_to(BatchStatus::Cancelled));
        assert!(BatchStatus::EnCours.can_transition_to(BatchStatus::Cancelled));
    }

    /// Finished and cancelled batches are final
    #[test]
    fn test_terminal_states() {
        for next in ALL_STATUSES {
            assert!(!BatchStatus::Termine.can_transition_to(next));
            assert!(!BatchStatus::Cancelled.can_transition_to(next));
        }
        assert!(BatchStatus::Termine.is_terminal());
        assert!(BatchStatus::Cancelled.is_terminal());
        assert!(!BatchStatus::EnCours.is_terminal());
    }

    /// No going back
    #[test]
    fn test_backward_transition_rejected() {
        assert!(!BatchStatus::EnCours.can_transition_to(BatchStatus::Planifie));
    }

    /// Status strings round-trip through the database representation
    #[test]
    fn test_status_strings() {
        for status in ALL_STATUSES {
            assert_eq!(status.as_str().parse::<BatchStatus>().unwrap(), status);
        }
        assert!("done".parse::<BatchStatus>().is_err());
    }

    /// Only deferred batches still have stock to deduct
    #[test]
    fn test_deduction_modes() {
        assert!(DeductionMode::AtCreation.has_deducted());
        assert!(DeductionMode::ActualQuantities.has_deducted());
        assert!(!DeductionMode::Deferred.has_deducted());
        assert_eq!(
            "actual_quantities".parse::<DeductionMode>().unwrap(),
            DeductionMode::ActualQuantities
        );
    }

    /// Closed batches refuse every change, with the status in the reason
    #[test]
    fn test_closed_batch_rules() {
        assert_eq!(
            BatchStatus::Termine.ensure_transition(BatchStatus::Cancelled),
            Err(BatchRuleError::Closed(BatchStatus::Termine))
        );
        assert_eq!(
            BatchStatus::EnCours.ensure_transition(BatchStatus::Planifie),
            Err(BatchRuleError::InvalidTransition {
                from: BatchStatus::EnCours,
                to: BatchStatus::Planifie,
            })
        );
        assert!(BatchStatus::EnCours.ensure_transition(BatchStatus::Cancelled).is_ok());
    }

    /// Actual quantities are accepted once, and never for a cancelled batch
    #[test]
    fn test_actual_deduction_guard() {
        assert!(ensure_actual_deduction_allowed(BatchStatus::Termine, DeductionMode::Deferred).is_ok());
        assert_eq!(
            ensure_actual_deduction_allowed(BatchStatus::Planifie, DeductionMode::AtCreation),
            Err(BatchRuleError::AlreadyDeducted(DeductionMode::AtCreation))
        );
        assert_eq!(
            ensure_actual_deduction_allowed(BatchStatus::EnCours, DeductionMode::ActualQuantities),
            Err(BatchRuleError::AlreadyDeducted(DeductionMode::ActualQuantities))
        );
        assert_eq!(
            ensure_actual_deduction_allowed(BatchStatus::Cancelled, DeductionMode::Deferred),
            Err(BatchRuleError::Closed(BatchStatus::Cancelled))
        );
    }

    /// Cancelling plan {"m":5} with 2 units/piece restores 10
    #[test]
    fn test_cancellation_restores_recomputed_quantity() {
        let x = Uuid::new_v4();
        let rows = vec![MaterialRequirement::new(x, dec("2"), None)];
        let stored_plan = plan(&[("m", 5)]);

        let restore = restore_quantities(
            DeductionMode::AtCreation.restore_source(),
            &rows,
            &stored_plan,
            &[],
        )
        .unwrap();
        let qty = restore.get(&x).unwrap();
        assert_eq!(qty, dec("10"));

        let stock_after = apply_movement(x, dec("40"), StockDirection::In, qty).unwrap();
        assert_eq!(stock_after, dec("50"));
    }

    /// A configuration changed after the start changes what cancellation restores
    #[test]
    fn test_cancellation_follows_current_configuration() {
        let x = Uuid::new_v4();
        let stored_plan = plan(&[("m", 5)]);

        let at_start = vec![MaterialRequirement::new(x, dec("2"), None)];
        let now = vec![MaterialRequirement::new(x, dec("3"), None)];

        let source = RestoreSource::CurrentConfiguration;
        let deducted = restore_quantities(source, &at_start, &stored_plan, &[]).unwrap().get(&x);
        let restored = restore_quantities(source, &now, &stored_plan, &[]).unwrap().get(&x);

        assert_eq!(deducted, Some(dec("10")));
        assert_eq!(restored, Some(dec("15")));
    }

    /// A product whose configuration was removed restores nothing
    #[test]
    fn test_cancellation_without_configuration() {
        let restore =
            restore_quantities(RestoreSource::CurrentConfiguration, &[], &plan(&[("m", 5)]), &[]).unwrap();
        assert!(restore.is_empty());
    }

    /// Batches deducted from actual quantities give back their recorded usage
    #[test]
    fn test_cancellation_restores_recorded_usage() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        let rows = vec![MaterialRequirement::new(x, dec("99"), None)];
        let recorded = vec![usage(x, "12.5"), usage(y, "3"), usage(x, "0.5")];

        let restore = restore_quantities(
            DeductionMode::ActualQuantities.restore_source(),
            &rows,
            &plan(&[("m", 5)]),
            &recorded,
        )
        .unwrap();

        assert_eq!(restore.get(&x), Some(dec("13")));
        assert_eq!(restore.get(&y), Some(dec("3")));
        assert_eq!(restore.len(), 2);
    }

    /// Deferred batches never touched stock, so cancelling them restores nothing
    #[test]
    fn test_cancellation_of_deferred_batch() {
        let x = Uuid::new_v4();
        let rows = vec![MaterialRequirement::new(x, dec("2"), None)];
        let restore = restore_quantities(
            DeductionMode::Deferred.restore_source(),
            &rows,
            &plan(&[("m", 5)]),
            &[usage(x, "4")],
        )
        .unwrap();
        assert!(restore.is_empty());
    }

    /// Actual quantities are per piece: 1.5 per piece over 20 pieces deducts 30
    #[test]
    fn test_actual_quantities_scale_with_pieces() {
        let x = Uuid::new_v4();
        let consumed = actual_consumption(&HashMap::from([(x, dec("1.5"))]), 20).unwrap();
        assert_eq!(consumed.get(&x), Some(&dec("30")));
    }

    /// Huge per-piece quantities are refused instead of overflowing
    #[test]
    fn test_actual_quantities_overflow_rejected() {
        let x = Uuid::new_v4();
        assert_eq!(
            actual_consumption(&HashMap::from([(x, dec("50000000000000000000000000000"))]), 2),
            Err(StockError::OutOfRange(x))
        );
        assert_eq!(
            actual_consumption(&HashMap::from([(x, dec("6000000000"))]), 2),
            Err(StockError::OutOfRange(x))
        );
    }

    /// References look like PREFIX-YYYYMMDD-XXXXXX
    #[test]
    fn test_batch_reference_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let suffix = Uuid::new_v4().simple().to_string();

        let regular = generate_batch_reference("BATCH", date, &suffix);
        assert!(regular.starts_with("BATCH-20240307-"));
        let tail = regular.rsplit('-').next().unwrap();
        assert_eq!(tail.len(), 6);
        assert!(tail.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));

        let sub = generate_batch_reference("BATCH-ST", date, "ab12cd34");
        assert_eq!(sub, "BATCH-ST-20240307-AB12CD");
    }

    /// Size breakdowns must add up to the planned quantity
    #[test]
    fn test_plan_validation() {
        assert!(validate_plan_matches_quantity(&plan(&[("s", 10), ("m", 15)]), 25).is_ok());
        assert!(validate_plan_matches_quantity(&plan(&[("s", 10)]), 25).is_err());
        assert!(validate_plan_matches_quantity(&ProductionPlan::total(25), 25).is_ok());
    }

    /// Without a breakdown the plan is a single total
    #[test]
    fn test_plan_from_missing_breakdown() {
        let p = ProductionPlan::from_breakdown(None, 12);
        assert_eq!(p.total_pieces(), 12);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn status_strategy() -> impl Strategy<Value = BatchStatus> {
        prop::sample::select(ALL_STATUSES.to_vec())
    }

    proptest! {
        /// Terminal states never transition
        #[test]
        fn prop_terminal_is_final(from in status_strategy(), to in status_strategy()) {
            if from.is_terminal() {
                prop_assert!(!from.can_transition_to(to));
            }
        }

        /// No status transitions to itself
        #[test]
        fn prop_no_self_transition(status in status_strategy()) {
            prop_assert!(!status.can_transition_to(status));
        }

        /// Cancellation restores exactly per-piece quantity times pieces
        #[test]
        fn prop_cancel_restores_recomputation(
            per_piece in 1u32..20,
            pieces in 1u32..200,
            stock in 0u32..10_000,
        ) {
            let x = Uuid::new_v4();
            let rows = vec![MaterialRequirement::new(x, Decimal::from(per_piece), None)];
            let qty = restore_quantities(RestoreSource::CurrentConfiguration, &rows, &plan(&[("m", pieces)]), &[])
                .unwrap()
                .get(&x)
                .unwrap();

            let after = apply_movement(x, Decimal::from(stock), StockDirection::In, qty).unwrap();
            prop_assert_eq!(after - Decimal::from(stock), Decimal::from(per_piece * pieces));
        }

        /// Actual consumption is the per-piece quantity times the planned pieces
        #[test]
        fn prop_actual_consumption_scales(per_piece in 1u32..1000, pieces in 1u32..10_000) {
            let x = Uuid::new_v4();
            let consumed = actual_consumption(&HashMap::from([(x, Decimal::new(per_piece.into(), 2))]), pieces).unwrap();
            prop_assert_eq!(
                consumed.get(&x).copied(),
                Some(Decimal::new(per_piece.into(), 2) * Decimal::from(pieces))
            );
        }

        /// Any breakdown summing to the quantity validates
        #[test]
        fn prop_breakdown_sum_validates(s in 0u32..100, m in 0u32..100, l in 1u32..100) {
            let p = plan(&[("s", s), ("m", m), ("l", l)]);
            prop_assert!(validate_plan_matches_quantity(&p, s + m + l).is_ok());
            prop_assert!(validate_plan_matches_quantity(&p, s + m + l + 1).is_err());
        }
    }
}
