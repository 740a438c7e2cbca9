//! Validation utilities for production and stock inputs

use rust_decimal::Decimal;

use crate::models::ProductionPlan;
use crate::stock::quantity_limit;

// ============================================================================
// Production Validations
// ============================================================================

/// A batch must plan at least one piece
pub fn validate_quantity_to_produce(quantity: u32) -> Result<(), &'static str> {
    if quantity == 0 {
        return Err("Quantity to produce must be at least 1");
    }
    Ok(())
}

/// A size breakdown must add up to the planned quantity
pub fn validate_plan_matches_quantity(plan: &ProductionPlan, quantity: u32) -> Result<(), &'static str> {
    if plan.is_empty() {
        return Err("Size breakdown cannot be empty");
    }
    if plan.sizes().any(|(size, _)| size.trim().is_empty()) {
        return Err("Size labels cannot be blank");
    }
    if plan.total_pieces() != u64::from(quantity) {
        return Err("Size breakdown must sum to the quantity to produce");
    }
    Ok(())
}

// ============================================================================
// Stock Validations
// ============================================================================

/// Stock movements and per-piece quantities must be strictly positive and fit a
/// stock column
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    if quantity >= quantity_limit() {
        return Err("Quantity is too large");
    }
    Ok(())
}

/// Every ledger row carries a motif
pub fn validate_motif(motif: &str) -> Result<(), &'static str> {
    if motif.trim().is_empty() {
        return Err("A reason is required for every stock movement");
    }
    if motif.len() > 500 {
        return Err("Reason must be at most 500 characters");
    }
    Ok(())
}

/// Leftover quantities may be zero (recorded as "nothing left") but never negative
pub fn validate_leftover_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity < Decimal::ZERO {
        return Err("Leftover quantity cannot be negative");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn plan(entries: &[(&str, u32)]) -> ProductionPlan {
        ProductionPlan::new(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn test_quantity_to_produce() {
        assert!(validate_quantity_to_produce(1).is_ok());
        assert!(validate_quantity_to_produce(0).is_err());
    }

    #[test]
    fn test_plan_must_match_quantity() {
        assert!(validate_plan_matches_quantity(&plan(&[("s", 10), ("m", 15)]), 25).is_ok());
        assert!(validate_plan_matches_quantity(&plan(&[("s", 10), ("m", 15)]), 20).is_err());
        assert!(validate_plan_matches_quantity(&plan(&[]), 0).is_err());
        assert!(validate_plan_matches_quantity(&plan(&[(" ", 3)]), 3).is_err());
    }

    #[test]
    fn test_positive_quantity() {
        assert!(validate_positive_quantity(Decimal::new(5, 1)).is_ok());
        assert!(validate_positive_quantity(Decimal::ZERO).is_err());
        assert!(validate_positive_quantity(Decimal::from(-2)).is_err());
        assert!(validate_positive_quantity(Decimal::from(9_999_999_999i64)).is_ok());
        assert!(validate_positive_quantity(quantity_limit()).is_err());
        assert!(validate_positive_quantity(Decimal::MAX).is_err());
    }

    #[test]
    fn test_motif() {
        assert!(validate_motif("Production BATCH-20240101-ABC123").is_ok());
        assert!(validate_motif("   ").is_err());
        assert!(validate_motif(&"x".repeat(501)).is_err());
    }

    #[test]
    fn test_leftover_quantity() {
        assert!(validate_leftover_quantity(Decimal::ZERO).is_ok());
        assert!(validate_leftover_quantity(Decimal::from(-1)).is_err());
    }
}
