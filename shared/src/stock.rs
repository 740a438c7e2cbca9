//! Stock arithmetic: availability checks, single movements and ledger reconciliation

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::StockDirection;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("material {0} not found")]
    UnknownMaterial(Uuid),

    #[error("insufficient stock for material {material_id}: required {required}, available {available}")]
    Insufficient {
        material_id: Uuid,
        required: Decimal,
        available: Decimal,
    },

    #[error("movement quantity for material {0} must be positive")]
    NonPositiveQuantity(Uuid),

    #[error("quantity or cost for material {0} is out of range")]
    OutOfRange(Uuid),
}

/// Exclusive upper bound for stored quantities and stock levels (`NUMERIC(14,4)`)
pub fn quantity_limit() -> Decimal {
    Decimal::from(10_000_000_000i64)
}

/// Material ids in the order their rows must be locked: ascending, each once
pub fn lock_order<I>(ids: I) -> Vec<Uuid>
where
    I: IntoIterator<Item = Uuid>,
{
    ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Verify every requirement against the available stock before anything is mutated.
///
/// Fails on the first material (in iteration order) that is unknown or short.
pub fn check_availability<I>(needs: I, available: &HashMap<Uuid, Decimal>) -> Result<(), StockError>
where
    I: IntoIterator<Item = (Uuid, Decimal)>,
{
    for (material_id, required) in needs {
        let on_hand = *available
            .get(&material_id)
            .ok_or(StockError::UnknownMaterial(material_id))?;
        if required > on_hand {
            return Err(StockError::Insufficient {
                material_id,
                required,
                available: on_hand,
            });
        }
    }
    Ok(())
}

/// New stock level after one movement. Outgoing movements never take stock below zero;
/// incoming movements have no ceiling.
pub fn apply_movement(
    material_id: Uuid,
    current: Decimal,
    direction: StockDirection,
    quantity: Decimal,
) -> Result<Decimal, StockError> {
    if quantity <= Decimal::ZERO {
        return Err(StockError::NonPositiveQuantity(material_id));
    }
    if direction == StockDirection::Out && quantity > current {
        return Err(StockError::Insufficient {
            material_id,
            required: quantity,
            available: current,
        });
    }
    let next = current
        .checked_add(direction.signed(quantity))
        .ok_or(StockError::OutOfRange(material_id))?;
    if next >= quantity_limit() {
        return Err(StockError::OutOfRange(material_id));
    }
    Ok(next)
}

/// Value of one movement at the material's unit price
pub fn movement_cost(material_id: Uuid, quantity: Decimal, unit_price: Decimal) -> Result<Decimal, StockError> {
    quantity
        .checked_mul(unit_price)
        .ok_or(StockError::OutOfRange(material_id))
}

/// Per-piece quantities scaled to the batch size, ordered by material id.
///
/// Every per-piece quantity must be positive and the scaled quantity must fit
/// in a stock column.
pub fn actual_consumption(
    per_piece: &HashMap<Uuid, Decimal>,
    pieces: u32,
) -> Result<BTreeMap<Uuid, Decimal>, StockError> {
    let pieces = Decimal::from(pieces);
    per_piece
        .iter()
        .map(|(&material_id, &quantity)| {
            if quantity <= Decimal::ZERO {
                return Err(StockError::NonPositiveQuantity(material_id));
            }
            let total = quantity
                .checked_mul(pieces)
                .filter(|total| *total < quantity_limit())
                .ok_or(StockError::OutOfRange(material_id))?;
            Ok((material_id, total))
        })
        .collect()
}

/// Comparison of a material's stock counter with what its ledger implies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerReconciliation {
    pub material_id: Uuid,
    pub opening_stock: Decimal,
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub net_movement: Decimal,
    pub expected_stock: Decimal,
    pub actual_stock: Decimal,
    /// `actual_stock - expected_stock`; zero when counter and ledger agree
    pub drift: Decimal,
}

impl LedgerReconciliation {
    pub fn is_balanced(&self) -> bool {
        self.drift.is_zero()
    }
}

pub fn reconcile<I>(
    material_id: Uuid,
    opening_stock: Decimal,
    actual_stock: Decimal,
    movements: I,
) -> LedgerReconciliation
where
    I: IntoIterator<Item = (StockDirection, Decimal)>,
{
    let (total_in, total_out) = movements.into_iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(tin, tout), (direction, quantity)| match direction {
            StockDirection::In => (tin + quantity, tout),
            StockDirection::Out => (tin, tout + quantity),
        },
    );
    let net_movement = total_in - total_out;
    let expected_stock = opening_stock + net_movement;

    LedgerReconciliation {
        material_id,
        opening_stock,
        total_in,
        total_out,
        net_movement,
        expected_stock,
        actual_stock,
        drift: actual_stock - expected_stock,
    }
}
