//! Batch leftovers

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unused material quantity identified after a batch completed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leftover {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub material_id: Uuid,
    pub leftover_quantity: Decimal,
    pub is_reusable: bool,
    /// Set once when the quantity went back to stock; never cleared
    pub readded_to_stock: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Leftover {
    /// Reusable and not already returned
    pub fn can_readd(&self) -> bool {
        self.is_reusable && !self.readded_to_stock
    }

    /// Quantity that goes back to stock on re-add; a zero leftover is only flagged
    pub fn restock_quantity(&self) -> Option<Decimal> {
        (self.can_readd() && self.leftover_quantity > Decimal::ZERO).then_some(self.leftover_quantity)
    }
}

/// Pick the requested leftovers that may go back to stock.
///
/// Ids that do not match, or leftovers failing the predicate, are dropped silently.
pub fn select_readdable<'a>(leftovers: &'a [Leftover], ids: &[Uuid]) -> Vec<&'a Leftover> {
    leftovers
        .iter()
        .filter(|l| ids.contains(&l.id) && l.can_readd())
        .collect()
}
