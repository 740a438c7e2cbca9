//! Stock ledger models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockDirection {
    In,
    Out,
}

impl StockDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockDirection::In => "in",
            StockDirection::Out => "out",
        }
    }

    /// Quantity with the sign this direction applies to the stock counter
    pub fn signed(&self, quantity: Decimal) -> Decimal {
        match self {
            StockDirection::In => quantity,
            StockDirection::Out => -quantity,
        }
    }
}

impl std::str::FromStr for StockDirection {
    type Err = crate::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(StockDirection::In),
            "out" => Ok(StockDirection::Out),
            other => Err(crate::ParseEnumError::new("direction", other)),
        }
    }
}

/// Immutable ledger row recording one stock movement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: Uuid,
    pub material_id: Uuid,
    pub direction: StockDirection,
    pub quantity: Decimal,
    /// Unit of measure the quantity is expressed in
    pub quantity_type: String,
    pub unit_price: Decimal,
    pub total_cost: Decimal,
    pub motif: String,
    /// Batch reference, order id...
    pub reference: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl StockTransaction {
    pub fn signed_quantity(&self) -> Decimal {
        self.direction.signed(self.quantity)
    }
}

/// A movement to be written through the ledger
#[derive(Debug, Clone)]
pub struct StockMovement {
    pub material_id: Uuid,
    pub direction: StockDirection,
    pub quantity: Decimal,
    pub motif: String,
    pub reference: Option<String>,
    pub user_id: Option<Uuid>,
}

impl StockMovement {
    pub fn out(material_id: Uuid, quantity: Decimal, motif: impl Into<String>) -> Self {
        Self {
            material_id,
            direction: StockDirection::Out,
            quantity,
            motif: motif.into(),
            reference: None,
            user_id: None,
        }
    }

    pub fn restore(material_id: Uuid, quantity: Decimal, motif: impl Into<String>) -> Self {
        Self {
            direction: StockDirection::In,
            ..Self::out(material_id, quantity, motif)
        }
    }

    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }

    pub fn by(mut self, user_id: Option<Uuid>) -> Self {
        self.user_id = user_id;
        self
    }
}
