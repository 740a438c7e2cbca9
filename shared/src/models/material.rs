//! Material catalog and per-product material configuration

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A raw material held in stock (fabric, thread, buttons, zips...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub id: Uuid,
    pub name: String,
    pub color: Option<String>,
    /// Unit of measure label (m, kg, piece...)
    pub unit: String,
    pub unit_price: Decimal,
    /// Stock level at the last independent reset; ledger movements are counted from here
    pub opening_stock: Decimal,
    pub quantity_in_stock: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which product catalog a product belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    #[default]
    Regular,
    /// Sub-contracted production for an external client
    Soustraitance,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Regular => "regular",
            ProductType::Soustraitance => "soustraitance",
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductType {
    type Err = crate::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(ProductType::Regular),
            "soustraitance" => Ok(ProductType::Soustraitance),
            other => Err(crate::ParseEnumError::new("product_type", other)),
        }
    }
}

/// Size restriction of a configuration row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SizeRestriction {
    /// Applies to every planned piece
    AllSizes,
    /// Applies only to pieces of this size label (as configured)
    Size(String),
}

impl SizeRestriction {
    /// Normalize a raw size column: `null`, blank and `none` mean "every size"
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None => SizeRestriction::AllSizes,
            Some(s) if s.is_empty() || s.eq_ignore_ascii_case("none") => {
                SizeRestriction::AllSizes
            }
            Some(s) => SizeRestriction::Size(s.to_string()),
        }
    }

    /// Key used for duplicate detection. Folds ASCII case only, the same way
    /// [`ProductionPlan::pieces_for_size`](crate::ProductionPlan::pieces_for_size) matches labels.
    pub fn key(&self) -> Option<String> {
        match self {
            SizeRestriction::AllSizes => None,
            SizeRestriction::Size(label) => Some(label.to_ascii_lowercase()),
        }
    }
}

/// One configuration row: quantity of a material consumed per produced piece
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialRequirement {
    pub material_id: Uuid,
    pub quantity_needed: Decimal,
    /// Raw size column; see [`SizeRestriction::from_raw`]
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl MaterialRequirement {
    pub fn new(material_id: Uuid, quantity_needed: Decimal, size: Option<&str>) -> Self {
        Self {
            material_id,
            quantity_needed,
            size: size.map(str::to_string),
            notes: None,
        }
    }

    pub fn restriction(&self) -> SizeRestriction {
        SizeRestriction::from_raw(self.size.as_deref())
    }
}
