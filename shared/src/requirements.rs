//! Material requirement calculation
//!
//! Turns a product's material configuration and a production plan into the
//! total quantity of each material the plan consumes:
//!
//! - rows whose size is `null`, blank or `none` apply to every planned piece
//! - size-specific rows apply only to the pieces planned for that size
//!   (exact label first, then case-insensitive)
//! - a `(material, size)` key is counted once; later duplicates are reported
//!   and ignored
//! - contributions of distinct rows for the same material add up

use std::collections::{BTreeMap, HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{BatchMaterialUsage, MaterialRequirement, ProductionPlan, RestoreSource, SizeRestriction};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequirementError {
    #[error("no materials configured for this product")]
    NoMaterialsConfigured,

    #[error("material {0} has no known unit price")]
    UnknownMaterial(Uuid),

    #[error("quantity or cost for material {0} is out of range")]
    OutOfRange(Uuid),
}

/// A configuration row skipped because its `(material, size)` key was already counted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateConfiguration {
    pub material_id: Uuid,
    /// Case-folded size label, `None` for an all-sizes row
    pub size: Option<String>,
}

/// Total quantity needed per material, in ascending material id order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequirementSet {
    quantities: BTreeMap<Uuid, Decimal>,
    duplicates: Vec<DuplicateConfiguration>,
}

impl RequirementSet {
    pub fn get(&self, material_id: &Uuid) -> Option<Decimal> {
        self.quantities.get(material_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Uuid, Decimal)> + '_ {
        self.quantities.iter().map(|(id, q)| (*id, *q))
    }

    pub fn material_ids(&self) -> Vec<Uuid> {
        self.quantities.keys().copied().collect()
    }

    pub fn quantities(&self) -> &BTreeMap<Uuid, Decimal> {
        &self.quantities
    }

    pub fn duplicates(&self) -> &[DuplicateConfiguration] {
        &self.duplicates
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    /// Attach unit prices and compute per-material and total cost
    pub fn priced(&self, unit_prices: &HashMap<Uuid, Decimal>) -> Result<CostBreakdown, RequirementError> {
        let mut lines = Vec::with_capacity(self.quantities.len());
        let mut total_cost = Decimal::ZERO;

        for (&material_id, &quantity) in &self.quantities {
            let unit_price = *unit_prices
                .get(&material_id)
                .ok_or(RequirementError::UnknownMaterial(material_id))?;
            let line_cost = quantity
                .checked_mul(unit_price)
                .ok_or(RequirementError::OutOfRange(material_id))?;
            total_cost = total_cost
                .checked_add(line_cost)
                .ok_or(RequirementError::OutOfRange(material_id))?;
            lines.push(MaterialCost {
                material_id,
                quantity,
                unit_price,
                total_cost: line_cost,
            });
        }

        Ok(CostBreakdown { lines, total_cost })
    }
}

/// Cost of one material in a requirement set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialCost {
    pub material_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub lines: Vec<MaterialCost>,
    pub total_cost: Decimal,
}

/// Compute the material totals a plan consumes.
///
/// Rows are processed in the given order, which decides which duplicate wins.
pub fn calculate_requirements(
    rows: &[MaterialRequirement],
    plan: &ProductionPlan,
) -> Result<RequirementSet, RequirementError> {
    if rows.is_empty() {
        return Err(RequirementError::NoMaterialsConfigured);
    }

    let total_pieces = Decimal::from(plan.total_pieces());
    let mut seen: HashSet<(Uuid, Option<String>)> = HashSet::with_capacity(rows.len());
    let mut set = RequirementSet::default();

    for row in rows {
        let restriction = row.restriction();
        let key = (row.material_id, restriction.key());
        if !seen.insert(key.clone()) {
            set.duplicates.push(DuplicateConfiguration {
                material_id: key.0,
                size: key.1,
            });
            continue;
        }

        let pieces = match &restriction {
            SizeRestriction::AllSizes => total_pieces,
            SizeRestriction::Size(label) => Decimal::from(plan.pieces_for_size(label)),
        };

        let needed = row
            .quantity_needed
            .checked_mul(pieces)
            .ok_or(RequirementError::OutOfRange(row.material_id))?;
        set.add(row.material_id, needed)?;
    }

    Ok(set)
}

impl RequirementSet {
    /// Add a positive contribution; zero and negative amounts are skipped
    fn add(&mut self, material_id: Uuid, quantity: Decimal) -> Result<(), RequirementError> {
        if quantity <= Decimal::ZERO {
            return Ok(());
        }
        let total = self.quantities.entry(material_id).or_insert(Decimal::ZERO);
        *total = total
            .checked_add(quantity)
            .ok_or(RequirementError::OutOfRange(material_id))?;
        Ok(())
    }
}

/// Quantities to give back when a batch is cancelled.
///
/// `configuration` is read for [`RestoreSource::CurrentConfiguration`] and `usage`
/// for [`RestoreSource::RecordedUsage`]. A product left without any configuration
/// restores nothing.
pub fn restore_quantities(
    source: RestoreSource,
    configuration: &[MaterialRequirement],
    plan: &ProductionPlan,
    usage: &[BatchMaterialUsage],
) -> Result<RequirementSet, RequirementError> {
    match source {
        RestoreSource::CurrentConfiguration => match calculate_requirements(configuration, plan) {
            Err(RequirementError::NoMaterialsConfigured) => Ok(RequirementSet::default()),
            other => other,
        },
        RestoreSource::RecordedUsage => {
            let mut set = RequirementSet::default();
            for row in usage {
                set.add(row.material_id, row.quantity_used)?;
            }
            Ok(set)
        }
        RestoreSource::Nothing => Ok(RequirementSet::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(entries: &[(&str, u32)]) -> ProductionPlan {
        ProductionPlan::new(entries.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    #[test]
    fn whole_plan_row_uses_all_pieces() {
        let m = Uuid::new_v4();
        let rows = vec![MaterialRequirement::new(m, Decimal::from(3), None)];
        let set = calculate_requirements(&rows, &ProductionPlan::total(10)).unwrap();
        assert_eq!(set.get(&m), Some(Decimal::from(30)));
    }

    #[test]
    fn general_and_sized_rows_add_up() {
        let m = Uuid::new_v4();
        let rows = vec![
            MaterialRequirement::new(m, Decimal::from(1), Some("none")),
            MaterialRequirement::new(m, Decimal::from(2), Some("S")),
            MaterialRequirement::new(m, Decimal::from(4), Some("M")),
        ];
        let set = calculate_requirements(&rows, &plan(&[("s", 10), ("m", 5)])).unwrap();
        // 15 * 1 + 10 * 2 + 5 * 4
        assert_eq!(set.get(&m), Some(Decimal::from(55)));
        assert!(set.duplicates().is_empty());
    }

    #[test]
    fn duplicate_rows_count_once() {
        let m = Uuid::new_v4();
        let rows = vec![
            MaterialRequirement::new(m, Decimal::from(2), Some("S")),
            MaterialRequirement::new(m, Decimal::from(7), Some("s")),
        ];
        let set = calculate_requirements(&rows, &plan(&[("s", 10)])).unwrap();
        assert_eq!(set.get(&m), Some(Decimal::from(20)));
        assert_eq!(set.duplicates().len(), 1);
    }

    #[test]
    fn zero_quantities_are_skipped() {
        let m = Uuid::new_v4();
        let rows = vec![MaterialRequirement::new(m, Decimal::from(2), Some("XL"))];
        let set = calculate_requirements(&rows, &plan(&[("s", 10)])).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn unconfigured_product_is_an_error() {
        assert_eq!(
            calculate_requirements(&[], &ProductionPlan::total(5)),
            Err(RequirementError::NoMaterialsConfigured)
        );
    }

    #[test]
    fn overflowing_requirement_is_out_of_range() {
        let m = Uuid::new_v4();
        let huge = Decimal::from_i128_with_scale(5 * 10i128.pow(28), 0);
        let rows = vec![MaterialRequirement::new(m, huge, None)];
        assert_eq!(
            calculate_requirements(&rows, &ProductionPlan::total(2)),
            Err(RequirementError::OutOfRange(m))
        );
    }

    #[test]
    fn overflowing_cost_is_out_of_range() {
        let m = Uuid::new_v4();
        let rows = vec![MaterialRequirement::new(m, Decimal::MAX, None)];
        let set = calculate_requirements(&rows, &ProductionPlan::total(1)).unwrap();
        let prices = HashMap::from([(m, Decimal::TWO)]);
        assert_eq!(set.priced(&prices), Err(RequirementError::OutOfRange(m)));
    }

    #[test]
    fn pricing_needs_every_material() {
        let m = Uuid::new_v4();
        let rows = vec![MaterialRequirement::new(m, Decimal::from(2), None)];
        let set = calculate_requirements(&rows, &ProductionPlan::total(5)).unwrap();
        assert_eq!(
            set.priced(&HashMap::new()),
            Err(RequirementError::UnknownMaterial(m))
        );

        let prices = HashMap::from([(m, Decimal::new(125, 2))]);
        let costs = set.priced(&prices).unwrap();
        assert_eq!(costs.total_cost, Decimal::new(1250, 2));
        assert_eq!(costs.lines[0].quantity, Decimal::from(10));
    }
}
