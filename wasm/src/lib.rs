//! WebAssembly module for the atelier production back office
//!
//! Provides client-side computation for:
//! - Material requirement previews for a production plan
//! - Plan validation before a batch is submitted
//! - Stock availability checks against a cached stock snapshot

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::requirements::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

#[derive(Serialize)]
struct RequirementPreview {
    materials: Vec<MaterialCost>,
    total_cost: Decimal,
    duplicates: Vec<DuplicateConfiguration>,
}

fn js_err(context: &str, e: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&format!("{}: {}", context, e)).into()
}

#[cfg(target_arch = "wasm32")]
fn warn_duplicates(duplicates: &[DuplicateConfiguration]) {
    for dup in duplicates {
        web_sys::console::warn_1(&JsValue::from_str(&format!(
            "Duplicate configuration ignored for material {} (size {})",
            dup.material_id,
            dup.size.as_deref().unwrap_or("all")
        )));
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn warn_duplicates(_duplicates: &[DuplicateConfiguration]) {}

/// Preview material needs and cost for a plan.
///
/// `requirements_json`: `[{material_id, quantity_needed, size}]`,
/// `plan_json`: `{"s": 10, "m": 15}`, `prices_json`: `{material_id: unit_price}`.
#[wasm_bindgen]
pub fn preview_requirements(
    requirements_json: &str,
    plan_json: &str,
    prices_json: &str,
) -> Result<String, JsValue> {
    let rows: Vec<MaterialRequirement> =
        serde_json::from_str(requirements_json).map_err(|e| js_err("Invalid requirements JSON", e))?;
    let plan: ProductionPlan =
        serde_json::from_str(plan_json).map_err(|e| js_err("Invalid plan JSON", e))?;
    let prices: HashMap<Uuid, Decimal> =
        serde_json::from_str(prices_json).map_err(|e| js_err("Invalid prices JSON", e))?;

    let set = calculate_requirements(&rows, &plan).map_err(|e| js_err("Calculation failed", e))?;
    let costs = set.priced(&prices).map_err(|e| js_err("Calculation failed", e))?;
    warn_duplicates(set.duplicates());

    let preview = RequirementPreview {
        materials: costs.lines,
        total_cost: costs.total_cost,
        duplicates: set.duplicates().to_vec(),
    };
    serde_json::to_string(&preview).map_err(|e| js_err("Serialization failed", e))
}

/// Total pieces in a plan
#[wasm_bindgen]
pub fn plan_total_pieces(plan_json: &str) -> Result<f64, JsValue> {
    let plan: ProductionPlan =
        serde_json::from_str(plan_json).map_err(|e| js_err("Invalid plan JSON", e))?;
    Ok(plan.total_pieces() as f64)
}

/// Validate a size breakdown against the planned quantity; returns an error message or empty string
#[wasm_bindgen]
pub fn validate_plan(plan_json: &str, quantity_to_produce: u32) -> String {
    let plan: ProductionPlan = match serde_json::from_str(plan_json) {
        Ok(p) => p,
        Err(e) => return format!("Invalid plan JSON: {}", e),
    };
    match validate_plan_matches_quantity(&plan, quantity_to_produce) {
        Ok(()) => String::new(),
        Err(msg) => msg.to_string(),
    }
}

/// Check requirement totals (`{material_id: quantity}`) against a stock snapshot
/// (`{material_id: on_hand}`); returns the shortage message or empty string
#[wasm_bindgen]
pub fn check_stock(needs_json: &str, stock_json: &str) -> Result<String, JsValue> {
    let needs: HashMap<Uuid, Decimal> =
        serde_json::from_str(needs_json).map_err(|e| js_err("Invalid needs JSON", e))?;
    let stock: HashMap<Uuid, Decimal> =
        serde_json::from_str(stock_json).map_err(|e| js_err("Invalid stock JSON", e))?;

    let mut ordered: Vec<(Uuid, Decimal)> = needs.into_iter().collect();
    ordered.sort_by_key(|(id, _)| *id);

    Ok(match shared::stock::check_availability(ordered, &stock) {
        Ok(()) => String::new(),
        Err(e) => e.to_string(),
    })
}
