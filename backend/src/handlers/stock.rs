//! HTTP handlers for direct stock movements

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::ledger::{
    AdjustStockInput, DeductMaterialsInput, DeductedMaterial, LedgerEntry, LedgerService,
};
use crate::AppState;

/// Move stock of one material in or out
pub async fn adjust_material_stock(
    State(state): State<AppState>,
    Path(material_id): Path<Uuid>,
    Json(input): Json<AdjustStockInput>,
) -> AppResult<Json<LedgerEntry>> {
    let service = LedgerService::new(state.db);
    let entry = service.adjust(material_id, input).await?;
    Ok(Json(entry))
}

/// Deduct several materials in one transaction
pub async fn deduct_materials_stock(
    State(state): State<AppState>,
    Json(input): Json<DeductMaterialsInput>,
) -> AppResult<Json<Vec<DeductedMaterial>>> {
    let service = LedgerService::new(state.db);
    let deducted = service.deduct_materials(input).await?;
    Ok(Json(deducted))
}
