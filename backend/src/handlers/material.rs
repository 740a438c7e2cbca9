//! HTTP handlers for materials and production-ready products

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::{LedgerReconciliation, Material, PaginatedResponse, Pagination, ProductType, StockTransaction};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::batch::BatchService;
use crate::services::configuration::ProductionProduct;
use crate::services::ledger::LedgerService;
use crate::services::material::{MaterialListQuery, MaterialService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailableProductsQuery {
    #[serde(default)]
    pub product_type: ProductType,
}

/// List materials
pub async fn list_materials(
    State(state): State<AppState>,
    Query(query): Query<MaterialListQuery>,
) -> AppResult<Json<Vec<Material>>> {
    let service = MaterialService::new(state.db);
    let materials = service.list(query).await?;
    Ok(Json(materials))
}

/// Get material by ID
pub async fn get_material(
    State(state): State<AppState>,
    Path(material_id): Path<Uuid>,
) -> AppResult<Json<Material>> {
    let service = MaterialService::new(state.db);
    let material = service.get(material_id).await?;
    Ok(Json(material))
}

/// Paginated stock ledger of a material
pub async fn list_material_transactions(
    State(state): State<AppState>,
    Path(material_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<StockTransaction>>> {
    let service = LedgerService::new(state.db);
    let page = service
        .list_material_transactions(material_id, pagination)
        .await?;
    Ok(Json(page))
}

/// Compare a material's stock counter with its ledger
pub async fn get_material_reconciliation(
    State(state): State<AppState>,
    Path(material_id): Path<Uuid>,
) -> AppResult<Json<LedgerReconciliation>> {
    let service = LedgerService::new(state.db);
    let report = service.reconcile(material_id).await?;
    Ok(Json(report))
}

/// Products configured for production and not currently produced
pub async fn list_available_products(
    State(state): State<AppState>,
    Query(query): Query<AvailableProductsQuery>,
) -> AppResult<Json<Vec<ProductionProduct>>> {
    let service = BatchService::new(state.db, state.config.production.clone());
    let products = service.available_products(query.product_type).await?;
    Ok(Json(products))
}
