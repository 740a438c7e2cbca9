//! HTTP handlers for production batch endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{Batch, StockTransaction};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::batch::{
    BatchDetail, BatchEstimate, BatchListQuery, BatchService, CancelBatchInput, CancelBatchResult,
    DeductActualInput, DeductActualResult, StartProductionInput, StartProductionResult,
};
use crate::AppState;

fn batch_service(state: AppState) -> BatchService {
    BatchService::new(state.db, state.config.production.clone())
}

/// Start production of a product
pub async fn start_production(
    State(state): State<AppState>,
    Json(input): Json<StartProductionInput>,
) -> AppResult<Json<StartProductionResult>> {
    let result = batch_service(state).start_production(input).await?;
    Ok(Json(result))
}

/// Deduct stock for a deferred batch from actual per-piece consumption
pub async fn deduct_actual_quantities(
    State(state): State<AppState>,
    Json(input): Json<DeductActualInput>,
) -> AppResult<Json<DeductActualResult>> {
    let result = batch_service(state).deduct_actual_quantities(input).await?;
    Ok(Json(result))
}

/// Cancel a batch by reference and restore its materials
pub async fn cancel_batch(
    State(state): State<AppState>,
    Json(input): Json<CancelBatchInput>,
) -> AppResult<Json<CancelBatchResult>> {
    let result = batch_service(state).cancel_batch(input).await?;
    Ok(Json(result))
}

/// List batches
pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<BatchListQuery>,
) -> AppResult<Json<Vec<Batch>>> {
    let batches = batch_service(state).list_batches(query).await?;
    Ok(Json(batches))
}

/// Get a batch with its recorded material usage
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<BatchDetail>> {
    let batch = batch_service(state).get_batch(batch_id).await?;
    Ok(Json(batch))
}

/// Live material estimate for a batch
pub async fn get_batch_estimate(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<BatchEstimate>> {
    let estimate = batch_service(state).current_estimate(batch_id).await?;
    Ok(Json(estimate))
}

/// Ledger rows written for a batch
pub async fn get_batch_transactions(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockTransaction>>> {
    let transactions = batch_service(state).batch_transactions(batch_id).await?;
    Ok(Json(transactions))
}

/// Move a planned batch into production
pub async fn start_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Batch>> {
    let batch = batch_service(state).start_batch(batch_id).await?;
    Ok(Json(batch))
}

/// Mark a batch as finished
pub async fn complete_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Batch>> {
    let batch = batch_service(state).complete_batch(batch_id).await?;
    Ok(Json(batch))
}
