//! HTTP handlers for batch leftovers

use axum::{
    extract::{Path, State},
    Json,
};
use shared::Leftover;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::leftover::{LeftoverService, ReaddLeftoversInput, ReaddResult, SaveLeftoversInput};
use crate::AppState;

/// List leftovers of a batch
pub async fn list_leftovers(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Vec<Leftover>>> {
    let service = LeftoverService::new(state.db);
    let leftovers = service.list(batch_id).await?;
    Ok(Json(leftovers))
}

/// Save leftovers of a completed batch
pub async fn save_leftovers(
    State(state): State<AppState>,
    Json(input): Json<SaveLeftoversInput>,
) -> AppResult<Json<Vec<Leftover>>> {
    let service = LeftoverService::new(state.db);
    let leftovers = service.save(input).await?;
    Ok(Json(leftovers))
}

/// Return reusable leftovers to stock
pub async fn readd_leftovers(
    State(state): State<AppState>,
    Json(input): Json<ReaddLeftoversInput>,
) -> AppResult<Json<ReaddResult>> {
    let service = LeftoverService::new(state.db);
    let result = service.readd_to_stock(input).await?;
    Ok(Json(result))
}
