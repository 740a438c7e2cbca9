//! Route definitions for the atelier production API

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/batches", batch_routes())
        .nest("/leftovers", leftover_routes())
        .nest("/materials", material_routes())
        .nest("/stock", stock_routes())
        .route("/products/available", get(handlers::list_available_products))
}

/// Production batch routes
fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_batches).post(handlers::start_production))
        .route(
            "/deduct-actual-quantities",
            post(handlers::deduct_actual_quantities),
        )
        .route("/cancel", post(handlers::cancel_batch))
        .route("/:batch_id", get(handlers::get_batch))
        .route("/:batch_id/estimate", get(handlers::get_batch_estimate))
        .route("/:batch_id/transactions", get(handlers::get_batch_transactions))
        .route("/:batch_id/start", post(handlers::start_batch))
        .route("/:batch_id/complete", post(handlers::complete_batch))
        .route("/:batch_id/leftovers", get(handlers::list_leftovers))
}

/// Leftover routes
fn leftover_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::save_leftovers))
        .route("/readd", post(handlers::readd_leftovers))
}

/// Material routes
fn material_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_materials))
        .route("/:material_id", get(handlers::get_material))
        .route("/:material_id/adjust", post(handlers::adjust_material_stock))
        .route(
            "/:material_id/transactions",
            get(handlers::list_material_transactions),
        )
        .route(
            "/:material_id/reconciliation",
            get(handlers::get_material_reconciliation),
        )
}

/// Stock movement routes
fn stock_routes() -> Router<AppState> {
    Router::new().route("/deduct", post(handlers::deduct_materials_stock))
}
