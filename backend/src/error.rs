//! Error handling for the atelier production server
//!
//! Every failure is rendered as `{ "success": false, "code", "message" }` with an
//! HTTP status matching its class.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{BatchRuleError, RequirementError, StockError};
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Insufficient stock for material {material_id}: required {required}, available {available}")]
    InsufficientStock {
        material_id: Uuid,
        material_name: Option<String>,
        required: Decimal,
        available: Decimal,
    },

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a field-level validation failure
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// A refused batch rule, naming the batch
    pub fn batch_rule(reference: &str, e: BatchRuleError) -> Self {
        let message = format!("Batch {}: {}", reference, e);
        match e {
            BatchRuleError::AlreadyDeducted(_) => AppError::Conflict {
                resource: "batch".to_string(),
                message,
            },
            BatchRuleError::Closed(_) | BatchRuleError::InvalidTransition { .. } => {
                AppError::InvalidStateTransition(message)
            }
        }
    }

    /// Attach a material name to a stock shortage
    pub fn with_material_name(self, name: Option<&str>) -> Self {
        match self {
            AppError::InsufficientStock {
                material_id,
                required,
                available,
                ..
            } => AppError::InsufficientStock {
                material_id,
                material_name: name.map(str::to_string),
                required,
                available,
            },
            other => other,
        }
    }
}

impl From<StockError> for AppError {
    fn from(e: StockError) -> Self {
        match e {
            StockError::UnknownMaterial(id) => AppError::NotFound(format!("Material {}", id)),
            StockError::Insufficient {
                material_id,
                required,
                available,
            } => AppError::InsufficientStock {
                material_id,
                material_name: None,
                required,
                available,
            },
            StockError::NonPositiveQuantity(_) | StockError::OutOfRange(_) => {
                AppError::validation("quantity", e.to_string())
            }
        }
    }
}

impl From<RequirementError> for AppError {
    fn from(e: RequirementError) -> Self {
        match e {
            RequirementError::NoMaterialsConfigured => {
                AppError::validation("product_id", "No materials configured for this product")
            }
            RequirementError::UnknownMaterial(id) => {
                AppError::NotFound(format!("Material {}", id))
            }
            RequirementError::OutOfRange(_) => AppError::validation("quantity", e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::ValidationError(e.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn new(code: &str, message: String) -> Self {
        Self {
            success: false,
            code: code.to_string(),
            message,
            field: None,
            details: None,
        }
    }
}

impl AppError {
    fn status_and_body(&self) -> (StatusCode, ErrorResponse) {
        match self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    field: Some(field.clone()),
                    ..ErrorResponse::new("VALIDATION_ERROR", message.clone())
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", msg.clone()),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::InsufficientStock {
                material_id,
                material_name,
                required,
                available,
            } => {
                let label = material_name
                    .clone()
                    .unwrap_or_else(|| material_id.to_string());
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        details: Some(serde_json::json!({
                            "material_id": material_id,
                            "material_name": material_name,
                            "required": required,
                            "available": available,
                        })),
                        ..ErrorResponse::new(
                            "INSUFFICIENT_STOCK",
                            format!(
                                "Insufficient stock for {}: required {}, available {}",
                                label, required, available
                            ),
                        )
                    },
                )
            }
            AppError::InvalidStateTransition(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("INVALID_STATE_TRANSITION", msg.clone()),
            ),
            AppError::Conflict { resource, message } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    field: Some(resource.clone()),
                    ..ErrorResponse::new("CONFLICT", message.clone())
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("DATABASE_ERROR", "A database error occurred".to_string()),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("INTERNAL_ERROR", msg.clone()),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                ),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
