//! Error handling for the StockLedger backend
//!
//! Business failures are values, not transport responses: services return
//! `AppError` through `?` and the mapping to an HTTP status and coded JSON
//! body happens exactly once, here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    #[error("Unknown warehouse: {0}")]
    UnknownWarehouse(String),

    #[error("Unknown supplier: {0}")]
    UnknownSupplier(String),

    #[error("Source and destination warehouse must differ")]
    SameWarehouseTransfer,

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error(
        "Insufficient stock for product {product_id} in warehouse {warehouse_id}: \
         on hand {on_hand}, requested {requested}"
    )]
    InsufficientStock {
        product_id: Uuid,
        warehouse_id: Uuid,
        on_hand: Decimal,
        requested: Decimal,
    },

    #[error("Transaction conflict: {0}")]
    Conflict(String),

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
    /// True for Postgres serialization failures (40001) and deadlocks
    /// (40P01), which are safe to retry as a whole document.
    pub fn is_serialization_conflict(&self) -> bool {
        match self {
            AppError::DatabaseError(sqlx::Error::Database(db_err)) => {
                matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
            }
            _ => false,
        }
    }
}

/// True when a sqlx error is a Postgres unique constraint violation (23505).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "UNAUTHORIZED".to_string(),
                    message: message.clone(),
                    field: None,
                },
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::UnknownProduct(identifier) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "PRODUCT_NOT_FOUND".to_string(),
                    message: format!("Product not found: {}", identifier),
                    field: None,
                },
            ),
            AppError::UnknownWarehouse(identifier) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "WAREHOUSE_NOT_FOUND".to_string(),
                    message: format!("Warehouse not found: {}", identifier),
                    field: None,
                },
            ),
            AppError::UnknownSupplier(identifier) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "SUPPLIER_NOT_FOUND".to_string(),
                    message: format!("Supplier not found: {}", identifier),
                    field: None,
                },
            ),
            AppError::SameWarehouseTransfer => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "SAME_WAREHOUSE".to_string(),
                    message: "Source and destination warehouse must differ".to_string(),
                    field: None,
                },
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "DUPLICATE_ENTRY".to_string(),
                    message: format!("A record with this {} already exists", field),
                    field: Some(field.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message: format!("{} not found", resource),
                    field: None,
                },
            ),
            AppError::InsufficientStock { .. } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message: self.to_string(),
                    field: None,
                },
            ),
            AppError::Conflict(message) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "TRANSACTION_CONFLICT".to_string(),
                    message: message.clone(),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message: "A database error occurred".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: message.clone(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred".to_string(),
                    field: None,
                },
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
