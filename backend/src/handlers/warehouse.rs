//! HTTP handlers for warehouse catalog endpoints

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::services::warehouse::{UpsertWarehouseInput, Warehouse, WarehouseService};
use crate::AppState;

/// List all warehouses
pub async fn list_warehouses(State(state): State<AppState>) -> AppResult<Json<Vec<Warehouse>>> {
    let service = WarehouseService::new(state.db);
    let warehouses = service.list().await?;
    Ok(Json(warehouses))
}

/// Create a warehouse, or rename it when the code already exists
pub async fn upsert_warehouse(
    State(state): State<AppState>,
    Json(input): Json<UpsertWarehouseInput>,
) -> AppResult<Json<Warehouse>> {
    let service = WarehouseService::new(state.db);
    let warehouse = service.upsert(input).await?;
    Ok(Json(warehouse))
}
