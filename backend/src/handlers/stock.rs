//! HTTP handlers for stock level endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::stock::{AvgCost, RebuildOutcome, StockFilter, StockRow, StockService};
use crate::AppState;

/// Query identifying one product and warehouse pair
#[derive(Deserialize)]
pub struct AvgCostQuery {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
}

/// Get stock levels, optionally filtered by product or warehouse
pub async fn get_stock(
    State(state): State<AppState>,
    Query(filter): Query<StockFilter>,
) -> AppResult<Json<Vec<StockRow>>> {
    let service = StockService::new(state.db);
    let rows = service.list(filter).await?;
    Ok(Json(rows))
}

/// Get the moving-average cost for a product at a warehouse
pub async fn get_avg_cost(
    State(state): State<AppState>,
    Query(query): Query<AvgCostQuery>,
) -> AppResult<Json<AvgCost>> {
    let service = StockService::new(state.db);
    let avg = service
        .avg_cost(query.product_id, query.warehouse_id)
        .await?;
    Ok(Json(avg))
}

/// Rebuild stock levels and cost averages by replaying the ledger
pub async fn rebuild_stock(
    State(state): State<AppState>,
    Query(filter): Query<StockFilter>,
) -> AppResult<Json<Vec<RebuildOutcome>>> {
    let service = StockService::new(state.db);
    let outcomes = service.rebuild(filter).await?;
    Ok(Json(outcomes))
}
