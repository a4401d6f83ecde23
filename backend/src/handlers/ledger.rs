//! HTTP handlers for ledger browsing

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use shared::{PaginatedResponse, Pagination};

use crate::error::AppResult;
use crate::services::ledger::{LedgerFilter, LedgerService};
use crate::services::movement::{LedgerEntry, MovementType};
use crate::AppState;

/// Query parameters for ledger listing
#[derive(Deserialize)]
pub struct LedgerQuery {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// List ledger entries, newest first
pub async fn get_ledger(
    State(state): State<AppState>,
    Query(query): Query<LedgerQuery>,
) -> AppResult<Json<PaginatedResponse<LedgerEntry>>> {
    let filter = LedgerFilter {
        product_id: query.product_id,
        warehouse_id: query.warehouse_id,
        movement_type: query.movement_type,
        from: query.from,
        to: query.to,
    };
    let pagination = Pagination {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };

    let service = LedgerService::new(state.db);
    let entries = service.list(filter, pagination).await?;
    Ok(Json(entries))
}
