//! HTTP handlers for sale posting and listing

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::ActingUser;
use crate::services::sale::{Sale, SaleInput, SaleService, SaleWithItems};
use crate::AppState;

/// Post a sale document
pub async fn create_sale(
    State(state): State<AppState>,
    actor: ActingUser,
    Json(input): Json<SaleInput>,
) -> AppResult<Json<Sale>> {
    let service = SaleService::new(state.db.clone(), state.config.posting.max_attempts);
    let sale = service.post(actor.0.actor_id, input).await?;
    Ok(Json(sale))
}

/// List recent sales with their lines
pub async fn list_sales(State(state): State<AppState>) -> AppResult<Json<Vec<SaleWithItems>>> {
    let service = SaleService::new(state.db.clone(), state.config.posting.max_attempts);
    let sales = service.list().await?;
    Ok(Json(sales))
}
