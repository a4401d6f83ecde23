//! HTTP handlers for purchase posting and listing

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::ActingUser;
use crate::services::purchase::{
    Purchase, PurchaseByKeysInput, PurchaseInput, PurchaseService, PurchaseWithItems,
};
use crate::AppState;

/// Post a purchase document
pub async fn create_purchase(
    State(state): State<AppState>,
    actor: ActingUser,
    Json(input): Json<PurchaseInput>,
) -> AppResult<Json<Purchase>> {
    let service = PurchaseService::new(state.db.clone(), state.config.posting.max_attempts);
    let purchase = service.post(actor.0.actor_id, input).await?;
    Ok(Json(purchase))
}

/// Post a purchase identified by supplier name, SKUs and warehouse codes
pub async fn create_purchase_by_keys(
    State(state): State<AppState>,
    actor: ActingUser,
    Json(input): Json<PurchaseByKeysInput>,
) -> AppResult<Json<Purchase>> {
    let service = PurchaseService::new(state.db.clone(), state.config.posting.max_attempts);
    let purchase = service.post_by_keys(actor.0.actor_id, input).await?;
    Ok(Json(purchase))
}

/// List recent purchases with their lines
pub async fn list_purchases(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PurchaseWithItems>>> {
    let service = PurchaseService::new(state.db.clone(), state.config.posting.max_attempts);
    let purchases = service.list().await?;
    Ok(Json(purchases))
}
