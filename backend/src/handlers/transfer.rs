//! HTTP handlers for warehouse transfer posting

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::ActingUser;
use crate::services::transfer::{
    TransferByKeysInput, TransferInput, TransferOutcome, TransferService,
};
use crate::AppState;

/// Post a transfer between two warehouses
pub async fn create_transfer(
    State(state): State<AppState>,
    actor: ActingUser,
    Json(input): Json<TransferInput>,
) -> AppResult<Json<TransferOutcome>> {
    let service = TransferService::new(state.db.clone(), state.config.posting.max_attempts);
    let outcome = service.post(actor.0.actor_id, input).await?;
    Ok(Json(outcome))
}

/// Post a transfer identified by SKU and warehouse codes
pub async fn create_transfer_by_keys(
    State(state): State<AppState>,
    actor: ActingUser,
    Json(input): Json<TransferByKeysInput>,
) -> AppResult<Json<TransferOutcome>> {
    let service = TransferService::new(state.db.clone(), state.config.posting.max_attempts);
    let outcome = service.post_by_keys(actor.0.actor_id, input).await?;
    Ok(Json(outcome))
}
