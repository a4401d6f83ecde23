//! HTTP handlers for stock adjustment posting

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::ActingUser;
use crate::services::adjustment::{AdjustmentInput, AdjustmentService};
use crate::services::movement::LedgerEntry;
use crate::AppState;

/// Post a manual stock adjustment
pub async fn create_adjustment(
    State(state): State<AppState>,
    actor: ActingUser,
    Json(input): Json<AdjustmentInput>,
) -> AppResult<Json<LedgerEntry>> {
    let service = AdjustmentService::new(state.db.clone(), state.config.posting.max_attempts);
    let entry = service.post(actor.0.actor_id, input).await?;
    Ok(Json(entry))
}
