//! Adjustment posting service
//!
//! Cycle counts, damage, shrinkage: a single signed ledger entry with a
//! mandatory reason. Negative adjustments go through the same availability
//! check as any other outbound movement.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::movement::{self, LedgerEntry, MovementType, PostMovement};

/// Adjustment posting service
#[derive(Clone)]
pub struct AdjustmentService {
    db: PgPool,
    max_attempts: u32,
}

/// Input for posting an adjustment
#[derive(Debug, Deserialize)]
pub struct AdjustmentInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    /// Signed: positive found stock, negative lost stock.
    pub qty: Decimal,
    pub reason: String,
}

impl AdjustmentService {
    /// Create a new AdjustmentService instance
    pub fn new(db: PgPool, max_attempts: u32) -> Self {
        Self { db, max_attempts }
    }

    /// Post a stock adjustment
    pub async fn post(&self, actor_id: Uuid, input: AdjustmentInput) -> AppResult<LedgerEntry> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_post(actor_id, &input).await {
                Err(err) if err.is_serialization_conflict() => {
                    if attempt >= self.max_attempts {
                        return Err(AppError::Conflict(
                            "Adjustment could not be posted after repeated transaction conflicts"
                                .to_string(),
                        ));
                    }
                    tracing::warn!(
                        attempt,
                        "adjustment post hit a transaction conflict, retrying"
                    );
                }
                result => return result,
            }
        }
    }

    async fn try_post(&self, actor_id: Uuid, input: &AdjustmentInput) -> AppResult<LedgerEntry> {
        let mut tx = self.db.begin().await?;

        // Shape checks (non-zero qty, reason present) live in the engine.
        let entry = movement::post_movement(
            &mut *tx,
            &PostMovement {
                product_id: input.product_id,
                warehouse_id: input.warehouse_id,
                movement_type: MovementType::Adjustment,
                qty: input.qty,
                unit_cost: None,
                reason: Some(input.reason.clone()),
                reference: None,
                actor_id,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(entry)
    }
}
