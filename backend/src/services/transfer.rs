//! Transfer posting service
//!
//! A transfer is a matched pair of ledger entries, transfer_out at the source
//! and transfer_in at the destination, posted in one transaction. There is no
//! header table; the pair itself is the document. Averages are untouched:
//! the destination keeps whatever average it already had.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::validation;

use crate::error::{AppError, AppResult};
use crate::services::movement::{self, LedgerEntry, MovementType, PostMovement};

/// Transfer posting service
#[derive(Clone)]
pub struct TransferService {
    db: PgPool,
    max_attempts: u32,
}

/// Input for posting a transfer by ids
#[derive(Debug, Deserialize)]
pub struct TransferInput {
    pub product_id: Uuid,
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub qty: Decimal,
}

/// Input for posting a transfer by natural keys
#[derive(Debug, Deserialize)]
pub struct TransferByKeysInput {
    pub sku: String,
    pub from_code: String,
    pub to_code: String,
    pub qty: Decimal,
}

/// The posted pair: out entry first, in entry second
#[derive(Debug, serde::Serialize)]
pub struct TransferOutcome {
    pub out_entry: LedgerEntry,
    pub in_entry: LedgerEntry,
}

impl TransferService {
    /// Create a new TransferService instance
    pub fn new(db: PgPool, max_attempts: u32) -> Self {
        Self { db, max_attempts }
    }

    /// Post a transfer between two warehouses
    pub async fn post(&self, actor_id: Uuid, input: TransferInput) -> AppResult<TransferOutcome> {
        validate_transfer_input(&input)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_post(actor_id, &input).await {
                Err(err) if err.is_serialization_conflict() => {
                    if attempt >= self.max_attempts {
                        return Err(AppError::Conflict(
                            "Transfer could not be posted after repeated transaction conflicts"
                                .to_string(),
                        ));
                    }
                    tracing::warn!(attempt, "transfer post hit a transaction conflict, retrying");
                }
                result => return result,
            }
        }
    }

    /// Post a transfer identified by SKU and warehouse codes
    pub async fn post_by_keys(
        &self,
        actor_id: Uuid,
        input: TransferByKeysInput,
    ) -> AppResult<TransferOutcome> {
        if input.from_code == input.to_code {
            return Err(AppError::SameWarehouseTransfer);
        }

        let product_id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM products WHERE sku = $1")
            .bind(&input.sku)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::UnknownProduct(input.sku.clone()))?;

        let from_warehouse_id =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM warehouses WHERE code = $1")
                .bind(&input.from_code)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::UnknownWarehouse(input.from_code.clone()))?;

        let to_warehouse_id =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM warehouses WHERE code = $1")
                .bind(&input.to_code)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::UnknownWarehouse(input.to_code.clone()))?;

        self.post(
            actor_id,
            TransferInput {
                product_id,
                from_warehouse_id,
                to_warehouse_id,
                qty: input.qty,
            },
        )
        .await
    }

    async fn try_post(&self, actor_id: Uuid, input: &TransferInput) -> AppResult<TransferOutcome> {
        let mut tx = self.db.begin().await?;

        // Out first: the source availability check must pass before the
        // destination gains anything.
        let out_entry = movement::post_movement(
            &mut *tx,
            &PostMovement {
                product_id: input.product_id,
                warehouse_id: input.from_warehouse_id,
                movement_type: MovementType::TransferOut,
                qty: -input.qty,
                unit_cost: None,
                reason: None,
                reference: None,
                actor_id,
            },
        )
        .await?;

        let in_entry = movement::post_movement(
            &mut *tx,
            &PostMovement {
                product_id: input.product_id,
                warehouse_id: input.to_warehouse_id,
                movement_type: MovementType::TransferIn,
                qty: input.qty,
                unit_cost: None,
                reason: None,
                reference: None,
                actor_id,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(TransferOutcome {
            out_entry,
            in_entry,
        })
    }
}

fn validate_transfer_input(input: &TransferInput) -> AppResult<()> {
    if input.from_warehouse_id == input.to_warehouse_id {
        return Err(AppError::SameWarehouseTransfer);
    }

    validation::validate_positive_qty(input.qty).map_err(|message| AppError::Validation {
        field: "qty".to_string(),
        message: message.to_string(),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_rejects_same_warehouse() {
        let warehouse_id = Uuid::new_v4();
        let input = TransferInput {
            product_id: Uuid::new_v4(),
            from_warehouse_id: warehouse_id,
            to_warehouse_id: warehouse_id,
            qty: dec("5"),
        };
        assert!(matches!(
            validate_transfer_input(&input),
            Err(AppError::SameWarehouseTransfer)
        ));
    }

    #[test]
    fn test_rejects_non_positive_qty() {
        let input = TransferInput {
            product_id: Uuid::new_v4(),
            from_warehouse_id: Uuid::new_v4(),
            to_warehouse_id: Uuid::new_v4(),
            qty: dec("0"),
        };
        assert!(validate_transfer_input(&input).is_err());
    }

    #[test]
    fn test_accepts_distinct_warehouses() {
        let input = TransferInput {
            product_id: Uuid::new_v4(),
            from_warehouse_id: Uuid::new_v4(),
            to_warehouse_id: Uuid::new_v4(),
            qty: dec("5"),
        };
        assert!(validate_transfer_input(&input).is_ok());
    }
}
