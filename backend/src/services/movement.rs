//! Movement engine
//!
//! Single write path for the stock ledger. Every document poster funnels its
//! lines through [`post_movement`], one call per line, inside the document's
//! transaction. The engine appends the ledger entry, keeps the cached
//! quantity in step with the ledger, and drives the average-cost update on
//! purchases.
//!
//! Locking: the stock row for the (product, warehouse) pair is created lazily
//! at zero and then read `FOR UPDATE`, so all movements for a pair serialize
//! on that row for the life of the transaction. The locked read doubles as
//! the pre-movement quantity used by the availability check and the costing
//! recompute.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use shared::validation;

use crate::error::{AppError, AppResult};
use crate::services::costing;

/// Stock movement types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "movement_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Purchase,
    Sale,
    TransferIn,
    TransferOut,
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Purchase => "purchase",
            MovementType::Sale => "sale",
            MovementType::TransferIn => "transfer_in",
            MovementType::TransferOut => "transfer_out",
            MovementType::Adjustment => "adjustment",
        }
    }

    /// Sign convention: inbound entries positive, outbound negative,
    /// adjustments either way but never zero.
    pub fn validate_signed_qty(&self, qty: Decimal) -> Result<(), &'static str> {
        validation::validate_nonzero_qty(qty)?;
        match self {
            MovementType::Purchase | MovementType::TransferIn => {
                if qty < Decimal::ZERO {
                    return Err("Quantity must be positive for inbound movements");
                }
            }
            MovementType::Sale | MovementType::TransferOut => {
                if qty > Decimal::ZERO {
                    return Err("Quantity must be negative for outbound movements");
                }
            }
            MovementType::Adjustment => {}
        }
        Ok(())
    }
}

/// Document a ledger entry was posted from
#[derive(Debug, Clone, Copy)]
pub struct DocumentRef {
    pub table: &'static str,
    pub id: Uuid,
}

/// One appended ledger row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub movement_type: MovementType,
    pub qty: Decimal,
    pub unit_cost: Option<Decimal>,
    pub reason: Option<String>,
    pub ref_table: Option<String>,
    pub ref_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Input for posting one movement
#[derive(Debug, Clone)]
pub struct PostMovement {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub movement_type: MovementType,
    /// Signed: positive adds stock, negative relieves it.
    pub qty: Decimal,
    /// Required for purchases, forbidden otherwise; the engine stamps sale
    /// entries with the current average itself.
    pub unit_cost: Option<Decimal>,
    pub reason: Option<String>,
    pub reference: Option<DocumentRef>,
    pub actor_id: Uuid,
}

impl PostMovement {
    pub fn validate(&self) -> AppResult<()> {
        self.movement_type
            .validate_signed_qty(self.qty)
            .map_err(|message| AppError::Validation {
                field: "qty".to_string(),
                message: message.to_string(),
            })?;

        match (self.movement_type, self.unit_cost) {
            (MovementType::Purchase, None) => {
                return Err(AppError::Validation {
                    field: "unit_cost".to_string(),
                    message: "Unit cost is required for purchases".to_string(),
                });
            }
            (MovementType::Purchase, Some(cost)) => {
                validation::validate_unit_cost(cost).map_err(|message| AppError::Validation {
                    field: "unit_cost".to_string(),
                    message: message.to_string(),
                })?;
            }
            (_, Some(_)) => {
                return Err(AppError::Validation {
                    field: "unit_cost".to_string(),
                    message: "Unit cost is only accepted on purchases".to_string(),
                });
            }
            (_, None) => {}
        }

        if self.movement_type == MovementType::Adjustment {
            let reason = self.reason.as_deref().unwrap_or("");
            validation::validate_reason(reason).map_err(|message| AppError::Validation {
                field: "reason".to_string(),
                message: message.to_string(),
            })?;
        }

        Ok(())
    }
}

/// Append one movement to the ledger and update the derived state for its
/// (product, warehouse) pair. Must run inside the document's transaction.
pub async fn post_movement(
    conn: &mut PgConnection,
    input: &PostMovement,
) -> AppResult<LedgerEntry> {
    input.validate()?;

    ensure_known_product(&mut *conn, input.product_id).await?;
    ensure_known_warehouse(&mut *conn, input.warehouse_id).await?;

    // First movement for a pair creates its stock row, so the lock below
    // always has a row to land on.
    sqlx::query(
        r#"
        INSERT INTO stock_levels (product_id, warehouse_id, qty_on_hand)
        VALUES ($1, $2, 0)
        ON CONFLICT (product_id, warehouse_id) DO NOTHING
        "#,
    )
    .bind(input.product_id)
    .bind(input.warehouse_id)
    .execute(&mut *conn)
    .await?;

    // Row lock serializes all movements for the pair until commit. The
    // quantity read here is also the pre-movement quantity the availability
    // check and the costing recompute both need.
    let on_hand = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT qty_on_hand FROM stock_levels
        WHERE product_id = $1 AND warehouse_id = $2
        FOR UPDATE
        "#,
    )
    .bind(input.product_id)
    .bind(input.warehouse_id)
    .fetch_one(&mut *conn)
    .await?;

    if input.qty < Decimal::ZERO && on_hand < -input.qty {
        return Err(AppError::InsufficientStock {
            product_id: input.product_id,
            warehouse_id: input.warehouse_id,
            on_hand,
            requested: -input.qty,
        });
    }

    // Purchases carry the caller's cost; sales are stamped with the average
    // in force when the entry is written, which is what the COGS report
    // reads back later. Transfers and adjustments carry no cost.
    let unit_cost = match input.movement_type {
        MovementType::Purchase => input.unit_cost,
        MovementType::Sale => {
            Some(costing::current_avg(&mut *conn, input.product_id, input.warehouse_id).await?)
        }
        _ => None,
    };

    let (ref_table, ref_id) = match &input.reference {
        Some(doc) => (Some(doc.table), Some(doc.id)),
        None => (None, None),
    };

    let entry = sqlx::query_as::<_, LedgerEntry>(
        r#"
        INSERT INTO ledger_entries (
            product_id, warehouse_id, movement_type, qty, unit_cost,
            reason, ref_table, ref_id, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, product_id, warehouse_id, movement_type, qty, unit_cost,
                  reason, ref_table, ref_id, created_by, created_at
        "#,
    )
    .bind(input.product_id)
    .bind(input.warehouse_id)
    .bind(input.movement_type)
    .bind(input.qty)
    .bind(unit_cost)
    .bind(&input.reason)
    .bind(ref_table)
    .bind(ref_id)
    .bind(input.actor_id)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        UPDATE stock_levels
        SET qty_on_hand = qty_on_hand + $3, updated_at = NOW()
        WHERE product_id = $1 AND warehouse_id = $2
        "#,
    )
    .bind(input.product_id)
    .bind(input.warehouse_id)
    .bind(input.qty)
    .execute(&mut *conn)
    .await?;

    if input.movement_type == MovementType::Purchase {
        // validate() guarantees the cost is present on purchases
        if let Some(cost) = input.unit_cost {
            costing::apply_purchase(
                &mut *conn,
                input.product_id,
                input.warehouse_id,
                on_hand,
                input.qty,
                cost,
            )
            .await?;
        }
    }

    Ok(entry)
}

/// Referential checks run inside the transaction so a movement can never
/// land against a product or warehouse that was never registered.
pub(crate) async fn ensure_known_product(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> AppResult<()> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id)
            .fetch_one(&mut *conn)
            .await?;

    if !exists {
        return Err(AppError::UnknownProduct(product_id.to_string()));
    }
    Ok(())
}

pub(crate) async fn ensure_known_warehouse(
    conn: &mut PgConnection,
    warehouse_id: Uuid,
) -> AppResult<()> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)")
            .bind(warehouse_id)
            .fetch_one(&mut *conn)
            .await?;

    if !exists {
        return Err(AppError::UnknownWarehouse(warehouse_id.to_string()));
    }
    Ok(())
}
