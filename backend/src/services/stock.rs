//! Stock read surface and derived-state rebuild
//!
//! The cached quantities and averages answer queries; the ledger is the
//! truth. `rebuild` replays the ledger pair by pair and rewrites the caches,
//! reporting any drift it repaired, for recovery after manual data surgery
//! or a costing bug.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::costing;
use crate::services::movement::MovementType;

/// Stock query and rebuild service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Optional (product, warehouse) narrowing for stock queries
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct StockFilter {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
}

/// One cached stock row with display identifiers
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockRow {
    pub product_id: Uuid,
    pub sku: String,
    pub product_name: String,
    pub warehouse_id: Uuid,
    pub warehouse_code: String,
    pub warehouse_name: String,
    pub qty_on_hand: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Average cost for one pair
#[derive(Debug, Clone, Serialize)]
pub struct AvgCost {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub avg_cost: Decimal,
}

/// Result of replaying one pair's ledger
#[derive(Debug, Clone, Serialize)]
pub struct RebuildOutcome {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub qty_on_hand: Decimal,
    pub avg_cost: Decimal,
    pub previous_qty: Decimal,
    pub previous_avg: Decimal,
    pub qty_drift: Decimal,
}

/// Ledger columns needed for the replay
#[derive(Debug, FromRow)]
struct ReplayRow {
    movement_type: MovementType,
    qty: Decimal,
    unit_cost: Option<Decimal>,
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List cached stock rows, optionally narrowed to a product or warehouse
    pub async fn list(&self, filter: StockFilter) -> AppResult<Vec<StockRow>> {
        let rows = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT s.product_id, p.sku, p.name AS product_name,
                   s.warehouse_id, w.code AS warehouse_code, w.name AS warehouse_name,
                   s.qty_on_hand, s.updated_at
            FROM stock_levels s
            JOIN products p ON p.id = s.product_id
            JOIN warehouses w ON w.id = s.warehouse_id
            WHERE ($1::uuid IS NULL OR s.product_id = $1)
              AND ($2::uuid IS NULL OR s.warehouse_id = $2)
            ORDER BY w.code, p.sku
            "#,
        )
        .bind(filter.product_id)
        .bind(filter.warehouse_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Current moving average for a pair; zero when never purchased.
    pub async fn avg_cost(&self, product_id: Uuid, warehouse_id: Uuid) -> AppResult<AvgCost> {
        let mut conn = self.db.acquire().await?;
        let avg_cost = costing::current_avg(&mut conn, product_id, warehouse_id).await?;

        Ok(AvgCost {
            product_id,
            warehouse_id,
            avg_cost,
        })
    }

    /// Replay the ledger and rewrite the caches for every pair the filter
    /// matches. Each pair is its own transaction under the same row lock the
    /// engine takes, so rebuilds never race live postings.
    pub async fn rebuild(&self, filter: StockFilter) -> AppResult<Vec<RebuildOutcome>> {
        let pairs = sqlx::query_as::<_, (Uuid, Uuid)>(
            r#"
            SELECT DISTINCT product_id, warehouse_id FROM ledger_entries
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR warehouse_id = $2)
            UNION
            SELECT product_id, warehouse_id FROM stock_levels
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR warehouse_id = $2)
            "#,
        )
        .bind(filter.product_id)
        .bind(filter.warehouse_id)
        .fetch_all(&self.db)
        .await?;

        let mut outcomes = Vec::with_capacity(pairs.len());
        for (product_id, warehouse_id) in pairs {
            let outcome = self.rebuild_pair(product_id, warehouse_id).await?;
            if !outcome.qty_drift.is_zero() {
                tracing::warn!(
                    product_id = %product_id,
                    warehouse_id = %warehouse_id,
                    drift = %outcome.qty_drift,
                    "stock cache had drifted from the ledger"
                );
            }
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    async fn rebuild_pair(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> AppResult<RebuildOutcome> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO stock_levels (product_id, warehouse_id, qty_on_hand)
            VALUES ($1, $2, 0)
            ON CONFLICT (product_id, warehouse_id) DO NOTHING
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .execute(&mut *tx)
        .await?;

        let previous_qty = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT qty_on_hand FROM stock_levels
            WHERE product_id = $1 AND warehouse_id = $2
            FOR UPDATE
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_one(&mut *tx)
        .await?;

        let previous_avg = costing::current_avg(&mut *tx, product_id, warehouse_id).await?;

        let entries = sqlx::query_as::<_, ReplayRow>(
            r#"
            SELECT movement_type, qty, unit_cost
            FROM ledger_entries
            WHERE product_id = $1 AND warehouse_id = $2
            ORDER BY created_at, seq
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_all(&mut *tx)
        .await?;

        // Same fold the engine applies entry by entry: the quantity before
        // each purchase weights that purchase into the average.
        let mut qty_on_hand = Decimal::ZERO;
        let mut avg_cost = Decimal::ZERO;
        for entry in &entries {
            if entry.movement_type == MovementType::Purchase {
                let unit_cost = entry.unit_cost.unwrap_or(Decimal::ZERO);
                avg_cost = shared::costing::moving_average_rounded(
                    qty_on_hand,
                    avg_cost,
                    entry.qty,
                    unit_cost,
                );
            }
            qty_on_hand += entry.qty;
        }

        sqlx::query(
            r#"
            UPDATE stock_levels
            SET qty_on_hand = $3, updated_at = NOW()
            WHERE product_id = $1 AND warehouse_id = $2
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .bind(qty_on_hand)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO cost_averages (product_id, warehouse_id, avg_cost)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, warehouse_id)
            DO UPDATE SET avg_cost = EXCLUDED.avg_cost, updated_at = NOW()
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .bind(avg_cost)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RebuildOutcome {
            product_id,
            warehouse_id,
            qty_on_hand,
            avg_cost,
            previous_qty,
            previous_avg,
            qty_drift: qty_on_hand - previous_qty,
        })
    }
}
