//! Ledger read service
//!
//! Browse the append-only ledger: audit trails for a product, a warehouse, a
//! movement type or a date window. Strictly read-only; writes go through the
//! movement engine.

use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::{PaginatedResponse, Pagination, PaginationMeta};

use crate::error::AppResult;
use crate::services::movement::{LedgerEntry, MovementType};

/// Ledger browsing service
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

/// Filters for ledger listing; all optional, combined with AND
#[derive(Debug, Default, Deserialize)]
pub struct LedgerFilter {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl LedgerService {
    /// Create a new LedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List ledger entries, newest first
    pub async fn list(
        &self,
        filter: LedgerFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<LedgerEntry>> {
        let pagination = pagination.normalized();

        let total_items = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM ledger_entries
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR warehouse_id = $2)
              AND ($3::movement_type IS NULL OR movement_type = $3)
              AND ($4::date IS NULL OR created_at >= $4)
              AND ($5::date IS NULL OR created_at < ($5::date + INTERVAL '1 day'))
            "#,
        )
        .bind(filter.product_id)
        .bind(filter.warehouse_id)
        .bind(filter.movement_type)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.db)
        .await?;

        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, product_id, warehouse_id, movement_type, qty, unit_cost,
                   reason, ref_table, ref_id, created_by, created_at
            FROM ledger_entries
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR warehouse_id = $2)
              AND ($3::movement_type IS NULL OR movement_type = $3)
              AND ($4::date IS NULL OR created_at >= $4)
              AND ($5::date IS NULL OR created_at < ($5::date + INTERVAL '1 day'))
            ORDER BY created_at DESC, seq DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(filter.product_id)
        .bind(filter.warehouse_id)
        .bind(filter.movement_type)
        .bind(filter.from)
        .bind(filter.to)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: entries,
            pagination: PaginationMeta::new(pagination, total_items as u64),
        })
    }
}
