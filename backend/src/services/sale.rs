//! Sale posting service
//!
//! Mirrors the purchase poster on the outbound side. Before any row is
//! written the whole document is pre-flighted against current stock so a
//! doomed sale fails without burning header ids; the engine then re-checks
//! every line under the row lock, which is the check that actually holds
//! under concurrency.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::validation;

use crate::error::{AppError, AppResult};
use crate::services::movement::{self, DocumentRef, MovementType, PostMovement};

/// Sale posting service
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
    max_attempts: u32,
}

/// Sale header. `customer_id` is a free reference, there is no customer
/// registry to point into.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Sale {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub doc_date: NaiveDate,
    pub bill_no: String,
    pub total: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Sale line joined with product and warehouse identifiers for listings
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SaleItemDetail {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub product_name: String,
    pub warehouse_id: Uuid,
    pub warehouse_code: String,
    pub qty: Decimal,
    pub unit_price: Decimal,
}

/// Sale header with its lines
#[derive(Debug, Clone, Serialize)]
pub struct SaleWithItems {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItemDetail>,
}

/// Input for posting a sale
#[derive(Debug, Deserialize)]
pub struct SaleInput {
    pub customer_id: Option<Uuid>,
    pub doc_date: NaiveDate,
    pub bill_no: String,
    pub items: Vec<SaleLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct SaleLineInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    /// Positive; the poster flips the sign when it writes the ledger entry.
    pub qty: Decimal,
    pub unit_price: Decimal,
}

impl SaleService {
    /// Create a new SaleService instance
    pub fn new(db: PgPool, max_attempts: u32) -> Self {
        Self { db, max_attempts }
    }

    /// Post a sale document
    pub async fn post(&self, actor_id: Uuid, input: SaleInput) -> AppResult<Sale> {
        validate_sale_input(&input)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_post(actor_id, &input).await {
                Err(err) if err.is_serialization_conflict() => {
                    if attempt >= self.max_attempts {
                        return Err(AppError::Conflict(
                            "Sale could not be posted after repeated transaction conflicts"
                                .to_string(),
                        ));
                    }
                    tracing::warn!(attempt, "sale post hit a transaction conflict, retrying");
                }
                result => return result,
            }
        }
    }

    /// List recent sales with their lines
    pub async fn list(&self) -> AppResult<Vec<SaleWithItems>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, customer_id, doc_date, bill_no, total, created_by, created_at
            FROM sales
            ORDER BY created_at DESC
            LIMIT 50
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = sales.iter().map(|s| s.id).collect();
        let items = sqlx::query_as::<_, SaleItemDetail>(
            r#"
            SELECT si.id, si.sale_id, si.product_id, p.sku, p.name AS product_name,
                   si.warehouse_id, w.code AS warehouse_code, si.qty, si.unit_price
            FROM sale_items si
            JOIN products p ON p.id = si.product_id
            JOIN warehouses w ON w.id = si.warehouse_id
            WHERE si.sale_id = ANY($1)
            ORDER BY si.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        Ok(group_items(sales, items))
    }

    async fn try_post(&self, actor_id: Uuid, input: &SaleInput) -> AppResult<Sale> {
        let mut tx = self.db.begin().await?;

        // Fail fast before any write. Unlocked reads: the engine repeats the
        // availability check under the row lock for each line below.
        for line in &input.items {
            movement::ensure_known_product(&mut *tx, line.product_id).await?;
            movement::ensure_known_warehouse(&mut *tx, line.warehouse_id).await?;

            let on_hand = sqlx::query_scalar::<_, Decimal>(
                "SELECT qty_on_hand FROM stock_levels WHERE product_id = $1 AND warehouse_id = $2",
            )
            .bind(line.product_id)
            .bind(line.warehouse_id)
            .fetch_optional(&mut *tx)
            .await?
            .unwrap_or(Decimal::ZERO);

            if on_hand < line.qty {
                return Err(AppError::InsufficientStock {
                    product_id: line.product_id,
                    warehouse_id: line.warehouse_id,
                    on_hand,
                    requested: line.qty,
                });
            }
        }

        let total = shared::costing::document_total(
            input.items.iter().map(|line| (line.qty, line.unit_price)),
        );

        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (customer_id, doc_date, bill_no, total, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, customer_id, doc_date, bill_no, total, created_by, created_at
            "#,
        )
        .bind(input.customer_id)
        .bind(input.doc_date)
        .bind(&input.bill_no)
        .bind(total)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await?;

        for line in &input.items {
            sqlx::query(
                r#"
                INSERT INTO sale_items (sale_id, product_id, warehouse_id, qty, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(sale.id)
            .bind(line.product_id)
            .bind(line.warehouse_id)
            .bind(line.qty)
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await?;

            movement::post_movement(
                &mut *tx,
                &PostMovement {
                    product_id: line.product_id,
                    warehouse_id: line.warehouse_id,
                    movement_type: MovementType::Sale,
                    qty: -line.qty,
                    unit_cost: None,
                    reason: None,
                    reference: Some(DocumentRef {
                        table: "sales",
                        id: sale.id,
                    }),
                    actor_id,
                },
            )
            .await?;
        }

        tx.commit().await?;

        Ok(sale)
    }
}

fn validate_sale_input(input: &SaleInput) -> AppResult<()> {
    validation::validate_code(&input.bill_no).map_err(|message| AppError::Validation {
        field: "bill_no".to_string(),
        message: message.to_string(),
    })?;

    validation::validate_has_lines(input.items.len()).map_err(|message| AppError::Validation {
        field: "items".to_string(),
        message: message.to_string(),
    })?;

    for (i, line) in input.items.iter().enumerate() {
        validation::validate_positive_qty(line.qty).map_err(|message| AppError::Validation {
            field: format!("items[{}].qty", i),
            message: message.to_string(),
        })?;
        validation::validate_unit_cost(line.unit_price).map_err(|message| {
            AppError::Validation {
                field: format!("items[{}].unit_price", i),
                message: message.to_string(),
            }
        })?;
    }

    Ok(())
}

fn group_items(sales: Vec<Sale>, items: Vec<SaleItemDetail>) -> Vec<SaleWithItems> {
    let mut by_sale: std::collections::HashMap<Uuid, Vec<SaleItemDetail>> =
        std::collections::HashMap::new();
    for item in items {
        by_sale.entry(item.sale_id).or_default().push(item);
    }

    sales
        .into_iter()
        .map(|sale| {
            let items = by_sale.remove(&sale.id).unwrap_or_default();
            SaleWithItems { sale, items }
        })
        .collect()
}
