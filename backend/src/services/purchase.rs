//! Purchase posting service
//!
//! A purchase document receives stock into one or more warehouses: header and
//! item rows for the paper trail, one engine movement per line for the
//! ledger, cache and average-cost updates. Everything happens in a single
//! transaction, retried wholesale on serialization conflicts.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::validation;

use crate::error::{AppError, AppResult};
use crate::services::movement::{self, DocumentRef, MovementType, PostMovement};

/// Purchase posting service
#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
    max_attempts: u32,
}

/// Purchase header
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub doc_date: NaiveDate,
    pub invoice_no: String,
    pub total: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Purchase line joined with product and warehouse identifiers for listings
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseItemDetail {
    pub id: Uuid,
    pub purchase_id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub product_name: String,
    pub warehouse_id: Uuid,
    pub warehouse_code: String,
    pub qty: Decimal,
    pub unit_cost: Decimal,
}

/// Purchase header with its lines
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseWithItems {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub items: Vec<PurchaseItemDetail>,
}

/// Input for posting a purchase by ids
#[derive(Debug, Deserialize)]
pub struct PurchaseInput {
    pub supplier_id: Uuid,
    pub doc_date: NaiveDate,
    pub invoice_no: String,
    pub items: Vec<PurchaseLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseLineInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub qty: Decimal,
    pub unit_cost: Decimal,
}

/// Input for posting a purchase by natural keys (import-friendly)
#[derive(Debug, Deserialize)]
pub struct PurchaseByKeysInput {
    pub supplier_name: String,
    pub doc_date: NaiveDate,
    pub invoice_no: String,
    pub items: Vec<PurchaseByKeysLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseByKeysLineInput {
    pub sku: String,
    pub warehouse_code: String,
    pub qty: Decimal,
    pub unit_cost: Decimal,
}

impl PurchaseService {
    /// Create a new PurchaseService instance
    pub fn new(db: PgPool, max_attempts: u32) -> Self {
        Self { db, max_attempts }
    }

    /// Post a purchase document
    pub async fn post(&self, actor_id: Uuid, input: PurchaseInput) -> AppResult<Purchase> {
        validate_purchase_input(&input)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_post(actor_id, &input).await {
                Err(err) if err.is_serialization_conflict() => {
                    if attempt >= self.max_attempts {
                        return Err(AppError::Conflict(
                            "Purchase could not be posted after repeated transaction conflicts"
                                .to_string(),
                        ));
                    }
                    tracing::warn!(attempt, "purchase post hit a transaction conflict, retrying");
                }
                result => return result,
            }
        }
    }

    /// Post a purchase identified by supplier name, SKUs and warehouse codes
    pub async fn post_by_keys(
        &self,
        actor_id: Uuid,
        input: PurchaseByKeysInput,
    ) -> AppResult<Purchase> {
        let resolved = self.resolve_keys(input).await?;
        self.post(actor_id, resolved).await
    }

    /// List recent purchases with their lines
    pub async fn list(&self) -> AppResult<Vec<PurchaseWithItems>> {
        let purchases = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT id, supplier_id, doc_date, invoice_no, total, created_by, created_at
            FROM purchases
            ORDER BY created_at DESC
            LIMIT 50
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = purchases.iter().map(|p| p.id).collect();
        let items = sqlx::query_as::<_, PurchaseItemDetail>(
            r#"
            SELECT pi.id, pi.purchase_id, pi.product_id, p.sku, p.name AS product_name,
                   pi.warehouse_id, w.code AS warehouse_code, pi.qty, pi.unit_cost
            FROM purchase_items pi
            JOIN products p ON p.id = pi.product_id
            JOIN warehouses w ON w.id = pi.warehouse_id
            WHERE pi.purchase_id = ANY($1)
            ORDER BY pi.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        Ok(group_items(purchases, items))
    }

    async fn try_post(&self, actor_id: Uuid, input: &PurchaseInput) -> AppResult<Purchase> {
        let mut tx = self.db.begin().await?;

        let supplier_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)")
                .bind(input.supplier_id)
                .fetch_one(&mut *tx)
                .await?;

        if !supplier_exists {
            return Err(AppError::UnknownSupplier(input.supplier_id.to_string()));
        }

        let total = shared::costing::document_total(
            input.items.iter().map(|line| (line.qty, line.unit_cost)),
        );

        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            INSERT INTO purchases (supplier_id, doc_date, invoice_no, total, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, supplier_id, doc_date, invoice_no, total, created_by, created_at
            "#,
        )
        .bind(input.supplier_id)
        .bind(input.doc_date)
        .bind(&input.invoice_no)
        .bind(total)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await?;

        for line in &input.items {
            sqlx::query(
                r#"
                INSERT INTO purchase_items (purchase_id, product_id, warehouse_id, qty, unit_cost)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(purchase.id)
            .bind(line.product_id)
            .bind(line.warehouse_id)
            .bind(line.qty)
            .bind(line.unit_cost)
            .execute(&mut *tx)
            .await?;

            movement::post_movement(
                &mut *tx,
                &PostMovement {
                    product_id: line.product_id,
                    warehouse_id: line.warehouse_id,
                    movement_type: MovementType::Purchase,
                    qty: line.qty,
                    unit_cost: Some(line.unit_cost),
                    reason: None,
                    reference: Some(DocumentRef {
                        table: "purchases",
                        id: purchase.id,
                    }),
                    actor_id,
                },
            )
            .await?;
        }

        tx.commit().await?;

        Ok(purchase)
    }

    /// Resolve natural keys into ids. Lookups are read-only; the posting
    /// transaction re-validates every reference it writes against.
    async fn resolve_keys(&self, input: PurchaseByKeysInput) -> AppResult<PurchaseInput> {
        let supplier_id =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM suppliers WHERE name = $1 LIMIT 1")
                .bind(&input.supplier_name)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::UnknownSupplier(input.supplier_name.clone()))?;

        let mut items = Vec::with_capacity(input.items.len());
        for line in input.items {
            let product_id =
                sqlx::query_scalar::<_, Uuid>("SELECT id FROM products WHERE sku = $1")
                    .bind(&line.sku)
                    .fetch_optional(&self.db)
                    .await?
                    .ok_or_else(|| AppError::UnknownProduct(line.sku.clone()))?;

            let warehouse_id =
                sqlx::query_scalar::<_, Uuid>("SELECT id FROM warehouses WHERE code = $1")
                    .bind(&line.warehouse_code)
                    .fetch_optional(&self.db)
                    .await?
                    .ok_or_else(|| AppError::UnknownWarehouse(line.warehouse_code.clone()))?;

            items.push(PurchaseLineInput {
                product_id,
                warehouse_id,
                qty: line.qty,
                unit_cost: line.unit_cost,
            });
        }

        Ok(PurchaseInput {
            supplier_id,
            doc_date: input.doc_date,
            invoice_no: input.invoice_no,
            items,
        })
    }
}

fn validate_purchase_input(input: &PurchaseInput) -> AppResult<()> {
    validation::validate_code(&input.invoice_no).map_err(|message| AppError::Validation {
        field: "invoice_no".to_string(),
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
        validation::validate_unit_cost(line.unit_cost).map_err(|message| AppError::Validation {
            field: format!("items[{}].unit_cost", i),
            message: message.to_string(),
        })?;
    }

    Ok(())
}

fn group_items(
    purchases: Vec<Purchase>,
    items: Vec<PurchaseItemDetail>,
) -> Vec<PurchaseWithItems> {
    let mut by_purchase: std::collections::HashMap<Uuid, Vec<PurchaseItemDetail>> =
        std::collections::HashMap::new();
    for item in items {
        by_purchase.entry(item.purchase_id).or_default().push(item);
    }

    purchases
        .into_iter()
        .map(|purchase| {
            let items = by_purchase.remove(&purchase.id).unwrap_or_default();
            PurchaseWithItems { purchase, items }
        })
        .collect()
}
