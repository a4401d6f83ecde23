//! Average-cost tracking
//!
//! Runs inside the caller's open transaction; the movement engine holds the
//! stock row lock for the pair while these run, which is what serializes
//! concurrent recomputes of the same average.

use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::AppResult;

/// Current moving average for a (product, warehouse) pair.
///
/// Zero when the pair has never been purchased, so a sale from stock that was
/// only ever adjusted in is costed at zero rather than failing.
pub async fn current_avg(
    conn: &mut PgConnection,
    product_id: Uuid,
    warehouse_id: Uuid,
) -> AppResult<Decimal> {
    let avg = sqlx::query_scalar::<_, Decimal>(
        "SELECT avg_cost FROM cost_averages WHERE product_id = $1 AND warehouse_id = $2",
    )
    .bind(product_id)
    .bind(warehouse_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(avg.unwrap_or(Decimal::ZERO))
}

/// Fold a purchase receipt into the stored average and return the new value.
///
/// `old_qty` must be the on-hand quantity before the receipt, read under the
/// stock row lock; the update is lost-update-safe only because of that lock.
pub async fn apply_purchase(
    conn: &mut PgConnection,
    product_id: Uuid,
    warehouse_id: Uuid,
    old_qty: Decimal,
    purchase_qty: Decimal,
    unit_cost: Decimal,
) -> AppResult<Decimal> {
    let old_avg = current_avg(&mut *conn, product_id, warehouse_id).await?;
    let new_avg = shared::costing::moving_average_rounded(old_qty, old_avg, purchase_qty, unit_cost);

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
    .bind(new_avg)
    .execute(&mut *conn)
    .await?;

    Ok(new_avg)
}
