//! Reporting service for stock on hand, inventory valuation and COGS
//! Read-only views over the ledger and its derived caches, with CSV export

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Stock-on-hand report row
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StockReportRow {
    pub warehouse_code: String,
    pub warehouse_name: String,
    pub sku: String,
    pub product_name: String,
    pub unit: String,
    pub qty_on_hand: Decimal,
    pub last_updated: DateTime<Utc>,
}

/// Valuation report row
#[derive(Debug, Serialize)]
pub struct ValuationRow {
    pub warehouse_code: String,
    pub sku: String,
    pub product_name: String,
    pub qty_on_hand: Decimal,
    pub avg_cost: Decimal,
    pub value: Decimal,
}

/// Valuation report with grand total
#[derive(Debug, Serialize)]
pub struct ValuationReport {
    pub total_value: Decimal,
    pub rows: Vec<ValuationRow>,
}

/// COGS report row, one per sale line
#[derive(Debug, Serialize)]
pub struct CogsRow {
    pub date: NaiveDate,
    pub bill_no: String,
    pub warehouse_code: String,
    pub sku: String,
    pub product_name: String,
    pub qty: Decimal,
    pub unit_price: Decimal,
    pub revenue: Decimal,
    pub unit_cost: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
}

/// COGS report totals
#[derive(Debug, Serialize)]
pub struct CogsTotals {
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
}

/// COGS report with totals
#[derive(Debug, Serialize)]
pub struct CogsReport {
    pub rows: Vec<CogsRow>,
    pub totals: CogsTotals,
}

/// Date window for COGS, filtering on the sale's business date
#[derive(Debug, Default, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, sqlx::FromRow)]
struct ValuationSourceRow {
    warehouse_code: String,
    sku: String,
    product_name: String,
    qty_on_hand: Decimal,
    avg_cost: Option<Decimal>,
}

#[derive(Debug, sqlx::FromRow)]
struct CogsSourceRow {
    doc_date: NaiveDate,
    bill_no: String,
    warehouse_code: String,
    sku: String,
    product_name: String,
    qty: Decimal,
    unit_price: Decimal,
    unit_cost: Option<Decimal>,
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Stock on hand across all warehouses, ordered by warehouse then SKU
    pub async fn stock_report(&self) -> AppResult<Vec<StockReportRow>> {
        let rows = sqlx::query_as::<_, StockReportRow>(
            r#"
            SELECT w.code AS warehouse_code, w.name AS warehouse_name,
                   p.sku, p.name AS product_name, p.unit,
                   sl.qty_on_hand, sl.updated_at AS last_updated
            FROM stock_levels sl
            JOIN products p ON p.id = sl.product_id
            JOIN warehouses w ON w.id = sl.warehouse_id
            ORDER BY w.code ASC, p.sku ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Inventory valuation: qty on hand times moving-average cost per pair
    pub async fn valuation_report(&self) -> AppResult<ValuationReport> {
        let source = sqlx::query_as::<_, ValuationSourceRow>(
            r#"
            SELECT w.code AS warehouse_code, p.sku, p.name AS product_name,
                   sl.qty_on_hand, ca.avg_cost
            FROM stock_levels sl
            JOIN products p ON p.id = sl.product_id
            JOIN warehouses w ON w.id = sl.warehouse_id
            LEFT JOIN cost_averages ca
              ON ca.product_id = sl.product_id AND ca.warehouse_id = sl.warehouse_id
            ORDER BY w.code ASC, p.sku ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(build_valuation_report(source))
    }

    /// COGS per sale line over a date window, costed from the ledger snapshots
    pub async fn cogs_report(&self, range: &DateRange) -> AppResult<CogsReport> {
        // A sale line normally maps to exactly one ledger entry; if several
        // exist for the same sale, product and warehouse, blend their
        // snapshots weighted by quantity.
        let source = sqlx::query_as::<_, CogsSourceRow>(
            r#"
            SELECT s.doc_date, s.bill_no, w.code AS warehouse_code,
                   p.sku, p.name AS product_name,
                   si.qty, si.unit_price,
                   (
                       SELECT SUM(ABS(le.qty) * COALESCE(le.unit_cost, 0))
                              / NULLIF(SUM(ABS(le.qty)), 0)
                       FROM ledger_entries le
                       WHERE le.movement_type = 'sale'
                         AND le.ref_table = 'sales'
                         AND le.ref_id = s.id
                         AND le.product_id = si.product_id
                         AND le.warehouse_id = si.warehouse_id
                   ) AS unit_cost
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            JOIN products p ON p.id = si.product_id
            JOIN warehouses w ON w.id = si.warehouse_id
            WHERE ($1::date IS NULL OR s.doc_date >= $1)
              AND ($2::date IS NULL OR s.doc_date <= $2)
            ORDER BY s.doc_date ASC, s.bill_no ASC
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.db)
        .await?;

        Ok(build_cogs_report(source))
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }

    /// Export a COGS report as CSV with a trailing totals record
    pub fn cogs_to_csv(report: &CogsReport) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for row in &report.rows {
            wtr.serialize(row)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }

        let revenue = report.totals.revenue.to_string();
        let cost = report.totals.cost.to_string();
        let profit = report.totals.profit.to_string();
        // Totals sit under the revenue, cost and profit columns
        wtr.write_record([
            "Totals",
            "",
            "",
            "",
            "",
            "",
            "",
            revenue.as_str(),
            "",
            cost.as_str(),
            profit.as_str(),
        ])
        .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;

        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}

fn build_valuation_report(source: Vec<ValuationSourceRow>) -> ValuationReport {
    let mut total_value = Decimal::ZERO;
    let rows = source
        .into_iter()
        .map(|row| {
            let avg_cost = row.avg_cost.unwrap_or(Decimal::ZERO);
            let value = (row.qty_on_hand * avg_cost).round_dp(2);
            total_value += value;
            ValuationRow {
                warehouse_code: row.warehouse_code,
                sku: row.sku,
                product_name: row.product_name,
                qty_on_hand: row.qty_on_hand,
                avg_cost,
                value,
            }
        })
        .collect();

    ValuationReport { total_value, rows }
}

fn build_cogs_report(source: Vec<CogsSourceRow>) -> CogsReport {
    let mut rows = Vec::with_capacity(source.len());
    // Totals accumulate unrounded so they do not drift from the row sums
    let mut total_revenue = Decimal::ZERO;
    let mut total_cost = Decimal::ZERO;

    for line in source {
        // Lines posted before costing existed have no snapshot; cost them at zero
        let unit_cost = line.unit_cost.unwrap_or(Decimal::ZERO);
        let revenue = line.qty * line.unit_price;
        let cost = line.qty * unit_cost;

        total_revenue += revenue;
        total_cost += cost;

        rows.push(CogsRow {
            date: line.doc_date,
            bill_no: line.bill_no,
            warehouse_code: line.warehouse_code,
            sku: line.sku,
            product_name: line.product_name,
            qty: line.qty,
            unit_price: line.unit_price,
            revenue: revenue.round_dp(2),
            unit_cost: unit_cost.round_dp(2),
            cost: cost.round_dp(2),
            profit: (revenue - cost).round_dp(2),
        });
    }

    CogsReport {
        rows,
        totals: CogsTotals {
            revenue: total_revenue.round_dp(2),
            cost: total_cost.round_dp(2),
            profit: (total_revenue - total_cost).round_dp(2),
        },
    }
}
