//! Reporting handlers for stock, valuation and COGS views with CSV export

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::reporting::{CogsReport, DateRange, ReportingService, ValuationReport};
use crate::AppState;

#[derive(Deserialize)]
pub struct StockReportQuery {
    pub format: Option<String>, // "json" or "csv"
}

#[derive(Deserialize)]
pub struct CogsQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub format: Option<String>,
}

/// Get the stock-on-hand report
pub async fn get_stock_report(
    State(state): State<AppState>,
    Query(query): Query<StockReportQuery>,
) -> AppResult<impl IntoResponse> {
    let service = ReportingService::new(state.db.clone());
    let data = service.stock_report().await?;

    if query.format.as_deref() == Some("csv") {
        let csv = ReportingService::export_to_csv(&data)?;
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"stock_on_hand.csv\"",
                ),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(data).into_response())
    }
}

/// Get the inventory valuation report
pub async fn get_valuation_report(
    State(state): State<AppState>,
) -> AppResult<Json<ValuationReport>> {
    let service = ReportingService::new(state.db.clone());
    let report = service.valuation_report().await?;
    Ok(Json(report))
}

/// Get the COGS report for a date range
pub async fn get_cogs_report(
    State(state): State<AppState>,
    Query(query): Query<CogsQuery>,
) -> AppResult<impl IntoResponse> {
    let service = ReportingService::new(state.db.clone());

    let range = DateRange {
        from: query.from,
        to: query.to,
    };
    let report: CogsReport = service.cogs_report(&range).await?;

    if query.format.as_deref() == Some("csv") {
        let csv = ReportingService::cogs_to_csv(&report)?;
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"cogs.csv\"",
                ),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(report).into_response())
    }
}
