//! Route definitions for the StockLedger API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - catalog
        .nest("/products", product_routes())
        .nest("/warehouses", warehouse_routes())
        .nest("/suppliers", supplier_routes())
        // Protected routes - document posting
        .nest("/purchases", purchase_routes())
        .nest("/sales", sale_routes())
        .nest("/transfers", transfer_routes())
        .nest("/adjustments", adjustment_routes())
        // Protected routes - stock and ledger reads
        .nest("/stock", stock_routes())
        .nest("/ledger", ledger_routes())
        // Protected routes - reporting
        .nest("/reports", report_routes())
}

/// Product catalog routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Warehouse catalog routes (protected)
fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_warehouses).post(handlers::upsert_warehouse),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Supplier catalog routes (protected)
fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_suppliers).post(handlers::create_supplier),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Purchase posting routes (protected)
fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchases).post(handlers::create_purchase),
        )
        .route("/by-keys", post(handlers::create_purchase_by_keys))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Sale posting routes (protected)
fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Transfer posting routes (protected)
fn transfer_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_transfer))
        .route("/by-keys", post(handlers::create_transfer_by_keys))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Adjustment posting routes (protected)
fn adjustment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_adjustment))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Stock read and rebuild routes (protected)
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_stock))
        .route("/avg-cost", get(handlers::get_avg_cost))
        .route("/rebuild", post(handlers::rebuild_stock))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Ledger browsing routes (protected)
fn ledger_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_ledger))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Reporting routes (protected)
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/stock", get(handlers::get_stock_report))
        .route("/valuation", get(handlers::get_valuation_report))
        .route("/cogs", get(handlers::get_cogs_report))
        .route_layer(middleware::from_fn(auth_middleware))
}
