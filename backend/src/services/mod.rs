//! Business logic services for the StockLedger inventory platform

pub mod adjustment;
pub mod costing;
pub mod ledger;
pub mod movement;
pub mod product;
pub mod purchase;
pub mod reporting;
pub mod sale;
pub mod stock;
pub mod supplier;
pub mod transfer;
pub mod warehouse;

pub use adjustment::AdjustmentService;
pub use ledger::LedgerService;
pub use product::ProductService;
pub use purchase::PurchaseService;
pub use reporting::ReportingService;
pub use sale::SaleService;
pub use stock::StockService;
pub use supplier::SupplierService;
pub use transfer::TransferService;
pub use warehouse::WarehouseService;
